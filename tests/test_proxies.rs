//! Tests for the proxies on both sides of the membrane.
//!
//! These tests verify identity preservation, snapshot and live forward proxies,
//! immutable reverse proxies, revocation, construction and reference release.

extern crate near_membrane;

use std::rc::Rc;

use near_membrane::membrane::{
    create_connector, EnvironmentOptions, MembraneConfig, RealmEvaluator, VirtualEnvironment,
};
use near_membrane::runner::ds::error::JErrorType;
use near_membrane::runner::ds::function_object::{new_native_function, NativeFn};
use near_membrane::runner::ds::object::{new_object, ObjectType};
use near_membrane::runner::ds::object_property::{
    PropertyDescriptor, PropertyDescriptorSetter, PropertyKey,
};
use near_membrane::runner::ds::operations::object as ops;
use near_membrane::runner::ds::realm::{CodeRealm, JsCodeRealmType, WellKnownIntrinsics};
use near_membrane::runner::ds::value::{JsNumberType, JsValue};

fn realms() -> (JsCodeRealmType, JsCodeRealmType) {
    (CodeRealm::new(), CodeRealm::new())
}

fn options_for(blue: &JsCodeRealmType, red: &JsCodeRealmType) -> EnvironmentOptions {
    EnvironmentOptions::new()
        .blue_connector(create_connector(RealmEvaluator::Global(blue.clone())).unwrap())
        .red_connector(create_connector(RealmEvaluator::Global(red.clone())).unwrap())
}

fn environment(blue: &JsCodeRealmType, red: &JsCodeRealmType) -> VirtualEnvironment {
    VirtualEnvironment::new(options_for(blue, red)).unwrap()
}

fn endow(env: &VirtualEnvironment, red: &JsCodeRealmType, name: &str, value: JsValue) {
    env.remap(
        &red.global_object(),
        vec![(PropertyKey::from(name), PropertyDescriptor::new_data(value, true, true, true))],
    )
    .unwrap();
}

fn key(name: &str) -> PropertyKey {
    PropertyKey::from(name)
}

fn int(i: i64) -> JsValue {
    JsValue::Number(JsNumberType::Integer(i))
}

fn is_proxy(v: &JsValue) -> bool {
    matches!(v, JsValue::Object(o) if o.borrow().is_proxy())
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn test_repeated_crossings_return_same_proxy() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let original = blue.evaluate("({ x: 1 })").unwrap();
    let first = env.get_red(&original).unwrap();
    let second = env.get_red(&original).unwrap();
    assert!(is_proxy(&first));
    assert_eq!(first, second);
    assert_eq!(env.get_blue(&first).unwrap(), original);
}

#[test]
fn test_primitives_cross_unchanged() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    for value in vec![
        JsValue::Undefined,
        JsValue::Null,
        JsValue::Boolean(true),
        JsValue::from("text"),
        int(-4),
        JsValue::Number(JsNumberType::Float(0.5)),
    ] {
        assert_eq!(env.get_red(&value).unwrap(), value);
        assert_eq!(env.get_blue(&value).unwrap(), value);
    }
}

#[test]
fn test_arrays_are_rebuilt_in_receiving_realm() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let list = blue.evaluate("[1, [2, 3]]").unwrap();
    let seen = env.get_red(&list).unwrap();
    let seen = seen.as_object().unwrap();
    assert!(matches!(&*seen.borrow(), ObjectType::Array(_)));
    let red_array_prototype = red.get_intrinsics_value(WellKnownIntrinsics::ArrayPrototype).unwrap();
    assert!(Rc::ptr_eq(&ops::get_prototype_of(seen).unwrap().unwrap(), &red_array_prototype));
    let inner = ops::get(seen, &PropertyKey::Int(1), &JsValue::Object(seen.clone())).unwrap();
    assert!(matches!(inner, JsValue::Object(ref o) if matches!(&*o.borrow(), ObjectType::Array(_))));
}

#[test]
fn test_arrays_beyond_depth_limit_are_proxied() {
    let (blue, red) = realms();
    let config = MembraneConfig {
        array_depth_limit: 0,
        ..Default::default()
    };
    let env = VirtualEnvironment::new(options_for(&blue, &red).config(config)).unwrap();
    let list = blue.evaluate("[1, 2]").unwrap();
    let seen = env.get_red(&list).unwrap();
    assert!(is_proxy(&seen));
    endow(&env, &red, "list", list);
    assert_eq!(env.evaluate("Array.isArray(list)").unwrap(), JsValue::Boolean(true));
    assert_eq!(env.evaluate("list[1]").unwrap(), int(2));
}

#[test]
fn test_cyclic_arrays_cross() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let list = blue.evaluate("var loop = []; loop.push(loop); loop").unwrap();
    let seen = env.get_red(&list).unwrap();
    let seen = seen.as_object().unwrap();
    let inner = ops::get(seen, &PropertyKey::Int(0), &JsValue::Object(seen.clone())).unwrap();
    assert!(is_proxy(&inner));
    assert_eq!(env.get_blue(&inner).unwrap(), list);
}

// ============================================================================
// Forward proxies
// ============================================================================

#[test]
fn test_snapshot_is_taken_on_first_use() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let state = blue.evaluate("var state = { x: 1 }; state").unwrap();
    endow(&env, &red, "state", state);
    blue.evaluate("state.x = 2").unwrap();
    assert_eq!(env.evaluate("state.x").unwrap(), int(2));
    blue.evaluate("state.x = 3").unwrap();
    assert_eq!(env.evaluate("state.x").unwrap(), int(2));
}

#[test]
fn test_snapshot_writes_stay_in_red() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let state = blue.evaluate("var state = { x: 1 }; state").unwrap();
    endow(&env, &red, "state", state);
    assert_eq!(env.evaluate("state.y = 5; state.y").unwrap(), int(5));
    assert_eq!(blue.evaluate("typeof state.y").unwrap(), JsValue::from("undefined"));
}

#[test]
fn test_frozen_snapshot_rejects_strict_writes() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let frozen = blue.evaluate("Object.freeze({ x: 1 })").unwrap();
    endow(&env, &red, "frozen", frozen);
    assert!(matches!(
        env.evaluate("'use strict'; frozen.x = 2"),
        Err(JErrorType::TypeError(_))
    ));
    assert_eq!(env.evaluate("frozen.x = 2; frozen.x").unwrap(), int(1));
    assert_eq!(env.evaluate("Object.isFrozen(frozen)").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_live_targets_forward_every_trap() {
    let (blue, red) = realms();
    let options = options_for(&blue, &red).live_target_callback(|_| true);
    let env = VirtualEnvironment::new(options).unwrap();
    let state = blue.evaluate("var state = { x: 1 }; state").unwrap();
    endow(&env, &red, "state", state);
    assert_eq!(env.evaluate("state.x").unwrap(), int(1));
    blue.evaluate("state.x = 3").unwrap();
    assert_eq!(env.evaluate("state.x").unwrap(), int(3));
    env.evaluate("state.y = 'from red'").unwrap();
    assert_eq!(blue.evaluate("state.y").unwrap(), JsValue::from("from red"));
    env.evaluate("delete state.y").unwrap();
    assert_eq!(blue.evaluate("'y' in state").unwrap(), JsValue::Boolean(false));
}

#[test]
fn test_live_target_freeze_is_observed() {
    let (blue, red) = realms();
    let options = options_for(&blue, &red).live_target_callback(|_| true);
    let env = VirtualEnvironment::new(options).unwrap();
    let state = blue.evaluate("var state = { x: 1 }; state").unwrap();
    endow(&env, &red, "state", state);
    assert_eq!(env.evaluate("Object.isExtensible(state)").unwrap(), JsValue::Boolean(true));
    blue.evaluate("Object.freeze(state)").unwrap();
    assert_eq!(env.evaluate("Object.isExtensible(state)").unwrap(), JsValue::Boolean(false));
    assert_eq!(env.evaluate("Object.isFrozen(state)").unwrap(), JsValue::Boolean(true));
    assert_eq!(env.evaluate("state.x").unwrap(), int(1));
}

#[test]
fn test_revoked_proxies_throw() {
    let (blue, red) = realms();
    let secret = blue.evaluate("({ key: 'hidden' })").unwrap();
    let revoked = secret.clone();
    let options = options_for(&blue, &red).revoked_proxy_callback(move |o| {
        matches!(&revoked, JsValue::Object(r) if Rc::ptr_eq(r, o))
    });
    let env = VirtualEnvironment::new(options).unwrap();
    endow(&env, &red, "secret", secret);
    endow(&env, &red, "open", blue.evaluate("({ key: 'visible' })").unwrap());
    assert!(matches!(env.evaluate("secret.key"), Err(JErrorType::TypeError(_))));
    assert_eq!(env.evaluate("open.key").unwrap(), JsValue::from("visible"));
}

#[test]
fn test_functions_are_applied_in_their_realm() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let add = blue.evaluate("(a, b) => a + b").unwrap();
    endow(&env, &red, "add", add);
    assert_eq!(env.evaluate("add(2, 3)").unwrap(), int(5));
    assert_eq!(env.evaluate("typeof add").unwrap(), JsValue::from("function"));
    let echo = blue.evaluate("(v) => v").unwrap();
    endow(&env, &red, "echo", echo);
    assert_eq!(
        env.evaluate("var mine = {}; echo(mine) === mine").unwrap(),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_construct_through_membrane() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let object_prototype = blue.get_intrinsics_value(WellKnownIntrinsics::ObjectPrototype).unwrap();
    let function_prototype = blue.get_intrinsics_value(WellKnownIntrinsics::FunctionPrototype).unwrap();
    let behaviour: NativeFn = Rc::new(move |_, args, new_target| {
        if new_target.is_none() {
            return Err(JErrorType::TypeError("Point requires new".to_string()));
        }
        let point = new_object(Some(object_prototype.clone()));
        let x = args.into_iter().next().unwrap_or(JsValue::Undefined);
        ops::create_data_property(&point, PropertyKey::from("x"), x)?;
        Ok(JsValue::Object(point))
    });
    let point = new_native_function(
        "Point",
        1,
        true,
        Some(function_prototype),
        Rc::downgrade(&blue),
        behaviour,
    );
    endow(&env, &red, "Point", JsValue::Object(point));
    assert_eq!(env.evaluate("new Point(3).x").unwrap(), int(3));
    assert_eq!(env.evaluate("new Point(3) instanceof Object").unwrap(), JsValue::Boolean(true));
    assert!(matches!(env.evaluate("Point(3)"), Err(JErrorType::TypeError(_))));
    let arrow = blue.evaluate("() => 1").unwrap();
    endow(&env, &red, "arrow", arrow);
    assert!(matches!(env.evaluate("new arrow()"), Err(JErrorType::TypeError(_))));
}

#[test]
fn test_prototype_cycle_through_membrane_raises_range_error() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let b = blue.evaluate("({})").unwrap();
    let r = red.evaluate("({})").unwrap();
    let r_in_blue = env.get_blue(&r).unwrap();
    assert!(ops::set_prototype_of(b.as_object().unwrap(), r_in_blue.as_object().cloned()).unwrap());
    let b_in_red = env.get_red(&b).unwrap();
    assert!(ops::set_prototype_of(r.as_object().unwrap(), b_in_red.as_object().cloned()).unwrap());
    let proxy = b_in_red.as_object().unwrap();
    assert!(matches!(
        ops::get(proxy, &key("missing"), &b_in_red),
        Err(JErrorType::RangeError(_))
    ));
}

// ============================================================================
// Reverse proxies
// ============================================================================

#[test]
fn test_reverse_proxies_are_immutable() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let red_object = red.evaluate("({ v: 1 })").unwrap();
    let view = env.get_blue(&red_object).unwrap();
    let view = view.as_object().unwrap();

    assert!(!ops::prevent_extensions(view).unwrap());
    assert!(!ops::set_prototype_of(view, None).unwrap());
    assert!(!ops::delete(view, &key("v")).unwrap());
    let desc = PropertyDescriptorSetter::new_from_property_descriptor(
        PropertyDescriptor::new_data(int(9), true, true, true),
    );
    assert!(!ops::define_own_property(view, key("w"), desc).unwrap());

    let original = red_object.as_object().unwrap();
    assert!(ops::is_extensible(original).unwrap());
    assert!(ops::get_prototype_of(original).unwrap().is_some());
    assert_eq!(ops::get(original, &key("v"), &red_object).unwrap(), int(1));
    assert!(ops::get_own_property(original, &key("w")).unwrap().is_none());
}

#[test]
fn test_reverse_proxies_read_live() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let red_object = red.evaluate("var counter = { n: 1 }; counter").unwrap();
    let view = env.get_blue(&red_object).unwrap();
    let o = view.as_object().unwrap();
    assert_eq!(ops::get(o, &key("n"), &view).unwrap(), int(1));
    red.evaluate("counter.n = 2").unwrap();
    assert_eq!(ops::get(o, &key("n"), &view).unwrap(), int(2));
    assert_eq!(ops::own_property_keys(o).unwrap(), vec![key("n")]);
}

#[test]
fn test_reverse_proxies_see_red_freeze() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let red_object = red.evaluate("var sealedThing = { n: 1 }; sealedThing").unwrap();
    let view = env.get_blue(&red_object).unwrap();
    let o = view.as_object().unwrap();
    red.evaluate("Object.freeze(sealedThing)").unwrap();
    assert!(!ops::is_extensible(o).unwrap());
    assert!(ops::test_integrity_level(o, true).unwrap());
}

// ============================================================================
// Release
// ============================================================================

#[test]
fn test_dropped_proxies_release_exports() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let baseline = env.stats();
    let original = blue.evaluate("({ x: 1 })").unwrap();
    let proxy = env.get_red(&original).unwrap();
    let during = env.stats();
    assert_eq!(during.blue.exported, baseline.blue.exported + 1);
    assert_eq!(during.red.imported, baseline.red.imported + 1);
    drop(proxy);
    let after = env.stats();
    assert_eq!(after.blue.exported, baseline.blue.exported);
    assert_eq!(after.red.imported, baseline.red.imported);
}

#[test]
fn test_failed_snapshot_releases_partial_exports() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let baseline = env.stats();
    let state = blue
        .evaluate(
            "var arr = []; \
             Object.defineProperty(arr, '0', { get: () => missingName, configurable: true }); \
             ({ p: {}, q: {}, z: arr })",
        )
        .unwrap();
    endow(&env, &red, "state", state);
    assert_eq!(env.evaluate("state.p").unwrap(), JsValue::Undefined);
    assert_eq!(env.evaluate("delete state").unwrap(), JsValue::Boolean(true));
    let after = env.stats();
    assert_eq!(after.blue.exported, baseline.blue.exported);
    assert_eq!(after.red.imported, baseline.red.imported);
}

#[test]
fn test_linked_intrinsics_are_pinned() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let stats = env.stats();
    assert_eq!(stats.blue.pinned, WellKnownIntrinsics::LINKED.len());
    assert_eq!(stats.red.linked, WellKnownIntrinsics::LINKED.len());
}

#[test]
fn test_proxies_outliving_the_environment_throw() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let f = blue.evaluate("() => 1").unwrap();
    let proxy = env.get_red(&f).unwrap();
    assert_eq!(ops::call(&proxy, JsValue::Undefined, vec![]).unwrap(), int(1));
    drop(env);
    assert!(matches!(
        ops::call(&proxy, JsValue::Undefined, vec![]),
        Err(JErrorType::TypeError(_))
    ));
}
