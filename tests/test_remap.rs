//! Tests for installing blue endowments into the red realm.
//!
//! These tests cover `remap`, `lazy_remap`, `remap_proto` and `link`, including the
//! distortion of accessors and the handling of keys the target will not accept.

extern crate near_membrane;

use std::rc::Rc;

use near_membrane::membrane::{
    create_connector, EnvironmentOptions, MembraneError, RealmEvaluator, VirtualEnvironment,
};
use near_membrane::runner::ds::error::JErrorType;
use near_membrane::runner::ds::object::JsObjectType;
use near_membrane::runner::ds::object_property::{PropertyDescriptor, PropertyKey};
use near_membrane::runner::ds::operations::object as ops;
use near_membrane::runner::ds::realm::{CodeRealm, JsCodeRealmType};
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

fn object(realm: &JsCodeRealmType, source: &str) -> JsObjectType {
    match realm.evaluate(source).unwrap() {
        JsValue::Object(o) => o,
        other => panic!("{} evaluated to {:?}", source, other),
    }
}

fn data(value: JsValue) -> PropertyDescriptor {
    PropertyDescriptor::new_data(value, true, true, true)
}

fn getter(get: &JsObjectType) -> PropertyDescriptor {
    PropertyDescriptor::new_accessor(Some(get.clone()), None, true, true)
}

fn key(name: &str) -> PropertyKey {
    PropertyKey::from(name)
}

fn int(i: i64) -> JsValue {
    JsValue::Number(JsNumberType::Integer(i))
}

// ============================================================================
// remap
// ============================================================================

#[test]
fn test_remap_endows_red_global() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let host = blue.evaluate("({ name: 'blue', depth: 2 })").unwrap();
    env.remap(&red.global_object(), vec![(key("host"), data(host.clone()))])
        .unwrap();
    assert_eq!(env.evaluate("host.name").unwrap(), JsValue::from("blue"));
    assert_eq!(env.evaluate("host").unwrap(), host);
    assert_eq!(env.evaluate("host === host").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_distortion_swaps_getters() {
    let (blue, red) = realms();
    let a_getter = object(&blue, "() => 'a'");
    let b_getter = object(&blue, "() => 'b'");
    let c_getter = object(&blue, "() => 'c'");
    let (a, b) = (JsValue::Object(a_getter.clone()), JsValue::Object(b_getter.clone()));
    let options = options_for(&blue, &red).distortion_callback(move |v| {
        if *v == a {
            b.clone()
        } else if *v == b {
            a.clone()
        } else {
            v.clone()
        }
    });
    let env = VirtualEnvironment::new(options).unwrap();
    env.remap(
        &red.global_object(),
        vec![
            (key("a"), getter(&a_getter)),
            (key("b"), getter(&b_getter)),
            (key("c"), getter(&c_getter)),
        ],
    )
    .unwrap();
    assert_eq!(env.evaluate("a").unwrap(), JsValue::from("b"));
    assert_eq!(env.evaluate("b").unwrap(), JsValue::from("a"));
    assert_eq!(env.evaluate("c").unwrap(), JsValue::from("c"));
}

#[test]
fn test_distortion_applies_to_return_values() {
    let (blue, red) = realms();
    let api = object(&blue, "var dangerous = () => 'boom'; ({ reveal: () => dangerous })");
    let dangerous = blue.evaluate("dangerous").unwrap();
    let safe = blue.evaluate("() => 'safe'").unwrap();
    let (from, to) = (dangerous.clone(), safe.clone());
    let options = options_for(&blue, &red)
        .distortion_callback(move |v| if *v == from { to.clone() } else { v.clone() });
    let env = VirtualEnvironment::new(options).unwrap();
    env.remap(
        &red.global_object(),
        vec![
            (key("api"), data(JsValue::Object(api))),
            (key("safe"), data(safe)),
        ],
    )
    .unwrap();
    assert_eq!(env.evaluate("api.reveal()()").unwrap(), JsValue::from("safe"));
    assert_eq!(env.evaluate("api.reveal() === safe").unwrap(), JsValue::Boolean(true));
}

#[test]
fn test_remap_skips_index_keys_on_plain_objects() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let red_value = object(&red, "({})");
    env.remap(&red_value, vec![(key("0"), data(JsValue::from("foo")))])
        .unwrap();
    assert!(ops::own_property_keys(&red_value).unwrap().is_empty());

    let red_array = object(&red, "[]");
    env.remap(&red_array, vec![(key("0"), data(JsValue::from("foo")))])
        .unwrap();
    let first = ops::get(&red_array, &key("0"), &JsValue::Object(red_array.clone())).unwrap();
    assert_eq!(first, JsValue::from("foo"));
}

#[test]
fn test_remap_leaves_non_configurable_properties() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let target = object(
        &red,
        "var t = {}; Object.defineProperty(t, 'k', { value: 1 }); t",
    );
    env.remap(&target, vec![(key("k"), data(int(2)))]).unwrap();
    let desc = ops::get_own_property(&target, &key("k")).unwrap().unwrap();
    assert!(desc == PropertyDescriptor::new_data(int(1), false, false, false));
}

#[test]
fn test_strict_write_to_read_only_endowment_throws() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    env.remap(
        &red.global_object(),
        vec![(key("limit"), PropertyDescriptor::new_data(int(5), false, true, false))],
    )
    .unwrap();
    assert!(matches!(
        env.evaluate("'use strict'; limit = 6"),
        Err(JErrorType::TypeError(_))
    ));
    assert_eq!(env.evaluate("limit = 6; limit").unwrap(), int(5));
}

#[test]
fn test_getter_only_endowment_shadows_writes() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let title = object(&blue, "var blueTitle = 'original'; () => blueTitle");
    env.remap(&red.global_object(), vec![(key("title"), getter(&title))])
        .unwrap();
    assert_eq!(env.evaluate("title").unwrap(), JsValue::from("original"));
    env.evaluate("title = 'shadowed'").unwrap();
    assert_eq!(env.evaluate("title").unwrap(), JsValue::from("shadowed"));
    assert_eq!(blue.evaluate("blueTitle").unwrap(), JsValue::from("original"));
    let own = ops::get_own_property(&red.global_object(), &key("title"))
        .unwrap()
        .unwrap();
    assert!(own.is_data_descriptor());
}

#[test]
fn test_remap_rejects_blue_views_as_targets() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let blue_object = blue.evaluate("({})").unwrap();
    let red_view = env.get_red(&blue_object).unwrap();
    let red_view = red_view.as_object().unwrap();
    assert!(matches!(
        env.remap(red_view, vec![(key("x"), data(int(1)))]),
        Err(MembraneError::InvalidInvocation(_))
    ));
}

// ============================================================================
// lazy_remap
// ============================================================================

#[test]
fn test_lazy_remap_materializes_on_first_access() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let source = object(&blue, "({ answer: 42, greet: () => 'hi' })");
    let global = red.global_object();
    env.lazy_remap(&global, &source, vec![key("answer"), key("greet"), key("missing")])
        .unwrap();

    let placeholder = ops::get_own_property(&global, &key("answer")).unwrap().unwrap();
    assert!(placeholder.is_accessor_descriptor());

    assert_eq!(env.evaluate("answer").unwrap(), int(42));
    let materialized = ops::get_own_property(&global, &key("answer")).unwrap().unwrap();
    assert!(materialized == PropertyDescriptor::new_data(int(42), true, true, true));

    assert_eq!(env.evaluate("greet()").unwrap(), JsValue::from("hi"));
    assert_eq!(env.evaluate("typeof missing").unwrap(), JsValue::from("undefined"));
    assert!(ops::get_own_property(&global, &key("missing")).unwrap().is_none());
}

#[test]
fn test_captured_placeholder_reads_materialized_value() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let source = object(&blue, "({ answer: 42 })");
    env.lazy_remap(&red.global_object(), &source, vec![key("answer")])
        .unwrap();
    let source = "var early = Object.getOwnPropertyDescriptor(globalThis, 'answer').get; \
                  answer + 0; \
                  early()";
    assert_eq!(env.evaluate(source).unwrap(), int(42));
}

#[test]
fn test_lazy_remap_write_before_read() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let source = object(&blue, "({ counter: 1 })");
    env.lazy_remap(&red.global_object(), &source, vec![key("counter")])
        .unwrap();
    assert_eq!(env.evaluate("counter = counter + 1; counter").unwrap(), int(2));
    let blue_counter = ops::get(&source, &key("counter"), &JsValue::Object(source.clone())).unwrap();
    assert_eq!(blue_counter, int(1));
}

#[test]
fn test_live_lazy_remap_forwards_writes_to_setter() {
    let (blue, red) = realms();
    let options = options_for(&blue, &red).live_target_callback(|_| true);
    let env = VirtualEnvironment::new(options).unwrap();
    let source = object(
        &blue,
        "var store = { v: 1 }; var src = {}; \
         Object.defineProperty(src, 'title', { get: () => store.v, set: (x) => store.v = x, configurable: true }); \
         src",
    );
    env.lazy_remap(&red.global_object(), &source, vec![key("title")])
        .unwrap();
    assert_eq!(env.evaluate("title").unwrap(), int(1));
    env.evaluate("title = 5").unwrap();
    assert_eq!(blue.evaluate("store.v").unwrap(), int(5));
    blue.evaluate("store.v = 9").unwrap();
    assert_eq!(env.evaluate("title").unwrap(), int(9));
}

#[test]
fn test_lazy_remap_rejects_red_sources() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let red_object = red.evaluate("({ x: 1 })").unwrap();
    let blue_view = env.get_blue(&red_object).unwrap();
    assert!(matches!(
        env.lazy_remap(&red.global_object(), blue_view.as_object().unwrap(), vec![key("x")]),
        Err(MembraneError::InvalidInvocation(_))
    ));
}

// ============================================================================
// remap_proto and link
// ============================================================================

#[test]
fn test_remap_proto_stitches_chain() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let target = object(&red, "({})");
    let proto = object(&blue, "({ inherited: 'yes' })");
    assert!(env.remap_proto(&target, Some(&proto)).unwrap());
    let receiver = JsValue::Object(target.clone());
    assert_eq!(
        ops::get(&target, &key("inherited"), &receiver).unwrap(),
        JsValue::from("yes")
    );
    assert!(env.remap_proto(&target, None).unwrap());
    assert!(ops::get_prototype_of(&target).unwrap().is_none());
}

#[test]
fn test_linked_intrinsics_keep_instanceof_local() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let list = blue.evaluate("[1, 2, 3]").unwrap();
    let record = blue.evaluate("({ k: 1 })").unwrap();
    env.remap(
        &red.global_object(),
        vec![(key("list"), data(list)), (key("record"), data(record))],
    )
    .unwrap();
    assert_eq!(env.evaluate("list instanceof Array").unwrap(), JsValue::Boolean(true));
    assert_eq!(env.evaluate("Array.isArray(list)").unwrap(), JsValue::Boolean(true));
    assert_eq!(env.evaluate("record instanceof Object").unwrap(), JsValue::Boolean(true));
    assert_eq!(
        env.evaluate("Object.getPrototypeOf(record) === Object.prototype").unwrap(),
        JsValue::Boolean(true)
    );
}

#[test]
fn test_link_shares_identity() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let blue_shared = blue.evaluate("var shared = { side: 'blue' }; shared").unwrap();
    let red_shared = red.evaluate("var shared = { side: 'red' }; shared").unwrap();
    env.link(&["shared"]).unwrap();
    let seen = env.get_red(&blue_shared).unwrap();
    assert!(Rc::ptr_eq(seen.as_object().unwrap(), red_shared.as_object().unwrap()));
    assert_eq!(env.get_blue(&red_shared).unwrap(), blue_shared);
}

#[test]
fn test_link_needs_a_path() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    assert!(matches!(env.link(&[]), Err(MembraneError::InvalidArgument(_))));
    assert!(matches!(env.link(&["undefined"]), Err(MembraneError::Js(_))));
}
