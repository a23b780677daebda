//! Tests for building a `VirtualEnvironment` and evaluating code in its red realm.
//!
//! These tests cover connector creation, option validation, source signing,
//! instrumentation, configuration and the re-homing of errors thrown in the sandbox.

extern crate near_membrane;

use std::cell::RefCell;
use std::rc::Rc;

use near_membrane::membrane::{
    create_connector, EnvironmentOptions, Instrumentation, MembraneConfig, MembraneError,
    RealmEvaluator, VirtualEnvironment,
};
use near_membrane::runner::ds::error::JErrorType;
use near_membrane::runner::ds::object::ObjectType;
use near_membrane::runner::ds::operations::object as ops;
use near_membrane::runner::ds::operations::test_and_comparison::ordinary_has_instance;
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

fn int(i: i64) -> JsValue {
    JsValue::Number(JsNumberType::Integer(i))
}

#[derive(Default)]
struct RecordingInstrumentation {
    events: RefCell<Vec<String>>,
}
impl Instrumentation for RecordingInstrumentation {
    fn start_activity(&self, name: &'static str) {
        self.events.borrow_mut().push(format!("start {}", name));
    }

    fn stop_activity(&self, name: &'static str) {
        self.events.borrow_mut().push(format!("stop {}", name));
    }

    fn error(&self, name: &'static str, _error: &JErrorType) {
        self.events.borrow_mut().push(format!("error {}", name));
    }
}

// ============================================================================
// Construction
// ============================================================================

#[test]
fn test_missing_options_are_rejected() {
    assert!(matches!(
        VirtualEnvironment::try_new(None),
        Err(MembraneError::InvalidOptions(_))
    ));
}

#[test]
fn test_missing_connectors_are_rejected() {
    let (blue, _) = realms();
    let only_blue = EnvironmentOptions::new()
        .blue_connector(create_connector(RealmEvaluator::Global(blue)).unwrap());
    assert!(matches!(
        VirtualEnvironment::new(only_blue),
        Err(MembraneError::InvalidConnector(_))
    ));
    assert!(matches!(
        VirtualEnvironment::new(EnvironmentOptions::new()),
        Err(MembraneError::InvalidConnector(_))
    ));
}

#[test]
fn test_both_connectors_from_one_realm_are_rejected() {
    let realm = CodeRealm::new();
    let connector = create_connector(RealmEvaluator::Global(realm)).unwrap();
    let options = EnvironmentOptions::new()
        .blue_connector(connector.clone())
        .red_connector(connector);
    assert!(matches!(
        VirtualEnvironment::new(options),
        Err(MembraneError::InvalidConnector(_))
    ));
}

#[test]
fn test_connector_from_eval_function() {
    let (blue, red) = realms();
    let eval = red.get_intrinsics_value(WellKnownIntrinsics::Eval).unwrap();
    let options = EnvironmentOptions::new()
        .blue_connector(create_connector(RealmEvaluator::Global(blue)).unwrap())
        .red_connector(create_connector(RealmEvaluator::Function(JsValue::Object(eval))).unwrap());
    let env = VirtualEnvironment::new(options).unwrap();
    env.evaluate("var fromEval = 'red'").unwrap();
    assert_eq!(red.evaluate("fromEval").unwrap(), JsValue::from("red"));
}

#[test]
fn test_connector_rejects_non_callable_evaluator() {
    for bad in vec![JsValue::Undefined, JsValue::Null, JsValue::from("eval")] {
        assert!(matches!(
            create_connector(RealmEvaluator::Function(bad)),
            Err(MembraneError::InvalidArgument(_))
        ));
    }
}

#[test]
fn test_connector_cache_follows_navigation() {
    let realm = CodeRealm::new();
    let first = create_connector(RealmEvaluator::Global(realm.clone())).unwrap();
    let again = create_connector(RealmEvaluator::Global(realm.clone())).unwrap();
    assert!(Rc::ptr_eq(&first, &again));
    realm.navigate();
    let navigated = create_connector(RealmEvaluator::Global(realm)).unwrap();
    assert!(!Rc::ptr_eq(&first, &navigated));
}

// ============================================================================
// Evaluation
// ============================================================================

#[test]
fn test_evaluate_runs_in_red() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    assert_eq!(env.evaluate("var sandboxed = 1 + 2; sandboxed").unwrap(), int(3));
    assert_eq!(red.evaluate("sandboxed").unwrap(), int(3));
    assert_eq!(blue.evaluate("typeof sandboxed").unwrap(), JsValue::from("undefined"));
}

#[test]
fn test_evaluate_returns_blue_views() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let f = env.evaluate("(a, b) => a + b").unwrap();
    let sum = ops::call(&f, JsValue::Undefined, vec![int(2), int(5)]).unwrap();
    assert_eq!(sum, int(7));

    let red_object = red.evaluate("var kept = { n: 1 }; kept").unwrap();
    let seen = env.evaluate("kept").unwrap();
    assert_ne!(seen, red_object);
    assert_eq!(env.get_blue(&red_object).unwrap(), seen);
}

#[test]
fn test_sign_source_runs_before_red() {
    let (blue, red) = realms();
    let options = options_for(&blue, &red).sign_source_callback(|s| format!("{}; 'signed'", s));
    let env = VirtualEnvironment::new(options).unwrap();
    assert_eq!(env.evaluate("1").unwrap(), JsValue::from("signed"));
}

#[test]
fn test_strict_evaluation_from_config() {
    let (blue, red) = realms();
    let config = MembraneConfig::parse("strict_evaluation = true").unwrap();
    let env = VirtualEnvironment::new(options_for(&blue, &red).config(config)).unwrap();
    assert!(matches!(
        env.evaluate("leaked = 1"),
        Err(JErrorType::ReferenceError(_))
    ));

    let (blue, red) = realms();
    let sloppy = environment(&blue, &red);
    assert!(sloppy.evaluate("leaked = 1").is_ok());
}

#[test]
fn test_instrumentation_sees_activities() {
    let (blue, red) = realms();
    let recorder = Rc::new(RecordingInstrumentation::default());
    let env = VirtualEnvironment::new(options_for(&blue, &red).instrumentation(recorder.clone()))
        .unwrap();
    env.evaluate("1").unwrap();
    assert!(env.evaluate("missing").is_err());
    assert_eq!(
        *recorder.events.borrow(),
        vec![
            "start evaluate",
            "stop evaluate",
            "start evaluate",
            "error evaluate",
            "stop evaluate",
        ]
    );
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_thrown_errors_use_catching_realm_constructors() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let thrown = match env.evaluate("throw new TypeError('x')") {
        Err(JErrorType::Thrown(JsValue::Object(e))) => e,
        other => panic!("expected a thrown error, got {:?}", other),
    };
    let blue_type_error = blue.get_intrinsics_value(WellKnownIntrinsics::TypeError).unwrap();
    let red_type_error = red.get_intrinsics_value(WellKnownIntrinsics::TypeError).unwrap();
    let value = JsValue::Object(thrown.clone());
    assert!(ordinary_has_instance(&JsValue::Object(blue_type_error), &value).unwrap());
    assert!(!ordinary_has_instance(&JsValue::Object(red_type_error), &value).unwrap());
    match &*thrown.borrow() {
        ObjectType::Error(e) => assert_eq!(e.message(), Some("x".to_string())),
        _ => panic!("expected an error object"),
    };
}

#[test]
fn test_engine_errors_stay_native() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    assert!(matches!(
        env.evaluate("notDefinedAnywhere"),
        Err(JErrorType::ReferenceError(_))
    ));
    assert!(matches!(env.evaluate("var = ;"), Err(JErrorType::SyntaxError(_))));
    assert!(matches!(env.evaluate("null.x"), Err(JErrorType::TypeError(_))));
}

#[test]
fn test_thrown_primitives_cross_unchanged() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    assert!(matches!(
        env.evaluate("throw 'plain'"),
        Err(JErrorType::Thrown(JsValue::String(s))) if s == "plain"
    ));
}

#[test]
fn test_thrown_objects_cross_as_proxies() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    let red_value = red.evaluate("var payload = { code: 7 }; payload").unwrap();
    let thrown = match env.evaluate("throw payload") {
        Err(JErrorType::Thrown(v)) => v,
        other => panic!("expected a thrown value, got {:?}", other),
    };
    assert_eq!(env.get_blue(&red_value).unwrap(), thrown);
    let o = thrown.as_object().unwrap();
    assert_eq!(ops::get(o, &"code".into(), &thrown).unwrap(), int(7));
}

#[test]
fn test_runaway_recursion_raises_range_error() {
    let (blue, red) = realms();
    let env = environment(&blue, &red);
    assert!(matches!(
        env.evaluate("var f = () => f(); f()"),
        Err(JErrorType::RangeError(_))
    ));
    assert_eq!(env.evaluate("var g = (n) => n; g(3)").unwrap(), int(3));
}
