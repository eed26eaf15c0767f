//! Dot-path resolution and invocation against live hosts

use super::support::Harness;
use crate::host::ScriptHost;
use crate::logging::LogLevel;
use rhai::Dynamic;

const CONTROLLER_SCRIPT: &str = r#"
    let state = #{
        armed: true,
        fire: || 42,
        nested: #{ reload: |n| n + 1 },
    };

    fn Ping() { 7 }
"#;

fn controller(harness: &Harness) -> ScriptHost {
    ScriptHost::start(1, "controller", CONTROLLER_SCRIPT, vec![], harness.services()).unwrap()
}

#[test]
fn has_callable_agrees_with_invocation() {
    let harness = Harness::new();
    let host = controller(&harness);

    assert!(host.has_callable("Ping"));
    assert!(host.has_callable("state.fire"));
    assert!(host.has_callable("state.nested.reload"));
    assert!(!host.has_callable("state.armed"));
    assert!(!host.has_callable("state.missing"));
    assert!(!host.has_callable("ghost.fire"));
}

#[test]
fn invoking_a_script_function_returns_its_value() {
    let harness = Harness::new();
    let mut host = controller(&harness);

    let out = host.invoke("Ping", vec![]);
    assert_eq!(out.as_int().unwrap(), 7);
}

#[test]
fn invoking_a_closure_through_a_map_path() {
    let harness = Harness::new();
    let mut host = controller(&harness);

    let out = host.invoke("state.fire", vec![]);
    assert_eq!(out.as_int().unwrap(), 42);

    let out = host.invoke("state.nested.reload", vec![Dynamic::from(9_i64)]);
    assert_eq!(out.as_int().unwrap(), 10);
}

#[test]
fn undefined_path_warns_and_returns_unit() {
    let harness = Harness::new();
    let mut host = controller(&harness);

    let out = host.invoke("state.missing", vec![]);
    assert!(out.is_unit());

    let warnings = harness.logger.messages_at(LogLevel::Warning);
    assert!(warnings
        .iter()
        .any(|m| m.contains("state.missing") && m.contains("missing")));
}

#[test]
fn non_callable_path_warns_and_returns_unit() {
    let harness = Harness::new();
    let mut host = controller(&harness);

    let out = host.invoke("state.armed", vec![]);
    assert!(out.is_unit());

    let warnings = harness.logger.messages_at(LogLevel::Warning);
    assert!(warnings.iter().any(|m| m.contains("not callable")));
}

#[test]
fn callback_errors_go_to_the_sink_not_the_caller() {
    let harness = Harness::new();
    let mut host = ScriptHost::start(
        1,
        "controller",
        r#"fn Detonate() { throw "misfire"; }"#,
        vec![],
        harness.services(),
    )
    .unwrap();

    let out = host.invoke("Detonate", vec![]);
    assert!(out.is_unit());

    let errors = harness.logger.messages_at(LogLevel::Error);
    assert!(errors.iter().any(|m| m.contains("misfire")));
}
