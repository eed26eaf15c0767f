//! Console commands exercised through whole script hosts

use super::support::{Harness, Probe, RecordingScene};
use crate::host::ScriptHost;
use crate::logging::LogLevel;
use std::sync::atomic::Ordering;

#[test]
fn scope_dump_lists_globals_and_host_bindings() {
    let harness = Harness::new();
    let probe = Probe::new();
    let _host = ScriptHost::start(
        1,
        "drone",
        r#"
            let fuel = 5;
            Scope(true);
        "#,
        vec![probe.binding("probe")],
        harness.services(),
    )
    .unwrap();

    let lines = harness.logger.messages_at(LogLevel::Info);
    assert!(lines.iter().any(|l| l.contains("scope of 'drone'")));
    assert!(lines.iter().any(|l| l.contains("fuel = 5")));
    assert!(lines
        .iter()
        .any(|l| l.contains("probe") && l.contains("(bound)")));
}

#[test]
fn scope_dump_without_bindings_flag_omits_them() {
    let harness = Harness::new();
    let probe = Probe::new();
    let _host = ScriptHost::start(
        1,
        "drone",
        "Scope(false);",
        vec![probe.binding("probe")],
        harness.services(),
    )
    .unwrap();

    let lines = harness.logger.messages_at(LogLevel::Info);
    assert!(lines.iter().all(|l| !l.contains("(bound)")));
}

#[test]
fn help_charp_reports_bound_type_methods() {
    let harness = Harness::new();
    let probe = Probe::new();
    let _host = ScriptHost::start(
        1,
        "drone",
        r#"HelpCharp("Probe", false, false, "Methods");"#,
        vec![probe.binding("probe")],
        harness.services(),
    )
    .unwrap();

    let lines = harness.logger.messages_at(LogLevel::Info);
    let report = lines
        .iter()
        .find(|l| l.contains("=== Probe ==="))
        .expect("report printed");
    assert!(report.contains("Bump(string)"));
    assert!(report.contains("Value(string)"));
    assert!(!report.contains("[properties]"));
}

#[test]
fn help_charp_accepts_a_live_object_as_target() {
    let harness = Harness::new();
    let probe = Probe::new();
    let _host = ScriptHost::start(
        1,
        "drone",
        r#"HelpCharp(probe, false, false, "All");"#,
        vec![probe.binding("probe")],
        harness.services(),
    )
    .unwrap();

    assert!(harness.logger.contains("=== Probe ==="));
    assert!(harness.logger.contains("total: int"));
}

#[test]
fn help_charp_warns_on_unknown_type() {
    let harness = Harness::new();
    let _host = ScriptHost::start(
        1,
        "drone",
        r#"HelpCharp("Phantom", false, false, "All");"#,
        vec![],
        harness.services(),
    )
    .unwrap();

    let warnings = harness.logger.messages_at(LogLevel::Warning);
    assert!(warnings.iter().any(|m| m.contains("Phantom")));
}

#[test]
fn doc_describes_an_object_map() {
    let harness = Harness::new();
    let _host = ScriptHost::start(
        1,
        "drone",
        r#"Doc(#{ x: 1, fire: || 0 }, false);"#,
        vec![],
        harness.services(),
    )
    .unwrap();

    let lines = harness.logger.messages_at(LogLevel::Info);
    let report = lines
        .iter()
        .find(|l| l.contains("=== object ==="))
        .expect("report printed");
    assert!(report.contains("x: int"));
    assert!(report.contains("[methods]"));
}

#[test]
fn scene_commands_delegate_to_the_host() {
    let harness = Harness::with_scene(RecordingScene::default().with_object("boss", 42));
    let _host = ScriptHost::start(
        1,
        "drone",
        r#"
            let id = FindObject("boss");
            LookAt(id);
            Destroy(id);
            if FindObject("nobody") == () {
                Log("absent");
            }
            Exit();
        "#,
        vec![],
        harness.services(),
    )
    .unwrap();

    assert_eq!(*harness.scene.looked_at.lock().unwrap(), vec![42]);
    assert_eq!(*harness.scene.destroyed.lock().unwrap(), vec![42]);
    assert!(harness.scene.exit_requested.load(Ordering::SeqCst));
    assert!(harness.logger.contains("absent"));
}
