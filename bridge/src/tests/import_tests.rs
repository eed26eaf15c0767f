//! Import guard behaviour through whole script hosts

use super::support::{Harness, Probe};
use crate::host::ScriptHost;
use crate::imports::MemoryFetcher;
use crate::logging::LogLevel;

#[test]
fn module_is_fetched_once_per_interpreter() {
    let harness = Harness::with_fetcher(
        MemoryFetcher::new().with_module("vehicle_math", "fn double(x) { x * 2 }"),
    );
    let host = ScriptHost::start(
        1,
        "drone",
        r#"
            import "vehicle_math" as vm;
            import "vehicle_math" as vm2;
            let a = vm::double(3);
            let b = vm2::double(4);
        "#,
        vec![],
        harness.services(),
    )
    .unwrap();

    assert!(host.has_imported("vehicle_math"));
    assert_eq!(harness.fetcher.fetch_count("vehicle_math"), 1);
}

#[test]
fn imported_module_is_callable_inside_lifecycle_hooks() {
    let harness = Harness::with_fetcher(
        MemoryFetcher::new().with_module("vehicle_math", "fn double(x) { x * 2 }"),
    );
    let probe = Probe::new();
    let mut host = ScriptHost::start(
        1,
        "drone",
        r#"
            import "vehicle_math" as vm;
            fn Update() {
                if vm::double(2) == 4 {
                    probe.Bump("steered");
                }
            }
        "#,
        vec![probe.binding("probe")],
        harness.services(),
    )
    .unwrap();

    assert!(host.invoke_lifecycle("Update").unwrap());
    assert!(host.invoke_lifecycle("Update").unwrap());
    assert_eq!(probe.count("steered"), 2);
    // Hook calls re-establish the import from the cache, not the fetcher.
    assert_eq!(harness.fetcher.fetch_count("vehicle_math"), 1);
    assert!(harness.logger.messages_at(LogLevel::Error).is_empty());
}

#[test]
fn imported_module_is_reachable_from_invoked_functions() {
    let harness = Harness::with_fetcher(
        MemoryFetcher::new().with_module("vehicle_math", "fn double(x) { x * 2 }"),
    );
    let mut host = ScriptHost::start(
        1,
        "drone",
        r#"
            import "vehicle_math" as vm;
            fn Reload() { vm::double(21) }
        "#,
        vec![],
        harness.services(),
    )
    .unwrap();

    let out = host.invoke("Reload", vec![]);
    assert_eq!(out.as_int().unwrap(), 42);
    assert!(harness.logger.messages_at(LogLevel::Error).is_empty());
}

#[test]
fn circular_imports_terminate() {
    let harness = Harness::with_fetcher(
        MemoryFetcher::new()
            .with_module("alpha", r#"import "beta" as b; fn from_alpha() { 1 }"#)
            .with_module("beta", r#"import "alpha" as a; fn from_beta() { 2 }"#),
    );
    let host = ScriptHost::start(
        1,
        "drone",
        r#"
            import "alpha" as a;
            let x = a::from_alpha();
        "#,
        vec![],
        harness.services(),
    )
    .unwrap();

    assert!(host.has_imported("alpha"));
    assert!(host.has_imported("beta"));
    assert_eq!(harness.fetcher.fetch_count("alpha"), 1);
    assert_eq!(harness.fetcher.fetch_count("beta"), 1);
}

#[test]
fn broken_module_is_logged_and_the_script_continues() {
    let harness = Harness::with_fetcher(MemoryFetcher::new().with_module("busted", "fn ("));
    let probe = Probe::new();
    let _host = ScriptHost::start(
        1,
        "drone",
        r#"
            import "busted" as b;
            probe.Bump("survived");
        "#,
        vec![probe.binding("probe")],
        harness.services(),
    )
    .unwrap();

    assert_eq!(probe.count("survived"), 1);
    let errors = harness.logger.messages_at(LogLevel::Error);
    assert!(errors.iter().any(|m| m.contains("busted")));
}

#[test]
fn missing_module_is_logged_and_the_script_continues() {
    let harness = Harness::new();
    let probe = Probe::new();
    let _host = ScriptHost::start(
        1,
        "drone",
        r#"
            import "ghost" as g;
            probe.Bump("survived");
        "#,
        vec![probe.binding("probe")],
        harness.services(),
    )
    .unwrap();

    assert_eq!(probe.count("survived"), 1);
    let errors = harness.logger.messages_at(LogLevel::Error);
    assert!(errors.iter().any(|m| m.contains("ghost")));
}

#[test]
fn restart_clears_import_markers() {
    let harness = Harness::with_fetcher(
        MemoryFetcher::new().with_module("vehicle_math", "fn double(x) { x * 2 }"),
    );
    let mut host = ScriptHost::start(
        1,
        "drone",
        r#"import "vehicle_math" as vm;"#,
        vec![],
        harness.services(),
    )
    .unwrap();

    assert_eq!(harness.fetcher.fetch_count("vehicle_math"), 1);
    host.restart().unwrap();
    assert_eq!(harness.fetcher.fetch_count("vehicle_math"), 2);
}
