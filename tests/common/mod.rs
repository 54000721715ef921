// Shared test helpers for integration tests
#![allow(dead_code)]

use factory_runner::config::{CaseSpec, MethodSpec, ModuleSpec, RunnerConfig};
use factory_runner::events::{Event, EventBus};
use factory_runner::execution::Executor;
use factory_runner::models::TestTree;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A runner that reports PASS for every path it is given, then a summary.
pub const PASS_ALL: &str = r#"
for p in "$@"; do
  printf '{"event":"start","path":"%s"}\n' "$p"
  printf '{"event":"end","path":"%s","status":"PASS","duration_ms":5}\n' "$p"
done
printf '{"event":"summary","counts":{"PASS":%d}}\n' "$#"
"#;

/// Builds a `sh -c` runner. The selected paths arrive as `$@`.
pub fn sh_runner(script: &str) -> RunnerConfig {
    RunnerConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string(), "runner".to_string()],
        working_dir: None,
        env: BTreeMap::new(),
    }
}

pub fn method(name: &str) -> MethodSpec {
    MethodSpec {
        name: name.to_string(),
        text: BTreeMap::new(),
    }
}

pub fn case(name: &str, methods: &[&str]) -> CaseSpec {
    CaseSpec {
        name: name.to_string(),
        text: BTreeMap::new(),
        methods: methods.iter().map(|m| method(m)).collect(),
    }
}

pub fn module(name: &str, cases: Vec<CaseSpec>) -> ModuleSpec {
    ModuleSpec {
        name: name.to_string(),
        text: BTreeMap::new(),
        cases,
        modules: Vec::new(),
    }
}

/// `auto` with two cases and `manual` with one.
pub fn sample_specs() -> Vec<ModuleSpec> {
    vec![
        module(
            "auto",
            vec![
                case("eMMCTest", &["test_identify", "test_read_write"]),
                case("EEPROMTest", &["test_read"]),
            ],
        ),
        module("manual", vec![case("KeyTest", &["test_power_key"])]),
    ]
}

pub fn sample_tree() -> TestTree {
    TestTree::from_specs(&sample_specs()).expect("sample tree is valid")
}

/// Records every event emitted on a bus.
pub fn recording_bus() -> (EventBus, Arc<Mutex<Vec<Event>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut bus = EventBus::new();
    let sink = events.clone();
    bus.bind_all(move |event: &Event| sink.lock().unwrap().push(event.clone()));
    (bus, events)
}

pub fn event_names(events: &Arc<Mutex<Vec<Event>>>) -> Vec<&'static str> {
    events
        .lock()
        .unwrap()
        .iter()
        .map(|e| e.kind().as_str())
        .collect()
}

/// Polls `executor` until it stops asking for more, failing after `limit`.
pub async fn poll_until_done(
    executor: &mut Executor,
    tree: &mut TestTree,
    bus: &mut EventBus,
    limit: Duration,
) {
    let deadline = tokio::time::Instant::now() + limit;
    while executor.poll(tree, bus) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "executor for '{}' did not finish within {:?}",
            executor.module(),
            limit
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Polls until `condition` holds, failing after `limit`.
pub async fn poll_until<F>(
    executor: &mut Executor,
    tree: &mut TestTree,
    bus: &mut EventBus,
    limit: Duration,
    mut condition: F,
) where
    F: FnMut(&TestTree) -> bool,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        executor.poll(tree, bus);
        if condition(tree) {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached within {limit:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
