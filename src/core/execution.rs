//! # Executor Module / 执行器模块
//!
//! An [`Executor`] supervises the runner process of one top-level module. It
//! is driven entirely from the scheduling thread: `start` launches the runner,
//! `poll` drains whatever output is available and turns it into status changes
//! and bus events, and `terminate` reclaims the process tree.
//!
//! 一个 [`Executor`] 监管一个顶层模块的运行器进程。它完全由调度线程驱动：
//! `start` 启动运行器，`poll` 处理当前可用的输出并将其转换为状态变化和总线事件，
//! `terminate` 回收进程树。

use chrono::{DateTime, Local};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::process::ExitStatus;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::core::config::RunnerConfig;
use crate::core::events::{Event, EventBus};
use crate::core::models::{Outcome, Status, TestTree, module_of};
use crate::core::protocol::{self, ProtocolError, RunnerRecord};
use crate::infra::command::RunnerProcess;
use crate::infra::t;

/// Lifecycle of an executor.
/// 执行器的生命周期。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExecutorState {
    Idle,
    Starting,
    Running,
    Finished,
    Terminated,
    Errored,
}

impl ExecutorState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ExecutorState::Finished | ExecutorState::Terminated | ExecutorState::Errored
        )
    }
}

impl fmt::Display for ExecutorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutorState::Idle => "IDLE",
            ExecutorState::Starting => "STARTING",
            ExecutorState::Running => "RUNNING",
            ExecutorState::Finished => "FINISHED",
            ExecutorState::Terminated => "TERMINATED",
            ExecutorState::Errored => "ERRORED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("module '{module}' already has an active run")]
    AlreadyRunning { module: String },

    #[error("no test methods selected for module '{module}'")]
    EmptySelection { module: String },

    #[error("cannot encode runner invocation for '{module}': {source}")]
    Encode {
        module: String,
        #[source]
        source: ProtocolError,
    },

    #[error("failed to launch runner for '{module}': {source}")]
    Launch {
        module: String,
        #[source]
        source: std::io::Error,
    },
}

/// Immutable summary of a completed run.
/// 已完成运行的不可变摘要。
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub state: ExecutorState,
    pub expected_count: usize,
    pub completed_count: usize,
    /// Per-status counts of the end records the executor applied.
    pub counts: BTreeMap<Status, usize>,
    /// Counts reported by the runner's summary record, if one arrived.
    pub runner_summary: Option<BTreeMap<Status, usize>>,
    pub started_at: DateTime<Local>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn any_failed(&self) -> bool {
        self.counts
            .iter()
            .any(|(status, count)| status.is_failure() && *count > 0)
    }
}

/// Ephemeral state of one invocation.
/// 单次调用的临时状态。
#[derive(Debug)]
pub struct ExecutionRun {
    pub paths: Vec<String>,
    requested: HashSet<String>,
    pub expected_count: usize,
    pub completed_count: usize,
    pub started_at: DateTime<Local>,
    started: Instant,
    total_duration: Duration,
    counts: BTreeMap<Status, usize>,
    seen_start: HashSet<String>,
    seen_end: HashSet<String>,
    current: Option<String>,
    summary: Option<BTreeMap<Status, usize>>,
    process: RunnerProcess,
}

impl ExecutionRun {
    fn new(paths: Vec<String>, process: RunnerProcess) -> Self {
        Self {
            expected_count: paths.len(),
            requested: paths.iter().cloned().collect(),
            paths,
            completed_count: 0,
            started_at: Local::now(),
            started: Instant::now(),
            total_duration: Duration::ZERO,
            counts: BTreeMap::new(),
            seen_start: HashSet::new(),
            seen_end: HashSet::new(),
            current: None,
            summary: None,
            process,
        }
    }

    /// `avg_duration_so_far * (expected_count - completed_count)`, saturating
    /// at `Duration::MAX`.
    pub fn estimated_remaining(&self) -> Duration {
        if self.completed_count == 0 {
            return Duration::ZERO;
        }
        let completed = u32::try_from(self.completed_count).unwrap_or(u32::MAX);
        let left = u32::try_from(self.expected_count.saturating_sub(self.completed_count))
            .unwrap_or(u32::MAX);
        let avg = self.total_duration / completed;
        avg.checked_mul(left).unwrap_or(Duration::MAX)
    }

    /// The path the runner is currently executing.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }

    fn report(&self, state: ExecutorState) -> RunReport {
        RunReport {
            state,
            expected_count: self.expected_count,
            completed_count: self.completed_count,
            counts: self.counts.clone(),
            runner_summary: self.summary.clone(),
            started_at: self.started_at,
            elapsed: self.started.elapsed(),
        }
    }
}

/// Supervisor of the runner process for one module.
/// 一个模块的运行器进程监管者。
#[derive(Debug)]
pub struct Executor {
    module: String,
    state: ExecutorState,
    run: Option<ExecutionRun>,
    last_report: Option<RunReport>,
}

impl Executor {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            state: ExecutorState::Idle,
            run: None,
            last_report: None,
        }
    }

    pub fn module(&self) -> &str {
        &self.module
    }

    pub fn state(&self) -> ExecutorState {
        self.state
    }

    /// `true` from an accepted `start` until a terminal state is reached.
    pub fn is_running(&self) -> bool {
        matches!(self.state, ExecutorState::Starting | ExecutorState::Running)
    }

    /// The active run, if any.
    pub fn run(&self) -> Option<&ExecutionRun> {
        self.run.as_ref()
    }

    /// The report of the most recent run that reached a terminal state.
    pub fn last_report(&self) -> Option<&RunReport> {
        self.last_report.as_ref()
    }

    /// Launches the runner for `paths`. Emits nothing on success; the first
    /// events arrive from [`Executor::poll`].
    ///
    /// A launch failure moves the executor to `ERRORED`, emits `suite_error`
    /// and returns the error. No method status is touched.
    pub fn start(
        &mut self,
        paths: Vec<String>,
        runner: &RunnerConfig,
        bus: &mut EventBus,
    ) -> Result<(), ExecutorError> {
        if self.is_running() {
            return Err(ExecutorError::AlreadyRunning {
                module: self.module.clone(),
            });
        }
        if paths.is_empty() {
            return Err(ExecutorError::EmptySelection {
                module: self.module.clone(),
            });
        }

        // A previous terminal state passes back through IDLE here.
        self.state = ExecutorState::Starting;

        let spawned = protocol::encode_invocation(runner, &self.module, &paths)
            .map_err(|source| ExecutorError::Encode {
                module: self.module.clone(),
                source,
            })
            .and_then(|spec| {
                tracing::debug!(module = %self.module, program = %spec.program, args = ?spec.args, "launching runner");
                RunnerProcess::spawn(&spec, &self.module).map_err(|source| ExecutorError::Launch {
                    module: self.module.clone(),
                    source,
                })
            });

        match spawned {
            Ok(process) => {
                tracing::info!(module = %self.module, pid = ?process.pid(), count = paths.len(), "runner started");
                self.run = Some(ExecutionRun::new(paths, process));
                self.state = ExecutorState::Running;
                Ok(())
            }
            Err(e) => {
                tracing::error!(module = %self.module, "{e}");
                self.state = ExecutorState::Errored;
                self.last_report = None;
                bus.emit(&Event::SuiteError {
                    module: self.module.clone(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Applies every record currently available from the runner. Never waits.
    ///
    /// Returns `true` while more polling is needed.
    ///
    /// 应用运行器当前可用的所有记录，从不等待。需要继续轮询时返回 `true`。
    pub fn poll(&mut self, tree: &mut TestTree, bus: &mut EventBus) -> bool {
        if self.state != ExecutorState::Running {
            return false;
        }
        let Some(run) = self.run.as_mut() else {
            return false;
        };

        let drained = run.process.drain();
        for line in &drained.lines {
            let record = protocol::decode_line(line);
            apply_record(&self.module, run, record, tree, bus);
        }

        if !drained.closed {
            // An exited runner whose stdout is still open has left a helper
            // holding the pipe; reclaim the group so the reader can finish.
            if let Ok(Some(_)) = run.process.try_exit() {
                run.process.kill_tree();
            }
            return true;
        }

        match run.process.try_exit() {
            Ok(None) => true,
            Ok(Some(status)) => {
                self.finish(Some(status), None, bus);
                false
            }
            Err(e) => {
                self.finish(None, Some(e.to_string()), bus);
                false
            }
        }
    }

    fn finish(&mut self, status: Option<ExitStatus>, wait_error: Option<String>, bus: &mut EventBus) {
        let Some(run) = self.run.take() else {
            return;
        };

        if run.summary.is_some() && wait_error.is_none() {
            let report = run.report(ExecutorState::Finished);
            tracing::info!(
                module = %self.module,
                completed = report.completed_count,
                expected = report.expected_count,
                ?status,
                "run finished"
            );
            self.state = ExecutorState::Finished;
            self.last_report = Some(report.clone());
            bus.emit(&Event::SuiteEnd {
                module: self.module.clone(),
                report,
            });
        } else {
            let error = match (wait_error, status) {
                (Some(e), _) => e,
                (None, Some(status)) => t!("executor.abnormal_exit", status = status).to_string(),
                (None, None) => t!("executor.abnormal_exit", status = "?").to_string(),
            };
            tracing::warn!(module = %self.module, current = ?run.current, "{error}");
            self.state = ExecutorState::Errored;
            self.last_report = Some(run.report(ExecutorState::Errored));
            bus.emit(&Event::SuiteError {
                module: self.module.clone(),
                error,
            });
        }
    }

    /// Forcibly ends the run. The in-flight method, if any, becomes `CANCELLED`;
    /// no `test_end` is emitted for it. A no-op unless the executor is running.
    ///
    /// 强制结束运行。正在执行的方法（如有）变为 `CANCELLED`，不会为其发出 `test_end`。
    /// 除非执行器正在运行，否则为空操作。
    pub fn terminate(&mut self, tree: &mut TestTree, bus: &mut EventBus) {
        if !self.is_running() {
            return;
        }
        let Some(mut run) = self.run.take() else {
            self.state = ExecutorState::Terminated;
            return;
        };

        run.process.kill_tree();
        if let Some(path) = run.current.take() {
            tree.set_status(&path, Status::Cancelled);
            *run.counts.entry(Status::Cancelled).or_insert(0) += 1;
        }

        tracing::info!(module = %self.module, completed = run.completed_count, "run terminated");
        self.state = ExecutorState::Terminated;
        self.last_report = Some(run.report(ExecutorState::Terminated));
        bus.emit(&Event::TestStatusUpdate {
            module: self.module.clone(),
            message: t!("executor.stopped").to_string(),
        });
    }
}

fn apply_record(
    module: &str,
    run: &mut ExecutionRun,
    record: RunnerRecord,
    tree: &mut TestTree,
    bus: &mut EventBus,
) {
    match record {
        RunnerRecord::Start { path } => {
            if !accepts(module, run, &path, tree) {
                return;
            }
            if run.seen_end.contains(&path) {
                tracing::warn!(module, path = %path, "start record for an already finished method dropped");
                return;
            }
            if run.seen_start.contains(&path) {
                tracing::warn!(module, path = %path, "duplicate start record dropped");
                return;
            }
            begin(module, run, path, tree, bus);
        }
        RunnerRecord::End {
            path,
            status,
            duration,
            output,
            error,
        } => {
            if !accepts(module, run, &path, tree) {
                return;
            }
            if run.seen_end.contains(&path) {
                tracing::warn!(module, path = %path, "duplicate end record dropped");
                return;
            }
            if !run.seen_start.contains(&path) {
                begin(module, run, path.clone(), tree, bus);
            }

            tree.record_result(
                &path,
                status,
                Outcome {
                    duration: Some(duration),
                    output,
                    error,
                },
            );
            if run.current.as_deref() == Some(path.as_str()) {
                run.current = None;
            }
            run.completed_count += 1;
            run.total_duration = run.total_duration.saturating_add(duration);
            *run.counts.entry(status).or_insert(0) += 1;

            bus.emit(&Event::TestEnd {
                module: module.to_string(),
                remaining: run.estimated_remaining(),
                path: path.clone(),
                status,
                duration,
            });
            run.seen_end.insert(path);
        }
        RunnerRecord::Summary { counts } => {
            tracing::debug!(module, ?counts, "runner summary");
            run.summary = Some(counts);
        }
        RunnerRecord::Unparsable { raw } => {
            tracing::debug!(module, "runner output: {raw}");
        }
    }
}

fn begin(module: &str, run: &mut ExecutionRun, path: String, tree: &mut TestTree, bus: &mut EventBus) {
    if let Some(previous) = run.current.as_deref() {
        if previous != path {
            tracing::warn!(module, previous, path = %path, "overlapping start records; only sequential runs are supported");
        }
    }
    tree.set_status(&path, Status::Running);
    bus.emit(&Event::TestStart {
        module: module.to_string(),
        path: path.clone(),
    });
    run.seen_start.insert(path.clone());
    run.current = Some(path);
}

/// Records are applied only for methods this run asked the runner for.
fn accepts(module: &str, run: &ExecutionRun, path: &str, tree: &TestTree) -> bool {
    if module_of(path) != module {
        tracing::warn!(module, path, "record for another module dropped");
        return false;
    }
    if tree.resolve(path).is_none() {
        tracing::warn!(module, path, "record for unknown test method dropped");
        return false;
    }
    if !run.requested.contains(path) {
        tracing::warn!(module, path, "record for an unselected test method dropped");
        return false;
    }
    true
}
