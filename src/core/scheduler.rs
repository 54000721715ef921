//! # Run Scheduler Module / 运行调度模块
//!
//! The caller-facing control surface. [`RunScheduler`] owns the test tree, the
//! event bus and one [`Executor`] per top-level module, enforces "at most one
//! active run per module", and drives every executor from a single polling loop.
//!
//! 面向调用方的控制接口。[`RunScheduler`] 持有测试树、事件总线以及每个顶层模块的一个
//! [`Executor`]，保证"每个模块最多一个活动运行"，并通过单一轮询循环驱动所有执行器。

use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::config::RunnerConfig;
use crate::core::events::EventBus;
use crate::core::execution::{Executor, ExecutorState};
use crate::core::models::TestTree;
use crate::core::planner::{self, RunPlan};

/// How a [`RunScheduler::drive`] loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveOutcome {
    /// Every executor reached a terminal state on its own.
    Completed,
    /// The cancellation token fired and every running executor was terminated.
    Cancelled,
}

/// Registry of executors with a defined lifetime, constructed once at startup.
/// 具有明确生命周期的执行器注册表，在启动时构建一次。
#[derive(Debug)]
pub struct RunScheduler {
    tree: TestTree,
    bus: EventBus,
    runner: RunnerConfig,
    executors: BTreeMap<String, Executor>,
}

impl RunScheduler {
    pub fn new(tree: TestTree, bus: EventBus, runner: RunnerConfig) -> Self {
        let executors = tree
            .module_names()
            .map(|module| (module.to_string(), Executor::new(module)))
            .collect();
        Self {
            tree,
            bus,
            runner,
            executors,
        }
    }

    pub fn tree(&self) -> &TestTree {
        &self.tree
    }

    /// Mutable access for registering status observers.
    pub fn tree_mut(&mut self) -> &mut TestTree {
        &mut self.tree
    }

    /// Mutable access for binding event handlers.
    pub fn bus_mut(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn executor(&self, module: &str) -> Option<&Executor> {
        self.executors.get(module)
    }

    pub fn executors(&self) -> impl Iterator<Item = &Executor> {
        self.executors.values()
    }

    pub fn is_running(&self, module: &str) -> bool {
        self.executors.get(module).is_some_and(Executor::is_running)
    }

    pub fn any_running(&self) -> bool {
        self.executors.values().any(Executor::is_running)
    }

    /// Starts every module that is not already running with all of its methods.
    /// Returns the modules that were started.
    ///
    /// 以全部方法启动每个尚未运行的模块，返回实际启动的模块。
    pub fn run_all(&mut self) -> Vec<String> {
        let plan = planner::plan_all(&self.tree);
        self.start_plan(plan)
    }

    /// Starts the selected module, case or method paths, grouped by module.
    /// Modules that are already running are skipped, never queued.
    pub fn run_selected<S: AsRef<str>>(&mut self, selection: &[S]) -> Vec<String> {
        let plan = planner::plan_selection(&self.tree, selection);
        self.start_plan(plan)
    }

    fn start_plan(&mut self, plan: RunPlan) -> Vec<String> {
        let mut started = Vec::new();
        for module_plan in plan.modules {
            let Some(executor) = self.executors.get_mut(&module_plan.module) else {
                continue;
            };
            if executor.is_running() {
                tracing::debug!(module = %module_plan.module, "already running, request skipped");
                continue;
            }
            match executor.start(module_plan.paths, &self.runner, &mut self.bus) {
                Ok(()) => started.push(module_plan.module),
                Err(e) => tracing::warn!(module = %module_plan.module, "run not started: {e}"),
            }
        }
        started
    }

    /// Terminates every running executor. Returns the modules that were stopped.
    pub fn stop_all(&mut self) -> Vec<String> {
        let mut stopped = Vec::new();
        for (module, executor) in self.executors.iter_mut() {
            if executor.is_running() {
                executor.terminate(&mut self.tree, &mut self.bus);
                stopped.push(module.clone());
            }
        }
        stopped
    }

    /// Polls every running executor once. Returns `true` while any module still runs.
    pub fn poll_all(&mut self) -> bool {
        let mut more = false;
        for executor in self.executors.values_mut() {
            if executor.is_running() {
                more |= executor.poll(&mut self.tree, &mut self.bus);
            }
        }
        more
    }

    /// Modules whose latest run ended in `state`.
    pub fn modules_in_state(&self, state: ExecutorState) -> Vec<&str> {
        self.executors
            .values()
            .filter(|e| e.state() == state)
            .map(Executor::module)
            .collect()
    }

    /// Polls on a fixed interval until no module is running, or until `cancel`
    /// fires, in which case every run is stopped.
    ///
    /// All model mutation and event emission happen inside this loop, so
    /// handlers never race with `start` or `terminate`.
    ///
    /// 按固定间隔轮询，直到没有模块在运行；或在 `cancel` 触发时停止所有运行。
    pub async fn drive(&mut self, interval: Duration, cancel: CancellationToken) -> DriveOutcome {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    let stopped = self.stop_all();
                    tracing::info!(?stopped, "runs cancelled");
                    return DriveOutcome::Cancelled;
                }
                _ = ticker.tick() => {
                    if !self.poll_all() {
                        return DriveOutcome::Completed;
                    }
                }
            }
        }
    }
}
