//! # Core Module / 核心模块
//!
//! This module contains the test execution and status-propagation engine:
//! the test tree, the event bus, the runner protocol, the executors and the
//! run scheduler.
//!
//! 此模块包含测试执行与状态传播引擎：
//! 测试树、事件总线、运行器协议、执行器以及运行调度器。

pub mod config;
pub mod events;
pub mod execution;
pub mod models;
pub mod planner;
pub mod protocol;
pub mod scheduler;

// Re-exports
pub use config::FactoryConfig;
pub use events::{Event, EventBus, EventKind};
pub use execution::{Executor, ExecutorState};
pub use models::{Status, TestTree};
pub use scheduler::RunScheduler;
