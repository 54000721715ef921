//! # Status Event Bus Module / 状态事件总线模块
//!
//! A synchronous publish/subscribe channel that decouples the executors that
//! produce status changes from the surfaces that render them.
//!
//! Handlers run on the emitting thread, in registration order, before `emit`
//! returns. A slow handler therefore delays the polling loop.
//!
//! 一个同步发布/订阅通道，将产生状态变化的执行器与渲染它们的界面解耦。
//! 处理函数在发出事件的线程上按注册顺序执行。

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::core::execution::RunReport;
use crate::core::models::Status;

/// The names of the events published on the bus.
/// 总线上发布的事件名称。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventKind {
    TestStatusUpdate,
    TestStart,
    TestEnd,
    SuiteEnd,
    SuiteError,
}

impl EventKind {
    pub const ALL: [EventKind; 5] = [
        EventKind::TestStatusUpdate,
        EventKind::TestStart,
        EventKind::TestEnd,
        EventKind::SuiteEnd,
        EventKind::SuiteError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::TestStatusUpdate => "test_status_update",
            EventKind::TestStart => "test_start",
            EventKind::TestEnd => "test_end",
            EventKind::SuiteEnd => "suite_end",
            EventKind::SuiteError => "suite_error",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown event '{s}'"))
    }
}

/// An event published by an executor.
/// 执行器发布的事件。
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Free-text progress for a module, e.g. when a run is stopped.
    TestStatusUpdate { module: String, message: String },
    /// The runner started a test method.
    TestStart { module: String, path: String },
    /// The runner finished a test method.
    TestEnd {
        module: String,
        path: String,
        status: Status,
        duration: Duration,
        /// Estimated time left for the rest of the run.
        /// 运行剩余部分的预计时间。
        remaining: Duration,
    },
    /// The runner exited after reporting its summary.
    SuiteEnd { module: String, report: RunReport },
    /// The run could not be launched or the runner exited without a summary.
    SuiteError { module: String, error: String },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::TestStatusUpdate { .. } => EventKind::TestStatusUpdate,
            Event::TestStart { .. } => EventKind::TestStart,
            Event::TestEnd { .. } => EventKind::TestEnd,
            Event::SuiteEnd { .. } => EventKind::SuiteEnd,
            Event::SuiteError { .. } => EventKind::SuiteError,
        }
    }

    /// The module the event belongs to.
    pub fn module(&self) -> &str {
        match self {
            Event::TestStatusUpdate { module, .. }
            | Event::TestStart { module, .. }
            | Event::TestEnd { module, .. }
            | Event::SuiteEnd { module, .. }
            | Event::SuiteError { module, .. } => module,
        }
    }
}

/// A bus subscriber.
pub type Handler = Box<dyn FnMut(&Event) + Send>;

/// The event bus. Owned by the run scheduler and lent to executors while they
/// run, so there is no process-wide instance.
///
/// 事件总线。由运行调度器持有，并在执行器运行时借给它们，因此不存在全局实例。
#[derive(Default)]
pub struct EventBus {
    handlers: HashMap<EventKind, Vec<Handler>>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: HashMap<_, _> = self
            .handlers
            .iter()
            .map(|(kind, handlers)| (kind.as_str(), handlers.len()))
            .collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes `handler` to one kind of event.
    pub fn bind(&mut self, kind: EventKind, handler: impl FnMut(&Event) + Send + 'static) {
        self.handlers.entry(kind).or_default().push(Box::new(handler));
    }

    /// Subscribes a cloneable handler to every kind of event.
    pub fn bind_all<F>(&mut self, handler: F)
    where
        F: FnMut(&Event) + Clone + Send + 'static,
    {
        for kind in EventKind::ALL {
            self.bind(kind, handler.clone());
        }
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.handlers.get(&kind).map_or(0, Vec::len)
    }

    /// Delivers `event` to every handler bound to its kind, synchronously and
    /// in registration order.
    pub fn emit(&mut self, event: &Event) {
        tracing::trace!(event = %event.kind(), module = event.module(), "emit");
        if let Some(handlers) = self.handlers.get_mut(&event.kind()) {
            for handler in handlers.iter_mut() {
                handler(event);
            }
        }
    }
}
