//! # Reporting Module / 报告模块
//!
//! Rendering surfaces that sit on top of the engine. The console reporter
//! subscribes to the event bus; the summary printers and the HTML report read
//! a snapshot of the test tree once the runs are over.
//!
//! 位于引擎之上的渲染界面。控制台报告器订阅事件总线；摘要打印和 HTML 报告
//! 在运行结束后读取测试树的快照。

pub mod console;
pub mod html;

// Re-export common reporting functions
pub use console::{ConsoleReporter, print_failure_details, print_summary};
pub use html::generate_html_report;
