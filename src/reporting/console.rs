//! # Console Reporting Module / 控制台报告模块
//!
//! A rendering surface for the operator console. [`ConsoleReporter`] subscribes
//! to the event bus and prints colored, localized progress lines; the engine
//! never knows it exists.
//!
//! 操作员控制台的渲染界面。[`ConsoleReporter`] 订阅事件总线并打印带颜色的本地化进度行；
//! 引擎并不知道它的存在。

use colored::*;
use std::time::Duration;

use crate::core::events::{Event, EventBus, EventKind};
use crate::core::models::{Status, TestTree};
use crate::infra::t;

/// Colors a status label the way the operator console shows it.
pub fn colorize(status: Status, label: String) -> ColoredString {
    match status {
        Status::Pass => label.green(),
        Status::Fail => label.red(),
        Status::Error => label.truecolor(0xE4, 0x74, 0x2C),
        Status::Skip => label.cyan(),
        Status::ExpectedFail => label.blue(),
        Status::UnexpectedSuccess => label.magenta(),
        Status::Cancelled => label.yellow(),
        Status::Running => label.bold(),
        Status::NotRun => label.dimmed(),
    }
}

fn format_duration(duration: Duration) -> String {
    format!("{:.2}s", duration.as_secs_f64())
}

/// Renders bus events as console lines.
/// 将总线事件渲染为控制台输出行。
#[derive(Debug, Clone)]
pub struct ConsoleReporter {
    locale: String,
}

impl ConsoleReporter {
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
        }
    }

    /// Binds a reporter to every event kind on `bus`.
    pub fn attach(bus: &mut EventBus, locale: &str) {
        for kind in EventKind::ALL {
            let reporter = ConsoleReporter::new(locale);
            bus.bind(kind, move |event| println!("{}", reporter.render(event)));
        }
    }

    /// Formats one event as a single console line.
    pub fn render(&self, event: &Event) -> String {
        let locale = self.locale.as_str();
        match event {
            Event::TestStatusUpdate { module, message } => {
                format!("[{}] {}", module.cyan(), message.yellow())
            }
            Event::TestStart { module, path } => format!(
                "[{}] {}",
                module.cyan(),
                t!("console.test_start", locale = locale, path = path).blue()
            ),
            Event::TestEnd {
                module,
                path,
                status,
                duration,
                remaining,
            } => format!(
                "[{}] {:<20} {} ({}, {})",
                module.cyan(),
                colorize(*status, status.label(locale)),
                path,
                format_duration(*duration),
                t!(
                    "console.remaining",
                    locale = locale,
                    remaining = format_duration(*remaining)
                )
            ),
            Event::SuiteEnd { module, report } => {
                let counts = report
                    .counts
                    .iter()
                    .map(|(status, count)| format!("{} {}", count, status.label(locale)))
                    .collect::<Vec<_>>()
                    .join(", ");
                let line = t!(
                    "console.suite_end",
                    locale = locale,
                    completed = report.completed_count,
                    expected = report.expected_count,
                    elapsed = format_duration(report.elapsed),
                    counts = counts
                );
                let line = if report.any_failed() {
                    line.red().bold()
                } else {
                    line.green().bold()
                };
                format!("[{}] {}", module.cyan(), line)
            }
            Event::SuiteError { module, error } => format!(
                "[{}] {}",
                module.cyan(),
                t!("console.suite_error", locale = locale, error = error).red().bold()
            ),
        }
    }
}

/// Prints a summary table of every method that took part in this session.
/// Methods still at `NOT_RUN` are omitted.
///
/// 打印本次会话中所有参与执行的方法的摘要表格，仍为 `NOT_RUN` 的方法会被省略。
///
/// # Output Format / 输出格式
/// ```text
/// --- Test Summary ---
///   - Status               | Test                                     | Duration
///   - Pass                 | auto.eMMCTest.test_identify  (Identify)  |      0.12s
/// ```
pub fn print_summary(tree: &TestTree, locale: &str) {
    println!("\n{}", t!("console.summary_banner", locale = locale).bold());

    for module in tree.modules() {
        for method in module.methods() {
            if method.status() == Status::NotRun {
                continue;
            }
            let duration = method
                .duration()
                .map(format_duration)
                .unwrap_or_else(|| "N/A".to_string());
            let name = format!("{}  ({})", method.path(), method.description(locale));
            println!(
                "  - {:<20} | {:<50} | {:>10}",
                colorize(method.status(), method.status().label(locale)),
                name,
                duration
            );
        }
    }
}

/// Prints the captured error text of every failed method.
pub fn print_failure_details(tree: &TestTree, locale: &str) {
    let failures: Vec<_> = tree
        .modules()
        .flat_map(|module| module.methods())
        .filter(|method| method.status().is_failure())
        .collect();
    if failures.is_empty() {
        return;
    }

    println!("\n{}", t!("console.failure_banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));
    for (i, method) in failures.iter().enumerate() {
        println!(
            "[{}/{}] {} '{}'",
            i + 1,
            failures.len(),
            colorize(method.status(), method.status().label(locale)),
            method.path().cyan()
        );
        if let Some(error) = method.error().filter(|e| !e.trim().is_empty()) {
            println!("\n{}\n", error.trim_end());
        }
        if let Some(output) = method.output().filter(|o| !o.trim().is_empty()) {
            println!("--- {} ---\n{}", t!("console.output", locale = locale).yellow(), output.trim_end());
        }
        println!("{}", "-".repeat(80));
    }
}
