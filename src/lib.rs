//! # Factory Runner Library / Factory Runner 库
//!
//! This library provides the core functionality for the factory runner, a
//! factory-acceptance test harness that executes hardware test modules out of
//! process and streams live pass/fail status to whatever surface subscribes.
//!
//! 此库为工厂测试运行器提供核心功能。它是一个工厂验收测试框架，
//! 在进程外执行硬件测试模块，并将实时的通过/失败状态推送给订阅的界面。
//!
//! ## Modules / 模块
//!
//! - `core` - Test tree, event bus, runner protocol, executors and scheduler
//! - `infra` - Runner process management, file system helpers and logging
//! - `reporting` - Console rendering and HTML reports
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 测试树、事件总线、运行器协议、执行器和调度器
//! - `infra` - 运行器进程管理、文件系统辅助和日志
//! - `reporting` - 控制台渲染和 HTML 报告
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use crate::core::config;
pub use crate::core::events;
pub use crate::core::execution;
pub use crate::core::models;
pub use crate::core::scheduler;

/// Picks the best available locale for `requested`: the full locale if a
/// translation exists (e.g. "zh-CN"), then its language part (e.g. "zh"),
/// and finally "en".
pub fn resolve_locale(requested: &str) -> String {
    let available_locales = rust_i18n::available_locales!();

    if available_locales.iter().any(|locale| *locale == requested) {
        return requested.to_string();
    }
    let language = requested.split(['-', '_']).next().unwrap_or("en");
    available_locales
        .iter()
        .find(|locale| **locale == language || locale.split('-').next() == Some(language))
        .map(|locale| locale.to_string())
        .unwrap_or_else(|| "en".to_string())
}

/// Picks the locale of a session: the command-line language, then the
/// manifest language, then the locale already set from the system.
pub fn session_locale(cli: Option<&str>, manifest: Option<&str>) -> String {
    match cli.or(manifest) {
        Some(requested) => resolve_locale(requested),
        None => rust_i18n::locale().to_string(),
    }
}

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface, falling back to "en".
pub fn init() {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    rust_i18n::set_locale(&resolve_locale(&locale));
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
