//! # Logging Module / 日志模块
//!
//! Structured logging setup. Filtering follows `RUST_LOG` and defaults to
//! `warn` so that the colored console view stays readable. An optional log file
//! receives the same records without ANSI colors.
//!
//! 结构化日志设置。过滤规则遵循 `RUST_LOG`，默认为 `warn`，以保持彩色控制台视图可读。
//! 可选的日志文件接收相同的记录（不含 ANSI 颜色）。

use anyhow::Result;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

use crate::infra::fs;

/// Installs the global tracing subscriber.
///
/// Only the first call in a process takes effect. A later call, including one
/// that names a `log_file`, leaves the installed subscriber in place and logs
/// that at debug level; the file is still created.
pub fn init(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let installed = match log_file {
        Some(path) => {
            let file = fs::open_append(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init(),
    };
    if let Err(e) = installed {
        tracing::debug!(log_file = ?log_file, "tracing subscriber already installed: {e}");
    }
    Ok(())
}
