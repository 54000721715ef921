//! # Runner Protocol Codec Module / 运行器协议编解码模块
//!
//! Encodes a module's selected test paths into a runner launch specification
//! and decodes the runner's stdout, one line at a time, into progress records.
//!
//! The runner writes newline-delimited JSON objects tagged by `"event"`:
//!
//! ```text
//! {"event":"start","path":"auto.eMMCTest.test_identify"}
//! {"event":"end","path":"auto.eMMCTest.test_identify","status":"PASS","duration_ms":120}
//! {"event":"summary","counts":{"PASS":1}}
//! ```
//!
//! Any other line (probe chatter, tracebacks, partial JSON) decodes to
//! [`RunnerRecord::Unparsable`] and never stops decoding of later lines.
//!
//! 将模块所选测试路径编码为运行器启动规范，并逐行将运行器的 stdout 解码为进度记录。
//! 任何其他行都会被解码为 `Unparsable`，且不会中断后续行的解码。

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::RunnerConfig;
use crate::core::models::Status;

/// Placeholder argument replaced by the module name.
pub const MODULE_PLACEHOLDER: &str = "{module}";

/// Environment variable that tells the runner which module it serves.
pub const MODULE_ENV: &str = "FACTORY_RUNNER_MODULE";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("runner program is empty")]
    EmptyProgram,

    #[error("cannot expand '{value}': {reason}")]
    Expansion { value: String, reason: String },

    #[error("'{0}' is not a valid test path")]
    InvalidPath(String),
}

/// A fully resolved runner invocation. Every selected path is its own argument.
/// 完全解析后的运行器调用。每个所选路径都是独立的参数。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: Vec<(String, String)>,
}

/// A test path is a `.`-separated list of identifier segments.
pub fn is_valid_path(path: &str) -> bool {
    !path.is_empty()
        && path.split('.').all(|segment| {
            !segment.is_empty() && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

fn expand(value: &str) -> Result<String, ProtocolError> {
    shellexpand::full(value)
        .map(|expanded| expanded.into_owned())
        .map_err(|e| ProtocolError::Expansion {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Builds the launch specification for running `paths` of `module`.
/// 构建运行 `module` 中 `paths` 的启动规范。
pub fn encode_invocation(
    runner: &RunnerConfig,
    module: &str,
    paths: &[String],
) -> Result<LaunchSpec, ProtocolError> {
    let program = expand(runner.program.trim())?;
    if program.is_empty() {
        return Err(ProtocolError::EmptyProgram);
    }

    if let Some(bad) = paths.iter().find(|p| !is_valid_path(p)) {
        return Err(ProtocolError::InvalidPath(bad.clone()));
    }

    let mut args: Vec<String> = runner
        .args
        .iter()
        .map(|arg| {
            if arg == MODULE_PLACEHOLDER {
                module.to_string()
            } else {
                arg.clone()
            }
        })
        .collect();
    args.extend(paths.iter().cloned());

    let working_dir = runner
        .working_dir
        .as_ref()
        .map(|dir| expand(&dir.to_string_lossy()).map(PathBuf::from))
        .transpose()?;

    let mut env: Vec<(String, String)> = runner
        .env
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    env.push((MODULE_ENV.to_string(), module.to_string()));

    Ok(LaunchSpec {
        program,
        args,
        working_dir,
        env,
    })
}

/// One decoded line of runner output.
/// 运行器输出中解码后的一行。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunnerRecord {
    Start {
        path: String,
    },
    End {
        path: String,
        status: Status,
        duration: Duration,
        output: Option<String>,
        error: Option<String>,
    },
    Summary {
        counts: BTreeMap<Status, usize>,
    },
    Unparsable {
        raw: String,
    },
}

#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum WireRecord {
    Start {
        path: String,
    },
    End {
        path: String,
        status: Status,
        #[serde(default)]
        duration_ms: u64,
        #[serde(default)]
        output: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    Summary {
        #[serde(default)]
        counts: HashMap<String, usize>,
    },
}

/// Decodes a single line of runner stdout.
pub fn decode_line(line: &str) -> RunnerRecord {
    let trimmed = line.trim();
    let unparsable = || RunnerRecord::Unparsable {
        raw: line.trim_end_matches(['\r', '\n']).to_string(),
    };

    if !trimmed.starts_with('{') {
        return unparsable();
    }

    match serde_json::from_str::<WireRecord>(trimmed) {
        Ok(WireRecord::Start { path }) if is_valid_path(&path) => RunnerRecord::Start { path },
        Ok(WireRecord::End {
            path,
            status,
            duration_ms,
            output,
            error,
        }) if is_valid_path(&path) && status.is_terminal() && status != Status::Cancelled => {
            RunnerRecord::End {
                path,
                status,
                duration: Duration::from_millis(duration_ms),
                output,
                error,
            }
        }
        Ok(WireRecord::Summary { counts }) => RunnerRecord::Summary {
            counts: summary_counts(counts),
        },
        _ => unparsable(),
    }
}

/// Keeps the counts of known statuses. Unknown keys are skipped so that a
/// runner reporting an extra category still finishes its run.
fn summary_counts(raw: HashMap<String, usize>) -> BTreeMap<Status, usize> {
    let mut counts = BTreeMap::new();
    for (key, count) in raw {
        match key.parse::<Status>() {
            Ok(status) => *counts.entry(status).or_insert(0) += count,
            Err(_) => tracing::debug!(status = %key, count, "unknown status in runner summary skipped"),
        }
    }
    counts
}

/// Decodes a raw line that may not be valid UTF-8.
pub fn decode_bytes(line: &[u8]) -> RunnerRecord {
    decode_line(&String::from_utf8_lossy(line))
}

/// Decodes a block of output line by line.
pub fn decode_stream(text: &str) -> Vec<RunnerRecord> {
    text.lines().map(decode_line).collect()
}
