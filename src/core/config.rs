//! # Configuration Module / 配置模块
//!
//! Defines the `Factory.toml` discovery manifest: the runner invocation and the
//! tree of modules, cases and methods with their per-locale display text.
//!
//! 定义 `Factory.toml` 发现清单：运行器调用方式，以及带有多语言显示文本的
//! 模块、用例和方法树。

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::infra::t;

/// How to launch the external runner process.
/// 如何启动外部运行器进程。
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Program to execute. `~` and `$VARS` are expanded.
    /// 要执行的程序。会展开 `~` 和 `$VARS`。
    pub program: String,
    /// Fixed arguments placed before the selected test paths. An argument that
    /// is exactly `{module}` is replaced by the module name.
    /// 放在所选测试路径之前的固定参数。恰好为 `{module}` 的参数会被替换为模块名。
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory of the runner. Defaults to the current directory.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Extra environment variables for the runner.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// A discovered test method.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct MethodSpec {
    pub name: String,
    /// Display text keyed by locale, e.g. `{ en = "Read data", zh = "读取数据" }`.
    #[serde(default)]
    pub text: BTreeMap<String, String>,
}

/// A discovered test case.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct CaseSpec {
    pub name: String,
    #[serde(default)]
    pub text: BTreeMap<String, String>,
    pub methods: Vec<MethodSpec>,
}

/// A discovered module. Modules may nest.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct ModuleSpec {
    pub name: String,
    #[serde(default)]
    pub text: BTreeMap<String, String>,
    #[serde(default)]
    pub cases: Vec<CaseSpec>,
    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

/// Represents the entire factory manifest, loaded from a TOML file.
/// 代表从 TOML 文件加载的整个工厂测试清单。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FactoryConfig {
    /// The language for console output and test descriptions (e.g. "en", "zh-CN").
    /// When absent, the system locale is used.
    /// 控制台输出和测试描述使用的语言（例如 "en", "zh-CN"）。缺省时使用系统语言。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Interval between two polls of the running executors, in milliseconds.
    /// 两次轮询正在运行的执行器之间的间隔（毫秒）。
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    pub runner: RunnerConfig,

    #[serde(default)]
    pub modules: Vec<ModuleSpec>,
}

fn default_poll_interval_ms() -> u64 {
    100
}

/// Loads and validates a factory manifest from disk.
/// 从磁盘加载并校验工厂测试清单。
pub fn load_factory_config(path: &Path) -> Result<FactoryConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| t!("config.read_failed", path = path.display()).to_string())?;
    parse_factory_config(&content)
        .with_context(|| t!("config.parse_failed", path = path.display()).to_string())
}

/// Parses and validates manifest text.
pub fn parse_factory_config(content: &str) -> Result<FactoryConfig> {
    let config: FactoryConfig = toml::from_str(content)?;

    if config.runner.program.trim().is_empty() {
        bail!("{}", t!("config.empty_program"));
    }
    if config.poll_interval_ms == 0 {
        bail!("{}", t!("config.zero_interval"));
    }

    Ok(config)
}
