//! # Init Command Module / 初始化命令模块
//!
//! This module implements the `init` command, which creates a starter
//! `Factory.toml` manifest, either from a commented template or through a
//! short interactive wizard.
//!
//! 此模块实现了 `init` 命令，用于创建初始的 `Factory.toml` 清单，
//! 可以使用带注释的模板，也可以通过简短的交互式向导生成。

use anyhow::{Context, Result, bail};
use colored::*;
use dialoguer::{Confirm, Input, theme::ColorfulTheme};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::config::{
    CaseSpec, FactoryConfig, MethodSpec, ModuleSpec, RunnerConfig, parse_factory_config,
};
use crate::infra::{fs, t};

/// Commented starter manifest written by `init --non-interactive`.
pub const DEFAULT_CONFIG: &str = r#"# Factory Runner Manifest / 工厂测试清单

# Language for console output and descriptions / 控制台输出和描述的语言
language = "en"

# Poll interval of the executors in milliseconds / 执行器轮询间隔（毫秒）
poll_interval_ms = 100

# How to launch the runner. An argument that is exactly "{module}" is replaced
# by the module name; the selected test paths are appended after the args.
# 如何启动运行器。恰好为 "{module}" 的参数会被替换为模块名；所选测试路径追加在参数之后。
[runner]
program = "python3"
args = ["-m", "factory_runner_agent", "{module}"]
# working_dir = "~/factory"
# env = { FACTORY_STATION = "line-1" }

[[modules]]
name = "auto"
text = { en = "Automatic tests", zh = "自动测试" }

[[modules.cases]]
name = "eMMCTest"
text = { en = "eMMC storage", zh = "eMMC 存储" }

[[modules.cases.methods]]
name = "test_identify"
text = { en = "Identify device", zh = "识别设备" }

[[modules.cases.methods]]
name = "test_read_write"
text = { en = "Read and write", zh = "读写测试" }
"#;

/// Executes the init command.
///
/// # Arguments
/// * `output` - Path for the new manifest
/// * `language` - Locale of the prompts and messages
/// * `non_interactive` - Write the template without asking anything
/// * `force` - Overwrite an existing file without confirmation
pub fn execute(output: &Path, language: &str, non_interactive: bool, force: bool) -> Result<()> {
    let theme = ColorfulTheme::default();

    if output.exists() && !force {
        if non_interactive {
            bail!(
                "{}",
                t!("init.file_exists", locale = language, path = output.display())
            );
        }
        let confirmation = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", locale = language, path = output.display()))
            .default(false)
            .interact()
            .context(t!("init.confirmation_failed", locale = language).to_string())?;
        if !confirmation {
            println!("{}", t!("init.aborted", locale = language));
            return Ok(());
        }
    }

    let contents = if non_interactive {
        DEFAULT_CONFIG.to_string()
    } else {
        println!("\n{}", t!("init.wizard_welcome", locale = language).cyan().bold());
        println!("{}", t!("init.wizard_description", locale = language));
        let factory = run_wizard(&theme, language)?;
        toml::to_string_pretty(&factory)
            .context(t!("init.serialize_failed", locale = language).to_string())?
    };

    // Never write a manifest `run` would reject.
    parse_factory_config(&contents)?;

    fs::write_file(output, contents)?;
    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success", locale = language, path = output.display()).bold()
    );
    println!("{}", t!("init.next_steps", locale = language));
    Ok(())
}

fn run_wizard(theme: &ColorfulTheme, language: &str) -> Result<FactoryConfig> {
    let command: String = Input::with_theme(theme)
        .with_prompt(t!("init.runner_prompt", locale = language))
        .default("python3 -m factory_runner_agent {module}".to_string())
        .validate_with(|input: &String| match shlex::split(input) {
            Some(words) if !words.is_empty() => Ok(()),
            _ => Err(t!("init.runner_invalid", locale = language).to_string()),
        })
        .interact_text()
        .context(t!("init.confirmation_failed", locale = language).to_string())?;

    let module: String = Input::with_theme(theme)
        .with_prompt(t!("init.module_prompt", locale = language))
        .default("auto".to_string())
        .interact_text()
        .context(t!("init.confirmation_failed", locale = language).to_string())?;

    let manifest_language: String = Input::with_theme(theme)
        .with_prompt(t!("init.language_prompt", locale = language))
        .default(language.to_string())
        .interact_text()
        .context(t!("init.confirmation_failed", locale = language).to_string())?;

    let mut words = shlex::split(&command).unwrap_or_default().into_iter();
    let program = words.next().unwrap_or_default();

    Ok(FactoryConfig {
        language: Some(manifest_language),
        poll_interval_ms: 100,
        runner: RunnerConfig {
            program,
            args: words.collect(),
            working_dir: None,
            env: BTreeMap::new(),
        },
        modules: vec![ModuleSpec {
            name: module,
            text: BTreeMap::new(),
            cases: vec![CaseSpec {
                name: "SmokeTest".to_string(),
                text: BTreeMap::new(),
                methods: vec![MethodSpec {
                    name: "test_smoke".to_string(),
                    text: BTreeMap::new(),
                }],
            }],
            modules: Vec::new(),
        }],
    })
}
