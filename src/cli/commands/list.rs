//! # List Command Module / 列表命令模块
//!
//! Prints the discovered test tree with localized descriptions, so an
//! operator can find the paths to pass to `run --select`.
//!
//! 打印已发现的测试树及其本地化描述，方便操作员找到 `run --select` 所需的路径。

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use crate::core::config;
use crate::core::models::{TestModule, TestNode, TestTree};
use crate::infra::{fs, t};
use crate::session_locale;

/// Executes the list command.
pub fn execute(config_path: &Path, lang: Option<&str>) -> Result<()> {
    let config_path = fs::absolute_path(config_path)?;
    let factory = config::load_factory_config(&config_path)?;
    let locale = session_locale(lang, factory.language.as_deref());

    let tree = TestTree::from_specs(&factory.modules)
        .with_context(|| t!("run.invalid_tree", locale = &locale).to_string())?;

    for line in render_tree(&tree, &locale) {
        println!("{line}");
    }
    Ok(())
}

/// Renders one indented line per module, case and method.
pub fn render_tree(tree: &TestTree, locale: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for module in tree.modules() {
        render_module(module, locale, 0, &mut lines);
    }
    lines
}

fn render_module(module: &TestModule, locale: &str, depth: usize, lines: &mut Vec<String>) {
    let indent = "  ".repeat(depth);
    lines.push(format!(
        "{indent}{}  {}",
        module.path().cyan().bold(),
        module.description(locale)
    ));
    for child in module.children() {
        match child {
            TestNode::Module(nested) => render_module(nested, locale, depth + 1, lines),
            TestNode::Case(case) => {
                lines.push(format!(
                    "{indent}  {}  {}",
                    case.path().blue(),
                    case.description(locale)
                ));
                for method in case.methods() {
                    lines.push(format!(
                        "{indent}    {}  {}",
                        method.path(),
                        method.description(locale).dimmed()
                    ));
                }
            }
        }
    }
}
