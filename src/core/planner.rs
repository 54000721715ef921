//! # Run Planner Module / 运行计划模块
//!
//! Turns a "run all" request or an operator's selection into the per-module
//! list of method paths each executor should be started with.
//!
//! 将"全部运行"请求或操作员的选择转换为每个执行器启动时所用的、按模块划分的方法路径列表。

use std::collections::HashSet;

use crate::core::models::{TestTree, module_of};

/// The method paths to start for one module.
/// 某个模块要启动的方法路径。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulePlan {
    pub module: String,
    pub paths: Vec<String>,
}

/// A complete plan for one request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunPlan {
    /// Plans in module order (run all) or order of first appearance (selection).
    pub modules: Vec<ModulePlan>,
    /// Selection entries that resolved to nothing in the tree.
    /// 在测试树中无法解析的选择项。
    pub unknown: Vec<String>,
}

/// Plans every method of every module.
pub fn plan_all(tree: &TestTree) -> RunPlan {
    let modules = tree
        .module_names()
        .map(|module| ModulePlan {
            module: module.to_string(),
            paths: tree.all_method_paths(module),
        })
        .filter(|plan| !plan.paths.is_empty())
        .collect();
    RunPlan {
        modules,
        unknown: Vec::new(),
    }
}

/// Plans a selection of module, case or method paths, grouped by top-level
/// module. Duplicates are removed; method order within a module follows the
/// selection.
pub fn plan_selection<S: AsRef<str>>(tree: &TestTree, selection: &[S]) -> RunPlan {
    let mut plan = RunPlan::default();
    let mut seen = HashSet::new();

    for entry in selection {
        let entry = entry.as_ref().trim();
        let expanded = tree.expand(entry);
        if expanded.is_empty() {
            tracing::warn!(path = entry, "selection does not match any test method");
            plan.unknown.push(entry.to_string());
            continue;
        }

        for path in expanded {
            if !seen.insert(path.clone()) {
                continue;
            }
            let module = module_of(&path);
            match plan.modules.iter_mut().find(|m| m.module == module) {
                Some(existing) => existing.paths.push(path),
                None => plan.modules.push(ModulePlan {
                    module: module.to_string(),
                    paths: vec![path],
                }),
            }
        }
    }

    plan
}
