//! # Test Node Model Module / 测试节点模型模块
//!
//! This module defines the addressable test tree (Module → Case → Method),
//! the status of each test method, and the observer hook that fires when a
//! status changes.
//!
//! 此模块定义可寻址的测试树（模块 → 用例 → 方法）、每个测试方法的状态，
//! 以及状态变化时触发的观察者回调。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::core::config::{CaseSpec, ModuleSpec};
use crate::infra::t;

/// The status of a single test method.
/// 单个测试方法的状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Never executed in this session / 本次会话中尚未执行
    NotRun,
    /// Started by the runner, outcome not yet known / 运行器已开始，结果未知
    Running,
    #[serde(alias = "OK")]
    Pass,
    Fail,
    Error,
    Skip,
    ExpectedFail,
    UnexpectedSuccess,
    /// The run was stopped while this method was in flight.
    /// 该方法执行期间运行被停止。
    Cancelled,
}

impl Status {
    /// All statuses, in display order.
    pub const ALL: [Status; 9] = [
        Status::NotRun,
        Status::Running,
        Status::Pass,
        Status::Fail,
        Status::Error,
        Status::Skip,
        Status::ExpectedFail,
        Status::UnexpectedSuccess,
        Status::Cancelled,
    ];

    /// Returns `true` for statuses from which no further automatic transition occurs.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Status::NotRun | Status::Running)
    }

    /// Returns `true` if this outcome should fail an acceptance run.
    /// 如果此结果应导致验收运行失败，则返回 `true`。
    pub fn is_failure(self) -> bool {
        matches!(
            self,
            Status::Fail | Status::Error | Status::UnexpectedSuccess | Status::Cancelled
        )
    }

    /// The wire name, e.g. `EXPECTED_FAIL`.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::NotRun => "NOT_RUN",
            Status::Running => "RUNNING",
            Status::Pass => "PASS",
            Status::Fail => "FAIL",
            Status::Error => "ERROR",
            Status::Skip => "SKIP",
            Status::ExpectedFail => "EXPECTED_FAIL",
            Status::UnexpectedSuccess => "UNEXPECTED_SUCCESS",
            Status::Cancelled => "CANCELLED",
        }
    }

    /// Gets the localized label of the status for display.
    /// 获取状态的本地化显示标签。
    pub fn label(self, locale: &str) -> String {
        match self {
            Status::NotRun => t!("status.not_run", locale = locale),
            Status::Running => t!("status.running", locale = locale),
            Status::Pass => t!("status.pass", locale = locale),
            Status::Fail => t!("status.fail", locale = locale),
            Status::Error => t!("status.error", locale = locale),
            Status::Skip => t!("status.skip", locale = locale),
            Status::ExpectedFail => t!("status.expected_fail", locale = locale),
            Status::UnexpectedSuccess => t!("status.unexpected_success", locale = locale),
            Status::Cancelled => t!("status.cancelled", locale = locale),
        }
        .to_string()
    }

    /// CSS class used by the HTML report.
    pub fn css_class(self) -> &'static str {
        match self {
            Status::Pass => "status-pass",
            Status::Fail => "status-fail",
            Status::Error => "status-error",
            Status::Skip => "status-skip",
            Status::ExpectedFail => "status-expected",
            Status::UnexpectedSuccess => "status-unexpected",
            Status::Cancelled => "status-cancelled",
            Status::Running => "status-running",
            Status::NotRun => "status-not-run",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(Status::Pass),
            _ => Status::ALL
                .into_iter()
                .find(|status| status.as_str() == s)
                .ok_or_else(|| ModelError::UnknownStatus(s.to_string())),
        }
    }
}

/// Errors raised while building the test tree from discovery input.
/// 从发现输入构建测试树时出现的错误。
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("node name must not be empty (under '{parent}')")]
    EmptyName { parent: String },

    #[error("node name '{name}' must not contain '.'")]
    DottedName { name: String },

    #[error("duplicate node '{path}'")]
    Duplicate { path: String },

    #[error("test case '{path}' has no methods")]
    EmptyCase { path: String },

    #[error("unknown status '{0}'")]
    UnknownStatus(String),
}

/// Per-locale display text of a node.
pub type Descriptions = BTreeMap<String, String>;

/// Resolves localized text, trying the full locale (`zh-CN`), then its language
/// part (`zh`), then falling back to the node name.
fn localized<'a>(descriptions: &'a Descriptions, locale: &str, fallback: &'a str) -> &'a str {
    descriptions
        .get(locale)
        .or_else(|| {
            locale
                .split(['-', '_'])
                .next()
                .and_then(|lang| descriptions.get(lang))
        })
        .map(String::as_str)
        .unwrap_or(fallback)
}

/// The addressable execution unit.
/// 可寻址的执行单元。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestMethod {
    name: String,
    path: String,
    status: Status,
    descriptions: Descriptions,
    duration: Option<Duration>,
    output: Option<String>,
    error: Option<String>,
}

impl TestMethod {
    fn new(name: &str, path: String, descriptions: Descriptions) -> Self {
        Self {
            name: name.to_string(),
            path,
            status: Status::NotRun,
            descriptions,
            duration: None,
            output: None,
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The dotted address, e.g. `auto.EEPROMTest.test_read`.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// The first segment of the path, which names the owning top-level module.
    pub fn module(&self) -> &str {
        module_of(&self.path)
    }

    pub fn description(&self, locale: &str) -> &str {
        localized(&self.descriptions, locale, &self.name)
    }

    /// Duration reported by the runner for the latest completed execution.
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Details attached to a terminal status by a runner `end` record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    pub duration: Option<Duration>,
    pub output: Option<String>,
    pub error: Option<String>,
}

/// A named grouping of test methods. Always exactly one level above a method.
#[derive(Debug, Clone)]
pub struct TestCase {
    name: String,
    path: String,
    descriptions: Descriptions,
    methods: BTreeMap<String, TestMethod>,
}

impl TestCase {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(&self, locale: &str) -> &str {
        localized(&self.descriptions, locale, &self.name)
    }

    /// Methods in lexicographic name order.
    pub fn methods(&self) -> impl Iterator<Item = &TestMethod> {
        self.methods.values()
    }
}

/// A child of a [`TestModule`].
#[derive(Debug, Clone)]
pub enum TestNode {
    Case(TestCase),
    Module(TestModule),
}

/// A named grouping of cases and nested modules.
/// 用例和嵌套模块的命名分组。
#[derive(Debug, Clone)]
pub struct TestModule {
    name: String,
    path: String,
    descriptions: Descriptions,
    children: BTreeMap<String, TestNode>,
}

impl TestModule {
    fn from_spec(spec: &ModuleSpec, parent: Option<&str>) -> Result<Self, ModelError> {
        let path = child_path(parent, &spec.name)?;
        let mut children = BTreeMap::new();

        for case in &spec.cases {
            let case = build_case(case, &path)?;
            insert_unique(&mut children, case.name.clone(), TestNode::Case(case), &path)?;
        }
        for module in &spec.modules {
            let module = TestModule::from_spec(module, Some(&path))?;
            insert_unique(&mut children, module.name.clone(), TestNode::Module(module), &path)?;
        }

        Ok(Self {
            name: spec.name.clone(),
            path,
            descriptions: spec.text.clone(),
            children,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn description(&self, locale: &str) -> &str {
        localized(&self.descriptions, locale, &self.name)
    }

    /// Children in lexicographic name order.
    pub fn children(&self) -> impl Iterator<Item = &TestNode> {
        self.children.values()
    }

    /// Depth-first walk over every method below this module, in name order.
    pub fn methods(&self) -> Vec<&TestMethod> {
        let mut out = Vec::new();
        self.collect_methods(&mut out);
        out
    }

    fn collect_methods<'a>(&'a self, out: &mut Vec<&'a TestMethod>) {
        for child in self.children.values() {
            match child {
                TestNode::Case(case) => out.extend(case.methods.values()),
                TestNode::Module(module) => module.collect_methods(out),
            }
        }
    }

    fn find(&self, segments: &[&str]) -> Option<NodeRef<'_>> {
        let Some((first, rest)) = segments.split_first() else {
            return Some(NodeRef::Module(self));
        };
        match self.children.get(*first)? {
            TestNode::Module(module) => module.find(rest),
            TestNode::Case(case) => match rest {
                [] => Some(NodeRef::Case(case)),
                [method] => case.methods.get(*method).map(NodeRef::Method),
                _ => None,
            },
        }
    }

    fn find_method_mut(&mut self, segments: &[&str]) -> Option<&mut TestMethod> {
        let (first, rest) = segments.split_first()?;
        match self.children.get_mut(*first)? {
            TestNode::Module(module) => module.find_method_mut(rest),
            TestNode::Case(case) => match rest {
                [method] => case.methods.get_mut(*method),
                _ => None,
            },
        }
    }
}

/// A resolved node of any kind.
#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Module(&'a TestModule),
    Case(&'a TestCase),
    Method(&'a TestMethod),
}

fn child_path(parent: Option<&str>, name: &str) -> Result<String, ModelError> {
    if name.is_empty() {
        return Err(ModelError::EmptyName {
            parent: parent.unwrap_or("<root>").to_string(),
        });
    }
    if name.contains('.') {
        return Err(ModelError::DottedName {
            name: name.to_string(),
        });
    }
    Ok(match parent {
        Some(parent) => format!("{parent}.{name}"),
        None => name.to_string(),
    })
}

fn insert_unique<V>(
    map: &mut BTreeMap<String, V>,
    name: String,
    value: V,
    parent: &str,
) -> Result<(), ModelError> {
    if map.contains_key(&name) {
        return Err(ModelError::Duplicate {
            path: format!("{parent}.{name}"),
        });
    }
    map.insert(name, value);
    Ok(())
}

fn build_case(spec: &CaseSpec, parent: &str) -> Result<TestCase, ModelError> {
    let path = child_path(Some(parent), &spec.name)?;
    if spec.methods.is_empty() {
        return Err(ModelError::EmptyCase { path });
    }

    let mut methods = BTreeMap::new();
    for method in &spec.methods {
        let method_path = child_path(Some(&path), &method.name)?;
        let node = TestMethod::new(&method.name, method_path, method.text.clone());
        insert_unique(&mut methods, method.name.clone(), node, &path)?;
    }

    Ok(TestCase {
        name: spec.name.clone(),
        path,
        descriptions: spec.text.clone(),
        methods,
    })
}

/// Returns the top-level module segment of a dotted path.
pub fn module_of(path: &str) -> &str {
    path.split('.').next().unwrap_or(path)
}

/// Callback invoked whenever a method's status is set.
pub type StatusObserver = Box<dyn FnMut(&TestMethod) + Send>;

/// The whole discovered test tree: the single source of truth for
/// `path → TestMethod` resolution.
///
/// 整个已发现的测试树：`path → TestMethod` 解析的唯一数据源。
pub struct TestTree {
    modules: BTreeMap<String, TestModule>,
    observers: Vec<StatusObserver>,
}

impl fmt::Debug for TestTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestTree")
            .field("modules", &self.modules)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl TestTree {
    /// Builds the tree once from discovery input. The structure is immutable afterwards.
    /// 从发现输入一次性构建测试树，之后结构不可变。
    pub fn from_specs(specs: &[ModuleSpec]) -> Result<Self, ModelError> {
        let mut modules = BTreeMap::new();
        for spec in specs {
            let module = TestModule::from_spec(spec, None)?;
            if modules.contains_key(&module.name) {
                return Err(ModelError::Duplicate { path: module.path });
            }
            modules.insert(module.name.clone(), module);
        }
        Ok(Self {
            modules,
            observers: Vec::new(),
        })
    }

    /// Names of the top-level modules in lexicographic order.
    pub fn module_names(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn module(&self, name: &str) -> Option<&TestModule> {
        self.modules.get(name)
    }

    pub fn modules(&self) -> impl Iterator<Item = &TestModule> {
        self.modules.values()
    }

    /// Resolves a method path. Module and case paths resolve to `None`.
    pub fn resolve(&self, path: &str) -> Option<&TestMethod> {
        match self.find(path)? {
            NodeRef::Method(method) => Some(method),
            _ => None,
        }
    }

    /// Resolves a path to a node of any kind.
    pub fn find(&self, path: &str) -> Option<NodeRef<'_>> {
        let segments: Vec<&str> = path.split('.').collect();
        let (first, rest) = segments.split_first()?;
        self.modules.get(*first)?.find(rest)
    }

    /// Every method path in a top-level module, in lexicographic
    /// module/case/method order. Unknown modules yield an empty list.
    pub fn all_method_paths(&self, module: &str) -> Vec<String> {
        self.modules
            .get(module)
            .map(|m| m.methods().into_iter().map(|m| m.path.clone()).collect())
            .unwrap_or_default()
    }

    /// Expands a module, case or method path to the method paths beneath it.
    pub fn expand(&self, path: &str) -> Vec<String> {
        match self.find(path) {
            Some(NodeRef::Module(module)) => {
                module.methods().into_iter().map(|m| m.path.clone()).collect()
            }
            Some(NodeRef::Case(case)) => case.methods().map(|m| m.path.clone()).collect(),
            Some(NodeRef::Method(method)) => vec![method.path.clone()],
            None => Vec::new(),
        }
    }

    /// Counts methods of a top-level module by status.
    pub fn counts(&self, module: &str) -> BTreeMap<Status, usize> {
        let mut counts = BTreeMap::new();
        if let Some(module) = self.modules.get(module) {
            for method in module.methods() {
                *counts.entry(method.status).or_insert(0) += 1;
            }
        }
        counts
    }

    /// Registers an observer. Observers run synchronously, in registration
    /// order, on the thread that sets the status.
    pub fn on_status_change(&mut self, observer: impl FnMut(&TestMethod) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Overwrites the status of a method. Returns `false` (and logs) if the
    /// path is unknown.
    pub fn set_status(&mut self, path: &str, status: Status) -> bool {
        self.apply(path, status, None)
    }

    /// Sets a terminal status together with the details of the runner's `end` record.
    pub fn record_result(&mut self, path: &str, status: Status, outcome: Outcome) -> bool {
        self.apply(path, status, Some(outcome))
    }

    fn apply(&mut self, path: &str, status: Status, outcome: Option<Outcome>) -> bool {
        let segments: Vec<&str> = path.split('.').collect();
        let method = segments
            .split_first()
            .and_then(|(first, rest)| self.modules.get_mut(*first)?.find_method_mut(rest));

        let Some(method) = method else {
            tracing::warn!(path, status = %status, "status update for unknown test method dropped");
            return false;
        };

        method.status = status;
        match outcome {
            Some(outcome) => {
                method.duration = outcome.duration;
                method.output = outcome.output;
                method.error = outcome.error;
            }
            None if status == Status::Running => {
                method.duration = None;
                method.output = None;
                method.error = None;
            }
            None => {}
        }

        for observer in self.observers.iter_mut() {
            observer(&*method);
        }
        true
    }
}
