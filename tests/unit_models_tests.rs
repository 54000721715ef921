//! # Models Module Unit Tests / Models 模块单元测试
//!
//! Tests for the test tree: construction and validation, path resolution,
//! status updates and status observers.
//!
//! 测试树的单元测试：构建与校验、路径解析、状态更新以及状态观察者。

mod common;

use common::{case, module, sample_specs, sample_tree};
use factory_runner::config::ModuleSpec;
use factory_runner::models::{ModelError, NodeRef, Outcome, Status, TestTree, module_of};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[cfg(test)]
mod tree_construction_tests {
    use super::*;

    #[test]
    fn test_every_method_starts_not_run() {
        let tree = sample_tree();
        let statuses: Vec<Status> = tree
            .modules()
            .flat_map(|m| m.methods())
            .map(|m| m.status())
            .collect();
        assert_eq!(statuses.len(), 4);
        assert!(statuses.iter().all(|s| *s == Status::NotRun));
    }

    #[test]
    fn test_methods_are_in_lexicographic_order() {
        let tree = sample_tree();
        assert_eq!(
            tree.all_method_paths("auto"),
            vec![
                "auto.EEPROMTest.test_read",
                "auto.eMMCTest.test_identify",
                "auto.eMMCTest.test_read_write",
            ]
        );
        assert_eq!(tree.module_names().collect::<Vec<_>>(), vec!["auto", "manual"]);
    }

    #[test]
    fn test_nested_modules_keep_their_prefix() {
        let mut root = module("auto", vec![case("BoardTest", &["test_id"])]);
        root.modules
            .push(module("sensors", vec![case("GyroTest", &["test_axis"])]));
        let tree = TestTree::from_specs(&[root]).unwrap();

        assert_eq!(
            tree.all_method_paths("auto"),
            vec!["auto.BoardTest.test_id", "auto.sensors.GyroTest.test_axis"]
        );
        let method = tree.resolve("auto.sensors.GyroTest.test_axis").unwrap();
        assert_eq!(method.module(), "auto");
    }

    #[test]
    fn test_duplicate_module_is_rejected() {
        let specs = vec![
            module("auto", vec![case("A", &["m"])]),
            module("auto", vec![case("B", &["m"])]),
        ];
        assert_eq!(
            TestTree::from_specs(&specs).unwrap_err(),
            ModelError::Duplicate {
                path: "auto".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate_method_is_rejected() {
        let specs = vec![module("auto", vec![case("A", &["m", "m"])])];
        assert!(matches!(
            TestTree::from_specs(&specs),
            Err(ModelError::Duplicate { path }) if path == "auto.A.m"
        ));
    }

    #[test]
    fn test_case_without_methods_is_rejected() {
        let specs = vec![module("auto", vec![case("Empty", &[])])];
        assert!(matches!(
            TestTree::from_specs(&specs),
            Err(ModelError::EmptyCase { path }) if path == "auto.Empty"
        ));
    }

    #[test]
    fn test_dotted_and_empty_names_are_rejected() {
        let dotted = vec![module("auto", vec![case("a.b", &["m"])])];
        assert!(matches!(
            TestTree::from_specs(&dotted),
            Err(ModelError::DottedName { .. })
        ));

        let empty = vec![ModuleSpec {
            name: String::new(),
            text: BTreeMap::new(),
            cases: Vec::new(),
            modules: Vec::new(),
        }];
        assert!(matches!(
            TestTree::from_specs(&empty),
            Err(ModelError::EmptyName { .. })
        ));
    }
}

#[cfg(test)]
mod resolution_tests {
    use super::*;

    #[test]
    fn test_resolve_only_returns_methods() {
        let tree = sample_tree();
        assert!(tree.resolve("auto.eMMCTest.test_identify").is_some());
        assert!(tree.resolve("auto.eMMCTest").is_none());
        assert!(tree.resolve("auto").is_none());
        assert!(tree.resolve("auto.eMMCTest.test_missing").is_none());
        assert!(tree.resolve("").is_none());
    }

    #[test]
    fn test_find_returns_node_kind() {
        let tree = sample_tree();
        assert!(matches!(tree.find("manual"), Some(NodeRef::Module(_))));
        assert!(matches!(tree.find("manual.KeyTest"), Some(NodeRef::Case(_))));
        assert!(matches!(
            tree.find("manual.KeyTest.test_power_key"),
            Some(NodeRef::Method(_))
        ));
        assert!(tree.find("manual.KeyTest.test_power_key.extra").is_none());
    }

    #[test]
    fn test_expand_module_case_and_method() {
        let tree = sample_tree();
        assert_eq!(tree.expand("auto").len(), 3);
        assert_eq!(
            tree.expand("auto.eMMCTest"),
            vec!["auto.eMMCTest.test_identify", "auto.eMMCTest.test_read_write"]
        );
        assert_eq!(tree.expand("auto.EEPROMTest.test_read"), vec!["auto.EEPROMTest.test_read"]);
        assert!(tree.expand("nowhere").is_empty());
    }

    #[test]
    fn test_module_of() {
        assert_eq!(module_of("auto.eMMCTest.test_identify"), "auto");
        assert_eq!(module_of("manual"), "manual");
    }
}

#[cfg(test)]
mod status_tests {
    use super::*;

    #[test]
    fn test_set_status_on_unknown_path_is_rejected() {
        let mut tree = sample_tree();
        assert!(!tree.set_status("auto.Nope.test_x", Status::Pass));
        assert!(tree.modules().flat_map(|m| m.methods()).all(|m| m.status() == Status::NotRun));
    }

    #[test]
    fn test_record_result_keeps_details() {
        let mut tree = sample_tree();
        let path = "auto.EEPROMTest.test_read";
        assert!(tree.record_result(
            path,
            Status::Fail,
            Outcome {
                duration: Some(Duration::from_millis(250)),
                output: Some("probe said hi".to_string()),
                error: Some("AssertionError: 0 != 1".to_string()),
            },
        ));

        let method = tree.resolve(path).unwrap();
        assert_eq!(method.status(), Status::Fail);
        assert_eq!(method.duration(), Some(Duration::from_millis(250)));
        assert_eq!(method.error(), Some("AssertionError: 0 != 1"));

        // A new run clears the previous details.
        tree.set_status(path, Status::Running);
        let method = tree.resolve(path).unwrap();
        assert_eq!(method.duration(), None);
        assert_eq!(method.error(), None);
        assert_eq!(method.output(), None);
    }

    #[test]
    fn test_observers_run_in_registration_order() {
        let mut tree = sample_tree();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = seen.clone();
        tree.on_status_change(move |m| first.lock().unwrap().push(format!("1:{}", m.status())));
        let second = seen.clone();
        tree.on_status_change(move |m| second.lock().unwrap().push(format!("2:{}", m.status())));

        tree.set_status("manual.KeyTest.test_power_key", Status::Running);
        tree.set_status("manual.KeyTest.test_power_key", Status::Pass);
        tree.set_status("manual.KeyTest.missing", Status::Pass);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["1:RUNNING", "2:RUNNING", "1:PASS", "2:PASS"]
        );
    }

    #[test]
    fn test_counts_by_status() {
        let mut tree = sample_tree();
        tree.set_status("auto.eMMCTest.test_identify", Status::Pass);
        tree.set_status("auto.eMMCTest.test_read_write", Status::Error);

        let counts = tree.counts("auto");
        assert_eq!(counts.get(&Status::Pass), Some(&1));
        assert_eq!(counts.get(&Status::Error), Some(&1));
        assert_eq!(counts.get(&Status::NotRun), Some(&1));
        assert!(tree.counts("missing").is_empty());
    }

    #[test]
    fn test_status_parsing_and_classification() {
        assert_eq!("OK".parse::<Status>().unwrap(), Status::Pass);
        assert_eq!("EXPECTED_FAIL".parse::<Status>().unwrap(), Status::ExpectedFail);
        assert!("MAYBE".parse::<Status>().is_err());

        assert!(!Status::NotRun.is_terminal());
        assert!(!Status::Running.is_terminal());
        assert!(Status::Skip.is_terminal());

        assert!(Status::UnexpectedSuccess.is_failure());
        assert!(Status::Cancelled.is_failure());
        assert!(!Status::ExpectedFail.is_failure());
        assert!(!Status::Skip.is_failure());
    }
}

#[cfg(test)]
mod description_tests {
    use super::*;

    fn described_tree() -> TestTree {
        let mut specs = sample_specs();
        let method = &mut specs[0].cases[0].methods[0];
        method.text.insert("en".to_string(), "Identify device".to_string());
        method.text.insert("zh".to_string(), "识别设备".to_string());
        TestTree::from_specs(&specs).unwrap()
    }

    #[test]
    fn test_description_prefers_full_locale_then_language() {
        let tree = described_tree();
        let method = tree.resolve("auto.eMMCTest.test_identify").unwrap();
        assert_eq!(method.description("en"), "Identify device");
        assert_eq!(method.description("zh-CN"), "识别设备");
    }

    #[test]
    fn test_description_falls_back_to_name() {
        let tree = described_tree();
        let method = tree.resolve("auto.eMMCTest.test_identify").unwrap();
        assert_eq!(method.description("de"), "test_identify");

        let plain = tree.resolve("auto.eMMCTest.test_read_write").unwrap();
        assert_eq!(plain.description("en"), "test_read_write");
    }
}
