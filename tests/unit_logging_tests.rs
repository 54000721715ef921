//! # Logging Module Unit Tests / Logging 模块单元测试
//!
//! Installing the subscriber more than once must not fail.
//!
//! 多次安装日志订阅者不应失败。

use factory_runner::infra::logging;
use tempfile::tempdir;

#[test]
fn test_second_init_keeps_first_subscriber() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("logs").join("station.log");

    logging::init(None).unwrap();
    logging::init(Some(&log_path)).unwrap();

    // The file is opened even though the first subscriber stays installed.
    assert!(log_path.exists());
}
