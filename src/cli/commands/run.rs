//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command: it loads the factory manifest,
//! starts every selected module under the run scheduler, renders progress on
//! the console and prints a summary once all runs are over.
//!
//! 此模块实现了 `run` 命令：加载工厂清单，在运行调度器下启动所有选定的模块，
//! 在控制台上渲染进度，并在所有运行结束后打印摘要。

use anyhow::{Context, Result};
use colored::*;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::{
    core::{
        config::{self, FactoryConfig},
        events::EventBus,
        execution::ExecutorState,
        models::TestTree,
        scheduler::{DriveOutcome, RunScheduler},
    },
    infra::{fs, t},
    reporting::{ConsoleReporter, generate_html_report, print_failure_details, print_summary},
    session_locale,
};

/// Arguments of the `run` subcommand.
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub config: PathBuf,
    /// Module, case or method paths. Empty means every module.
    pub select: Vec<String>,
    pub interval_ms: Option<u64>,
    pub html: Option<PathBuf>,
    /// Language requested on the command line; overrides the manifest.
    pub lang: Option<String>,
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// `ExitCode::FAILURE` if any executed method failed, or if any module run
/// ended `ERRORED` or `TERMINATED`.
pub async fn execute(args: RunArgs) -> Result<ExitCode> {
    let (factory, config_path) = setup_and_parse_config(&args.config)?;
    let locale = session_locale(args.lang.as_deref(), factory.language.as_deref());
    rust_i18n::set_locale(&locale);

    println!(
        "{}",
        t!("run.loading_manifest", locale = &locale, path = config_path.display())
    );

    let tree = TestTree::from_specs(&factory.modules)
        .with_context(|| t!("run.invalid_tree", locale = &locale).to_string())?;

    let mut bus = EventBus::new();
    ConsoleReporter::attach(&mut bus, &locale);

    let mut scheduler = RunScheduler::new(tree, bus, factory.runner.clone());

    let started = if args.select.is_empty() {
        scheduler.run_all()
    } else {
        scheduler.run_selected(&args.select)
    };

    if started.is_empty() {
        if scheduler.executors().any(|e| e.state() == ExecutorState::Errored) {
            print_failure_summary(&scheduler, &locale);
            return Ok(ExitCode::FAILURE);
        }
        println!("{}", t!("run.nothing_to_run", locale = &locale).yellow());
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "{}",
        t!("run.started_modules", locale = &locale, modules = started.join(", ")).bold()
    );

    let stop_token = setup_signal_handler(&locale);
    let interval = Duration::from_millis(args.interval_ms.unwrap_or(factory.poll_interval_ms));
    let outcome = scheduler.drive(interval, stop_token).await;
    tracing::info!(?outcome, "drive loop finished");

    print_summary(scheduler.tree(), &locale);

    if let Some(report_path) = &args.html {
        println!(
            "\n{}",
            t!("run.generating_html", locale = &locale, path = report_path.display())
        );
        if let Err(e) = generate_html_report(scheduler.tree(), report_path, &locale) {
            eprintln!("{} {:#}", t!("run.html_failed", locale = &locale).red(), e);
        }
    }

    if outcome == DriveOutcome::Cancelled || run_failed(&scheduler) {
        print_failure_summary(&scheduler, &locale);
        Ok(ExitCode::FAILURE)
    } else {
        println!("\n{}", t!("run.all_passed", locale = &locale).green().bold());
        Ok(ExitCode::SUCCESS)
    }
}

/// Sets up and parses the factory manifest.
fn setup_and_parse_config(config_path_arg: &Path) -> Result<(FactoryConfig, PathBuf)> {
    let config_path = fs::absolute_path(config_path_arg)
        .with_context(|| t!("config.read_failed", path = config_path_arg.display()).to_string())?;
    let factory = config::load_factory_config(&config_path)?;
    Ok((factory, config_path))
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", t!("run.shutdown_signal", locale = &locale).yellow());
                token_clone.cancel();
            }
            Err(e) => tracing::warn!("failed to listen for Ctrl-C: {e}"),
        }
    });

    token
}

/// Whether the session should fail the acceptance run.
fn run_failed(scheduler: &RunScheduler) -> bool {
    let method_failed = scheduler
        .tree()
        .modules()
        .flat_map(|module| module.methods())
        .any(|method| method.status().is_failure());
    let module_failed = scheduler.executors().any(|executor| {
        matches!(
            executor.state(),
            ExecutorState::Errored | ExecutorState::Terminated
        )
    });
    method_failed || module_failed
}

fn print_failure_summary(scheduler: &RunScheduler, locale: &str) {
    print_failure_details(scheduler.tree(), locale);
    for state in [ExecutorState::Errored, ExecutorState::Terminated] {
        let modules = scheduler.modules_in_state(state);
        if !modules.is_empty() {
            println!(
                "{}",
                t!(
                    "run.modules_in_state",
                    locale = locale,
                    state = state,
                    modules = modules.join(", ")
                )
                .red()
            );
        }
    }
    println!("\n{}", t!("run.failed", locale = locale).red().bold());
}
