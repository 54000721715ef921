// src/cli.rs
use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::{env, path::PathBuf, process::ExitCode};

use crate::infra::{logging, t};
use crate::resolve_locale;

pub mod commands;

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for `--lang <VALUE>` or `--lang=<VALUE>`.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang=").map(str::to_string))
}

fn build_cli(locale: &str) -> Command {
    Command::new("factory-runner")
        .author(env!("CARGO_PKG_AUTHORS"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help(t!("cli.log_file", locale = locale).to_string())
                .value_name("LOG_FILE")
                .global(true)
                .value_parser(clap::value_parser!(PathBuf))
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cmd.run_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(
                    Arg::new("select")
                        .short('s')
                        .long("select")
                        .help(t!("arg.select", locale = locale).to_string())
                        .value_name("PATH")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("interval-ms")
                        .long("interval-ms")
                        .help(t!("arg.interval_ms", locale = locale).to_string())
                        .value_name("MILLISECONDS")
                        .value_parser(clap::value_parser!(u64).range(1..))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("arg.html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("list")
                .about(t!("cmd.list_about", locale = locale).to_string())
                .arg(config_arg(locale)),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cmd.init_about", locale = locale).to_string())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("arg.output", locale = locale).to_string())
                        .value_name("OUTPUT")
                        .default_value("Factory.toml")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("arg.non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("force")
                        .short('f')
                        .long("force")
                        .help(t!("arg.force", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn config_arg(locale: &str) -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("arg.config", locale = locale).to_string())
        .value_name("CONFIG")
        .default_value("Factory.toml")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

/// Parses the command line and dispatches to a subcommand.
///
/// # Returns
/// The process exit code: failure when any executed method failed or any
/// module run ended abnormally.
pub async fn run() -> Result<ExitCode> {
    // Pre-parse language and initialize i18n first.
    let requested = pre_parse_language();
    let language = match &requested {
        Some(lang) => resolve_locale(lang),
        None => rust_i18n::locale().to_string(),
    };
    rust_i18n::set_locale(&language);

    let matches = build_cli(&language).get_matches();

    logging::init(matches.get_one::<PathBuf>("log-file").map(PathBuf::as_path))?;
    tracing::debug!(locale = %language, "cli started");

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let args = commands::run::RunArgs {
                config: run_matches
                    .get_one::<PathBuf>("config")
                    .cloned()
                    .unwrap_or_else(|| PathBuf::from("Factory.toml")),
                select: run_matches
                    .get_many::<String>("select")
                    .map(|values| values.cloned().collect())
                    .unwrap_or_default(),
                interval_ms: run_matches.get_one::<u64>("interval-ms").copied(),
                html: run_matches.get_one::<PathBuf>("html").cloned(),
                lang: requested,
            };
            commands::run::execute(args).await
        }
        Some(("list", list_matches)) => {
            let config = list_matches
                .get_one::<PathBuf>("config")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("Factory.toml"));
            commands::list::execute(&config, requested.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Some(("init", init_matches)) => {
            let output = init_matches
                .get_one::<PathBuf>("output")
                .cloned()
                .unwrap_or_else(|| PathBuf::from("Factory.toml"));
            let non_interactive = init_matches.get_flag("non-interactive");
            let force = init_matches.get_flag("force");

            // Show language detection message if it was auto-detected
            if requested.is_none() && !non_interactive {
                println!(
                    "{}",
                    t!("init.system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::execute(&output, &language, non_interactive, force)?;
            Ok(ExitCode::SUCCESS)
        }
        // Unreachable with `subcommand_required`; clap has already printed help.
        _ => Ok(ExitCode::SUCCESS),
    }
}
