//! Application orchestration: logging setup and subcommand execution.

use std::path::PathBuf;
use std::sync::Arc;
use anyhow::{Context, Result};
use colored::Colorize;
use log::{info, LevelFilter};

use crate::archive;
use crate::cli::{Args, Command};
use crate::clone;
use crate::config::AppConfig;
use crate::logging::{self, LogConfig, LogDestination, LogFormat};
use crate::report;
use crate::scanner::Collector;
use crate::serve;

/// Install the logger from CLI flags, falling back to the configured
/// level when no flag is given.
pub fn configure_logging(args: &Args, config: &AppConfig) -> Result<()> {
    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        logging::parse_log_level(&config.logger.level)?
    };

    let file_level = match (&args.log_file, &args.log_file_level) {
        (Some(_), Some(level)) => Some(logging::parse_log_level(level)?),
        (Some(_), None) => Some(console_level),
        (None, _) => None,
    };

    let destination = match &args.log_file {
        Some(path) => LogDestination::Both(path.clone()),
        None => LogDestination::Console,
    };

    let format: LogFormat = args.log_format.parse().map_err(anyhow::Error::msg)?;

    logging::init_logger(LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

/// Execute the selected subcommand.
pub fn run(args: Args, config: AppConfig) -> Result<()> {
    match args.command {
        None => {
            welcome();
            Ok(())
        }
        Some(Command::Clone { dir_path }) => clone::clone_workspace(dir_path.as_deref(), &config),
        Some(Command::Report {
            dir_path,
            output,
            dev_sheets,
        }) => run_report(&config, dir_path, output, dev_sheets),
        Some(Command::Zip {
            dir_path,
            dest_path,
        }) => {
            let dest = dest_path.unwrap_or_else(|| config.app.dest_dir.clone());
            let label = if config.bitbucket.workspace.is_empty() {
                dir_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "archive".to_string())
            } else {
                config.bitbucket.workspace.clone()
            };
            archive::archive_tree(&dir_path, &dest, &label).map(|_| ())
        }
        Some(Command::Serve { port }) => {
            let runtime = tokio::runtime::Runtime::new().context("Failed to start runtime")?;
            runtime.block_on(serve::serve(Arc::new(config), port))
        }
    }
}

fn run_report(
    config: &AppConfig,
    dir_path: Option<PathBuf>,
    output: Option<PathBuf>,
    dev_sheets: bool,
) -> Result<()> {
    let base = dir_path.unwrap_or_else(|| config.workspace_dir());
    let output_dir = output.unwrap_or_else(|| base.clone());

    let collector = Collector::new(config.scan_config());
    let result = collector
        .collect_branch_info(&base, 0)
        .with_context(|| format!("Failed to collect branch info under {}", base.display()))?;

    if !result.empty_repos.is_empty() {
        info!("Empty repositories: {}", result.empty_repos.join(", "));
    }

    let settings = config.report_settings(dev_sheets);
    let written = report::write_report(&result, &output_dir, &settings)?;

    println!(
        "{} {} branch records from {} repositories -> {}",
        "Report generated:".green().bold(),
        result.records.len(),
        result.processed_repos,
        output_dir.display()
    );
    for path in written {
        println!("  {}", path.display());
    }
    if !result.errors.is_empty() {
        println!(
            "{} {} repositories failed and are missing from the report",
            "Warning:".yellow().bold(),
            result.errors.len()
        );
    }
    Ok(())
}

/// Welcome screen shown when no subcommand is given.
fn welcome() {
    println!();
    println!("{}", "garchive - Bitbucket workspace backup".cyan().bold());
    println!("{}", "-".repeat(42));
    println!();
    for (command, description) in [
        ("clone", "Clone Bitbucket repositories"),
        ("report", "Generate branch report sheets"),
        ("zip", "Create a tar.gz archive of repositories"),
        ("serve", "Start the JIRA ticket HTTP shim"),
    ] {
        println!("  {:<10}{}", command.cyan(), description);
    }
    println!();
    println!("Use 'garchive <command> --help' for more information about a command.");
    println!();
}
