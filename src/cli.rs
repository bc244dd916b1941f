//! Command-line surface.

use clap::{Parser, Subcommand};
use anyhow::Result;
use std::path::PathBuf;
use log::debug;

/// Bitbucket workspace backup and reporting tool
#[derive(Parser, Debug)]
#[command(name = "garchive")]
#[command(about = "A Bitbucket workspace backup tool: clone repositories, mine per-branch ownership statistics, archive the tree")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Verbose output (debug level logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE", global = true)]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE", global = true)]
    pub config_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Clone all repositories of the configured Bitbucket workspace
    Clone {
        /// Directory to clone into (default: configured clone dir)
        #[arg(short = 'p', long = "dir-path", value_name = "DIR")]
        dir_path: Option<PathBuf>,
    },

    /// Collect branch statistics and render report sheets
    Report {
        /// Directory of cloned repositories (default: configured
        /// workspace dir)
        #[arg(short = 'p', long = "dir-path", value_name = "DIR")]
        dir_path: Option<PathBuf>,

        /// Directory the sheets are written to (default: the scanned
        /// directory)
        #[arg(short = 'o', long = "output", value_name = "DIR")]
        output: Option<PathBuf>,

        /// Also write one sheet per developer
        #[arg(short = 'd', long = "dev-sheets")]
        dev_sheets: bool,
    },

    /// Create a timestamped tar.gz archive of a directory tree
    Zip {
        /// Source path to archive
        #[arg(short = 'p', long = "dir-path", value_name = "DIR")]
        dir_path: PathBuf,

        /// Destination directory for the archive (default: configured
        /// dest dir)
        #[arg(short = 'd', long = "dest-path", value_name = "DIR")]
        dest_path: Option<PathBuf>,
    },

    /// Start the JIRA ticket-creation HTTP shim
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8081)]
        port: u16,
    },
}

pub fn parse_args() -> Args {
    Args::parse()
}

/// Validate flag combinations that clap cannot express.
pub fn validate_args(args: &Args) -> Result<()> {
    debug!("Validating CLI argument combinations");

    let log_flags = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();
    if log_flags > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    args.log_format
        .parse::<crate::logging::LogFormat>()
        .map_err(anyhow::Error::msg)?;

    if let Some(ref level) = args.log_file_level {
        crate::logging::parse_log_level(level)?;
    }
    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    Ok(())
}
