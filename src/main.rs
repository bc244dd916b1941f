use std::process;
use anyhow::Result;
use garchive::config::AppConfig;
use garchive::{app, cli};

fn main() {
    let args = cli::parse_args();
    if let Err(err) = run(args) {
        eprintln!("Error: {err:#}");
        process::exit(1);
    }
}

fn run(args: cli::Args) -> Result<()> {
    cli::validate_args(&args)?;
    let config = AppConfig::load(args.config_file.as_deref())?;
    app::configure_logging(&args, &config)?;
    app::run(args, config)
}
