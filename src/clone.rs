//! Workspace cloning through the external `ghorg` tool.

use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use anyhow::{bail, Context, Result};
use log::{error, info};

use crate::config::AppConfig;

/// Clone every repository of the configured Bitbucket workspace into
/// `dir_path` (the configured clone dir when `None`). The child's stdout
/// and stderr are streamed into the log; stderr is also collected for the
/// error report.
pub fn clone_workspace(dir_path: Option<&Path>, config: &AppConfig) -> Result<()> {
    config.validate_bitbucket()?;

    let target = dir_path.unwrap_or(&config.app.clone_dir);
    info!(
        "Cloning workspace {} into {}",
        config.bitbucket.workspace,
        target.display()
    );

    let mut args = vec![
        "clone".to_string(),
        config.bitbucket.workspace.clone(),
        "--scm=bitbucket".to_string(),
        format!("--bitbucket-username={}", config.bitbucket.username),
        format!("--token={}", config.bitbucket.token),
        format!("--path={}", target.display()),
    ];
    if config.app.shallow_clone {
        args.push("--clone-depth=1".to_string());
    }
    if config.app.main_branch_only {
        args.push("--branch=master".to_string());
    }

    let mut child = Command::new("ghorg")
        .args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to start ghorg (is it installed and on PATH?)")?;

    let stdout = child.stdout.take().context("Failed to open ghorg stdout")?;
    let stderr = child.stderr.take().context("Failed to open ghorg stderr")?;

    let stdout_reader = thread::spawn(move || {
        for line in BufReader::new(stdout).lines().map_while(Result::ok) {
            info!("ghorg: {}", line.trim_end());
        }
    });
    let stderr_reader = thread::spawn(move || {
        let mut lines = Vec::new();
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            let line = line.trim_end().to_string();
            error!("ghorg: {}", line);
            lines.push(line);
        }
        lines
    });

    let status = child.wait().context("Failed to wait for ghorg")?;
    let _ = stdout_reader.join();
    let error_lines = stderr_reader.join().unwrap_or_default();

    if !status.success() {
        if error_lines.is_empty() {
            bail!("ghorg exited with {status}");
        }
        bail!("ghorg exited with {status}:\n{}", error_lines.join("\n"));
    }

    info!("Workspace {} cloned", config.bitbucket.workspace);
    Ok(())
}
