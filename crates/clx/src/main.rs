//! clx - command launcher
//!
//! Runs the requested command and, on the way out, offers any self-update
//! that became available while the command was running.

use anyhow::{Context, Result};
use clap::Parser;
use clx::updater::{SelfUpdater, UpdateError, UpdaterConfig};
use clx_common::DebugFlags;
use std::process::{Command, ExitCode};
use std::time::Duration;
use tracing::{warn, Level};

const LATEST_VERSION_URL: &str = "https://downloads.clx.sh/version.json";
const DOWNLOAD_ROOT_URL: &str = "https://downloads.clx.sh";
const CHECK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "clx", version, about = "Run a command through the clx launcher")]
struct Cli {
    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Command to launch
    command: String,

    /// Arguments passed through to the command
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::WARN })
        .init();

    let flags = DebugFlags::load();
    let mut updater = SelfUpdater::new(UpdaterConfig {
        binary_name: "clx".to_string(),
        current_version: env!("CARGO_PKG_VERSION").to_string(),
        latest_version_url: LATEST_VERSION_URL.to_string(),
        download_root_url: DOWNLOAD_ROOT_URL.to_string(),
        timeout: CHECK_TIMEOUT,
        force_self_update: flags.force_self_update,
    });
    updater.start_check();

    let status = Command::new(&cli.command)
        .args(&cli.args)
        .status()
        .with_context(|| format!("failed to launch {}", cli.command))?;

    // A declined or failed update never changes the child's exit status.
    match updater.run_update().await {
        Ok(()) => {}
        Err(UpdateError::Aborted) => {}
        Err(err) => warn!("self-update did not complete: {err}"),
    }

    Ok(match status.code() {
        Some(code) => ExitCode::from(code as u8),
        None => ExitCode::FAILURE,
    })
}
