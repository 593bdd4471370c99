//! Logscope CLI - Command-line interface
//!
//! Browse, download and serve the log files of remote nodes.

mod commands;

use clap::Parser;
use logscope_core::config::LogscopeConfig;
use logscope_core::tracing_setup::{CliLogLevel, init_tracing};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "logscope")]
#[command(about = "Remote node log browser and download server")]
#[command(version)]
struct Cli {
    /// Console log level; the full trace always goes to logs/
    #[arg(long, value_enum, default_value_t = CliLogLevel::Info, global = true)]
    log_level: CliLogLevel,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_file = init_tracing(cli.log_level.as_tracing_level(), None)
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing: {e}"))?;
    tracing::debug!("Writing trace log to {}", log_file.display());

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, shutting down");
            interrupt.cancel();
        }
    });

    let config = LogscopeConfig::from_env();
    if let Err(e) = commands::handle_command(cli.command, config, cancel).await {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e.user_message());
        std::process::exit(if e.is_user_error() { 2 } else { 1 });
    }

    Ok(())
}
