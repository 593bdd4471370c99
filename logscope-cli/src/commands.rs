//! CLI command implementations

use std::path::{Path, PathBuf};

use clap::Subcommand;
use logscope_core::config::LogscopeConfig;
use logscope_core::protocol::format_byte_count;
use logscope_core::{
    HttpNodeTransport, LogscopeError, NodeLogClient, ReadError, Result, spawn_dispatcher,
};
use logscope_web::{AppState, run_server};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

/// Buffer size for file downloads.
const DOWNLOAD_BUFFER_SIZE: usize = 256 * 1024;

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server
    Serve {
        /// Host to bind to (defaults to LOGSCOPE_HOST or 127.0.0.1)
        #[arg(long)]
        host: Option<String>,
        /// Port to bind to (defaults to LOGSCOPE_PORT or 3000)
        #[arg(short, long)]
        port: Option<u16>,
        /// Node allocated to a session, as NAME=URL (repeatable)
        #[arg(long = "session", value_name = "NAME=URL")]
        sessions: Vec<String>,
    },
    /// List the log files of a node
    List {
        /// Base URL of the node
        #[arg(long)]
        node: String,
    },
    /// Download one log file from a node
    Download {
        /// Base URL of the node
        #[arg(long)]
        node: String,
        /// Log file name as shown by `list`
        #[arg(short, long)]
        file: String,
        /// File size if already known
        #[arg(long)]
        size: Option<u64>,
        /// Where to write the file
        #[arg(short, long)]
        output: PathBuf,
    },
}

/// Handle the CLI command
///
/// # Errors
/// Returns appropriate error based on the command that fails
pub async fn handle_command(
    command: Commands,
    config: LogscopeConfig,
    cancel: CancellationToken,
) -> Result<()> {
    match command {
        Commands::Serve {
            host,
            port,
            sessions,
        } => serve(config, host, port, &sessions, cancel).await,
        Commands::List { node } => list_logs(&config, &node, &cancel).await,
        Commands::Download {
            node,
            file,
            size,
            output,
        } => {
            let client = connect(&config, &node)?;
            let written = download_log(&client, &file, size.unwrap_or(0), &output, cancel).await?;
            println!(
                "Downloaded {} ({}) to {}",
                file,
                format_byte_count(written),
                output.display()
            );
            Ok(())
        }
    }
}

/// Run the web server with one dispatcher per session until cancelled
///
/// # Errors
/// - `LogscopeError::Configuration` - Malformed `--session` or node URL
/// - `LogscopeError::Io` - Listener could not be bound or the server failed
pub async fn serve(
    mut config: LogscopeConfig,
    host: Option<String>,
    port: Option<u16>,
    sessions: &[String],
    cancel: CancellationToken,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let state = AppState::new(cancel);
    for session in sessions {
        let (name, url) = parse_session(session)?;
        state.add_session(name, connect(&config, &url)?).await;
    }

    if sessions.is_empty() {
        tracing::warn!("No sessions configured; every request will report an unallocated node");
    }

    run_server(&config.server, state)
        .await
        .map_err(|e| LogscopeError::Io(std::io::Error::other(e)))
}

/// Print the log files of the node at `node`
///
/// # Errors
/// - `LogscopeError::Read` - Node unreachable, node error or malformed listing
pub async fn list_logs(config: &LogscopeConfig, node: &str, cancel: &CancellationToken) -> Result<()> {
    let client = connect(config, node)?;
    let listing = client.list_logs(cancel).await?;

    println!("Log files on {node}");
    println!("{:-<60}", "");

    if listing.entries.is_empty() {
        println!("No log files.");
    }
    for entry in &listing.entries {
        println!("{:<48} {:>10}", entry.filename, entry.printed_size);
    }

    Ok(())
}

/// Copy `file` from the node into `output`, returning the bytes written
///
/// # Errors
/// - `LogscopeError::Read` - Chunk request failed, was cancelled, or came back empty
/// - `LogscopeError::Io` - Output file could not be written
pub async fn download_log(
    client: &NodeLogClient,
    file: &str,
    size: u64,
    output: &Path,
    cancel: CancellationToken,
) -> Result<u64> {
    let mut reader = client.open_reader(file, size, cancel);
    let mut out = File::create(output).await?;
    let mut buf = vec![0u8; DOWNLOAD_BUFFER_SIZE];

    loop {
        let outcome = reader.read(&mut buf).await?;
        out.write_all(&buf[..outcome.copied]).await?;

        if outcome.end_of_stream {
            break;
        }
        if outcome.copied == 0 {
            return Err(ReadError::EmptyChunk {
                offset: reader.offset(),
                total: reader.total_size(),
            }
            .into());
        }
        tracing::debug!("Downloaded {}/{} bytes of {}", reader.offset(), reader.total_size(), file);
    }

    out.flush().await?;
    Ok(reader.offset())
}

/// Spawn a dispatcher talking to the node at `url`
fn connect(config: &LogscopeConfig, url: &str) -> Result<NodeLogClient> {
    let transport =
        HttpNodeTransport::new(url, &config.node).map_err(|e| LogscopeError::Configuration {
            reason: format!("cannot create client for {url}: {e}"),
        })?;
    tracing::debug!("Dispatching requests to node at {}", transport.base_url());

    Ok(NodeLogClient::new(
        spawn_dispatcher(transport),
        config.protocol.clone(),
    ))
}

/// Split a `NAME=URL` session argument
fn parse_session(session: &str) -> Result<(String, String)> {
    match session.split_once('=') {
        Some((name, url)) if !name.is_empty() && !url.is_empty() => {
            Ok((name.to_string(), url.to_string()))
        }
        _ => Err(LogscopeError::Configuration {
            reason: format!("session must be NAME=URL, got '{session}'"),
        }),
    }
}
