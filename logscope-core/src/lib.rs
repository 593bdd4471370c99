//! Logscope Core - remote node log access
//!
//! This crate provides the protocol client used to browse and download log
//! files that live on a remote node: decoders for the node's text responses,
//! the asynchronous request bridge to a dispatcher, and a seekable reader
//! that turns chunked requests into a byte stream.

pub mod bridge;
pub mod client;
pub mod config;
pub mod protocol;
pub mod reader;
pub mod tracing_setup;
pub mod transport;

// Re-export main types for convenient access
pub use bridge::{BridgeError, NodeTransport, RequestChannel, spawn_dispatcher};
pub use client::{NodeLogClient, SnippetEnd};
pub use config::LogscopeConfig;
pub use protocol::ProtocolError;
pub use reader::{LogReader, ReadError, ReadOutcome};
pub use transport::HttpNodeTransport;

/// Core errors that can bubble up from any Logscope subsystem.
#[derive(Debug, thiserror::Error)]
pub enum LogscopeError {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl LogscopeError {
    /// Returns a user-friendly error message suitable for display.
    pub fn user_message(&self) -> String {
        match self {
            LogscopeError::Protocol(ProtocolError::Remote(text))
            | LogscopeError::Read(ReadError::Protocol(ProtocolError::Remote(text))) => {
                format!("Node reported: {text}")
            }
            LogscopeError::Protocol(e) | LogscopeError::Read(ReadError::Protocol(e)) => {
                format!("Unexpected response from node: {e}")
            }
            LogscopeError::Bridge(_) | LogscopeError::Read(ReadError::Bridge(_)) => {
                "Node is not reachable".to_string()
            }
            LogscopeError::Read(ReadError::Cancelled) => "Operation was interrupted".to_string(),
            LogscopeError::Read(e) => format!("Download failed: {e}"),
            LogscopeError::Configuration { reason } => format!("Configuration error: {reason}"),
            LogscopeError::Io(_) => "File system error occurred".to_string(),
        }
    }

    /// Checks if this error is due to user input validation.
    pub fn is_user_error(&self) -> bool {
        matches!(self, LogscopeError::Configuration { .. })
    }
}

pub type Result<T> = std::result::Result<T, LogscopeError>;
