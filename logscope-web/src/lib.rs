//! Logscope Web - HTTP access to remote node logs

#![warn(missing_docs)]
#![warn(clippy::missing_errors_doc)]
#![deny(clippy::missing_panics_doc)]
//!
//! JSON endpoints for browsing the log files of allocated nodes, plus a
//! range-capable download endpoint that streams a file chunk by chunk.

pub mod handlers;
pub mod server;

// Re-export main types
pub use server::{AppState, build_router, run_server};
