//! HTTP request handlers organized by functionality

pub mod download;
pub mod logs;
pub mod range;

// Re-export handler functions
pub use download::{DownloadQuery, NODE_NOT_ALLOCATED, download_log, transmit_log_file};
pub use logs::{OffsetQuery, health, list_logs, log_head, log_tail};
pub use range::{ByteRange, extract_range_header, parse_range_header, validate_range_bounds};
