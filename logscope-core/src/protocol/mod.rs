//! Decoders for the three text responses a node emits for log access.
//!
//! All decoders are pure. Text responses (list and snippet) come with a
//! transport success flag: when it is false the body is the node's error
//! text and is surfaced verbatim without any parsing. Chunk responses are
//! decoded from a snapshot of a pending bridge request.

pub mod chunk;
pub mod listing;
pub mod snippet;

use thiserror::Error;

pub use chunk::{ChunkDecode, LogChunk, decode_chunk};
pub use listing::{LogFileEntry, LogFileListing, decode_listing, format_byte_count};
pub use snippet::{LogFileSnippet, decode_snippet};

/// Marker the node puts at the start of the first line of every successful response.
pub const SUCCESS_MARKER: &str = "SUCCESS";

/// Errors produced while decoding node responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The node (or the transport) reported a failure; text is passed through as received.
    #[error("{0}")]
    Remote(String),

    /// Listing response is shorter than the marker line plus a body.
    #[error("incorrect response (length of lines should be at least 2): {lines:?}")]
    TooFewLines {
        /// Lines of the rejected response.
        lines: Vec<String>,
    },

    /// First line of a listing response does not carry the success marker.
    #[error("incorrect response (first line needs to be SUCCESS): {first_line}")]
    MissingSuccessMarker {
        /// The offending first line.
        first_line: String,
    },

    /// A listing line does not split into filename and size.
    #[error("incorrect response line (need to have 2 terms divided by |): {line}")]
    MalformedListLine {
        /// The offending line, verbatim.
        line: String,
    },

    /// A listing size field is not a base-10 u64.
    #[error("incorrect size in line {line}: {size}")]
    InvalidSize {
        /// The line carrying the bad size, verbatim.
        line: String,
        /// The size field that failed to parse.
        size: String,
    },

    /// Chunk response has no newline terminating its header line.
    #[error("could not find first line in log part response")]
    MissingHeaderLine,

    /// Chunk header line is not `SUCCESS: <from>-<to>/<total>`.
    #[error("first line needs to have format SUCCESS: from-to/total, was [{line}]")]
    MalformedHeader {
        /// The header line as received (lossy UTF-8).
        line: String,
    },

    /// A chunk header field matched the digit pattern but does not fit a u64.
    #[error("parsing {field}: invalid number {value}")]
    InvalidNumber {
        /// Which header field failed (`from`, `to` or `total`).
        field: &'static str,
        /// Field text as received.
        value: String,
    },

    /// The node answered for a different offset than was requested.
    #[error("unexpected chunk offset: requested {requested}, node reported {reported}")]
    OffsetMismatch {
        /// Offset the reader asked for.
        requested: u64,
        /// `from` value in the response header.
        reported: u64,
    },
}
