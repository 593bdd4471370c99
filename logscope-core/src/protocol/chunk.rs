//! Byte-chunk response decoding.
//!
//! A chunk response starts with `SUCCESS: <from>-<to>/<total>\n` followed by
//! the raw bytes of `[from, to)`. Whether a failure is worth waiting out is
//! decided by [`RetryOutcome::is_final`]; a well-formed chunk is always final.

use std::sync::LazyLock;

use bytes::Bytes;
use regex::bytes::Regex;

use super::{ProtocolError, SUCCESS_MARKER};
use crate::bridge::{RequestState, RetryOutcome};

static CHUNK_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        "^{}: ([0-9]+)-([0-9]+)/([0-9]+)$",
        regex::escape(SUCCESS_MARKER)
    ))
    .expect("chunk header pattern is valid")
});

/// A successfully decoded chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    /// End offset (exclusive) reported by the node.
    pub to: u64,
    /// Total file size reported by the node.
    pub total: u64,
    /// Bytes following the header line.
    pub payload: Bytes,
}

/// Result of examining one snapshot of a chunk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkDecode {
    /// Not served yet; poll again.
    Pending,
    /// Served, but unusable. `terminal` says whether to stop polling.
    Failed {
        error: ProtocolError,
        terminal: bool,
    },
    /// A valid chunk for the requested offset.
    Delivered(LogChunk),
}

/// Decodes a chunk request snapshot taken for `requested_offset`.
pub fn decode_chunk(state: &RequestState, requested_offset: u64, ceiling: u32) -> ChunkDecode {
    let outcome = match state {
        RequestState::Pending => return ChunkDecode::Pending,
        RequestState::Served(outcome) => outcome,
    };

    match parse_outcome(outcome, requested_offset) {
        Ok(chunk) => ChunkDecode::Delivered(chunk),
        Err(error) => ChunkDecode::Failed {
            error,
            terminal: outcome.is_final(ceiling),
        },
    }
}

fn parse_outcome(outcome: &RetryOutcome, requested_offset: u64) -> Result<LogChunk, ProtocolError> {
    let response = match &outcome.result {
        Ok(response) => response,
        Err(error) => return Err(ProtocolError::Remote(error.clone())),
    };

    let header_end = response
        .iter()
        .position(|&byte| byte == b'\n')
        .ok_or(ProtocolError::MissingHeaderLine)?;
    let header = &response[..header_end];

    let captures = CHUNK_HEADER
        .captures(header)
        .ok_or_else(|| ProtocolError::MalformedHeader {
            line: String::from_utf8_lossy(header).into_owned(),
        })?;

    let from = parse_field(&captures[1], "from")?;
    if from != requested_offset {
        return Err(ProtocolError::OffsetMismatch {
            requested: requested_offset,
            reported: from,
        });
    }
    let to = parse_field(&captures[2], "to")?;
    let total = parse_field(&captures[3], "total")?;

    Ok(LogChunk {
        to,
        total,
        payload: response.slice(header_end + 1..),
    })
}

fn parse_field(digits: &[u8], field: &'static str) -> Result<u64, ProtocolError> {
    // Digits only, so the text is ASCII; overflow is the only failure left.
    let text = String::from_utf8_lossy(digits);
    text.parse::<u64>().map_err(|_| ProtocolError::InvalidNumber {
        field,
        value: text.into_owned(),
    })
}
