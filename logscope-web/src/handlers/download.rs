//! Log file download handler
//!
//! Serves a remote log file as an attachment. The file is pulled from the
//! node chunk by chunk through a [`LogReader`], so downloads start before
//! the whole file has been transferred and honour `Range` requests.

use std::io::SeekFrom;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use futures::stream;
use logscope_core::{LogReader, NodeLogClient, ReadError};
use serde::Deserialize;
use tokio_util::sync::{CancellationToken, DropGuard};

use super::range::{ByteRange, extract_range_header, parse_range_header, validate_range_bounds};
use crate::server::AppState;

/// Body written when the session has no node behind it.
pub const NODE_NOT_ALLOCATED: &str = "ERROR: Node is not allocated\n";

/// Upper bound for a single body chunk.
const STREAM_CHUNK_SIZE: usize = 64 * 1024;

/// Query parameters of the download endpoint.
#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    /// File size as shown in the listing; 0 or absent when unknown.
    #[serde(default)]
    pub size: u64,
}

/// `GET /sessions/{session}/logs/{file}/download`
pub async fn download_log(
    State(state): State<AppState>,
    Path((session, file)): Path<(String, String)>,
    Query(query): Query<DownloadQuery>,
    headers: HeaderMap,
) -> Response {
    let client = state.session(&session).await;
    let cancel = state.shutdown_token().child_token();

    transmit_log_file(client.as_ref(), &session, &file, query.size, &headers, cancel).await
}

/// Streams `filename` from the node behind `client` as an HTTP response.
///
/// `cancel` stops the underlying reader. It is cancelled automatically when
/// the response body is dropped, e.g. because the client went away.
pub async fn transmit_log_file(
    client: Option<&NodeLogClient>,
    session: &str,
    filename: &str,
    size: u64,
    headers: &HeaderMap,
    cancel: CancellationToken,
) -> Response {
    let Some(client) = client else {
        tracing::warn!("Download of {} requested for unallocated session {}", filename, session);
        return plain_text(StatusCode::OK, NODE_NOT_ALLOCATED.to_string());
    };

    let guard = cancel.clone().drop_guard();
    let mut reader = client.open_reader(filename, size, cancel);

    let known_size = reader.seek(SeekFrom::End(0));
    reader.seek(SeekFrom::Start(0));

    let range = match requested_range(headers, known_size) {
        Ok(range) => range,
        Err(status) => return unsatisfiable(status, known_size),
    };

    if let Some(range) = range {
        reader.seek(SeekFrom::Start(range.start));
    }

    // First chunk goes out before the response head so early failures get a status
    let first_budget = match range {
        Some(range) => range.length(),
        None if known_size > 0 => known_size,
        None => STREAM_CHUNK_SIZE as u64,
    };
    let first = match read_piece(&mut reader, first_budget).await {
        Ok(first) => first,
        Err(e) => {
            tracing::warn!("Download of {} from session {} failed: {}", filename, session, e);
            return plain_text(StatusCode::BAD_GATEWAY, format!("ERROR: {e}\n"));
        }
    };

    let length = match range {
        Some(range) => range.length(),
        None => reader.total_size(),
    };

    tracing::info!(
        "Serving {} bytes of {} from session {}",
        length,
        filename,
        session
    );

    let mut response = Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, content_disposition(session, filename))
        .header(header::ACCEPT_RANGES, "bytes")
        .header(header::CONTENT_LENGTH, length.to_string());

    response = match range {
        Some(range) => response
            .status(StatusCode::PARTIAL_CONTENT)
            .header(header::CONTENT_RANGE, range.content_range(known_size)),
        None => response.status(StatusCode::OK),
    };

    let body = BodyState {
        remaining: length.saturating_sub(first.len() as u64),
        first: (!first.is_empty()).then_some(first),
        reader,
        failed: false,
        _guard: guard,
    };

    response
        .body(Body::from_stream(body_stream(body)))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

/// Reader state carried across body chunks.
struct BodyState {
    reader: LogReader,
    remaining: u64,
    first: Option<Bytes>,
    failed: bool,
    _guard: DropGuard,
}

fn body_stream(
    state: BodyState,
) -> impl futures::Stream<Item = Result<Bytes, ReadError>> + Send + 'static {
    stream::unfold(state, |mut state| async move {
        if let Some(first) = state.first.take() {
            return Some((Ok(first), state));
        }
        if state.failed || state.remaining == 0 {
            return None;
        }

        match read_piece(&mut state.reader, state.remaining).await {
            Ok(chunk) if chunk.is_empty() => {
                tracing::warn!(
                    "Download of {} ended at offset {} with {} bytes still announced",
                    state.reader.filename(),
                    state.reader.offset(),
                    state.remaining
                );
                state.failed = true;
                let error = ReadError::UnexpectedEof {
                    offset: state.reader.offset(),
                    missing: state.remaining,
                };
                Some((Err(error), state))
            }
            Ok(chunk) => {
                state.remaining = state.remaining.saturating_sub(chunk.len() as u64);
                Some((Ok(chunk), state))
            }
            Err(e) => {
                tracing::warn!(
                    "Aborting download of {} at offset {}: {}",
                    state.reader.filename(),
                    state.reader.offset(),
                    e
                );
                state.failed = true;
                Some((Err(e), state))
            }
        }
    })
}

/// Reads up to `budget` bytes. An empty result means the end of the file.
///
/// # Errors
/// - `ReadError::EmptyChunk` - The node sent no bytes without reaching the end
/// - Any error from [`LogReader::read`]
async fn read_piece(reader: &mut LogReader, budget: u64) -> Result<Bytes, ReadError> {
    let capacity = budget.min(STREAM_CHUNK_SIZE as u64) as usize;
    let mut buf = vec![0u8; capacity];
    let outcome = reader.read(&mut buf).await?;

    if outcome.copied == 0 && !outcome.end_of_stream {
        return Err(ReadError::EmptyChunk {
            offset: reader.offset(),
            total: reader.total_size(),
        });
    }

    buf.truncate(outcome.copied);
    Ok(Bytes::from(buf))
}

/// Resolves the Range header against `known_size`.
///
/// Ranges are ignored while the size is unknown.
fn requested_range(headers: &HeaderMap, known_size: u64) -> Result<Option<ByteRange>, StatusCode> {
    if known_size == 0 {
        return Ok(None);
    }

    extract_range_header(headers)
        .and_then(|value| parse_range_header(value, known_size))
        .map(|range| validate_range_bounds(range, known_size))
        .transpose()
}

/// `attachment; filename="<session>_<filename>"` with quoting applied.
pub(crate) fn content_disposition(session: &str, filename: &str) -> String {
    let mut escaped = String::with_capacity(session.len() + filename.len() + 1);
    for c in format!("{session}_{filename}").chars() {
        match c {
            '"' | '\\' => {
                escaped.push('\\');
                escaped.push(c);
            }
            c if c.is_control() => escaped.push('_'),
            c => escaped.push(c),
        }
    }
    format!("attachment; filename=\"{escaped}\"")
}

fn plain_text(status: StatusCode, body: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response()
}

fn unsatisfiable(status: StatusCode, total_size: u64) -> Response {
    (
        status,
        [(
            header::CONTENT_RANGE,
            HeaderValue::from_str(&format!("bytes */{total_size}"))
                .unwrap_or_else(|_| HeaderValue::from_static("bytes */0")),
        )],
    )
        .into_response()
}
