//! Seekable reader over a log file that lives on a remote node.
//!
//! Every [`LogReader::read`] issues one chunk request for the current offset
//! and polls it until the chunk arrives, the failure becomes final, or the
//! session is cancelled. [`LogReader::seek`] only moves the offset.

use std::io::SeekFrom;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::bridge::{BridgeError, PendingRequest, RequestChannel};
use crate::config::ProtocolConfig;
use crate::protocol::{ChunkDecode, LogChunk, ProtocolError, decode_chunk};

/// Errors returned by [`LogReader::read`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    /// The download session was cancelled while the read was in flight.
    #[error("interrupted")]
    Cancelled,

    /// The node failed the chunk request or answered with an unusable chunk.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The request never reached or never came back from the dispatcher.
    #[error(transparent)]
    Bridge(#[from] BridgeError),

    /// The node delivered zero bytes without reaching the end of the file.
    #[error("node returned an empty chunk at offset {offset} of {total}")]
    EmptyChunk {
        /// Offset the empty chunk was requested at.
        offset: u64,
        /// Total size reported alongside it.
        total: u64,
    },

    /// The file ended before the expected number of bytes was read.
    #[error("file ended at offset {offset} with {missing} bytes still expected")]
    UnexpectedEof {
        /// Offset at which the node reported the end of the file.
        offset: u64,
        /// Bytes that were expected but never delivered.
        missing: u64,
    },
}

/// Result of a successful read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes copied into the caller's buffer.
    pub copied: usize,
    /// The read reached the reported end of the file. Bytes in `copied`
    /// still have to be consumed.
    pub end_of_stream: bool,
}

/// Builds the chunk request target for `filename` at `offset`.
pub fn read_target(filename: &str, offset: u64) -> String {
    format!(
        "/logs/read?file={}&offset={offset}\n",
        urlencoding::encode(filename)
    )
}

/// Single-consumer, seekable view of one remote log file.
#[derive(Debug)]
pub struct LogReader {
    filename: String,
    total_size: u64,
    offset: u64,
    channel: RequestChannel,
    protocol: ProtocolConfig,
    cancel: CancellationToken,
}

impl LogReader {
    /// Creates a reader positioned at offset 0.
    ///
    /// `total_size` may be 0 when the size is not known yet; the first
    /// successful read fills it in.
    pub fn new(
        filename: impl Into<String>,
        total_size: u64,
        channel: RequestChannel,
        protocol: ProtocolConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            filename: filename.into(),
            total_size,
            offset: 0,
            channel,
            protocol,
            cancel,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Current read position.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Size reported by the node, or 0 while unknown.
    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    /// Reads the chunk at the current offset into `buf`.
    ///
    /// Copies at most `buf.len()` bytes and advances the offset by the
    /// amount copied. The offset is left untouched on error.
    ///
    /// # Errors
    /// - `ReadError::Cancelled` - Cancellation was observed before the chunk arrived
    /// - `ReadError::Protocol` - Final node error, malformed header or offset mismatch
    /// - `ReadError::Bridge` - Dispatcher gone, or it dropped the request unserved
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<ReadOutcome, ReadError> {
        if self.cancel.is_cancelled() {
            return Err(ReadError::Cancelled);
        }

        let pending = self
            .channel
            .submit(read_target(&self.filename, self.offset))?;
        let chunk = self.await_chunk(&pending).await?;

        self.total_size = chunk.total;
        let copied = buf.len().min(chunk.payload.len());
        buf[..copied].copy_from_slice(&chunk.payload[..copied]);
        self.offset += copied as u64;

        tracing::trace!(
            "Read {} bytes of {} ending at offset {}/{}",
            copied,
            self.filename,
            self.offset,
            chunk.total
        );

        Ok(ReadOutcome {
            copied,
            end_of_stream: self.offset == chunk.total,
        })
    }

    /// Polls `pending` until it yields a chunk or a final failure.
    async fn await_chunk(&self, pending: &PendingRequest) -> Result<LogChunk, ReadError> {
        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!("Read of {} cancelled at offset {}", self.filename, self.offset);
                return Err(ReadError::Cancelled);
            }

            // Once the dispatcher is gone, the snapshot taken after this check is final
            let abandoned = pending.is_abandoned();

            match decode_chunk(&pending.snapshot(), self.offset, self.protocol.retry_ceiling) {
                ChunkDecode::Delivered(chunk) => return Ok(chunk),
                ChunkDecode::Failed { error, terminal } if terminal || abandoned => {
                    tracing::warn!(
                        "Chunk request for {} at offset {} failed: {}",
                        self.filename,
                        self.offset,
                        error
                    );
                    return Err(error.into());
                }
                ChunkDecode::Failed { error, .. } => {
                    tracing::trace!("Waiting out transient chunk failure: {}", error);
                }
                ChunkDecode::Pending if abandoned => {
                    return Err(BridgeError::RequestAbandoned {
                        target: pending.target().to_string(),
                    }
                    .into());
                }
                ChunkDecode::Pending => {}
            }

            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(self.protocol.poll_interval) => {}
            }
        }
    }

    /// Moves the read position and returns the new absolute offset.
    ///
    /// Seeking from the end before the size is known lands on offset 0.
    /// Positions saturate at 0 and `u64::MAX`.
    pub fn seek(&mut self, position: SeekFrom) -> u64 {
        self.offset = match position {
            SeekFrom::Start(offset) => offset,
            SeekFrom::Current(delta) => self.offset.saturating_add_signed(delta),
            SeekFrom::End(delta) if self.total_size > 0 => {
                self.total_size.saturating_add_signed(delta)
            }
            SeekFrom::End(_) => 0,
        };
        self.offset
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::bridge::{RequestQueue, RetryOutcome};
    use crate::config::LogscopeConfig;

    fn test_reader(total_size: u64) -> (LogReader, RequestQueue, CancellationToken) {
        let (channel, queue) = RequestChannel::new();
        let cancel = CancellationToken::new();
        let reader = LogReader::new(
            "erigon.log",
            total_size,
            channel,
            LogscopeConfig::for_testing().protocol,
            cancel.clone(),
        );
        (reader, queue, cancel)
    }

    /// Answers the next queued request with `body`.
    fn answer_next(queue: &mut RequestQueue, body: &'static str) -> String {
        let request = queue.try_recv().expect("a request was submitted");
        let target = request.target().to_string();
        request.resolve(RetryOutcome::success(1, body));
        target
    }

    #[test]
    fn test_read_target_escapes_filename() {
        assert_eq!(
            read_target("logs/erigon 1.log", 42),
            "/logs/read?file=logs%2Ferigon%201.log&offset=42\n"
        );
    }

    #[tokio::test]
    async fn test_first_chunk_sets_total() {
        let (mut reader, mut queue, _cancel) = test_reader(0);
        let mut buf = [0u8; 4];

        let read = tokio::spawn(async move {
            let outcome = reader.read(&mut buf).await;
            (reader, buf, outcome)
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let target = answer_next(&mut queue, "SUCCESS: 0-4/10\nABCD");

        let (reader, buf, outcome) = read.await.unwrap();
        assert_eq!(target, "/logs/read?file=erigon.log&offset=0\n");
        assert_eq!(
            outcome.unwrap(),
            ReadOutcome {
                copied: 4,
                end_of_stream: false
            }
        );
        assert_eq!(&buf, b"ABCD");
        assert_eq!(reader.total_size(), 10);
        assert_eq!(reader.offset(), 4);
    }

    #[tokio::test]
    async fn test_last_chunk_signals_end_of_stream() {
        let (mut reader, mut queue, _cancel) = test_reader(10);
        reader.seek(SeekFrom::Start(6));
        let mut buf = [0u8; 10];

        let read = tokio::spawn(async move {
            let outcome = reader.read(&mut buf).await;
            (reader, buf, outcome)
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        answer_next(&mut queue, "SUCCESS: 6-10/10\nWXYZ");

        let (reader, buf, outcome) = read.await.unwrap();
        assert_eq!(
            outcome.unwrap(),
            ReadOutcome {
                copied: 4,
                end_of_stream: true
            }
        );
        assert_eq!(&buf[..4], b"WXYZ");
        assert_eq!(reader.offset(), 10);
    }

    #[tokio::test]
    async fn test_small_buffer_copies_prefix() {
        let (mut reader, mut queue, _cancel) = test_reader(0);
        let mut buf = [0u8; 2];

        let read = tokio::spawn(async move {
            let outcome = reader.read(&mut buf).await;
            (reader, buf, outcome)
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        answer_next(&mut queue, "SUCCESS: 0-4/4\nABCD");

        let (reader, buf, outcome) = read.await.unwrap();
        assert_eq!(outcome.unwrap().copied, 2);
        assert_eq!(&buf, b"AB");
        assert_eq!(reader.offset(), 2);
    }

    #[tokio::test]
    async fn test_offset_mismatch_leaves_offset_unchanged() {
        let (mut reader, mut queue, _cancel) = test_reader(20);
        reader.seek(SeekFrom::Start(4));
        let mut buf = [0u8; 8];

        let read = tokio::spawn(async move {
            let outcome = reader.read(&mut buf).await;
            (reader, outcome)
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        let request = queue.try_recv().unwrap();
        request.resolve(RetryOutcome {
            attempt: 16,
            done: false,
            result: Ok("SUCCESS: 8-12/20\nWXYZ".into()),
        });

        let (reader, outcome) = read.await.unwrap();
        assert_eq!(
            outcome.unwrap_err(),
            ReadError::Protocol(ProtocolError::OffsetMismatch {
                requested: 4,
                reported: 8
            })
        );
        assert_eq!(reader.offset(), 4);
    }

    #[tokio::test]
    async fn test_read_with_cancellation_signaled_returns_immediately() {
        let (mut reader, mut queue, cancel) = test_reader(0);
        cancel.cancel();
        let mut buf = [0u8; 4];

        let started = Instant::now();
        let outcome = reader.read(&mut buf).await;

        assert_eq!(outcome, Err(ReadError::Cancelled));
        assert!(started.elapsed() < LogscopeConfig::default().protocol.poll_interval);
        assert!(queue.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_cancellation_interrupts_poll_loop() {
        let (channel, _queue) = RequestChannel::new();
        let cancel = CancellationToken::new();
        let protocol = ProtocolConfig {
            poll_interval: Duration::from_secs(30),
            ..ProtocolConfig::default()
        };
        let mut reader = LogReader::new("erigon.log", 0, channel, protocol, cancel.clone());

        let read = tokio::spawn(async move {
            let mut buf = [0u8; 4];
            reader.read(&mut buf).await
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        let outcome = tokio::time::timeout(Duration::from_secs(1), read)
            .await
            .expect("read returned promptly")
            .unwrap();
        assert_eq!(outcome, Err(ReadError::Cancelled));
    }

    #[tokio::test]
    async fn test_unserved_drop_reports_abandoned() {
        let (mut reader, mut queue, _cancel) = test_reader(0);

        let read = tokio::spawn(async move {
            let mut buf = [0u8; 4];
            reader.read(&mut buf).await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(queue.try_recv().unwrap());

        let outcome = read.await.unwrap();
        assert!(matches!(
            outcome,
            Err(ReadError::Bridge(BridgeError::RequestAbandoned { .. }))
        ));
    }

    #[tokio::test]
    async fn test_drop_after_transient_failure_ends_read() {
        let (mut reader, mut queue, _cancel) = test_reader(0);

        let read = tokio::spawn(async move {
            let mut buf = [0u8; 4];
            reader.read(&mut buf).await
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        let request = queue.try_recv().unwrap();
        request.resolve(RetryOutcome::failure(1, false, "connection reset"));
        drop(request);

        let outcome = tokio::time::timeout(Duration::from_secs(1), read)
            .await
            .expect("read ends once the request is dropped")
            .unwrap();
        assert_eq!(
            outcome,
            Err(ReadError::Protocol(ProtocolError::Remote(
                "connection reset".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn test_read_without_dispatcher_fails() {
        let (mut reader, queue, _cancel) = test_reader(0);
        drop(queue);

        let mut buf = [0u8; 4];
        assert_eq!(
            reader.read(&mut buf).await,
            Err(ReadError::Bridge(BridgeError::DispatcherClosed))
        );
    }

    #[test]
    fn test_seek_positions() {
        let (mut reader, _queue, _cancel) = test_reader(0);

        assert_eq!(reader.seek(SeekFrom::End(0)), 0);
        assert_eq!(reader.seek(SeekFrom::Start(100)), 100);
        assert_eq!(reader.seek(SeekFrom::Current(-40)), 60);
        assert_eq!(reader.seek(SeekFrom::Current(-100)), 0);
    }

    #[tokio::test]
    async fn test_seek_from_end_after_read() {
        let (mut reader, mut queue, _cancel) = test_reader(0);
        assert_eq!(reader.seek(SeekFrom::End(-100)), 0);

        let read = tokio::spawn(async move {
            let mut buf = [0u8; 4];
            let outcome = reader.read(&mut buf).await;
            (reader, outcome)
        });
        tokio::time::sleep(Duration::from_millis(10)).await;
        answer_next(&mut queue, "SUCCESS: 0-4/5000\nABCD");

        let (mut reader, outcome) = read.await.unwrap();
        outcome.unwrap();
        assert_eq!(reader.seek(SeekFrom::End(-100)), 4900);
    }
}
