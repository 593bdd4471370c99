//! Per-node facade over the request bridge.

use tokio_util::sync::CancellationToken;

use crate::bridge::{BridgeError, PendingRequest, RequestChannel, RequestState, RetryOutcome};
use crate::config::ProtocolConfig;
use crate::protocol::{LogFileListing, LogFileSnippet, decode_listing, decode_snippet};
use crate::reader::{LogReader, ReadError};

/// Request target for the node's log listing.
pub const LIST_TARGET: &str = "/logs/list\n";

/// Which end of a file a snippet is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnippetEnd {
    Head,
    Tail,
}

impl SnippetEnd {
    fn path(self) -> &'static str {
        match self {
            SnippetEnd::Head => "/logs/head",
            SnippetEnd::Tail => "/logs/tail",
        }
    }
}

/// Builds the snippet request target for `filename` at `offset`.
pub fn snippet_target(end: SnippetEnd, filename: &str, offset: u64) -> String {
    format!(
        "{}?file={}&offset={offset}\n",
        end.path(),
        urlencoding::encode(filename)
    )
}

/// Client for the log endpoints of one node.
///
/// Cheap to clone; all clones share the node's dispatcher.
#[derive(Debug, Clone)]
pub struct NodeLogClient {
    channel: RequestChannel,
    protocol: ProtocolConfig,
}

impl NodeLogClient {
    pub fn new(channel: RequestChannel, protocol: ProtocolConfig) -> Self {
        Self { channel, protocol }
    }

    /// Checks whether the node's dispatcher is still accepting requests.
    pub fn is_connected(&self) -> bool {
        self.channel.is_open()
    }

    /// Fetches and decodes the node's list of log files.
    ///
    /// # Errors
    /// - `ReadError::Protocol` - Node error text or malformed listing
    /// - `ReadError::Bridge` - Dispatcher unavailable or request dropped
    /// - `ReadError::Cancelled` - `cancel` fired while waiting
    pub async fn list_logs(&self, cancel: &CancellationToken) -> Result<LogFileListing, ReadError> {
        let (success, text) = self.fetch_text(LIST_TARGET, cancel).await?;
        Ok(decode_listing(success, &text)?)
    }

    /// Fetches a head or tail preview of `filename`.
    ///
    /// # Errors
    /// Same as [`NodeLogClient::list_logs`].
    pub async fn snippet(
        &self,
        end: SnippetEnd,
        filename: &str,
        offset: u64,
        cancel: &CancellationToken,
    ) -> Result<LogFileSnippet, ReadError> {
        let target = snippet_target(end, filename, offset);
        let (success, text) = self.fetch_text(&target, cancel).await?;
        Ok(decode_snippet(success, &text)?)
    }

    /// Opens a seekable reader over `filename`.
    ///
    /// `size` is the size known from the listing, or 0 if unknown.
    pub fn open_reader(&self, filename: &str, size: u64, cancel: CancellationToken) -> LogReader {
        LogReader::new(
            filename,
            size,
            self.channel.clone(),
            self.protocol.clone(),
            cancel,
        )
    }

    /// Submits `target` and waits for a final text outcome.
    ///
    /// Returns the success flag with the response body, or with the error
    /// text when the request failed.
    async fn fetch_text(
        &self,
        target: &str,
        cancel: &CancellationToken,
    ) -> Result<(bool, String), ReadError> {
        let pending = self.channel.submit(target)?;
        let outcome = self.await_final(&pending, cancel).await?;

        Ok(match outcome.result {
            Ok(body) => (true, String::from_utf8_lossy(&body).into_owned()),
            Err(error) => (false, error),
        })
    }

    async fn await_final(
        &self,
        pending: &PendingRequest,
        cancel: &CancellationToken,
    ) -> Result<RetryOutcome, ReadError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ReadError::Cancelled);
            }

            // Once the dispatcher is gone, the snapshot taken after this check is final
            let abandoned = pending.is_abandoned();

            match pending.snapshot() {
                RequestState::Served(outcome)
                    if abandoned
                        || outcome.result.is_ok()
                        || outcome.is_final(self.protocol.retry_ceiling) =>
                {
                    return Ok(outcome);
                }
                RequestState::Served(_) => {}
                RequestState::Pending if abandoned => {
                    return Err(BridgeError::RequestAbandoned {
                        target: pending.target().to_string(),
                    }
                    .into());
                }
                RequestState::Pending => {}
            }

            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(self.protocol.poll_interval) => {}
            }
        }
    }
}
