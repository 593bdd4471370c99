//! Hand-off queue between request submitters and a dispatcher.

use tokio::sync::mpsc;

use super::BridgeError;
use super::request::{NodeRequest, PendingRequest, request_pair};

/// Receiving end consumed by a dispatcher.
pub type RequestQueue = mpsc::UnboundedReceiver<NodeRequest>;

/// Cloneable handle for submitting requests to one node's dispatcher.
///
/// The queue is unbounded so submission never waits; pacing requests is
/// the dispatcher's business.
#[derive(Debug, Clone)]
pub struct RequestChannel {
    sender: mpsc::UnboundedSender<NodeRequest>,
}

impl RequestChannel {
    /// Creates a channel and the queue a dispatcher should drain.
    pub fn new() -> (Self, RequestQueue) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    /// Enqueues a request for `target` and returns the handle to poll.
    ///
    /// # Errors
    /// - `BridgeError::DispatcherClosed` - The dispatcher dropped its queue
    pub fn submit(&self, target: impl Into<String>) -> Result<PendingRequest, BridgeError> {
        let (node_request, pending) = request_pair(target);
        tracing::trace!("Submitting node request {:?}", pending.target());

        self.sender
            .send(node_request)
            .map_err(|_| BridgeError::DispatcherClosed)?;

        Ok(pending)
    }

    /// Checks whether a dispatcher is still receiving requests.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }
}
