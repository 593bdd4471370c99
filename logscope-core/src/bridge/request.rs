//! Node requests and their completion slots.
//!
//! A request travels to the dispatcher as a [`NodeRequest`]; the submitter
//! keeps the matching [`PendingRequest`]. Outcomes flow back through a
//! single-value watch slot, so every observation is one consistent
//! [`RequestState`] value rather than a set of separately locked fields.

use bytes::Bytes;
use tokio::sync::watch;

/// One dispatcher attempt at serving a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryOutcome {
    /// 1-based number of attempts the dispatcher has made so far.
    pub attempt: u32,
    /// Set when the dispatcher will not retry this request again.
    pub done: bool,
    /// Raw response body, or the node/transport error text.
    pub result: Result<Bytes, String>,
}

impl RetryOutcome {
    /// Final successful attempt.
    pub fn success(attempt: u32, payload: impl Into<Bytes>) -> Self {
        Self {
            attempt,
            done: true,
            result: Ok(payload.into()),
        }
    }

    /// Failed attempt; `done` tells the consumer whether more attempts follow.
    pub fn failure(attempt: u32, done: bool, error: impl Into<String>) -> Self {
        Self {
            attempt,
            done,
            result: Err(error.into()),
        }
    }

    /// Whether a consumer should stop waiting for further attempts.
    ///
    /// Failures become final once the dispatcher gives up or the attempt
    /// count reaches `ceiling`.
    pub fn is_final(&self, ceiling: u32) -> bool {
        self.done || self.attempt >= ceiling
    }
}

/// Observable state of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestState {
    /// No outcome yet, or a new attempt is in flight.
    #[default]
    Pending,
    /// The dispatcher published an outcome.
    Served(RetryOutcome),
}

/// Dispatcher side of a submitted request.
#[derive(Debug)]
pub struct NodeRequest {
    target: String,
    completion: watch::Sender<RequestState>,
}

impl NodeRequest {
    /// Request descriptor to send to the node, e.g. `/logs/list\n`.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Marks a new attempt as in flight, hiding any previous outcome.
    pub fn begin_attempt(&self) {
        self.completion.send_replace(RequestState::Pending);
    }

    /// Publishes the outcome of an attempt.
    pub fn resolve(&self, outcome: RetryOutcome) {
        self.completion.send_replace(RequestState::Served(outcome));
    }

    /// True once the submitter stopped watching (read cancelled or finished).
    pub fn is_orphaned(&self) -> bool {
        self.completion.is_closed()
    }
}

/// Submitter side of a request: polled until a final outcome appears.
#[derive(Debug)]
pub struct PendingRequest {
    target: String,
    completion: watch::Receiver<RequestState>,
}

impl PendingRequest {
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns a consistent copy of the current request state.
    pub fn snapshot(&self) -> RequestState {
        self.completion.borrow().clone()
    }

    /// True when the dispatcher dropped the request, so the state can no
    /// longer change.
    pub fn is_abandoned(&self) -> bool {
        self.completion.has_changed().is_err()
    }
}

/// Creates the two halves of a request for `target`.
pub fn request_pair(target: impl Into<String>) -> (NodeRequest, PendingRequest) {
    let target = target.into();
    let (sender, receiver) = watch::channel(RequestState::Pending);
    (
        NodeRequest {
            target: target.clone(),
            completion: sender,
        },
        PendingRequest {
            target,
            completion: receiver,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_request_is_pending() {
        let (_node_request, pending) = request_pair("/logs/list\n");
        assert_eq!(pending.snapshot(), RequestState::Pending);
        assert_eq!(pending.target(), "/logs/list\n");
        assert!(!pending.is_abandoned());
    }

    #[test]
    fn test_resolve_is_visible_to_submitter() {
        let (node_request, pending) = request_pair("/logs/list\n");
        node_request.resolve(RetryOutcome::success(1, "SUCCESS\n"));

        assert_eq!(
            pending.snapshot(),
            RequestState::Served(RetryOutcome::success(1, "SUCCESS\n"))
        );
    }

    #[test]
    fn test_new_attempt_hides_previous_outcome() {
        let (node_request, pending) = request_pair("/logs/list\n");
        node_request.resolve(RetryOutcome::failure(1, false, "timeout"));
        node_request.begin_attempt();

        assert_eq!(pending.snapshot(), RequestState::Pending);
    }

    #[test]
    fn test_dropped_dispatcher_side_abandons_request() {
        let (node_request, pending) = request_pair("/logs/list\n");
        drop(node_request);
        assert!(pending.is_abandoned());
    }

    #[test]
    fn test_dropped_submitter_orphans_request() {
        let (node_request, pending) = request_pair("/logs/list\n");
        drop(pending);
        assert!(node_request.is_orphaned());
    }

    #[test]
    fn test_outcome_finality() {
        assert!(RetryOutcome::success(1, "x").is_final(16));
        assert!(!RetryOutcome::failure(3, false, "e").is_final(16));
        assert!(RetryOutcome::failure(16, false, "e").is_final(16));
        assert!(RetryOutcome::failure(1, true, "e").is_final(16));
    }
}
