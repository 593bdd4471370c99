//! Asynchronous request bridge between log consumers and a node dispatcher.
//!
//! Consumers submit request targets through a [`RequestChannel`] and poll the
//! returned [`PendingRequest`]. A dispatcher drains the queue, talks to the
//! node and publishes [`RetryOutcome`]s. The bridge itself neither retries
//! nor parses anything.

pub mod channel;
pub mod dispatcher;
pub mod request;

use thiserror::Error;

pub use channel::{RequestChannel, RequestQueue};
pub use dispatcher::{NodeTransport, spawn_dispatcher};
pub use request::{NodeRequest, PendingRequest, RequestState, RetryOutcome, request_pair};

/// Errors raised by the request plumbing itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// No dispatcher is draining the request queue anymore.
    #[error("node dispatcher is not running")]
    DispatcherClosed,

    /// The dispatcher dropped a request without ever serving it.
    #[error("node request {target:?} was dropped before being served")]
    RequestAbandoned {
        /// Target of the abandoned request.
        target: String,
    },
}
