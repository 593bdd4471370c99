//! Single-shot dispatcher actor.
//!
//! Drains a [`RequestQueue`] and performs exactly one remote call per
//! request through a [`NodeTransport`]. Every outcome is published with
//! `done = true`: this dispatcher never retries, so consumers stop waiting
//! as soon as the first attempt finishes.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use super::channel::{RequestChannel, RequestQueue};
use super::request::{NodeRequest, RetryOutcome};

/// Performs one remote call against a node.
///
/// Implementations return the raw response body on success, or the error
/// text to surface to the operator.
#[async_trait]
pub trait NodeTransport: Send + Sync {
    /// Sends `target` to the node and returns its response body.
    ///
    /// # Errors
    /// Error text describing the failure, passed through to the operator verbatim.
    async fn fetch(&self, target: &str) -> Result<Bytes, String>;
}

/// Spawns the dispatcher actor for `transport` and returns its request channel.
///
/// The actor stops once every [`RequestChannel`] clone has been dropped.
pub fn spawn_dispatcher<T>(transport: T) -> RequestChannel
where
    T: NodeTransport + 'static,
{
    let (channel, queue) = RequestChannel::new();
    let transport = Arc::new(transport);

    tokio::spawn(async move {
        run_dispatch_loop(transport, queue).await;
    });

    channel
}

/// Receives requests until the queue closes, serving each on its own task.
async fn run_dispatch_loop<T>(transport: Arc<T>, mut queue: RequestQueue)
where
    T: NodeTransport + 'static,
{
    tracing::debug!("Node dispatcher started");

    while let Some(request) = queue.recv().await {
        let transport = Arc::clone(&transport);
        tokio::spawn(async move {
            serve_request(transport.as_ref(), request).await;
        });
    }

    tracing::debug!("Node dispatcher stopped");
}

async fn serve_request<T>(transport: &T, request: NodeRequest)
where
    T: NodeTransport + ?Sized,
{
    if request.is_orphaned() {
        tracing::trace!("Skipping orphaned request {:?}", request.target());
        return;
    }

    request.begin_attempt();
    let outcome = match transport.fetch(request.target()).await {
        Ok(body) => RetryOutcome::success(1, body),
        Err(error) => {
            tracing::warn!("Node request {:?} failed: {}", request.target(), error);
            RetryOutcome::failure(1, true, error)
        }
    };
    request.resolve(outcome);
}
