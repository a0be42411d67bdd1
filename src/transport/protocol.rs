//! Statement client abstraction trait.
//!
//! This module defines the `StatementClient` trait, the dependency contract
//! through which the poller talks to a coordinator. Implementations own the
//! HTTP transport, URI construction and JSON decoding.

use crate::error::TransportError;
use crate::model::{Batch, CloseRequest, CloseResponse, PollRequest, SubmitRequest};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Client for the asynchronous statement protocol.
///
/// A query error reported by the server is not a transport failure: it is
/// returned as a `Batch` whose `error` is set.
#[async_trait]
pub trait StatementClient: Send + Sync {
    /// Submit a statement and return the first batch.
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request cannot be completed.
    async fn submit(&self, request: &SubmitRequest) -> Result<Batch, TransportError>;

    /// Fetch the batch behind a continuation pointer.
    ///
    /// # Arguments
    ///
    /// * `request` - Continuation request
    /// * `cancel` - Abandons the in-flight request when cancelled
    ///
    /// # Errors
    ///
    /// Returns `TransportError` if the request fails or is cancelled.
    async fn poll(
        &self,
        request: &PollRequest,
        cancel: &CancellationToken,
    ) -> Result<Batch, TransportError>;

    /// Ask the server to release the resources of a query.
    ///
    /// Best effort: callers in this crate log and discard failures.
    async fn close(
        &self,
        request: &CloseRequest,
        cancel: &CancellationToken,
    ) -> Result<CloseResponse, TransportError>;
}
