//! Transport seam for the statement protocol.
//!
//! The HTTP client that speaks to a coordinator lives outside this crate; it
//! plugs in by implementing [`StatementClient`].
//!
//! # Example
//!
//! ```no_run
//! use async_trait::async_trait;
//! use presto_stream::error::TransportError;
//! use presto_stream::model::{Batch, CloseRequest, CloseResponse, PollRequest, SubmitRequest};
//! use presto_stream::transport::StatementClient;
//! use tokio_util::sync::CancellationToken;
//!
//! struct MyHttpClient;
//!
//! #[async_trait]
//! impl StatementClient for MyHttpClient {
//!     async fn submit(&self, request: &SubmitRequest) -> Result<Batch, TransportError> {
//!         // POST request.query() to /v1/statement and decode the body
//!         # unimplemented!()
//!     }
//!
//!     async fn poll(&self, request: &PollRequest, cancel: &CancellationToken) -> Result<Batch, TransportError> {
//!         // GET request.next_uri(), abandoning the request when `cancel` fires
//!         # unimplemented!()
//!     }
//!
//!     async fn close(&self, request: &CloseRequest, cancel: &CancellationToken) -> Result<CloseResponse, TransportError> {
//!         // DELETE request.last_uri()
//!         # unimplemented!()
//!     }
//! }
//! ```

pub mod protocol;

pub use protocol::StatementClient;
