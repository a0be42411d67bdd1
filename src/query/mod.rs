//! Query execution and result handling.
//!
//! This module drives a statement from submission to release.
//!
//! # Overview
//!
//! The query module is organized into:
//! - `executor` - Statement validation and submission
//! - `poller` - Continuation polling state machine over raw batches
//! - `close` - Best-effort release of server resources
//! - `deadline` - Budget accounting for network waits
//! - `batched` - Shared cache exposing rows, columns and statistics views
//! - `results` - Fully materialized results
//!
//! # Example
//!
//! ```no_run
//! use presto_stream::config::PollingConfig;
//! use presto_stream::query::QueryExecutor;
//! use presto_stream::transport::StatementClient;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(client: Arc<dyn StatementClient>) -> Result<(), Box<dyn std::error::Error>> {
//! let executor = QueryExecutor::new(client, PollingConfig::default());
//! let response = executor
//!     .execute_batched("SELECT * FROM orders", &CancellationToken::new())
//!     .await?;
//!
//! let mut batches = response.batches();
//! while let Some(batch) = batches.next().await? {
//!     println!("Batch rows: {}", batch.row_count());
//! }
//! response.close().await;
//! # Ok(())
//! # }
//! ```

pub mod batched;
pub mod close;
pub mod deadline;
pub mod executor;
pub mod poller;
pub mod results;

// Re-export commonly used types
pub use batched::{BatchCursor, BatchedResponse, RowCursor};
pub use close::{close_handshake, CloseOutcome};
pub use deadline::DeadlineGovernor;
pub use executor::QueryExecutor;
pub use poller::{ContinuationPoller, PollerState};
pub use results::QueryResults;
