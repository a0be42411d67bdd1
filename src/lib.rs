//! # presto-stream
//!
//! Client-side core of the Presto/Trino asynchronous statement protocol.
//!
//! A statement is submitted once; the server answers with a batch carrying an
//! optional continuation pointer, and the client keeps polling that pointer
//! until it disappears. This library turns that sequence into a cancellable,
//! deadline-bounded stream, caches it so that rows, columns and statistics
//! can be read independently, and always tells the server to release the query
//! when the stream is done with.
//!
//! HTTP is not done here: plug a client in through [`transport::StatementClient`].
//!
//! ## Example
//!
//! ```no_run
//! # use presto_stream::*;
//! # use std::sync::Arc;
//! # use tokio_util::sync::CancellationToken;
//! # async fn example(client: Arc<dyn StatementClient>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = PollingConfig::from_env()?;
//! let executor = QueryExecutor::new(client, config);
//!
//! let response = executor
//!     .execute_batched("SELECT name, price FROM items", &CancellationToken::new())
//!     .await?;
//!
//! let columns = response.columns().await?;
//! let mut rows = response.rows();
//! while let Some(row) = rows.next().await? {
//!     println!("{}: {:?}", columns[0].name, row[0]);
//! }
//!
//! response.close().await;
//! # Ok(())
//! # }
//! ```

// Module declarations
pub mod config;
pub mod error;
pub mod model;
pub mod query;
pub mod transport;
pub mod types;

// Re-export public API
pub use config::PollingConfig;
pub use error::{
    ArgumentError, ClientError, ConversionError, QueryError, TransportError, UsageError,
};
pub use model::{Batch, Column, ContinuationPointer, Stats};
pub use query::{BatchedResponse, ContinuationPoller, QueryExecutor, QueryResults};
pub use transport::StatementClient;
pub use types::{EngineType, Row, Value};
