//! Statement submission.

use crate::config::PollingConfig;
use crate::error::{ClientError, QueryError, TransportError};
use crate::model::SubmitRequest;
use crate::transport::StatementClient;
use log::debug;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::batched::BatchedResponse;
use super::deadline::DeadlineGovernor;
use super::poller::ContinuationPoller;
use super::results::QueryResults;

/// Submits statements and wraps their responses.
#[derive(Clone)]
pub struct QueryExecutor {
    client: Arc<dyn StatementClient>,
    config: PollingConfig,
}

impl std::fmt::Debug for QueryExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryExecutor")
            .field("config", &self.config)
            .field("client", &"<StatementClient>")
            .finish()
    }
}

impl QueryExecutor {
    pub fn new(client: Arc<dyn StatementClient>, config: PollingConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &PollingConfig {
        &self.config
    }

    /// Submit `query` and return its streaming response.
    ///
    /// The deadline starts with submission and keeps running through every
    /// poll of the returned response.
    ///
    /// # Errors
    /// - `ArgumentError::EmptyQuery` for a blank statement
    /// - `QueryError::Timeout` if the deadline expires before the first batch
    /// - `TransportError` if submission fails or `cancel` fires first
    pub async fn execute_batched(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchedResponse, ClientError> {
        let request = SubmitRequest::new(query)?;
        let mut governor = DeadlineGovernor::new(self.config.client_request_timeout, cancel);
        let token = governor.token().clone();

        let client = Arc::clone(&self.client);
        let submitted = governor
            .run(async {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(TransportError::Cancelled),
                    result = client.submit(&request) => result,
                }
            })
            .await;

        let initial = match submitted {
            Some(result) => result?,
            None => {
                let timeout_ms = governor
                    .budget()
                    .map_or(0, |b| u64::try_from(b.as_millis()).unwrap_or(u64::MAX));
                return Err(QueryError::Timeout { timeout_ms }.into());
            }
        };
        debug!(
            "[EXECUTOR] Query {} submitted; state={}",
            initial.id, initial.stats.state
        );

        let poller = ContinuationPoller::with_governor(
            initial,
            Arc::clone(&self.client),
            self.config.check_interval,
            governor,
        );
        Ok(BatchedResponse::from_poller(poller))
    }

    /// Submit `query` and collect every row.
    pub async fn execute(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<QueryResults, ClientError> {
        let response = self.execute_batched(query, cancel).await?;
        let results = response.fetch_all().await;
        response.close().await;
        results
    }
}
