//! Batched response: one poller, three views.
//!
//! A [`BatchedResponse`] owns the single-pass poller of a query and caches the
//! batches it produces so that rows, columns and statistics can each be read
//! without re-polling. The poller is only ever driven under the cache lock, and
//! the lock is released between items so that other views can make progress.
//!
//! # Example
//!
//! ```no_run
//! use presto_stream::query::BatchedResponse;
//! use presto_stream::ClientError;
//!
//! # async fn example(response: BatchedResponse) -> Result<(), ClientError> {
//! let columns = response.columns().await?;
//! println!("{} columns", columns.len());
//!
//! let mut rows = response.rows();
//! while let Some(row) = rows.next().await? {
//!     println!("{:?}", row);
//! }
//! response.close().await;
//! # Ok(())
//! # }
//! ```

use crate::config::PollingConfig;
use crate::error::{ClientError, UsageError};
use crate::model::{Batch, Column, Stats};
use crate::transport::StatementClient;
use crate::types::{Row, ValueResolver};
use futures_util::future::BoxFuture;
use futures_util::stream::{self, Stream};
use log::{debug, trace, warn};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use super::close::CloseOutcome;
use super::poller::ContinuationPoller;
use super::results::QueryResults;

/// Everything guarded by the cache lock.
#[derive(Debug, Default)]
struct CacheState {
    /// `None` once the poller has been closed and released
    poller: Option<ContinuationPoller>,
    first_batch: Option<Arc<Batch>>,
    first_columns_batch: Option<Arc<Batch>>,
    latest_batch: Option<Arc<Batch>>,
    /// Row-bearing batches not yet handed to the rows view
    pending_rows: VecDeque<Arc<Batch>>,
    /// First batch that carried a query error
    failure: Option<Arc<Batch>>,
    closed: bool,
}

impl CacheState {
    fn absorb(&mut self, batch: &Arc<Batch>) {
        if self.first_batch.is_none() {
            self.first_batch = Some(Arc::clone(batch));
        }
        if batch.has_rows() {
            self.pending_rows.push_back(Arc::clone(batch));
        }
        if self.first_columns_batch.is_none() && batch.has_columns() {
            self.first_columns_batch = Some(Arc::clone(batch));
        }
        if self.failure.is_none() && batch.is_failed() {
            self.failure = Some(Arc::clone(batch));
        }
        self.latest_batch = Some(Arc::clone(batch));
    }

    fn failure_error(&self) -> Option<ClientError> {
        self.failure
            .as_ref()
            .and_then(|b| b.query_error())
            .map(ClientError::from)
    }
}

/// Streaming response of one query.
///
/// Share it behind an `Arc` to read different views from different tasks.
/// Dropping an open response closes the query with a blocking release; prefer
/// [`close`](Self::close) or [`scoped`](Self::scoped) in async code.
pub struct BatchedResponse {
    query_id: String,
    state: Mutex<CacheState>,
    closed: AtomicBool,
    /// Poller's token, reachable without the lock so that closing can
    /// interrupt an in-flight wait
    abort: CancellationToken,
}

impl std::fmt::Debug for BatchedResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchedResponse")
            .field("query_id", &self.query_id)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl BatchedResponse {
    /// Wrap the batch returned by submission.
    pub fn new(
        initial: Batch,
        client: Arc<dyn StatementClient>,
        config: &PollingConfig,
        cancel: &CancellationToken,
    ) -> Self {
        Self::from_poller(ContinuationPoller::new(initial, client, config, cancel))
    }

    /// Wrap a poller that has not been advanced yet.
    pub fn from_poller(poller: ContinuationPoller) -> Self {
        Self {
            query_id: poller.query_id().to_string(),
            abort: poller.governor().token().clone(),
            state: Mutex::new(CacheState {
                poller: Some(poller),
                ..Default::default()
            }),
            closed: AtomicBool::new(false),
        }
    }

    pub fn query_id(&self) -> &str {
        &self.query_id
    }

    /// Query info page reported by the first batch observed, if any.
    pub async fn info_uri(&self) -> Option<String> {
        let state = self.state.lock().await;
        state
            .first_batch
            .as_ref()
            .map(|b| b.info_uri.clone())
            .filter(|uri| !uri.is_empty())
    }

    /// Whether the query has been closed, by exhaustion or explicitly.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// View over the row-bearing batches, in server order.
    ///
    /// Each batch is handed out once across all cursors.
    pub fn batches(&self) -> BatchCursor<'_> {
        BatchCursor {
            response: self,
            started: false,
            finished: false,
        }
    }

    /// View over the typed rows.
    pub fn rows(&self) -> RowCursor<'_> {
        RowCursor {
            batches: self.batches(),
            resolver: None,
            buffered: Vec::new().into_iter(),
            offset: 0,
        }
    }

    /// The result columns, polling only as far as the first batch that
    /// carries them.
    ///
    /// # Errors
    /// Returns the query's own failure if it failed before reporting columns,
    /// `UsageError::ColumnsUnavailable` if it ended without any, or a
    /// transport error from polling.
    pub async fn columns(&self) -> Result<Vec<Column>, ClientError> {
        let mut state = self.state.lock().await;
        loop {
            if let Some(columns) = state
                .first_columns_batch
                .as_ref()
                .and_then(|b| b.columns.clone())
            {
                return Ok(columns);
            }
            if state.closed {
                return Err(state
                    .failure_error()
                    .unwrap_or_else(|| UsageError::ColumnsUnavailable.into()));
            }
            self.advance(&mut state).await?;
        }
    }

    /// Statistics of the most recent batch.
    ///
    /// # Errors
    /// Returns `UsageError::StatsUnavailable` if the query closed before any
    /// batch was observed.
    pub async fn stats(&self) -> Result<Stats, ClientError> {
        let mut state = self.state.lock().await;
        if state.latest_batch.is_none() {
            if state.closed {
                return Err(UsageError::StatsUnavailable.into());
            }
            self.advance(&mut state).await?;
        }
        state
            .latest_batch
            .as_ref()
            .map(|b| b.stats.clone())
            .ok_or_else(|| UsageError::StatsUnavailable.into())
    }

    /// Stop the query. Same as [`close`](Self::close).
    pub async fn cancel(&self) -> CloseOutcome {
        self.close().await
    }

    /// Close the query, releasing it on the server. Idempotent.
    ///
    /// A pacing delay or poll in flight on another task is interrupted
    /// first; that task then performs the release and this call reports
    /// `Skipped`.
    pub async fn close(&self) -> CloseOutcome {
        self.abort.cancel();
        let mut state = self.state.lock().await;
        self.end_iteration(&mut state).await
    }

    /// Blocking variant of [`close`](Self::close).
    pub fn close_blocking(&mut self) -> CloseOutcome {
        self.abort.cancel();
        self.closed.store(true, Ordering::Release);
        let state = self.state.get_mut();
        state.closed = true;
        match state.poller.take() {
            Some(mut poller) => poller.close_blocking(),
            None => CloseOutcome::Skipped,
        }
    }

    /// Run `f` against this response and close it afterwards, whatever `f`
    /// returned.
    ///
    /// ```no_run
    /// # use presto_stream::query::BatchedResponse;
    /// # async fn example(response: BatchedResponse) -> Result<(), presto_stream::ClientError> {
    /// let first = response
    ///     .scoped(|r| Box::pin(async move { r.rows().next().await }))
    ///     .await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn scoped<T, F>(self, f: F) -> Result<T, ClientError>
    where
        F: for<'r> FnOnce(&'r BatchedResponse) -> BoxFuture<'r, Result<T, ClientError>>,
    {
        let result = f(&self).await;
        self.close().await;
        result
    }

    /// Drain the query into memory.
    ///
    /// # Errors
    /// Fails on the first query, conversion or transport error.
    pub async fn fetch_all(&self) -> Result<QueryResults, ClientError> {
        let mut batches = Vec::new();
        let mut cursor = self.batches();
        while let Some(batch) = cursor.next().await? {
            batches.push(batch);
        }

        let columns = match self.columns().await {
            Ok(columns) => columns,
            Err(ClientError::Usage(UsageError::ColumnsUnavailable)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let mut rows = Vec::new();
        for batch in &batches {
            rows.extend(batch.typed_rows(&columns)?);
        }

        let state = self.state.lock().await;
        let last = state
            .latest_batch
            .clone()
            .ok_or(ClientError::Usage(UsageError::StatsUnavailable))?;
        debug!(
            "[RESPONSE] Query {} fetched {} rows in {} batches",
            self.query_id,
            rows.len(),
            batches.len()
        );
        Ok(QueryResults::new(columns, rows, &last))
    }

    /// Pull one batch from the poller into the cache.
    ///
    /// Ends iteration when the poller is exhausted or fails.
    async fn advance(&self, state: &mut CacheState) -> Result<Option<Arc<Batch>>, ClientError> {
        let Some(poller) = state.poller.as_mut() else {
            return Ok(None);
        };

        match poller.advance().await {
            Ok(Some(batch)) => {
                trace!(
                    "[RESPONSE] Query {} absorbed batch rows={} columns={} failed={}",
                    self.query_id,
                    batch.row_count(),
                    batch.has_columns(),
                    batch.is_failed()
                );
                state.absorb(&batch);
                Ok(Some(batch))
            }
            Ok(None) => {
                self.end_iteration(state).await;
                Ok(None)
            }
            Err(e) => {
                warn!(
                    "[RESPONSE] Query {} ended by {} error: {}",
                    self.query_id,
                    e.category(),
                    e
                );
                self.end_iteration(state).await;
                Err(e)
            }
        }
    }

    async fn end_iteration(&self, state: &mut CacheState) -> CloseOutcome {
        state.closed = true;
        self.closed.store(true, Ordering::Release);
        match state.poller.take() {
            Some(mut poller) => {
                debug!("[RESPONSE] Query {} closing", self.query_id);
                poller.close().await
            }
            None => CloseOutcome::Skipped,
        }
    }

    /// Next row-bearing batch, polling as needed.
    async fn next_row_batch(&self, state: &mut CacheState) -> Result<Option<Arc<Batch>>, ClientError> {
        loop {
            if let Some(batch) = state.pending_rows.pop_front() {
                return Ok(Some(batch));
            }
            if let Some(error) = state.failure_error() {
                self.end_iteration(state).await;
                return Err(error);
            }
            if state.closed {
                return Ok(None);
            }
            if self.advance(state).await?.is_none() {
                return Ok(None);
            }
        }
    }
}

/// Cursor over the row-bearing batches of a [`BatchedResponse`].
pub struct BatchCursor<'a> {
    response: &'a BatchedResponse,
    started: bool,
    finished: bool,
}

impl<'a> BatchCursor<'a> {
    /// Next row-bearing batch, or `None` at the end.
    ///
    /// # Errors
    /// The first call fails with `UsageError::QueryClosed` if the query was
    /// already closed. Later closes end iteration quietly. A failed query
    /// yields its remaining rows, then its error.
    pub async fn next(&mut self) -> Result<Option<Arc<Batch>>, ClientError> {
        if self.finished {
            return Ok(None);
        }

        let mut state = self.response.state.lock().await;
        if !self.started {
            self.started = true;
            if state.closed {
                self.finished = true;
                return Err(UsageError::QueryClosed.into());
            }
        }

        let result = self.response.next_row_batch(&mut state).await;
        if !matches!(result, Ok(Some(_))) {
            self.finished = true;
        }
        result
    }

    /// Adapt the cursor into a `Stream`. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Arc<Batch>, ClientError>> + 'a {
        stream::unfold(self, |mut cursor| async move {
            match cursor.next().await {
                Ok(Some(batch)) => Some((Ok(batch), cursor)),
                Ok(None) => None,
                Err(e) => Some((Err(e), cursor)),
            }
        })
    }
}

/// Cursor over the typed rows of a [`BatchedResponse`].
pub struct RowCursor<'a> {
    batches: BatchCursor<'a>,
    resolver: Option<ValueResolver>,
    buffered: std::vec::IntoIter<Row>,
    offset: usize,
}

impl<'a> RowCursor<'a> {
    /// Next typed row, or `None` at the end.
    ///
    /// # Errors
    /// Same as [`BatchCursor::next`], plus conversion errors for cells that
    /// do not match their column type.
    pub async fn next(&mut self) -> Result<Option<Row>, ClientError> {
        loop {
            if let Some(row) = self.buffered.next() {
                return Ok(Some(row));
            }

            let Some(batch) = self.batches.next().await? else {
                return Ok(None);
            };

            if self.resolver.is_none() {
                let columns = match batch.columns.clone() {
                    Some(columns) => columns,
                    None => self.batches.response.columns().await?,
                };
                self.resolver = Some(ValueResolver::for_columns(&columns)?);
            }

            if let (Some(resolver), Some(data)) = (self.resolver.as_ref(), batch.data.as_ref()) {
                let rows = data
                    .iter()
                    .enumerate()
                    .map(|(index, raw)| resolver.resolve_row(self.offset + index, raw))
                    .collect::<Result<Vec<_>, _>>()?;
                self.offset += rows.len();
                self.buffered = rows.into_iter();
            }
        }
    }

    /// Adapt the cursor into a `Stream`. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<Row, ClientError>> + 'a {
        stream::unfold(self, |mut cursor| async move {
            match cursor.next().await {
                Ok(Some(row)) => Some((Ok(row), cursor)),
                Ok(None) => None,
                Err(e) => Some((Err(e), cursor)),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QueryError, TransportError};
    use crate::model::{CloseResponse, ContinuationPointer, QueryErrorInfo};
    use crate::transport::mock::MockClient;
    use crate::types::Value;
    use futures_util::StreamExt;
    use serde_json::json;
    use std::time::Duration;

    fn batch(next: Option<&str>) -> Batch {
        Batch {
            id: "q1".to_string(),
            next_uri: next.map(ContinuationPointer::new),
            ..Default::default()
        }
    }

    fn with_columns(mut b: Batch) -> Batch {
        b.columns = Some(vec![Column::new("n", "bigint")]);
        b
    }

    fn with_rows(mut b: Batch, values: &[i64]) -> Batch {
        b.data = Some(values.iter().map(|v| vec![json!(v)]).collect());
        b
    }

    /// Client whose polls return `script` in order, then a closing acknowledgement.
    fn scripted(script: Vec<Batch>, closes: usize) -> MockClient {
        let mut client = MockClient::new();
        let mut queue = VecDeque::from(script);
        client
            .expect_poll()
            .returning(move |_, _| Ok(queue.pop_front().unwrap_or_else(|| batch(None))));
        client
            .expect_close()
            .times(closes)
            .returning(|_, _| Ok(CloseResponse::new(true)));
        client
    }

    fn response(initial: Batch, client: MockClient) -> BatchedResponse {
        let config = PollingConfig::builder()
            .check_interval(Duration::from_millis(1))
            .build()
            .unwrap();
        BatchedResponse::new(initial, Arc::new(client), &config, &CancellationToken::new())
    }

    #[tokio::test]
    async fn test_rows_skip_batches_without_data() {
        let client = scripted(
            vec![
                with_columns(batch(Some("u2"))),
                with_rows(with_columns(batch(Some("u3"))), &[1, 2]),
                batch(Some("u4")),
                with_rows(batch(None), &[3]),
            ],
            1,
        );
        let r = response(batch(Some("u1")), client);

        let mut rows = r.rows();
        let mut seen = Vec::new();
        while let Some(row) = rows.next().await.unwrap() {
            seen.push(row[0].as_i64().unwrap());
        }

        assert_eq!(seen, vec![1, 2, 3]);
        assert!(r.is_closed());
    }

    #[tokio::test]
    async fn test_columns_then_rows_without_repolling() {
        let client = scripted(
            vec![
                with_rows(with_columns(batch(Some("u2"))), &[10]),
                with_rows(batch(None), &[11]),
            ],
            1,
        );
        let r = response(batch(Some("u1")), client);

        let columns = r.columns().await.unwrap();
        assert_eq!(columns[0].name, "n");

        let batches: Vec<_> = r.batches().into_stream().collect().await;
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].as_ref().unwrap().row_count(), 1);

        // Cached.
        assert_eq!(r.columns().await.unwrap(), columns);
    }

    #[tokio::test]
    async fn test_columns_unavailable_after_exhaustion() {
        let client = scripted(vec![batch(None)], 1);
        let r = response(batch(Some("u1")), client);

        let err = r.columns().await.unwrap_err();
        assert!(matches!(err, ClientError::Usage(UsageError::ColumnsUnavailable)));
        assert!(r.is_closed());
    }

    #[tokio::test]
    async fn test_rows_after_close_is_usage_error() {
        let client = scripted(vec![], 0);
        let r = response(batch(Some("u1")), client);
        r.close().await;

        let err = r.batches().next().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot get batches: query already closed"
        );
    }

    #[tokio::test]
    async fn test_stats_reads_initial_batch() {
        let mut initial = batch(Some("u1"));
        initial.stats.state = "QUEUED".to_string();
        let client = scripted(vec![], 0);
        let r = response(initial, client);

        assert_eq!(r.stats().await.unwrap().state, "QUEUED");
        assert!(!r.is_closed());
        r.close().await;
    }

    #[tokio::test]
    async fn test_failed_query_yields_rows_then_error() {
        let mut failed = with_rows(batch(None), &[7]);
        failed.error = Some(QueryErrorInfo {
            message: "Division by zero".to_string(),
            error_code: 8,
            error_name: "DIVISION_BY_ZERO".to_string(),
            ..Default::default()
        });
        let client = scripted(vec![with_columns(batch(Some("u2"))), failed], 1);
        let r = response(batch(Some("u1")), client);

        let mut rows = r.rows();
        assert_eq!(rows.next().await.unwrap(), Some(vec![Value::BigInt(7)]));
        let err = rows.next().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Query(QueryError::Failed { code: 8, .. })
        ));
        assert!(rows.next().await.unwrap().is_none());
        assert!(r.is_closed());
    }

    #[tokio::test]
    async fn test_transport_error_closes_and_propagates() {
        let mut client = MockClient::new();
        client
            .expect_poll()
            .times(1)
            .returning(|_, _| Err(TransportError::Http {
                status: 502,
                message: "bad gateway".to_string(),
            }));
        client
            .expect_close()
            .times(1)
            .returning(|_, _| Ok(CloseResponse::new(true)));
        let r = response(batch(Some("u1")), client);

        let err = r.batches().next().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Transport(TransportError::Http { status: 502, .. })
        ));
        assert!(r.is_closed());
    }

    #[tokio::test]
    async fn test_fetch_all_collects_update_count() {
        let mut last = batch(None);
        last.update_type = Some("INSERT".to_string());
        last.update_count = Some(4);
        let client = scripted(vec![last], 1);
        let r = response(batch(Some("u1")), client);

        let results = r.fetch_all().await.unwrap();
        assert!(results.columns.is_empty());
        assert!(results.rows.is_empty());
        assert_eq!(results.update_type.as_deref(), Some("INSERT"));
        assert_eq!(results.update_count, Some(4));
    }

    #[tokio::test]
    async fn test_scoped_closes_on_error() {
        let client = scripted(vec![], 0);
        let r = response(batch(Some("u1")), client);

        let out = r
            .scoped(|_| {
                Box::pin(async { Err::<(), _>(ClientError::from(UsageError::StatsUnavailable)) })
            })
            .await;
        assert!(out.is_err());
    }
}
