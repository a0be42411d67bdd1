//! Continuation poller.
//!
//! Drives the submit → poll → ... → close lifecycle of one query as an
//! explicit state machine over raw batches. The poller is single-pass: there
//! is no way to restart it, and callers that need a second pass must buffer.

use crate::config::PollingConfig;
use crate::error::ClientError;
use crate::model::{Batch, ContinuationPointer, PollRequest};
use crate::transport::StatementClient;
use log::{debug, trace, warn};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio_util::sync::CancellationToken;

use super::close::{close_handshake, CloseOutcome};
use super::deadline::DeadlineGovernor;

/// Lifecycle state of a [`ContinuationPoller`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// The initial batch has not been handed out yet
    NotStarted,
    /// At least one batch has been handed out
    Polling,
    /// The close handshake has been attempted; no further batches
    Closed,
}

/// Single-pass, cancellable producer of batches.
pub struct ContinuationPoller {
    client: Arc<dyn StatementClient>,
    current: Arc<Batch>,
    last_non_null_uri: Option<ContinuationPointer>,
    check_interval: Duration,
    governor: DeadlineGovernor,
    state: PollerState,
    batches_iterated: usize,
}

impl std::fmt::Debug for ContinuationPoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContinuationPoller")
            .field("query_id", &self.current.id)
            .field("state", &self.state)
            .field("last_non_null_uri", &self.last_non_null_uri)
            .field("batches_iterated", &self.batches_iterated)
            .field("client", &"<StatementClient>")
            .finish()
    }
}

impl ContinuationPoller {
    /// Create a poller whose deadline starts fresh.
    ///
    /// # Arguments
    ///
    /// * `initial` - Batch returned by submission
    /// * `client` - Client used for continuation and close requests
    /// * `config` - Pacing delay and deadline
    /// * `cancel` - Caller's cancellation signal
    pub fn new(
        initial: Batch,
        client: Arc<dyn StatementClient>,
        config: &PollingConfig,
        cancel: &CancellationToken,
    ) -> Self {
        let governor = DeadlineGovernor::new(config.client_request_timeout, cancel);
        Self::with_governor(initial, client, config.check_interval, governor)
    }

    /// Create a poller that continues charging an existing governor.
    pub fn with_governor(
        initial: Batch,
        client: Arc<dyn StatementClient>,
        check_interval: Duration,
        governor: DeadlineGovernor,
    ) -> Self {
        Self {
            client,
            current: Arc::new(initial),
            last_non_null_uri: None,
            check_interval,
            governor,
            state: PollerState::NotStarted,
            batches_iterated: 0,
        }
    }

    /// Server-assigned id of the query.
    pub fn query_id(&self) -> &str {
        &self.current.id
    }

    pub fn state(&self) -> PollerState {
        self.state
    }

    /// Number of batches handed out so far.
    pub fn batches_iterated(&self) -> usize {
        self.batches_iterated
    }

    /// Pointer the close handshake would target.
    pub fn last_non_null_uri(&self) -> Option<&ContinuationPointer> {
        self.last_non_null_uri.as_ref()
    }

    pub fn governor(&self) -> &DeadlineGovernor {
        &self.governor
    }

    /// Produce the next batch.
    ///
    /// Returns `Ok(None)` once the sequence has ended, whether by exhaustion,
    /// cancellation or deadline; the close handshake has run by then.
    ///
    /// # Errors
    /// Transport failures of a continuation request propagate unchanged. The
    /// poller stays open so the owner decides when to close.
    pub async fn advance(&mut self) -> Result<Option<Arc<Batch>>, ClientError> {
        match self.state {
            PollerState::Closed => return Ok(None),
            PollerState::NotStarted => {
                self.state = PollerState::Polling;
                self.batches_iterated += 1;
                trace!("[POLLER] Query {} yielding initial batch", self.current.id);
                return Ok(Some(Arc::clone(&self.current)));
            }
            PollerState::Polling => {}
        }

        if self.governor.token().is_cancelled() {
            debug!("[POLLER] Query {} cancelled; closing", self.current.id);
            self.close().await;
            return Ok(None);
        }

        let Some(next_uri) = self.current.next_uri.clone() else {
            debug!(
                "[POLLER] Query {} exhausted after {} batches",
                self.current.id, self.batches_iterated
            );
            self.close().await;
            return Ok(None);
        };
        let request = PollRequest::new(next_uri.clone())?;

        let token = self.governor.token().clone();
        let interval = self.check_interval;
        let paced = self
            .governor
            .run(async {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => false,
                    _ = tokio::time::sleep(interval) => true,
                }
            })
            .await;
        if paced != Some(true) {
            debug!(
                "[POLLER] Query {} cancelled during pacing delay; closing",
                self.current.id
            );
            self.close().await;
            return Ok(None);
        }

        self.last_non_null_uri = Some(next_uri);

        let client = Arc::clone(&self.client);
        let response = self.governor.run(client.poll(&request, &token)).await;
        match response {
            Some(Ok(batch)) => {
                self.current = Arc::new(batch);
                self.batches_iterated += 1;
                trace!(
                    "[POLLER] Query {} batch #{} rows={} terminal={}",
                    self.current.id,
                    self.batches_iterated,
                    self.current.row_count(),
                    self.current.is_terminal()
                );
                Ok(Some(Arc::clone(&self.current)))
            }
            Some(Err(e)) if token.is_cancelled() => {
                debug!(
                    "[POLLER] Query {} poll abandoned by cancellation: {}",
                    self.current.id, e
                );
                self.close().await;
                Ok(None)
            }
            Some(Err(e)) => {
                warn!("[POLLER] Query {} poll failed: {}", self.current.id, e);
                Err(e.into())
            }
            None => {
                debug!(
                    "[POLLER] Query {} hit its deadline after {:?} of network wait; closing",
                    self.current.id,
                    self.governor.spent()
                );
                self.close().await;
                Ok(None)
            }
        }
    }

    /// Close the poller, running the close handshake once. Idempotent.
    pub async fn close(&mut self) -> CloseOutcome {
        match self.begin_close() {
            Some(release) => release.await,
            None => CloseOutcome::Skipped,
        }
    }

    /// Blocking variant of [`close`](Self::close) for contexts that cannot suspend.
    ///
    /// Inside a multi-threaded runtime the worker is handed over with
    /// `block_in_place`; inside a current-thread runtime the release runs on
    /// a dedicated thread that is joined; outside any runtime a temporary
    /// runtime is used.
    pub fn close_blocking(&mut self) -> CloseOutcome {
        match self.begin_close() {
            Some(release) => block_on_teardown(release),
            None => CloseOutcome::Skipped,
        }
    }

    /// Mark the poller closed and return the release future, or `None` if
    /// it was already closed or nothing was ever polled.
    fn begin_close(
        &mut self,
    ) -> Option<impl Future<Output = CloseOutcome> + Send + 'static> {
        if self.state == PollerState::Closed {
            return None;
        }
        self.state = PollerState::Closed;

        let Some(last_uri) = self.last_non_null_uri.clone() else {
            debug!(
                "[POLLER] Query {} closed before polling; nothing to release",
                self.current.id
            );
            return None;
        };
        let client = Arc::clone(&self.client);
        Some(async move { close_handshake(client.as_ref(), Some(&last_uri)).await })
    }
}

impl Drop for ContinuationPoller {
    fn drop(&mut self) {
        if self.state != PollerState::Closed {
            debug!(
                "[POLLER] Query {} dropped while open; closing",
                self.current.id
            );
            self.close_blocking();
        }
    }
}

fn block_on_teardown<F>(release: F) -> CloseOutcome
where
    F: Future<Output = CloseOutcome> + Send + 'static,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::CurrentThread => {
            match std::thread::spawn(move || block_on_fresh_runtime(release)).join() {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!("[POLLER] Teardown thread panicked");
                    CloseOutcome::Failed
                }
            }
        }
        Ok(handle) => tokio::task::block_in_place(|| handle.block_on(release)),
        Err(_) => block_on_fresh_runtime(release),
    }
}

fn block_on_fresh_runtime<F>(release: F) -> CloseOutcome
where
    F: Future<Output = CloseOutcome>,
{
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime.block_on(release),
        Err(e) => {
            warn!("[POLLER] Cannot build runtime for teardown: {}", e);
            CloseOutcome::Failed
        }
    }
}
