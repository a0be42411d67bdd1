//! Close handshake.
//!
//! Tells the coordinator to release a query's resources. The target is the
//! last non-null continuation pointer the poller actually requested.

use crate::model::{CloseRequest, ContinuationPointer};
use crate::transport::StatementClient;
use log::{debug, warn};
use tokio_util::sync::CancellationToken;

/// What the handshake did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// No pointer was known, so there was nothing to release
    Skipped,
    /// The release request completed; `closed` is the server's answer
    Released { closed: bool },
    /// The release request failed; the failure was logged and discarded
    Failed,
}

impl CloseOutcome {
    /// Whether a release request was issued.
    pub fn was_attempted(&self) -> bool {
        !matches!(self, CloseOutcome::Skipped)
    }
}

/// Issue a best-effort release request against `last_uri`.
///
/// Never returns an error: teardown must not be blocked by a failed release.
/// The request runs under a fresh token so that a cancelled query can still
/// be released.
pub async fn close_handshake(
    client: &dyn StatementClient,
    last_uri: Option<&ContinuationPointer>,
) -> CloseOutcome {
    let Some(last_uri) = last_uri else {
        debug!("[CLOSE] No continuation pointer observed; nothing to release");
        return CloseOutcome::Skipped;
    };

    let request = match CloseRequest::new(last_uri.clone()) {
        Ok(request) => request,
        Err(e) => {
            warn!("[CLOSE] Cannot build release request: {}", e);
            return CloseOutcome::Failed;
        }
    };

    debug!("[CLOSE] Releasing query at {}", last_uri);
    match client.close(&request, &CancellationToken::new()).await {
        Ok(response) => {
            debug!("[CLOSE] Release acknowledged: closed={}", response.closed);
            CloseOutcome::Released {
                closed: response.closed,
            }
        }
        Err(e) => {
            warn!("[CLOSE] Release of {} failed: {}", last_uri, e);
            CloseOutcome::Failed
        }
    }
}
