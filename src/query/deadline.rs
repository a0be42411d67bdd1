//! Deadline governor.
//!
//! Tracks a wall-clock budget that only advances while this crate is waiting
//! on the network (submission, continuation requests, pacing delays). Time the
//! caller spends between pulls is never charged.

use log::debug;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Budget accountant for network waits.
///
/// Exhausting the budget cancels the governor's token, a child of the
/// caller's token, so the poller ends through its ordinary cancellation path.
#[derive(Debug)]
pub struct DeadlineGovernor {
    budget: Option<Duration>,
    spent: Duration,
    token: CancellationToken,
}

impl DeadlineGovernor {
    /// Create a governor with an optional budget, linked to the caller's token.
    pub fn new(budget: Option<Duration>, parent: &CancellationToken) -> Self {
        Self {
            budget,
            spent: Duration::ZERO,
            token: parent.child_token(),
        }
    }

    /// Create a governor that never expires.
    pub fn unbounded(parent: &CancellationToken) -> Self {
        Self::new(None, parent)
    }

    /// Token cancelled by the caller or by budget exhaustion.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The configured budget.
    pub fn budget(&self) -> Option<Duration> {
        self.budget
    }

    /// Time charged so far.
    pub fn spent(&self) -> Duration {
        self.spent
    }

    /// Time left, or `None` when unbounded.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget.map(|b| b.saturating_sub(self.spent))
    }

    /// Whether the budget is exhausted.
    pub fn is_expired(&self) -> bool {
        self.remaining().is_some_and(|r| r.is_zero())
    }

    /// Await a network wait, charging its duration against the budget.
    ///
    /// Returns `None` when the budget ran out before `fut` completed; the
    /// governor's token is cancelled in that case.
    pub async fn run<F>(&mut self, fut: F) -> Option<F::Output>
    where
        F: Future,
    {
        let started = Instant::now();
        let outcome = match self.remaining() {
            None => Some(fut.await),
            Some(remaining) if remaining.is_zero() => None,
            Some(remaining) => tokio::time::timeout(remaining, fut).await.ok(),
        };
        self.spent += started.elapsed();

        if outcome.is_none() {
            debug!(
                "[DEADLINE] Budget of {:?} exhausted after {:?} of network wait",
                self.budget.unwrap_or_default(),
                self.spent
            );
            self.token.cancel();
        }
        outcome
    }
}
