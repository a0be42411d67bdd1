//! Common test utilities for presto-stream integration tests.
//!
//! [`ScriptedClient`] plays the coordinator side of the statement protocol
//! from a fixed list of batches. Batch `i` points at batch `i + 1`; the last
//! one carries no continuation pointer. Every request sleeps for the
//! configured latency on the tokio clock, so tests that pause time can reason
//! about deadlines exactly.

#![allow(dead_code)]

use async_trait::async_trait;
use presto_stream::config::PollingConfig;
use presto_stream::error::TransportError;
use presto_stream::model::{
    Batch, CloseRequest, CloseResponse, Column, ContinuationPointer, PollRequest, QueryErrorInfo,
    SubmitRequest,
};
use presto_stream::query::QueryExecutor;
use presto_stream::transport::StatementClient;
use serde_json::{json, Value as JsonValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const BASE_URI: &str = "http://coordinator:8080/v1/statement/executing/20241016_000000_00001_test";

/// Pointer to batch `index` of the script.
pub fn pointer(index: usize) -> ContinuationPointer {
    ContinuationPointer::new(format!("{BASE_URI}/{index}"))
}

fn index_of(pointer: &ContinuationPointer) -> Option<usize> {
    pointer.as_str().rsplit('/').next()?.parse().ok()
}

/// Link `batches` into a continuation chain.
pub fn chain(mut batches: Vec<Batch>) -> Vec<Batch> {
    let last = batches.len().saturating_sub(1);
    for (index, batch) in batches.iter_mut().enumerate() {
        batch.id = "20241016_000000_00001_test".to_string();
        batch.next_uri = (index < last).then(|| pointer(index + 1));
    }
    batches
}

fn cell(type_tag: &str, row: usize) -> JsonValue {
    match type_tag {
        "bigint" | "integer" => json!(row),
        "double" => json!(row as f64 + 0.5),
        "boolean" => json!(row % 2 == 0),
        "date" => json!("2024-10-16"),
        _ => json!(format!("v{row}")),
    }
}

/// Script of a SELECT returning `total_rows` rows over `columns`, `page_size` rows per batch.
///
/// Shape: queued batch, planning batch with columns only, then data pages.
pub fn select_script(columns: &[(&str, &str)], total_rows: usize, page_size: usize) -> Vec<Batch> {
    let columns: Vec<Column> = columns
        .iter()
        .map(|(name, type_tag)| Column::new(*name, *type_tag))
        .collect();

    let planning = Batch {
        columns: Some(columns.clone()),
        ..state("RUNNING")
    };
    let mut batches = vec![queued(), planning];

    let mut row = 0;
    while row < total_rows {
        let end = (row + page_size).min(total_rows);
        let data = (row..end)
            .map(|r| columns.iter().map(|c| cell(&c.type_tag, r)).collect())
            .collect();
        batches.push(Batch {
            columns: Some(columns.clone()),
            data: Some(data),
            ..state("RUNNING")
        });
        row = end;
    }

    batches.push(Batch {
        columns: Some(columns),
        ..state("FINISHED")
    });
    chain(batches)
}

/// Script of a query that fails after `healthy` non-terminal batches.
pub fn failed_script(healthy: usize, error_name: &str, error_code: i32, message: &str) -> Vec<Batch> {
    let mut batches = vec![queued()];
    batches.extend((0..healthy).map(|_| state("RUNNING")));
    batches.push(Batch {
        error: Some(QueryErrorInfo {
            message: message.to_string(),
            error_code,
            error_name: error_name.to_string(),
            error_type: Some("USER_ERROR".to_string()),
            ..Default::default()
        }),
        ..state("FAILED")
    });
    chain(batches)
}

fn queued() -> Batch {
    state("QUEUED")
}

fn state(name: &str) -> Batch {
    let mut batch = Batch::default();
    batch.stats.state = name.to_string();
    batch
}

/// Fake coordinator serving a fixed script.
pub struct ScriptedClient {
    script: Vec<Batch>,
    latency: Duration,
    submits: AtomicUsize,
    polls: AtomicUsize,
    closes: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(script: Vec<Batch>) -> Self {
        Self {
            script,
            latency: Duration::ZERO,
            submits: AtomicUsize::new(0),
            polls: AtomicUsize::new(0),
            closes: Mutex::new(Vec::new()),
        }
    }

    /// Delay applied to every submit and poll.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    pub fn submits(&self) -> usize {
        self.submits.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    /// Pointers the client was asked to release, in order.
    pub fn closes(&self) -> Vec<String> {
        self.closes.lock().unwrap().clone()
    }
}

#[async_trait]
impl StatementClient for ScriptedClient {
    async fn submit(&self, _request: &SubmitRequest) -> Result<Batch, TransportError> {
        self.submits.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.latency).await;
        self.script
            .first()
            .cloned()
            .ok_or_else(|| TransportError::IoError("empty script".to_string()))
    }

    async fn poll(
        &self,
        request: &PollRequest,
        cancel: &CancellationToken,
    ) -> Result<Batch, TransportError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransportError::Cancelled),
            _ = tokio::time::sleep(self.latency) => {}
        }
        index_of(request.next_uri())
            .and_then(|index| self.script.get(index))
            .cloned()
            .ok_or_else(|| TransportError::Http {
                status: 404,
                message: format!("unknown pointer {}", request.next_uri()),
            })
    }

    async fn close(
        &self,
        request: &CloseRequest,
        _cancel: &CancellationToken,
    ) -> Result<CloseResponse, TransportError> {
        self.closes
            .lock()
            .unwrap()
            .push(request.last_uri().as_str().to_string());
        Ok(CloseResponse::new(true))
    }
}

/// Executor over `client` with the given pacing delay and deadline.
pub fn executor(
    client: &Arc<ScriptedClient>,
    check_interval: Duration,
    deadline: Option<Duration>,
) -> QueryExecutor {
    let mut builder = PollingConfig::builder().check_interval(check_interval);
    if let Some(deadline) = deadline {
        builder = builder.client_request_timeout(deadline);
    }
    let client: Arc<dyn StatementClient> = client.clone();
    QueryExecutor::new(client, builder.build().expect("valid polling config"))
}
