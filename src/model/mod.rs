//! Protocol data model.
//!
//! This module defines the response unit of the statement protocol (`Batch`)
//! together with its parts, and the value objects passed to a `StatementClient`.
//!
//! # Overview
//!
//! - `batch` - Batch, columns, query error descriptor and warnings
//! - `stats` - Execution progress snapshot
//! - `requests` - Submit/poll/close request and response objects

pub mod batch;
pub mod requests;
pub mod stats;

pub use batch::{Batch, Column, ErrorLocationInfo, QueryErrorInfo, Warning, WarningCode};
pub use requests::{CloseRequest, CloseResponse, ContinuationPointer, PollRequest, SubmitRequest};
pub use stats::Stats;
