//! QueryLens Audit Log
//!
//! Table usage statistics from BigQuery job-completion audit logs:
//! - Payload decoding, with or without the log envelope
//! - Record validation with stable rejection codes
//! - Usage, co-occurrence and filter aggregation
//! - Per-table profiles for output
//!
//! Fetching log pages is left to the caller; the collector consumes
//! whatever iterator the log client provides.

pub mod payload;
pub mod logdata;
pub mod stats;
pub mod profile;
pub mod filter;
pub mod collector;

pub use payload::{AuditData, AuditLogEntry, PayloadError, TableName};
pub use logdata::{validate, JobState, LogRecord, RejectionReason};
pub use stats::{JoinDetail, JoinUsage, TableStats};
pub use profile::{JoinProfile, TableProfile};
pub use filter::{UsageWindow, WindowError};
pub use collector::{CollectError, CollectSummary, EntryOutcome, UsageCollector};
