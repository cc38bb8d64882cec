//! Aggregation over a stream of raw audit-log entries
//!
//! The stream is whatever the log client yields, one JSON entry at a time.
//! A failing stream aborts collection; a bad entry is logged and skipped.

use querylens_core::UsageConfig;
use querylens_sql::ConditionExtractor;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::filter::{UsageWindow, WindowError};
use crate::logdata::{validate, RejectionReason};
use crate::payload::{AuditData, PayloadError};
use crate::stats::TableStats;

/// Counts of what happened to each entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectSummary {
    pub accepted: usize,

    /// Rejected entries by rejection code
    pub rejected: BTreeMap<&'static str, usize>,

    pub undecodable: usize,
}

impl CollectSummary {
    pub fn total_rejected(&self) -> usize {
        self.rejected.values().sum()
    }

    pub fn total(&self) -> usize {
        self.accepted + self.total_rejected() + self.undecodable
    }

    fn reject(&mut self, reason: &RejectionReason) {
        *self.rejected.entry(reason.code()).or_insert(0) += 1;
    }
}

/// Errors that stop collection
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("error iterating log entries: {0}")]
    Source(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Outcome of handling a single entry
#[derive(Debug)]
pub enum EntryOutcome {
    Accepted,
    Rejected(RejectionReason),
    Undecodable(PayloadError),
}

/// Builds [`TableStats`] from raw entries
#[derive(Debug, Clone)]
pub struct UsageCollector {
    extractor: Option<ConditionExtractor>,
    period_in_day: i64,
}

impl UsageCollector {
    pub fn new(config: &UsageConfig) -> Self {
        Self {
            extractor: config.extract_conditions.then(ConditionExtractor::new),
            period_in_day: config.usage_period_in_day,
        }
    }

    /// Window ending now, sized by the configured period
    pub fn window(&self) -> Result<UsageWindow, WindowError> {
        UsageWindow::last_days(self.period_in_day)
    }

    /// Drain `entries` into fresh statistics.
    ///
    /// Returns on the first stream error; everything aggregated so far is
    /// dropped since the window would be incomplete.
    pub fn collect<I, E>(&self, entries: I) -> Result<(TableStats, CollectSummary), CollectError>
    where
        I: IntoIterator<Item = Result<Value, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        let mut stats = TableStats::new();
        let mut summary = CollectSummary::default();

        for entry in entries {
            let entry = entry.map_err(|e| CollectError::Source(Box::new(e)))?;

            match self.process(&mut stats, &entry) {
                EntryOutcome::Accepted => summary.accepted += 1,
                EntryOutcome::Rejected(reason) => {
                    tracing::warn!(code = reason.code(), "error populating logdata: {reason}");
                    summary.reject(&reason);
                }
                EntryOutcome::Undecodable(err) => {
                    tracing::warn!("error parsing log entry payload: {err}");
                    summary.undecodable += 1;
                }
            }
        }

        tracing::info!(
            accepted = summary.accepted,
            rejected = summary.total_rejected(),
            undecodable = summary.undecodable,
            tables = stats.table_usage().len(),
            "collected table usage"
        );

        Ok((stats, summary))
    }

    /// Decode, validate and aggregate one entry
    pub fn process(&self, stats: &mut TableStats, entry: &Value) -> EntryOutcome {
        let data = match AuditData::from_entry(entry) {
            Ok(data) => data,
            Err(err) => return EntryOutcome::Undecodable(err),
        };

        let record = match validate(&data) {
            Ok(record) => record,
            Err(reason) => return EntryOutcome::Rejected(reason),
        };

        match (&self.extractor, record.sql()) {
            (Some(extractor), Some(sql)) => {
                let conditions = extractor.extract(sql);
                stats.populate_with_conditions(&record, &conditions);
            }
            _ => stats.populate(&record),
        }

        EntryOutcome::Accepted
    }
}

impl Default for UsageCollector {
    fn default() -> Self {
        Self::new(&UsageConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, thiserror::Error)]
    #[error("page fetch failed")]
    struct PageError;

    fn entry(tables: &[&str], state: &str, sql: &str) -> Value {
        let tables: Vec<Value> = tables
            .iter()
            .map(|t| json!({ "projectId": "p", "datasetId": "d", "tableId": t }))
            .collect();

        json!({
            "protoPayload": { "serviceData": {
                "jobCompletedEvent": { "job": {
                    "jobConfiguration": { "query": { "query": sql } },
                    "jobStatus": { "state": state },
                    "jobStatistics": { "referencedTables": tables }
                } }
            } }
        })
    }

    #[test]
    fn skips_bad_entries() {
        let entries: Vec<Result<Value, PageError>> = vec![
            Ok(entry(&["a", "b"], "DONE", "select * from p.d.a join p.d.b on a.k = b.k")),
            Ok(entry(&["a"], "RUNNING", "")),
            Ok(json!({ "protoPayload": {} })),
            Ok(entry(&["a"], "DONE", "select * from p.d.a where x = 1")),
        ];

        let (stats, summary) = UsageCollector::default().collect(entries).unwrap();

        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected.get("JOB_NOT_DONE"), Some(&1));
        assert_eq!(summary.undecodable, 1);
        assert_eq!(summary.total(), 4);

        assert_eq!(stats.usage("p.d.a"), 2);
        assert_eq!(stats.usage("p.d.b"), 1);
        let detail = stats.join_usage().detail("p.d.a", "p.d.b").unwrap();
        assert!(detail.conditions.contains("on a.k = b.k"));
        assert!(stats.filter_conditions()["p.d.a"].contains("where x = 1"));
    }

    #[test]
    fn stream_error_aborts() {
        let entries: Vec<Result<Value, PageError>> =
            vec![Ok(entry(&["a"], "DONE", "select 1")), Err(PageError)];

        let err = UsageCollector::default().collect(entries).unwrap_err();
        assert_eq!(err.to_string(), "error iterating log entries: page fetch failed");
    }

    #[test]
    fn conditions_can_be_disabled() {
        let config = UsageConfig {
            extract_conditions: false,
            ..UsageConfig::default()
        };
        let collector = UsageCollector::new(&config);

        let mut stats = TableStats::new();
        let outcome = collector.process(
            &mut stats,
            &entry(&["a", "b"], "DONE", "select * from p.d.a join p.d.b on a.k = b.k"),
        );

        assert!(matches!(outcome, EntryOutcome::Accepted));
        assert!(stats.join_usage().detail("p.d.a", "p.d.b").unwrap().conditions.is_empty());
    }
}
