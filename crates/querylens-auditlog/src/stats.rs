//! Table usage aggregation
//!
//! [`TableStats`] accumulates per-table usage counts, co-occurrence ("join")
//! counts with their conditions, and filter conditions over a stream of
//! validated records. Two tables count as joined whenever they are
//! referenced by the same query.

use querylens_sql::QueryConditions;
use std::collections::{BTreeSet, HashMap};

use crate::logdata::LogRecord;

/// How often, and on what conditions, two tables were used together
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinDetail {
    pub usage: i64,
    pub conditions: BTreeSet<String>,
}

/// Join usage keyed by table, then by related table
///
/// Every pair is stored in both directions so "joins of X" is a single
/// lookup; writes go through [`JoinUsage::record`] which keeps both in step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinUsage {
    edges: HashMap<String, HashMap<String, JoinDetail>>,
}

impl JoinUsage {
    /// Count one co-occurrence of `a` and `b`
    pub fn record(&mut self, a: &str, b: &str, conditions: &[String]) {
        if a == b {
            return;
        }

        for (from, to) in [(a, b), (b, a)] {
            let detail = self
                .edges
                .entry(from.to_string())
                .or_default()
                .entry(to.to_string())
                .or_default();
            detail.usage += 1;
            detail.conditions.extend(conditions.iter().cloned());
        }
    }

    /// Tables related to `urn`
    pub fn related(&self, urn: &str) -> Option<&HashMap<String, JoinDetail>> {
        self.edges.get(urn)
    }

    pub fn detail(&self, a: &str, b: &str) -> Option<&JoinDetail> {
        self.edges.get(a)?.get(b)
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HashMap<String, JoinDetail>)> {
        self.edges.iter()
    }

    /// Fold another instance in; its entries are already symmetric
    fn merge(&mut self, other: JoinUsage) {
        for (from, related) in other.edges {
            let entry = self.edges.entry(from).or_default();
            for (to, detail) in related {
                let mine = entry.entry(to).or_default();
                mine.usage += detail.usage;
                mine.conditions.extend(detail.conditions);
            }
        }
    }
}

/// Usage statistics for one collection window
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableStats {
    table_usage: HashMap<String, i64>,
    join_usage: JoinUsage,
    filter_conditions: HashMap<String, BTreeSet<String>>,
}

impl TableStats {
    /// Create empty statistics
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one record, without conditions
    pub fn populate(&mut self, record: &LogRecord) {
        self.populate_with_conditions(record, &QueryConditions::default());
    }

    /// Count one record and attach the conditions extracted from its query.
    ///
    /// Each distinct table counts once per record; join conditions go to
    /// every referenced pair and filter conditions to every referenced table.
    pub fn populate_with_conditions(&mut self, record: &LogRecord, conditions: &QueryConditions) {
        let urns = record.referenced_urns();
        if urns.is_empty() {
            return;
        }

        for urn in &urns {
            *self.table_usage.entry(urn.clone()).or_insert(0) += 1;
        }

        for (i, a) in urns.iter().enumerate() {
            for b in &urns[i + 1..] {
                self.join_usage.record(a, b, &conditions.joins);
            }
        }

        if !conditions.filters.is_empty() {
            for urn in &urns {
                self.filter_conditions
                    .entry(urn.clone())
                    .or_default()
                    .extend(conditions.filters.iter().cloned());
            }
        }

        tracing::trace!(tables = urns.len(), "populated table stats");
    }

    /// Fold statistics gathered over a disjoint set of records
    pub fn merge(&mut self, other: TableStats) {
        for (urn, count) in other.table_usage {
            *self.table_usage.entry(urn).or_insert(0) += count;
        }

        self.join_usage.merge(other.join_usage);

        for (urn, filters) in other.filter_conditions {
            self.filter_conditions.entry(urn).or_default().extend(filters);
        }
    }

    pub fn table_usage(&self) -> &HashMap<String, i64> {
        &self.table_usage
    }

    pub fn join_usage(&self) -> &JoinUsage {
        &self.join_usage
    }

    pub fn filter_conditions(&self) -> &HashMap<String, BTreeSet<String>> {
        &self.filter_conditions
    }

    /// Usage count of `urn`, zero when never seen
    pub fn usage(&self, urn: &str) -> i64 {
        self.table_usage.get(urn).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.table_usage.is_empty()
    }
}
