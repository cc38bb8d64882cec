//! Per-table usage profiles
//!
//! Flattened, sorted views over [`TableStats`] for output.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::stats::TableStats;

/// Usage profile of one table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableProfile {
    pub usage_count: i64,

    /// Related tables, sorted by URN
    pub joins: Vec<JoinProfile>,

    /// Distinct filter conditions, sorted
    pub filters: Vec<String>,
}

/// One related table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinProfile {
    pub urn: String,
    pub count: i64,
    pub conditions: Vec<String>,
}

impl TableStats {
    /// Profile of `urn`; an unseen table gets an empty profile
    pub fn profile(&self, urn: &str) -> TableProfile {
        let mut joins: Vec<JoinProfile> = self
            .join_usage()
            .related(urn)
            .map(|related| {
                related
                    .iter()
                    .map(|(other, detail)| JoinProfile {
                        urn: other.clone(),
                        count: detail.usage,
                        conditions: detail.conditions.iter().cloned().collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        joins.sort_by(|a, b| a.urn.cmp(&b.urn));

        let filters = self
            .filter_conditions()
            .get(urn)
            .map(|filters| filters.iter().cloned().collect())
            .unwrap_or_default();

        TableProfile {
            usage_count: self.usage(urn),
            joins,
            filters,
        }
    }

    /// One profile per table with recorded usage
    pub fn profiles(&self) -> BTreeMap<String, TableProfile> {
        self.table_usage()
            .keys()
            .map(|urn| (urn.clone(), self.profile(urn)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logdata::LogRecord;
    use querylens_core::Resource;
    use querylens_sql::QueryConditions;

    #[test]
    fn unknown_table() {
        assert_eq!(TableStats::new().profile("p.d.missing"), TableProfile::default());
    }

    #[test]
    fn sorted_output() {
        let mut stats = TableStats::new();
        let record = LogRecord::done(
            vec![
                Resource::new("p", "d", "a"),
                Resource::new("p", "d", "c"),
                Resource::new("p", "d", "b"),
            ],
            None,
        );
        stats.populate_with_conditions(
            &record,
            &QueryConditions {
                joins: vec!["on z = 1".to_string(), "on a = 1".to_string()],
                filters: vec!["where y = 2".to_string(), "where x = 1".to_string()],
            },
        );

        let profile = stats.profile("p.d.a");
        assert_eq!(profile.usage_count, 1);
        assert_eq!(
            profile.joins.iter().map(|j| j.urn.as_str()).collect::<Vec<_>>(),
            vec!["p.d.b", "p.d.c"]
        );
        assert_eq!(profile.joins[0].conditions, vec!["on a = 1", "on z = 1"]);
        assert_eq!(profile.filters, vec!["where x = 1", "where y = 2"]);

        let profiles = stats.profiles();
        assert_eq!(profiles.len(), 3);
        assert_eq!(profiles["p.d.c"].joins.len(), 2);
    }

    #[test]
    fn serializes_as_json() {
        let mut stats = TableStats::new();
        stats.populate(&LogRecord::done(vec![Resource::new("p", "d", "a")], None));

        let json = serde_json::to_value(stats.profile("p.d.a")).unwrap();
        assert_eq!(json, serde_json::json!({ "usage_count": 1, "joins": [], "filters": [] }));
    }
}
