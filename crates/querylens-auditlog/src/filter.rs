//! Audit-log advanced filter for a usage window

use chrono::{DateTime, Duration, SecondsFormat, Utc};

/// Fixed part of the filter: completed query jobs, excluding metadata
/// queries against `INFORMATION_SCHEMA` and `__TABLES__`
const JOB_COMPLETED_FILTER: &str = concat!(
    r#"protoPayload.methodName="jobservice.jobcompleted" AND "#,
    r#"resource.type="bigquery_resource" AND "#,
    "NOT protoPayload.serviceData.jobCompletedEvent.job.jobConfiguration.query.query:(INFORMATION_SCHEMA OR __TABLES__)",
);

/// Half-open time range `[from, to)` of collected entries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// A window that cannot be represented
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("usage period of {0} day(s) is out of range")]
    PeriodOutOfRange(i64),
}

impl UsageWindow {
    /// The `days` days up to `to`
    pub fn ending_at(to: DateTime<Utc>, days: i64) -> Result<Self, WindowError> {
        let from = (days >= 0)
            .then(|| Duration::try_days(days))
            .flatten()
            .and_then(|period| to.checked_sub_signed(period))
            .ok_or(WindowError::PeriodOutOfRange(days))?;

        Ok(Self { from, to })
    }

    /// The last `days` days up to now
    pub fn last_days(days: i64) -> Result<Self, WindowError> {
        Self::ending_at(Utc::now(), days)
    }

    /// Render the log filter selecting this window's entries for `table_id`
    pub fn build_filter(&self, table_id: &str) -> String {
        format!(
            r#"{JOB_COMPLETED_FILTER} AND timestamp >= "{}" AND timestamp < "{}" AND {table_id}"#,
            format_timestamp(&self.from),
            format_timestamp(&self.to),
        )
    }
}

fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
