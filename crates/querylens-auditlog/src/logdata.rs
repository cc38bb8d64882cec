//! Audit-log record validation
//!
//! Turns decoded [`AuditData`] into a [`LogRecord`] ready for aggregation,
//! or a [`RejectionReason`] explaining why the entry does not count.
//!
//! IMPORTANT: Rejection codes are stable. Callers key metrics and log
//! queries on them, so never rename or remove a code.

use querylens_core::Resource;
use std::collections::HashSet;

use crate::payload::AuditData;

/// Terminal state of a successfully finished job
pub const DONE_STATE: &str = "DONE";

/// Job state as reported by the log
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Done,
    Other(String),
}

impl JobState {
    pub fn parse(state: &str) -> Self {
        match state {
            "PENDING" => Self::Pending,
            "RUNNING" => Self::Running,
            DONE_STATE => Self::Done,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Done => DONE_STATE,
            Self::Other(state) => state,
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A validated job-completion record
///
/// Never mutated after validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    state: JobState,
    error: Option<String>,
    referenced_tables: Vec<Resource>,
    sql: Option<String>,
}

impl LogRecord {
    /// A finished record, for callers that aggregate without a payload
    pub fn done(referenced_tables: Vec<Resource>, sql: Option<String>) -> Self {
        Self {
            state: JobState::Done,
            error: None,
            referenced_tables,
            sql,
        }
    }

    pub fn state(&self) -> &JobState {
        &self.state
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn referenced_tables(&self) -> &[Resource] {
        &self.referenced_tables
    }

    pub fn sql(&self) -> Option<&str> {
        self.sql.as_deref()
    }

    /// Distinct URNs of the referenced tables, first occurrence first
    pub fn referenced_urns(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.referenced_tables
            .iter()
            .map(Resource::urn)
            .filter(|urn| seen.insert(urn.clone()))
            .collect()
    }
}

/// Why an audit entry was not counted
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RejectionReason {
    #[error("jobCompletedEvent field not found")]
    MissingJobCompletedEvent,

    #[error("jobCompletedEvent.job field not found")]
    MissingJob,

    #[error("job statistics is nil")]
    MissingJobStatistics,

    #[error("no referenced tables found")]
    NoReferencedTables,

    #[error("jobCompletedEvent.job.jobStatus field not found")]
    MissingJobStatus,

    #[error("jobCompletedEvent.job.jobStatus.state is empty")]
    EmptyJobState,

    #[error("job status state is not DONE: {0}")]
    JobNotDone(String),

    #[error("job status has error: {0}")]
    JobFailed(String),
}

impl RejectionReason {
    /// Stable identifier for this reason
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingJobCompletedEvent => "MISSING_JOB_COMPLETED_EVENT",
            Self::MissingJob => "MISSING_JOB",
            Self::MissingJobStatistics => "MISSING_JOB_STATISTICS",
            Self::NoReferencedTables => "NO_REFERENCED_TABLES",
            Self::MissingJobStatus => "MISSING_JOB_STATUS",
            Self::EmptyJobState => "EMPTY_JOB_STATE",
            Self::JobNotDone(_) => "JOB_NOT_DONE",
            Self::JobFailed(_) => "JOB_FAILED",
        }
    }
}

/// Validate one decoded payload.
///
/// Checks run in a fixed order and the first failure wins. Referenced
/// tables with an empty component are dropped before the emptiness check.
pub fn validate(data: &AuditData) -> Result<LogRecord, RejectionReason> {
    let event = data
        .job_completed_event
        .as_ref()
        .ok_or(RejectionReason::MissingJobCompletedEvent)?;

    let job = event.job.as_ref().ok_or(RejectionReason::MissingJob)?;

    let statistics = job
        .job_statistics
        .as_ref()
        .ok_or(RejectionReason::MissingJobStatistics)?;

    let referenced_tables: Vec<Resource> = statistics
        .referenced_tables
        .iter()
        .map(|table| table.to_resource())
        .filter(Resource::is_complete)
        .collect();
    if referenced_tables.is_empty() {
        return Err(RejectionReason::NoReferencedTables);
    }

    let status = job.job_status.as_ref().ok_or(RejectionReason::MissingJobStatus)?;

    if status.state.is_empty() {
        return Err(RejectionReason::EmptyJobState);
    }

    let state = JobState::parse(&status.state);
    if state != JobState::Done {
        return Err(RejectionReason::JobNotDone(status.state.clone()));
    }

    if let Some(error) = status.error.as_ref().filter(|e| !e.message.is_empty()) {
        return Err(RejectionReason::JobFailed(error.message.clone()));
    }

    Ok(LogRecord {
        state,
        error: None,
        referenced_tables,
        sql: data.query().map(str::to_string),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{Job, JobCompletedEvent, JobError, JobStatistics, JobStatus, TableName};

    fn job(state: &str, tables: Vec<TableName>) -> Job {
        Job {
            job_configuration: None,
            job_status: Some(JobStatus {
                state: state.to_string(),
                error: None,
            }),
            job_statistics: Some(JobStatistics {
                referenced_tables: tables,
            }),
        }
    }

    fn audit(job: Option<Job>) -> AuditData {
        AuditData {
            job_completed_event: Some(JobCompletedEvent {
                event_name: "query_job_completed".to_string(),
                job,
            }),
            sql_query: None,
        }
    }

    #[test]
    fn accepts_finished_job() {
        let data = audit(Some(job("DONE", vec![TableName::new("p", "d", "t")])));

        let record = validate(&data).unwrap();
        assert_eq!(record.state(), &JobState::Done);
        assert_eq!(record.referenced_tables(), &[Resource::new("p", "d", "t")]);
        assert_eq!(record.sql(), None);
    }

    #[test]
    fn rejection_order() {
        assert_eq!(
            validate(&AuditData::default()),
            Err(RejectionReason::MissingJobCompletedEvent)
        );
        assert_eq!(validate(&audit(None)), Err(RejectionReason::MissingJob));

        let mut no_stats = job("DONE", vec![]);
        no_stats.job_statistics = None;
        no_stats.job_status = None;
        assert_eq!(
            validate(&audit(Some(no_stats))),
            Err(RejectionReason::MissingJobStatistics)
        );

        let mut no_tables = job("", vec![]);
        no_tables.job_status = None;
        assert_eq!(
            validate(&audit(Some(no_tables))),
            Err(RejectionReason::NoReferencedTables)
        );

        let mut no_status = job("DONE", vec![TableName::new("p", "d", "t")]);
        no_status.job_status = None;
        assert_eq!(
            validate(&audit(Some(no_status))),
            Err(RejectionReason::MissingJobStatus)
        );

        assert_eq!(
            validate(&audit(Some(job("", vec![TableName::new("p", "d", "t")])))),
            Err(RejectionReason::EmptyJobState)
        );
    }

    #[test]
    fn rejects_unfinished_job() {
        let data = audit(Some(job("RUNNING", vec![TableName::new("p", "d", "t")])));

        let reason = validate(&data).unwrap_err();
        assert_eq!(reason, RejectionReason::JobNotDone("RUNNING".to_string()));
        assert_eq!(reason.code(), "JOB_NOT_DONE");
    }

    #[test]
    fn rejects_failed_job() {
        let mut failed = job("DONE", vec![TableName::new("p", "d", "t")]);
        if let Some(status) = failed.job_status.as_mut() {
            status.error = Some(JobError {
                code: 3,
                message: "Syntax error".to_string(),
            });
        }

        let reason = validate(&audit(Some(failed))).unwrap_err();
        assert_eq!(reason.code(), "JOB_FAILED");
        assert_eq!(reason.to_string(), "job status has error: Syntax error");
    }

    #[test]
    fn empty_error_message_is_not_a_failure() {
        let mut done = job("DONE", vec![TableName::new("p", "d", "t")]);
        if let Some(status) = done.job_status.as_mut() {
            status.error = Some(JobError::default());
        }

        assert!(validate(&audit(Some(done))).is_ok());
    }

    #[test]
    fn incomplete_tables_are_dropped() {
        let data = audit(Some(job(
            "DONE",
            vec![TableName::new("p", "", "t"), TableName::new("p", "d", "t")],
        )));
        assert_eq!(validate(&data).unwrap().referenced_tables().len(), 1);

        let data = audit(Some(job("DONE", vec![TableName::new("", "d", "t")])));
        assert_eq!(validate(&data), Err(RejectionReason::NoReferencedTables));
    }

    #[test]
    fn distinct_urns() {
        let record = LogRecord::done(
            vec![
                Resource::new("p", "d", "b"),
                Resource::new("p", "d", "a"),
                Resource::new("p", "d", "b"),
            ],
            None,
        );

        assert_eq!(record.referenced_urns(), vec!["p.d.b".to_string(), "p.d.a".to_string()]);
    }

    #[test]
    fn codes_are_distinct() {
        let reasons = [
            RejectionReason::MissingJobCompletedEvent,
            RejectionReason::MissingJob,
            RejectionReason::MissingJobStatistics,
            RejectionReason::NoReferencedTables,
            RejectionReason::MissingJobStatus,
            RejectionReason::EmptyJobState,
            RejectionReason::JobNotDone(String::new()),
            RejectionReason::JobFailed(String::new()),
        ];

        let codes: HashSet<&str> = reasons.iter().map(RejectionReason::code).collect();
        assert_eq!(codes.len(), reasons.len());
    }
}
