//! Audit-log payload model
//!
//! Mirrors the JSON form of BigQuery `AuditData` (subset of fields we care
//! about). Entries come either wrapped in a log envelope
//! (`protoPayload.serviceData` or `protoPayload.metadata`) or bare.

use querylens_core::Resource;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Audit data for one job-completion entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_completed_event: Option<JobCompletedEvent>,

    /// Query text, when the producer lifts it out of the job configuration
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql_query: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobCompletedEvent {
    #[serde(default)]
    pub event_name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<Job>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_configuration: Option<JobConfiguration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_status: Option<JobStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_statistics: Option<JobStatistics>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryConfiguration>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryConfiguration {
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default)]
    pub state: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobError {
    #[serde(default)]
    pub code: i64,

    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatistics {
    #[serde(default)]
    pub referenced_tables: Vec<TableName>,
}

/// A referenced table as it appears in the log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableName {
    #[serde(default, alias = "project")]
    pub project_id: String,

    #[serde(default, alias = "dataset")]
    pub dataset_id: String,

    #[serde(default, alias = "table")]
    pub table_id: String,
}

impl TableName {
    pub fn new(project: impl Into<String>, dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            project_id: project.into(),
            dataset_id: dataset.into(),
            table_id: table.into(),
        }
    }

    pub fn to_resource(&self) -> Resource {
        Resource::new(&self.project_id, &self.dataset_id, &self.table_id)
    }
}

/// A log entry wrapping audit data in its `protoPayload`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proto_payload: Option<ProtoPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtoPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_name: Option<String>,

    /// Legacy location of the audit data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_data: Option<Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl AuditLogEntry {
    /// Decode the wrapped audit data, preferring `serviceData` over `metadata`
    pub fn audit_data(&self) -> Result<AuditData, PayloadError> {
        let payload = self.proto_payload.as_ref().ok_or(PayloadError::MissingMetadata)?;

        let data = payload
            .service_data
            .as_ref()
            .filter(|v| !v.is_null())
            .or_else(|| payload.metadata.as_ref().filter(|v| !v.is_null()))
            .ok_or(PayloadError::MissingMetadata)?;

        Ok(serde_json::from_value(data.clone())?)
    }
}

impl AuditData {
    /// Decode one log entry, unwrapping the envelope if there is one.
    /// An entry without `protoPayload` is decoded as bare audit data.
    pub fn from_entry(entry: &Value) -> Result<Self, PayloadError> {
        if !entry.is_object() {
            return Err(PayloadError::NotAnObject);
        }

        if entry.get("protoPayload").is_some() {
            let envelope: AuditLogEntry = serde_json::from_value(entry.clone())?;
            return envelope.audit_data();
        }

        Ok(serde_json::from_value(entry.clone())?)
    }

    pub fn job(&self) -> Option<&Job> {
        self.job_completed_event.as_ref()?.job.as_ref()
    }

    /// Referenced tables, in log order
    pub fn referenced_tables(&self) -> Vec<Resource> {
        self.job()
            .and_then(|job| job.job_statistics.as_ref())
            .map(|stats| stats.referenced_tables.iter().map(TableName::to_resource).collect())
            .unwrap_or_default()
    }

    /// Query text: top-level `sqlQuery` first, then the job configuration.
    /// Empty text counts as absent.
    pub fn query(&self) -> Option<&str> {
        let configured = || {
            self.job()?
                .job_configuration
                .as_ref()?
                .query
                .as_ref()
                .map(|q| q.query.as_str())
        };

        self.sql_query
            .as_deref()
            .filter(|q| !q.trim().is_empty())
            .or_else(|| configured().filter(|q| !q.trim().is_empty()))
    }
}

/// Errors decoding a raw log entry
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("log entry is not a JSON object")]
    NotAnObject,

    #[error("metadata field is nil")]
    MissingMetadata,

    #[error("parse audit data: {0}")]
    Decode(#[from] serde_json::Error),
}
