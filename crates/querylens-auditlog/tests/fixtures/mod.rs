//! Audit-log entry builders for integration tests
//!
//! Entries are built as raw JSON, the way the log client hands them over.

use serde_json::{json, Value};

/// Builder for one job-completion entry
pub struct EntryBuilder {
    tables: Vec<(String, String, String)>,
    state: Option<String>,
    error: Option<String>,
    query: Option<String>,
}

impl EntryBuilder {
    /// A finished job with no tables yet
    pub fn done() -> Self {
        Self {
            tables: Vec::new(),
            state: Some("DONE".to_string()),
            error: None,
            query: None,
        }
    }

    /// Reference `urn` (`project.dataset.table`)
    pub fn table(mut self, urn: &str) -> Self {
        let mut parts = urn.splitn(3, '.');
        let mut next = || parts.next().unwrap_or_default().to_string();
        self.tables.push((next(), next(), next()));
        self
    }

    pub fn tables(self, urns: &[&str]) -> Self {
        urns.iter().fold(self, |builder, urn| builder.table(urn))
    }

    pub fn state(mut self, state: &str) -> Self {
        self.state = Some(state.to_string());
        self
    }

    pub fn without_status(mut self) -> Self {
        self.state = None;
        self
    }

    pub fn error(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    pub fn query(mut self, sql: &str) -> Self {
        self.query = Some(sql.to_string());
        self
    }

    /// Bare audit data
    pub fn audit_data(&self) -> Value {
        let tables: Vec<Value> = self
            .tables
            .iter()
            .map(|(project, dataset, table)| {
                json!({ "projectId": project, "datasetId": dataset, "tableId": table })
            })
            .collect();

        let mut job = json!({
            "jobStatistics": { "referencedTables": tables }
        });

        if let Some(state) = &self.state {
            let mut status = json!({ "state": state });
            if let Some(message) = &self.error {
                status["error"] = json!({ "code": 3, "message": message });
            }
            job["jobStatus"] = status;
        }

        if let Some(sql) = &self.query {
            job["jobConfiguration"] = json!({ "query": { "query": sql } });
        }

        json!({
            "jobCompletedEvent": { "eventName": "query_job_completed", "job": job }
        })
    }

    /// Legacy envelope, audit data under `serviceData`
    pub fn service_data(&self) -> Value {
        json!({ "protoPayload": { "serviceData": self.audit_data() } })
    }

    /// Current envelope, audit data under `metadata`
    pub fn metadata(&self) -> Value {
        json!({ "protoPayload": { "metadata": self.audit_data() } })
    }
}
