//! Table resources and their provenance during upstream resolution

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a table in the warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Resource {
    /// Project name
    pub project: String,

    /// Dataset name
    pub dataset: String,

    /// Table name (may end in a wildcard, e.g. `events_*`)
    pub name: String,
}

impl Resource {
    /// Create a new resource
    pub fn new(project: impl Into<String>, dataset: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            name: name.into(),
        }
    }

    /// Canonical `project.dataset.name` identity, used as a map key
    pub fn urn(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.name)
    }

    /// True when every component is non-empty
    pub fn is_complete(&self) -> bool {
        !self.project.is_empty() && !self.dataset.is_empty() && !self.name.is_empty()
    }

    /// True when the table name carries a trailing wildcard
    pub fn is_wildcard(&self) -> bool {
        self.name.ends_with('*')
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.urn())
    }
}

/// The clause that introduced a table reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    /// `FROM project.dataset.table`
    From,

    /// `JOIN project.dataset.table`
    Join,

    /// `WITH project.dataset.table AS (...)`
    With,

    /// `CREATE VIEW project.dataset.table`
    View,

    /// A bare back-quoted name, e.g. the second entry of a comma-separated FROM list
    Backquoted,
}

impl ClauseKind {
    /// Provenance of a reference found in this clause, or `None` when the
    /// reference is never an upstream (DDL view targets)
    pub fn provenance(&self) -> Option<Provenance> {
        match self {
            Self::From | Self::Join | Self::Backquoted => Some(Provenance::Real),
            Self::With => Some(Provenance::Pseudo),
            Self::View => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::From => "from",
            Self::Join => "join",
            Self::With => "with",
            Self::View => "view",
            Self::Backquoted => "backquoted",
        }
    }
}

impl fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a reference names a real table or a WITH-clause alias
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    Real,
    Pseudo,
}

/// A resource tagged with its provenance.
///
/// Only lives for the resolution of a single query.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UpstreamResource {
    pub resource: Resource,
    pub provenance: Provenance,
}

impl UpstreamResource {
    pub fn real(resource: Resource) -> Self {
        Self { resource, provenance: Provenance::Real }
    }

    pub fn pseudo(resource: Resource) -> Self {
        Self { resource, provenance: Provenance::Pseudo }
    }

    pub fn is_pseudo(&self) -> bool {
        self.provenance == Provenance::Pseudo
    }
}
