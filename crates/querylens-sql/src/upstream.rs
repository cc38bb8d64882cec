//! Upstream table resolution from raw query text
//!
//! Resolves the fully-qualified tables a query reads from without parsing
//! the query. Each clause alternative in the pattern carries its own named
//! groups, so a match is turned into a tagged [`ClauseMatch`] by asking which
//! alternative participated.

use querylens_core::{ClauseKind, Provenance, Resource, UpstreamResource};
use querylens_core::config::DEFAULT_IGNORE_UPSTREAM;
use regex::{Captures, Regex};
use std::collections::HashSet;

use crate::normalizer::{compile, TextNormalizer};

/// Optional directive comment in front of a name: `/* @marker */`
fn directive(group: &str) -> String {
    format!(r"(?:/\*\s*(?P<{group}_directive>[a-zA-Z0-9@_-]*)\s*\*/)?")
}

/// `project.dataset.name`, optionally back-quoted
fn qualified_name(group: &str, wildcard: bool) -> String {
    let name_chars = if wildcard { r"[\w*-]+" } else { r"[\w-]+" };
    format!(
        r"`?(?P<{group}_project>[\w-]+)\.(?P<{group}_dataset>[\w-]+)\.(?P<{group}_name>{name_chars})`?"
    )
}

fn keyword_clause(keyword: &str, group: &str, wildcard: bool) -> String {
    format!(
        r"\b{keyword}\s*{}\s+{}",
        directive(group),
        qualified_name(group, wildcard)
    )
}

fn upstream_pattern() -> String {
    let alternatives = [
        keyword_clause("FROM", "from", true),
        keyword_clause("JOIN", "join", true),
        format!(r"{}\s+AS", keyword_clause("WITH", "with", false)),
        keyword_clause(r"VIEW(?:\s+IF\s+NOT\s+EXISTS)?", "view", false),
        format!(
            r"{}\s+`(?P<bq_project>[\w-]+)\.(?P<bq_dataset>[\w-]+)\.(?P<bq_name>[\w*-]+)`\s*(?:AS)?",
            directive("bq")
        ),
    ];

    format!("(?i){}", alternatives.join("|"))
}

/// Capture group prefix for each clause alternative
const CLAUSE_GROUPS: [(ClauseKind, &str); 5] = [
    (ClauseKind::From, "from"),
    (ClauseKind::Join, "join"),
    (ClauseKind::With, "with"),
    (ClauseKind::View, "view"),
    (ClauseKind::Backquoted, "bq"),
];

/// A directive comment attached to a table reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// Exclude this occurrence from the upstream set
    IgnoreUpstream,

    /// Any other token, carried but without effect
    Other(String),
}

/// One clause occurrence, before any policy is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseMatch {
    pub kind: ClauseKind,
    pub directive: Option<Directive>,
    pub resource: Resource,
}

impl ClauseMatch {
    /// Tag this occurrence, or `None` when policy discards it
    pub fn to_upstream(&self) -> Option<UpstreamResource> {
        if self.directive == Some(Directive::IgnoreUpstream) {
            return None;
        }

        match self.kind.provenance()? {
            Provenance::Real => Some(UpstreamResource::real(self.resource.clone())),
            Provenance::Pseudo => Some(UpstreamResource::pseudo(self.resource.clone())),
        }
    }
}

/// Resolves upstream tables of a query
#[derive(Debug, Clone)]
pub struct UpstreamResolver {
    normalizer: TextNormalizer,
    pattern: Regex,
    ignore_directive: String,
}

impl UpstreamResolver {
    /// Create a resolver using the default `@ignoreupstream` marker
    pub fn new() -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            pattern: compile(&upstream_pattern()),
            ignore_directive: DEFAULT_IGNORE_UPSTREAM.to_string(),
        }
    }

    /// Use a different ignore marker (e.g. from config)
    pub fn with_ignore_directive(mut self, marker: impl Into<String>) -> Self {
        self.ignore_directive = marker.into();
        self
    }

    /// Every clause occurrence in textual order, with empty-component
    /// matches already dropped
    pub fn clause_matches(&self, sql: &str) -> Vec<ClauseMatch> {
        let cleaned = self.normalizer.strip_preserving_directives(sql);

        self.pattern
            .captures_iter(&cleaned)
            .filter_map(|caps| self.to_clause_match(&caps))
            .collect()
    }

    /// Resolve the deduplicated set of upstream tables.
    ///
    /// Real references minus any that coincide with a WITH alias.
    pub fn resolve(&self, sql: &str) -> HashSet<Resource> {
        let mut real = HashSet::new();
        let mut pseudo = HashSet::new();

        for clause in self.clause_matches(sql) {
            let Some(upstream) = clause.to_upstream() else {
                tracing::trace!(
                    clause = %clause.kind,
                    table = %clause.resource,
                    "discarding table reference"
                );
                continue;
            };

            if upstream.is_pseudo() {
                pseudo.insert(upstream.resource);
            } else {
                real.insert(upstream.resource);
            }
        }

        real.retain(|resource| !pseudo.contains(resource));
        real
    }

    /// Like [`resolve`](Self::resolve), sorted by URN
    pub fn resolve_sorted(&self, sql: &str) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self.resolve(sql).into_iter().collect();
        resources.sort_by_key(|r| r.urn());
        resources
    }

    fn to_clause_match(&self, caps: &Captures) -> Option<ClauseMatch> {
        let (kind, group) = CLAUSE_GROUPS
            .iter()
            .find(|(_, group)| caps.name(&format!("{group}_project")).is_some())?;

        let part = |suffix: &str| {
            caps.name(&format!("{group}_{suffix}"))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        let resource = Resource::new(part("project"), part("dataset"), part("name"));
        if !resource.is_complete() {
            return None;
        }

        let directive = caps
            .name(&format!("{group}_directive"))
            .map(|m| m.as_str().trim())
            .filter(|token| !token.is_empty())
            .map(|token| {
                if token == self.ignore_directive {
                    Directive::IgnoreUpstream
                } else {
                    Directive::Other(token.to_string())
                }
            });

        Some(ClauseMatch {
            kind: *kind,
            directive,
            resource,
        })
    }
}

impl Default for UpstreamResolver {
    fn default() -> Self {
        Self::new()
    }
}
