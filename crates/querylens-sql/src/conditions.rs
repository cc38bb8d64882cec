//! Join and filter condition extraction
//!
//! Captures `ON a = b` / `USING (...)` join conditions and `WHERE` / `HAVING`
//! predicate chains as literal substrings of the normalized query. This is
//! best-effort: nested boolean expressions and arbitrary function calls on
//! the left-hand side are not recognised.

use regex::Regex;

use crate::normalizer::{collapse_whitespace, compile, TextNormalizer};

const JOIN_CHARS: &str = r"[a-zA-Z0-9@_.`-]";

const FILTER_CHARS: &str = r#"[a-zA-Z0-9@_%"',.`-]*"#;
const FILTER_CHARS_WITH_SPACE: &str = r#"[a-zA-Z0-9@_%:"',\s.`-]*"#;

fn join_pattern() -> String {
    let expr = format!(r"(?:DATE\({JOIN_CHARS}*\)|{JOIN_CHARS}+)");
    let terminal = format!(r"{expr}\s*=\s*{expr}");

    format!(
        r"(?i)\bON\s+{terminal}(?:\s+(?:AND|OR)\s+{terminal})*|\bUSING\s*\(\s*[a-zA-Z0-9,@_\s`-]*\s*\)"
    )
}

fn filter_pattern() -> String {
    let lhs = FILTER_CHARS;
    let rhs = format!(
        r"(?:CURRENT_TIMESTAMP\(\)|TIMESTAMP\({FILTER_CHARS_WITH_SPACE}\)|{FILTER_CHARS})"
    );

    let terminals = [
        format!(r"{lhs}\s*(?:<=|>=|!=|<>|=|<|>)\s*{rhs}"),
        format!(r"{lhs}\s+(?:LIKE|NOT\s+LIKE)\s+{rhs}"),
        format!(r"{lhs}\s+(?:BETWEEN|NOT\s+BETWEEN)\s+{rhs}\s+AND\s+{rhs}"),
        format!(r"{lhs}\s+IS\s+(?:NOT\s+)?(?:NULL|TRUE|FALSE)"),
        format!(r"{lhs}\s+(?:IN|NOT\s+IN)\s*\({FILTER_CHARS_WITH_SPACE}\)"),
    ];
    let terminal = format!("(?:{})", terminals.join("|"));

    format!(r"(?i)\b(?:WHERE|HAVING)\s+{terminal}(?:\s+(?:AND|OR)\s+{terminal})*")
}

/// Conditions found in one query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryConditions {
    /// Join conditions, in textual order
    pub joins: Vec<String>,

    /// Filter conditions, in textual order
    pub filters: Vec<String>,
}

impl QueryConditions {
    pub fn is_empty(&self) -> bool {
        self.joins.is_empty() && self.filters.is_empty()
    }
}

/// Extracts join and filter conditions from query text
#[derive(Debug, Clone)]
pub struct ConditionExtractor {
    normalizer: TextNormalizer,
    joins: Regex,
    filters: Regex,
}

impl ConditionExtractor {
    /// Create a new extractor
    pub fn new() -> Self {
        Self {
            normalizer: TextNormalizer::new(),
            joins: compile(&join_pattern()),
            filters: compile(&filter_pattern()),
        }
    }

    /// Every `ON ...` / `USING (...)` condition, keyword included
    pub fn extract_join_conditions(&self, sql: &str) -> Vec<String> {
        let cleaned = self.clean_up(sql);
        Self::find_all(&self.joins, &cleaned)
    }

    /// Every `WHERE ...` / `HAVING ...` condition, keyword included
    pub fn extract_filter_conditions(&self, sql: &str) -> Vec<String> {
        let cleaned = self.clean_up(sql);
        Self::find_all(&self.filters, &cleaned)
    }

    /// Both condition kinds over a single normalization pass
    pub fn extract(&self, sql: &str) -> QueryConditions {
        let cleaned = self.clean_up(sql);

        QueryConditions {
            joins: Self::find_all(&self.joins, &cleaned),
            filters: Self::find_all(&self.filters, &cleaned),
        }
    }

    /// Full comment strip, semicolons dropped, whitespace collapsed
    fn clean_up(&self, sql: &str) -> String {
        let stripped = self.normalizer.strip_all(sql).replace(';', " ");
        collapse_whitespace(&stripped)
    }

    fn find_all(pattern: &Regex, text: &str) -> Vec<String> {
        pattern
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

impl Default for ConditionExtractor {
    fn default() -> Self {
        Self::new()
    }
}
