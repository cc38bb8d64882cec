//! Comment stripping for raw query text
//!
//! Two modes: a full strip used before condition extraction, and a
//! directive-preserving strip used before upstream resolution, which keeps
//! single-token `/* @marker */` comments in place.

use regex::{Captures, Regex};

/// Line comments run to end of line; block comments are non-greedy.
/// Both are scanned in one pass so whichever opens first wins.
const COMMENT_PATTERN: &str = r"--[^\n]*|(?s:/\*.*?\*/)";

/// A block comment holding exactly one `@token`
const DIRECTIVE_PATTERN: &str = r"^/\*\s*@[a-zA-Z0-9_-]+\s*\*/$";

/// Strips SQL comments
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    comments: Regex,
    directive: Regex,
}

impl TextNormalizer {
    /// Create a new normalizer
    pub fn new() -> Self {
        Self {
            comments: compile(COMMENT_PATTERN),
            directive: compile(DIRECTIVE_PATTERN),
        }
    }

    /// Remove comments from `text`.
    ///
    /// Line comments are dropped up to (not including) the newline. Block
    /// comments are replaced by a single space, except directive comments
    /// when `preserve_directives` is set. Whitespace is otherwise untouched.
    pub fn strip_comments(&self, text: &str, preserve_directives: bool) -> String {
        self.comments
            .replace_all(text, |caps: &Captures| {
                let comment = &caps[0];
                if comment.starts_with("--") {
                    String::new()
                } else if preserve_directives && self.is_directive(comment) {
                    comment.to_string()
                } else {
                    " ".to_string()
                }
            })
            .into_owned()
    }

    /// Full strip: drops every comment
    pub fn strip_all(&self, text: &str) -> String {
        self.strip_comments(text, false)
    }

    /// Strip that keeps directive comments for later policy decisions
    pub fn strip_preserving_directives(&self, text: &str) -> String {
        self.strip_comments(text, true)
    }

    /// Check whether a block comment is a single-token directive
    pub fn is_directive(&self, comment: &str) -> bool {
        self.directive.is_match(comment)
    }
}

impl Default for TextNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Trim and collapse every whitespace run to a single space
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Compile one of this crate's constant patterns.
///
/// The patterns are fixed at compile time and covered by unit tests, so a
/// failure here is a programming error.
pub(crate) fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid built-in pattern {pattern:?}: {e}"))
}
