//! Lexical SQL analysis
//!
//! This crate handles:
//! - Stripping comments, optionally keeping `/* @directive */` markers
//! - Resolving upstream tables from FROM/JOIN/WITH/VIEW clauses
//! - Extracting join (ON/USING) and filter (WHERE/HAVING) conditions
//!
//! None of this parses SQL; every component is a set of precompiled
//! patterns owned by the component itself.

pub mod normalizer;
pub mod upstream;
pub mod conditions;

pub use normalizer::{TextNormalizer, collapse_whitespace};
pub use upstream::{UpstreamResolver, ClauseMatch, Directive};
pub use conditions::{ConditionExtractor, QueryConditions};
