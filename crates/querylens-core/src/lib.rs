//! QueryLens Core
//!
//! Domain model shared by the SQL analysis and audit-log crates.
//! Resource URNs are used as map keys downstream - never change their format.

pub mod resource;
pub mod config;

pub use resource::{Resource, ClauseKind, Provenance, UpstreamResource};
pub use config::{Config, ConfigError, UsageConfig, DirectiveConfig};
