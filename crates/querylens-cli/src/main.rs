//! QueryLens command line
//!
//! Local driver over the SQL and audit-log crates: resolve upstream tables
//! and conditions of a query file, or aggregate table usage from a file of
//! exported audit-log entries (one JSON entry per line).

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use querylens_auditlog::{CollectSummary, UsageCollector, UsageWindow};
use querylens_core::Config;
use querylens_sql::{ConditionExtractor, UpstreamResolver};

const DEFAULT_CONFIG_FILE: &str = "querylens.toml";

/// QueryLens - lexical lineage and usage analysis for BigQuery SQL
#[derive(Parser)]
#[command(name = "querylens")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: querylens.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the upstream tables a query reads from
    Upstreams {
        /// SQL file to analyze
        sql: PathBuf,

        /// Print as a JSON array
        #[arg(long)]
        json: bool,
    },

    /// List join and filter conditions of a query
    Conditions {
        /// SQL file to analyze
        sql: PathBuf,
    },

    /// Aggregate table usage from exported audit-log entries
    Usage {
        /// File with one audit-log entry (JSON) per line
        entries: PathBuf,

        /// Only print the profile of this table URN
        #[arg(short, long)]
        table: Option<String>,

        /// Collect even when usage collection is disabled in config
        #[arg(long)]
        force: bool,
    },

    /// Print the audit-log filter for a table over the configured window
    Filter {
        /// Table ID to filter on
        table_id: String,
    },

    /// Write a default config file
    Init {
        /// Where to write the config
        #[arg(default_value = DEFAULT_CONFIG_FILE)]
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = load_config(cli.config.as_deref(), cli.verbose)?;

    match cli.command {
        Commands::Upstreams { sql, json } => upstreams_command(&config, &sql, json),
        Commands::Conditions { sql } => conditions_command(&sql),
        Commands::Usage { entries, table, force } => {
            usage_command(&config, &entries, table.as_deref(), force, cli.verbose)
        }
        Commands::Filter { table_id } => filter_command(&config, &table_id),
        Commands::Init { path } => init_command(&path),
    }
}

fn load_config(path: Option<&Path>, verbose: bool) -> Result<Config> {
    let config = if let Some(path) = path {
        Config::from_file(path).with_context(|| format!("Failed to load config from {}", path.display()))?
    } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG_FILE))?
    } else {
        if verbose {
            eprintln!("{}", "No config file found, using defaults".yellow());
        }
        Config::default()
    };

    if verbose {
        eprintln!(
            "{} ignore marker {}, usage period {} day(s)",
            "Using".cyan(),
            config.directives.ignore_upstream,
            config.usage.usage_period_in_day
        );
    }

    Ok(config)
}

fn read_sql(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn upstreams_command(config: &Config, sql_path: &Path, json: bool) -> Result<()> {
    let sql = read_sql(sql_path)?;

    let resolver = UpstreamResolver::new().with_ignore_directive(&config.directives.ignore_upstream);
    let upstreams = resolver.resolve_sorted(&sql);
    tracing::debug!(count = upstreams.len(), "resolved upstream tables");

    if json {
        let urns: Vec<String> = upstreams.iter().map(|r| r.urn()).collect();
        println!("{}", serde_json::to_string_pretty(&urns)?);
        return Ok(());
    }

    if upstreams.is_empty() {
        println!("{}", "No upstream tables found".yellow());
        return Ok(());
    }

    println!("{} ({})", "Upstream tables".bold(), upstreams.len());
    for resource in &upstreams {
        println!("  {}", resource.urn().green());
    }

    Ok(())
}

fn conditions_command(sql_path: &Path) -> Result<()> {
    let sql = read_sql(sql_path)?;
    let conditions = ConditionExtractor::new().extract(&sql);

    print_section("Join conditions", &conditions.joins);
    println!();
    print_section("Filter conditions", &conditions.filters);

    Ok(())
}

fn print_section(title: &str, items: &[String]) {
    println!("{} ({})", title.bold(), items.len());
    if items.is_empty() {
        println!("  {}", "none".dimmed());
    }
    for item in items {
        println!("  {}", item.cyan());
    }
}

fn usage_command(
    config: &Config,
    entries_path: &Path,
    table: Option<&str>,
    force: bool,
    verbose: bool,
) -> Result<()> {
    if !config.usage.collect_table_usage && !force {
        anyhow::bail!(
            "Table usage collection is disabled. Set usage.collect_table_usage = true in {} or pass --force.",
            DEFAULT_CONFIG_FILE
        );
    }

    let text = std::fs::read_to_string(entries_path)
        .with_context(|| format!("Failed to read {}", entries_path.display()))?;

    if verbose {
        eprintln!("{} {}", "Reading audit log entries from:".cyan(), entries_path.display());
    }

    let entries = text
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(serde_json::from_str::<Value>);

    let collector = UsageCollector::new(&config.usage);
    tracing::debug!(
        extract_conditions = config.usage.extract_conditions,
        "collecting table usage"
    );
    let (stats, summary) = collector
        .collect(entries)
        .with_context(|| format!("Failed to collect usage from {}", entries_path.display()))?;

    let output = match table {
        Some(urn) => serde_json::to_string_pretty(&stats.profile(urn))?,
        None => serde_json::to_string_pretty(&stats.profiles())?,
    };
    println!("{output}");

    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &CollectSummary) {
    eprintln!();
    eprintln!("{}", "Summary".bold());
    eprintln!("  {} {}", "Accepted:".green(), summary.accepted);
    eprintln!("  {} {}", "Rejected:".yellow(), summary.total_rejected());
    for (code, count) in &summary.rejected {
        eprintln!("    {code}: {count}");
    }
    if summary.undecodable > 0 {
        eprintln!("  {} {}", "Undecodable:".red(), summary.undecodable);
    }
}

fn filter_command(config: &Config, table_id: &str) -> Result<()> {
    let window = UsageWindow::last_days(config.usage.usage_period_in_day)?;

    let projects = config.usage_project_ids();
    if !projects.is_empty() {
        eprintln!("{} {}", "Projects:".cyan(), projects.join(", "));
    }

    println!("{}", window.build_filter(table_id));

    Ok(())
}

fn init_command(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("{} already exists", path.display());
    }

    Config::default()
        .save_to_file(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("{} {}", "✓ Wrote".green(), path.display());

    Ok(())
}
