//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// TFB Insight - project insight for TechEmpower Framework Benchmarks
///
/// Scans a FrameworkBenchmarks checkout, classifies every benchmark
/// project, attaches round results and writes a Markdown/JSON report.
///
/// Examples:
///   tfb-insight
///   tfb-insight --local ./FrameworkBenchmarks --results results.json
///   tfb-insight --local ./FrameworkBenchmarks --store .insight --format json
///   tfb-insight --store .insight --from-store
///   tfb-insight --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// FrameworkBenchmarks repository URL to clone
    ///
    /// Defaults to the upstream TechEmpower repository.
    #[arg(short, long, value_name = "URL", env = "TFB_INSIGHT_REPO")]
    pub repo: Option<String>,

    /// Local checkout to analyze instead of cloning
    #[arg(long, value_name = "DIR")]
    pub local: Option<PathBuf>,

    /// Specific branch to analyze
    #[arg(short, long, value_name = "BRANCH")]
    pub branch: Option<String>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .tfb-insight.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Round results to attach (path or http(s) URL of results.json)
    #[arg(long, value_name = "SOURCE", env = "TFB_INSIGHT_RESULTS")]
    pub results: Option<String>,

    /// Timeout in seconds when fetching remote results
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Directory of the JSON project store
    #[arg(long, value_name = "DIR")]
    pub store: Option<PathBuf>,

    /// Build the report from stored projects without scanning
    #[arg(long, requires = "store")]
    pub from_store: bool,

    /// Report broken benchmark configs instead of aborting
    ///
    /// Exit code 2 when any project failed.
    #[arg(long)]
    pub keep_going: bool,

    /// Number of projects built in parallel
    #[arg(long, value_name = "NUM")]
    pub concurrency: Option<usize>,

    /// Entries per test type leaderboard
    #[arg(long, value_name = "COUNT")]
    pub top: Option<usize>,

    /// Dry run: list discovered benchmark directories and exit
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .tfb-insight.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl OutputFormat {
    /// File extension of reports in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Markdown => "md",
            OutputFormat::Json => "json",
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if let Some(ref repo) = self.repo {
            if !repo.starts_with("https://") && !repo.starts_with("git@") {
                return Err("Repository URL must start with 'https://' or 'git@'".to_string());
            }
        }

        if self.repo.is_some() && self.local.is_some() {
            return Err("Cannot use both --repo and --local".to_string());
        }

        if self.concurrency == Some(0) {
            return Err("Concurrency must be at least 1".to_string());
        }

        if self.top == Some(0) {
            return Err("Leaderboard size must be at least 1".to_string());
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.from_store && self.dry_run {
            return Err("Cannot use both --from-store and --dry-run".to_string());
        }

        // Validate local directory if provided
        if let Some(ref local_path) = self.local {
            if !local_path.exists() {
                return Err(format!(
                    "Local directory does not exist: {}",
                    local_path.display()
                ));
            }
            if !local_path.is_dir() {
                return Err(format!(
                    "Local path is not a directory: {}",
                    local_path.display()
                ));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
