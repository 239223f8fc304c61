//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.tfb-insight.toml` files.

use crate::technology::{Technology, TechnologyFamily, DOT_NET_LANGUAGES, JVM_LANGUAGES};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".tfb-insight.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Where the benchmark checkout comes from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Technology classifier settings.
    #[serde(default)]
    pub classifier: ClassifierConfig,

    /// Round results settings.
    #[serde(default)]
    pub results: ResultsConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Project store settings.
    #[serde(default)]
    pub store: StoreConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Number of projects built in parallel.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Report broken benchmark configs instead of aborting the run.
    #[serde(default)]
    pub keep_going: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
            concurrency: default_concurrency(),
            keep_going: false,
        }
    }
}

fn default_output() -> String {
    "tfb_insight_report.md".to_string()
}

fn default_concurrency() -> usize {
    4
}

/// Benchmark checkout settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Repository to clone when no local checkout is given.
    #[serde(default = "default_repo_url")]
    pub repo_url: String,

    /// Branch to check out (None for the default branch).
    #[serde(default)]
    pub branch: Option<String>,

    /// Directory below the checkout holding the benchmarks.
    #[serde(default = "default_frameworks_dir")]
    pub frameworks_dir: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            repo_url: default_repo_url(),
            branch: None,
            frameworks_dir: default_frameworks_dir(),
        }
    }
}

pub fn default_repo_url() -> String {
    "https://github.com/TechEmpower/FrameworkBenchmarks.git".to_string()
}

fn default_frameworks_dir() -> String {
    crate::project::FRAMEWORKS_SEGMENT.to_string()
}

/// Source line counting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// File extensions counted as source code.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory or file names to skip.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec![
        "rs", "py", "js", "ts", "go", "java", "kt", "scala", "groovy", "clj", "c", "cpp", "h",
        "hpp", "cs", "fs", "vb", "rb", "php", "swift", "ex", "exs", "erl", "hs", "ml", "cr", "nim",
        "d", "dart", "lua", "pl", "v", "zig",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_excludes() -> Vec<String> {
    vec![
        ".git",
        "target",
        "node_modules",
        "vendor",
        "dist",
        "build",
        "bin",
        "obj",
        "__pycache__",
        ".venv",
        "venv",
        ".idea",
        ".vscode",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_file_size() -> usize {
    1024 * 1024 // 1MB
}

/// Languages claimed by each technology family.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_jvm")]
    pub jvm: Vec<String>,

    #[serde(default = "default_dotnet")]
    pub dotnet: Vec<String>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            jvm: default_jvm(),
            dotnet: default_dotnet(),
        }
    }
}

fn default_jvm() -> Vec<String> {
    JVM_LANGUAGES.into_iter().map(String::from).collect()
}

fn default_dotnet() -> Vec<String> {
    DOT_NET_LANGUAGES.into_iter().map(String::from).collect()
}

impl ClassifierConfig {
    /// Ordered families for classification: JVM, then .NET.
    pub fn families(&self) -> Vec<TechnologyFamily> {
        vec![
            TechnologyFamily::new(Technology::Jvm, self.jvm.iter().cloned()),
            TechnologyFamily::new(Technology::DotNet, self.dotnet.iter().cloned()),
        ]
    }
}

/// Round results settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsConfig {
    /// Path or http(s) URL of a `results.json`.
    #[serde(default)]
    pub source: Option<String>,

    /// Request timeout in seconds for remote results.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            source: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

/// Report generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Entries per test type leaderboard.
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,

    /// List individual tests under each project.
    #[serde(default = "default_true")]
    pub include_tests: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            leaderboard_size: default_leaderboard_size(),
            include_tests: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_leaderboard_size() -> usize {
    10
}

/// Project store settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory of the JSON project store.
    #[serde(default)]
    pub path: Option<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings when given.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref repo) = args.repo {
            self.source.repo_url = repo.clone();
        }
        if let Some(ref branch) = args.branch {
            self.source.branch = Some(branch.clone());
        }
        if let Some(ref output) = args.output {
            self.general.output = output.to_string_lossy().to_string();
        } else if self.general.output == default_output() {
            self.general.output = Path::new(&self.general.output)
                .with_extension(args.format.extension())
                .to_string_lossy()
                .to_string();
        }
        if let Some(concurrency) = args.concurrency {
            self.general.concurrency = concurrency;
        }
        if let Some(ref results) = args.results {
            self.results.source = Some(results.clone());
        }
        if let Some(timeout) = args.timeout {
            self.results.timeout_seconds = timeout;
        }
        if let Some(top) = args.top {
            self.report.leaderboard_size = top;
        }
        if let Some(ref store) = args.store {
            self.store.path = Some(store.to_string_lossy().to_string());
        }

        // Flags always override
        if args.keep_going {
            self.general.keep_going = true;
        }
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
