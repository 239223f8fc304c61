//! Benchmark directory scanner.
//!
//! Discovers benchmark directories (those holding a
//! `benchmark_config.json`) below a checkout's frameworks directory, loads
//! their configuration and counts their source lines.

use crate::models::BenchmarkConfig;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Name of the per-benchmark configuration file.
pub const CONFIG_FILE_NAME: &str = "benchmark_config.json";

/// `frameworks/<Language>/<benchmark>/benchmark_config.json`
const CONFIG_DEPTH: usize = 3;

/// Configuration for scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Source file extensions counted as code (e.g., ["rs", "java"])
    pub extensions: Vec<String>,
    /// Directory or file names to skip (e.g., ["target", "node_modules"])
    pub excludes: Vec<String>,
    /// Files above this size in bytes are not counted
    pub max_file_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::from(&crate::config::ScannerConfig::default())
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
        }
    }
}

/// A discovered benchmark directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BenchmarkDir {
    /// Absolute or caller-relative path of the directory
    pub path: PathBuf,
    /// Path relative to the frameworks root (e.g. `Java/gemini`)
    pub relative: String,
}

impl BenchmarkDir {
    pub fn config_path(&self) -> PathBuf {
        self.path.join(CONFIG_FILE_NAME)
    }
}

/// Scanner over a frameworks directory.
pub struct BenchmarkScanner {
    config: ScanConfig,
    frameworks_root: PathBuf,
}

impl BenchmarkScanner {
    pub fn new(frameworks_root: PathBuf, config: ScanConfig) -> Self {
        Self {
            config,
            frameworks_root,
        }
    }

    /// Find all benchmark directories, sorted by path.
    pub fn discover(&self) -> Result<Vec<BenchmarkDir>> {
        if !self.frameworks_root.is_dir() {
            anyhow::bail!(
                "Frameworks directory not found: {}",
                self.frameworks_root.display()
            );
        }

        let dirs = WalkDir::new(&self.frameworks_root)
            .max_depth(CONFIG_DEPTH)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded_entry(e))
            .filter_map(|e| match e {
                Ok(entry) => Some(entry),
                Err(err) => {
                    debug!("Cannot read entry: {}", err);
                    None
                }
            })
            .filter(|e| e.file_type().is_file() && e.file_name() == CONFIG_FILE_NAME)
            .filter_map(|e| e.path().parent().map(Path::to_path_buf))
            .map(|path| {
                let relative = path
                    .strip_prefix(&self.frameworks_root)
                    .unwrap_or(&path)
                    .to_string_lossy()
                    .to_string();
                BenchmarkDir { path, relative }
            })
            .collect();

        Ok(dirs)
    }

    /// Read and parse the configuration of a benchmark directory.
    pub fn load_config(&self, dir: &BenchmarkDir) -> Result<BenchmarkConfig> {
        load_config(&dir.config_path())
    }

    /// Count lines of source files below a benchmark directory.
    pub fn count_lines(&self, dir: &Path) -> usize {
        WalkDir::new(dir)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded_entry(e))
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && self.matches(e.path()))
            .map(|e| match fs::read_to_string(e.path()) {
                Ok(content) => content.lines().count(),
                Err(err) => {
                    debug!("Skipping {}: {}", e.path().display(), err);
                    0
                }
            })
            .sum()
    }

    /// Check if a file counts as source code.
    pub fn matches(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        if !self.config.extensions.iter().any(|e| e == ext) {
            return false;
        }

        match fs::metadata(path) {
            Ok(metadata) => metadata.len() <= self.config.max_file_size as u64,
            Err(_) => false,
        }
    }

    fn is_excluded_entry(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        self.is_excluded(&name)
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        // Hidden files
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern)
    }
}

/// Read and parse a `benchmark_config.json`.
pub fn load_config(path: &Path) -> Result<BenchmarkConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read benchmark config: {}", path.display()))?;

    let config: BenchmarkConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse benchmark config: {}", path.display()))?;

    if config.tests.is_empty() {
        warn!("Benchmark config {} declares no tests", path.display());
    }

    Ok(config)
}
