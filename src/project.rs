//! The project aggregate.
//!
//! A [`Project`] is built once per benchmark directory from its
//! `benchmark_config.json`. It owns the surviving tests, knows which
//! databases they use and how the project is classified, and answers
//! best-result queries per test type.

use crate::analysis::{color, density};
use crate::models::{BenchmarkConfig, Classification, Test, TestResult, TestType};
use crate::technology::{classify, Technology, TechnologyFamily};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Default directory name that anchors project roots inside a checkout.
pub const FRAMEWORKS_SEGMENT: &str = "frameworks";

/// Fatal errors raised while building a project.
#[derive(Debug, Error)]
pub enum ProjectError {
    /// The first surviving test declares no language. Carries the whole
    /// configuration as JSON for diagnosis.
    #[error("Language not found for {framework}: {config}")]
    MissingLanguage { framework: String, config: String },
}

/// A benchmarked framework project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Display name of the framework.
    pub framework: String,
    /// Path of the benchmark below the `frameworks` directory.
    pub project_root: String,
    /// Database engines used by any test.
    pub db: BTreeSet<String>,
    /// Non-stripped tests in configuration order.
    pub tests: Vec<Test>,
    pub language: Option<String>,
    pub classification: Option<Classification>,
    pub technology: Option<Technology>,
    /// Source lines in the benchmark directory.
    #[serde(default)]
    pub loc: usize,
    /// Number of implemented (test, test type) pairs.
    #[serde(default)]
    pub test_count: usize,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub density: Option<f32>,
}

impl Project {
    /// Build a project from its configuration and benchmark directory.
    /// `frameworks_dir` is the checkout directory the project root is
    /// taken relative to.
    ///
    /// Stripped tests are dropped. When no test survives the language,
    /// classification and technology stay unset.
    pub fn from_config(
        config: &BenchmarkConfig,
        root: &Path,
        frameworks_dir: &str,
        families: &[TechnologyFamily],
    ) -> Result<Self, ProjectError> {
        let mut project = Self {
            framework: config.framework.clone(),
            project_root: project_root_of(root, frameworks_dir),
            db: BTreeSet::new(),
            tests: Vec::new(),
            language: None,
            classification: None,
            technology: None,
            loc: 0,
            test_count: 0,
            color: None,
            density: None,
        };

        for (name, test) in config.iter_tests() {
            if test.is_stripped() {
                debug!("Ignoring stripped test {} of {}", name, config.framework);
                continue;
            }

            let mut test = test.clone();
            test.name = name.clone();
            if let Some(database) = test.effective_database() {
                project.db.insert(database.to_string());
            }
            project.test_count += test.supported_test_types().len();
            project.tests.push(test);
        }

        let Some(first) = project.tests.first() else {
            return Ok(project);
        };

        let Some(language) = first.language.clone() else {
            return Err(ProjectError::MissingLanguage {
                framework: config.framework.clone(),
                config: serde_json::to_string(config)
                    .unwrap_or_else(|e| format!("<unserializable: {}>", e)),
            });
        };

        project.classification = first.classification;
        project.technology = Some(classify(&language, families));
        project.language = Some(language);

        Ok(project)
    }

    /// Identity used by the project store.
    pub fn id(&self) -> &str {
        &self.project_root
    }

    /// `[language] framework`.
    pub fn label(&self) -> String {
        format!(
            "[{}] {}",
            self.language.as_deref().unwrap_or("unknown"),
            self.framework
        )
    }

    pub fn has_effective_tests(&self) -> bool {
        !self.tests.is_empty()
    }

    /// Find the test with the best result for a test type.
    ///
    /// Tests without a result for the type are skipped. On ties the test
    /// that comes first keeps the spot.
    pub fn best_of(&self, test_type: TestType) -> Option<(&Test, &TestResult)> {
        let mut best: Option<(&Test, &TestResult)> = None;

        for test in &self.tests {
            let Some(result) = test.best_result.get(&test_type) else {
                continue;
            };
            let replace = match best {
                Some((_, current)) => result.is_better_than(current),
                None => true,
            };
            if replace {
                best = Some((test, result));
            }
        }

        best
    }

    /// Recompute the project color and the color of every test.
    pub fn update_colors(&mut self) {
        self.color = Some(color::project_color(self));
        let test_colors: Vec<String> = self
            .tests
            .iter()
            .map(|test| color::test_color(self, test))
            .collect();
        for (test, c) in self.tests.iter_mut().zip(test_colors) {
            test.color = Some(c);
        }
    }

    pub fn calculate_density(&mut self) {
        self.density = density::calculate(self);
    }
}

/// The part of the absolute path after the first occurrence of
/// `frameworks_dir` (`frameworks` in a stock checkout).
pub fn project_root_of(root: &Path, frameworks_dir: &str) -> String {
    let absolute = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
    let path = absolute.to_string_lossy();
    let segment = frameworks_dir.trim_start_matches("./").trim_matches('/');

    match path.find(segment).filter(|_| !segment.is_empty()) {
        Some(idx) => path[idx + segment.len()..].to_string(),
        None => {
            warn!(
                "No '{}' segment in {}, keeping the full path",
                segment, path
            );
            path.into_owned()
        }
    }
}
