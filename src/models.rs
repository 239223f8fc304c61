//! Data models for benchmark insight.
//!
//! This module contains the value types read from `benchmark_config.json`
//! files, the per-test result type and the report structures written at
//! the end of a run.

use crate::project::Project;
use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Implementation style tag of a benchmark test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Approach {
    /// Production-grade implementation.
    Realistic,
    /// Hand-tuned variant excluded from insight.
    Stripped,
    /// Any value not known to this tool.
    #[serde(other)]
    Other,
}

impl fmt::Display for Approach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Approach::Realistic => write!(f, "Realistic"),
            Approach::Stripped => write!(f, "Stripped"),
            Approach::Other => write!(f, "Other"),
        }
    }
}

/// Category label applied to a test by its configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    Fullstack,
    Micro,
    Platform,
    #[serde(other)]
    Other,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Fullstack => write!(f, "Fullstack"),
            Classification::Micro => write!(f, "Micro"),
            Classification::Platform => write!(f, "Platform"),
            Classification::Other => write!(f, "Other"),
        }
    }
}

/// An axis of benchmark measurement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Json,
    Db,
    Query,
    Fortune,
    Update,
    Plaintext,
    #[serde(alias = "cached-query")]
    CachedQuery,
}

impl TestType {
    /// All test types in report order.
    pub const ALL: [TestType; 7] = [
        TestType::Json,
        TestType::Db,
        TestType::Query,
        TestType::Fortune,
        TestType::Update,
        TestType::Plaintext,
        TestType::CachedQuery,
    ];

    /// Key used for this test type in `results.json`.
    pub fn key(&self) -> &'static str {
        match self {
            TestType::Json => "json",
            TestType::Db => "db",
            TestType::Query => "query",
            TestType::Fortune => "fortune",
            TestType::Update => "update",
            TestType::Plaintext => "plaintext",
            TestType::CachedQuery => "cached_query",
        }
    }

    /// Parse a results key, accepting the legacy dashed spelling.
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "json" => Some(TestType::Json),
            "db" => Some(TestType::Db),
            "query" => Some(TestType::Query),
            "fortune" => Some(TestType::Fortune),
            "update" => Some(TestType::Update),
            "plaintext" => Some(TestType::Plaintext),
            "cached_query" | "cached-query" => Some(TestType::CachedQuery),
            _ => None,
        }
    }

    /// Whether samples of this type are indexed by query count rather than
    /// by client concurrency.
    pub fn uses_query_intervals(&self) -> bool {
        matches!(
            self,
            TestType::Query | TestType::Update | TestType::CachedQuery
        )
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestType::Json => write!(f, "JSON Serialization"),
            TestType::Db => write!(f, "Single Query"),
            TestType::Query => write!(f, "Multiple Queries"),
            TestType::Fortune => write!(f, "Fortunes"),
            TestType::Update => write!(f, "Data Updates"),
            TestType::Plaintext => write!(f, "Plaintext"),
            TestType::CachedQuery => write!(f, "Cached Queries"),
        }
    }
}

/// Best measured outcome of one test for one test type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    /// Throughput of the best sample.
    pub requests_per_second: f64,
    /// Average latency of the best sample in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_avg_ms: Option<f64>,
    /// Concurrency level (or query count) the best sample ran at.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<u32>,
    /// Non-2xx responses reported for the best sample.
    #[serde(default)]
    pub errors: u64,
}

impl TestResult {
    pub fn new(requests_per_second: f64) -> Self {
        Self {
            requests_per_second,
            latency_avg_ms: None,
            concurrency: None,
            errors: 0,
        }
    }

    /// Strict ordering used for best-of selection: higher throughput wins,
    /// equal throughput is not better.
    pub fn is_better_than(&self, other: &TestResult) -> bool {
        self.requests_per_second > other.requests_per_second
    }
}

/// A single benchmark test as declared in `benchmark_config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Test {
    /// Key the test appeared under in its configuration.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub approach: Option<Approach>,
    #[serde(default)]
    pub classification: Option<Classification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webserver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versus: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fortune_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plaintext_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cached_query_url: Option<String>,
    /// Best result per test type, filled in by results ingestion.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub best_result: BTreeMap<TestType, TestResult>,
    /// Display color, see [`crate::analysis::color`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl Test {
    /// Whether the configuration marks this test as stripped.
    pub fn is_stripped(&self) -> bool {
        self.approach == Some(Approach::Stripped)
    }

    /// The database engine, unless blank or the `none` sentinel.
    pub fn effective_database(&self) -> Option<&str> {
        self.database
            .as_deref()
            .map(str::trim)
            .filter(|db| !db.is_empty() && !db.eq_ignore_ascii_case("none"))
    }

    /// Test types this test declares an endpoint for.
    pub fn supported_test_types(&self) -> Vec<TestType> {
        TestType::ALL
            .into_iter()
            .filter(|t| self.url_for(*t).is_some())
            .collect()
    }

    /// Endpoint declared for a test type.
    pub fn url_for(&self, test_type: TestType) -> Option<&str> {
        let url = match test_type {
            TestType::Json => &self.json_url,
            TestType::Db => &self.db_url,
            TestType::Query => &self.query_url,
            TestType::Fortune => &self.fortune_url,
            TestType::Update => &self.update_url,
            TestType::Plaintext => &self.plaintext_url,
            TestType::CachedQuery => &self.cached_query_url,
        };
        url.as_deref().filter(|u| !u.trim().is_empty())
    }

    /// Identifier of this test in round results: the framework name for the
    /// `default` test, `framework-name` otherwise.
    pub fn result_key(&self, framework: &str) -> String {
        if self.name == "default" {
            framework.to_string()
        } else {
            format!("{}-{}", framework, self.name)
        }
    }
}

/// One mapping of test name to test in a benchmark configuration.
///
/// Entries keep the order they have in the document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TestGroup(pub Vec<(String, Test)>);

impl Serialize for TestGroup {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, test) in &self.0 {
            map.serialize_entry(name, test)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TestGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupVisitor;

        impl<'de> Visitor<'de> for GroupVisitor {
            type Value = TestGroup;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of test name to test definition")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TestGroup, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((name, test)) = access.next_entry::<String, Test>()? {
                    entries.push((name, test));
                }
                Ok(TestGroup(entries))
            }
        }

        deserializer.deserialize_map(GroupVisitor)
    }
}

/// Parsed `benchmark_config.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    pub framework: String,
    #[serde(default)]
    pub tests: Vec<TestGroup>,
}

impl BenchmarkConfig {
    /// Iterate all `(name, test)` pairs, mapping by mapping.
    pub fn iter_tests(&self) -> impl Iterator<Item = (&String, &Test)> {
        self.tests
            .iter()
            .flat_map(|group| group.0.iter().map(|(name, test)| (name, test)))
    }
}

/// A benchmark directory whose configuration could not be turned into a
/// project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedProject {
    /// Directory of the benchmark, relative to the frameworks root.
    pub directory: String,
    /// Error message including diagnostics.
    pub error: String,
}

/// Metadata about an insight run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Repository URL or local path the projects came from.
    pub source: String,
    /// Short commit hash of the checkout, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<String>,
    /// Results source applied to the projects, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results_source: Option<String>,
    pub analysis_date: DateTime<Utc>,
    pub projects_analyzed: usize,
    pub projects_failed: usize,
    pub tests_analyzed: usize,
    pub duration_seconds: f64,
}

/// The complete insight report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub metadata: ReportMetadata,
    pub projects: Vec<Project>,
    #[serde(default)]
    pub failures: Vec<FailedProject>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "framework": "gemini",
        "tests": [{
            "default": {
                "json_url": "/json",
                "plaintext_url": "/plaintext",
                "approach": "Realistic",
                "classification": "Fullstack",
                "database": "None",
                "language": "Java",
                "orm": "Micro"
            },
            "postgres": {
                "db_url": "/db",
                "query_url": "/query?queries=",
                "approach": "Stripped",
                "classification": "Fullstack",
                "database": "Postgres",
                "language": "Java"
            },
            "mysql": {
                "db_url": "/db",
                "approach": "Realistic",
                "classification": "Micro",
                "database": "MySQL",
                "language": "Java"
            }
        }]
    }"#;

    #[test]
    fn test_parse_config_preserves_key_order() {
        let config: BenchmarkConfig = serde_json::from_str(CONFIG).unwrap();
        let names: Vec<&str> = config.iter_tests().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["default", "postgres", "mysql"]);
        assert_eq!(config.framework, "gemini");
    }

    #[test]
    fn test_parse_enums() {
        let config: BenchmarkConfig = serde_json::from_str(CONFIG).unwrap();
        let tests: Vec<&Test> = config.iter_tests().map(|(_, t)| t).collect();
        assert_eq!(tests[0].approach, Some(Approach::Realistic));
        assert!(tests[1].is_stripped());
        assert_eq!(tests[2].classification, Some(Classification::Micro));
    }

    #[test]
    fn test_unknown_approach_is_other() {
        let test: Test = serde_json::from_str(r#"{"approach": "Experimental"}"#).unwrap();
        assert_eq!(test.approach, Some(Approach::Other));
        assert!(!test.is_stripped());
    }

    #[test]
    fn test_effective_database() {
        let mut test = Test::default();
        assert_eq!(test.effective_database(), None);

        test.database = Some("NONE".to_string());
        assert_eq!(test.effective_database(), None);

        test.database = Some("  ".to_string());
        assert_eq!(test.effective_database(), None);

        test.database = Some("Postgres".to_string());
        assert_eq!(test.effective_database(), Some("Postgres"));

        test.database = Some(" Postgres\t".to_string());
        assert_eq!(test.effective_database(), Some("Postgres"));

        test.database = Some(" none ".to_string());
        assert_eq!(test.effective_database(), None);
    }

    #[test]
    fn test_supported_test_types() {
        let config: BenchmarkConfig = serde_json::from_str(CONFIG).unwrap();
        let (_, first) = config.iter_tests().next().unwrap();
        assert_eq!(
            first.supported_test_types(),
            vec![TestType::Json, TestType::Plaintext]
        );
    }

    #[test]
    fn test_result_key() {
        let mut test = Test {
            name: "default".to_string(),
            ..Test::default()
        };
        assert_eq!(test.result_key("gemini"), "gemini");

        test.name = "postgres".to_string();
        assert_eq!(test.result_key("gemini"), "gemini-postgres");
    }

    #[test]
    fn test_test_type_keys() {
        assert_eq!(TestType::from_key("cached-query"), Some(TestType::CachedQuery));
        assert_eq!(TestType::from_key("cached_query"), Some(TestType::CachedQuery));
        assert_eq!(TestType::from_key("websocket"), None);
        for t in TestType::ALL {
            assert_eq!(TestType::from_key(t.key()), Some(t));
        }
    }

    #[test]
    fn test_is_better_than_is_strict() {
        let fast = TestResult::new(2000.0);
        let slow = TestResult::new(1000.0);
        assert!(fast.is_better_than(&slow));
        assert!(!slow.is_better_than(&fast));
        assert!(!fast.is_better_than(&fast.clone()));
    }

    #[test]
    fn test_best_result_map_serializes_with_string_keys() {
        let mut test = Test::default();
        test.best_result
            .insert(TestType::CachedQuery, TestResult::new(10.0));
        let json = serde_json::to_string(&test).unwrap();
        assert!(json.contains("\"cached_query\""));

        let back: Test = serde_json::from_str(&json).unwrap();
        assert_eq!(back.best_result.len(), 1);
    }
}
