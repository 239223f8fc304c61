//! Round results ingestion.
//!
//! Reads a TFB round `results.json`, reduces the raw samples of every
//! test to its best [`TestResult`] per test type and attaches those to the
//! tests of the matching projects.

use crate::models::{TestResult, TestType};
use crate::project::Project;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Best result per test type, keyed by result identifier.
pub type BestResults = HashMap<String, BTreeMap<TestType, TestResult>>;

/// The parts of `results.json` this tool reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundResults {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub concurrency_levels: Vec<u32>,
    #[serde(default)]
    pub query_intervals: Vec<u32>,
    /// `testType -> testId -> samples`.
    #[serde(default)]
    pub raw_data: BTreeMap<String, BTreeMap<String, Vec<RawSample>>>,
}

/// One load-generator run.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSample {
    #[serde(rename = "totalRequests", default)]
    pub total_requests: Option<f64>,
    #[serde(rename = "startTime", default)]
    pub start_time: Option<f64>,
    #[serde(rename = "endTime", default)]
    pub end_time: Option<f64>,
    #[serde(rename = "latencyAvg", default)]
    pub latency_avg: Option<String>,
    #[serde(rename = "5xx", default)]
    pub server_errors: Option<u64>,
}

impl RawSample {
    /// Requests per second, if the sample has a positive duration.
    pub fn requests_per_second(&self) -> Option<f64> {
        let total = self.total_requests?;
        let duration = self.end_time? - self.start_time?;
        (duration > 0.0).then(|| total / duration)
    }
}

impl RoundResults {
    /// Reduce raw samples to the best result per test and test type.
    pub fn best_results(&self) -> BestResults {
        let mut best: BestResults = HashMap::new();

        for (type_key, tests) in &self.raw_data {
            let Some(test_type) = TestType::from_key(type_key) else {
                debug!("Skipping unknown test type in results: {}", type_key);
                continue;
            };
            let levels = if test_type.uses_query_intervals() {
                &self.query_intervals
            } else {
                &self.concurrency_levels
            };

            for (test_id, samples) in tests {
                let Some(result) = best_sample(samples, levels) else {
                    continue;
                };
                best.entry(test_id.clone())
                    .or_default()
                    .insert(test_type, result);
            }
        }

        best
    }
}

fn best_sample(samples: &[RawSample], levels: &[u32]) -> Option<TestResult> {
    let mut best: Option<TestResult> = None;

    for (idx, sample) in samples.iter().enumerate() {
        let Some(rps) = sample.requests_per_second() else {
            continue;
        };
        let candidate = TestResult {
            latency_avg_ms: sample.latency_avg.as_deref().and_then(parse_latency_ms),
            concurrency: levels.get(idx).copied(),
            errors: sample.server_errors.unwrap_or(0),
            ..TestResult::new(rps)
        };
        let replace = match &best {
            Some(current) => candidate.is_better_than(current),
            None => true,
        };
        if replace {
            best = Some(candidate);
        }
    }

    best
}

/// Parse a wrk latency such as `1.25ms`, `830.00us` or `2.01s`.
pub fn parse_latency_ms(latency: &str) -> Option<f64> {
    let latency = latency.trim();
    let parse = |v: &str| v.trim().parse::<f64>().ok();

    if let Some(v) = latency.strip_suffix("us") {
        parse(v).map(|us| us / 1000.0)
    } else if let Some(v) = latency.strip_suffix("ms") {
        parse(v)
    } else if let Some(v) = latency.strip_suffix('m') {
        parse(v).map(|m| m * 60_000.0)
    } else if let Some(v) = latency.strip_suffix('s') {
        parse(v).map(|s| s * 1000.0)
    } else {
        parse(latency)
    }
}

/// Attach best results to project tests. Returns the number of tests that
/// received at least one result.
pub fn apply(projects: &mut [Project], best: &BestResults) -> usize {
    let mut matched = 0;

    for project in projects.iter_mut() {
        let framework = project.framework.clone();
        for test in project.tests.iter_mut() {
            if let Some(results) = best.get(&test.result_key(&framework)) {
                test.best_result
                    .extend(results.iter().map(|(t, r)| (*t, r.clone())));
                matched += 1;
            }
        }
    }

    matched
}

/// Load round results from a file path or an http(s) URL.
pub async fn load(source: &str, timeout_seconds: u64) -> Result<RoundResults> {
    if source.starts_with("http://") || source.starts_with("https://") {
        info!("Fetching results from {}", source);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        let response = client.get(source).send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow::anyhow!("Request timed out after {}s", timeout_seconds)
            } else {
                anyhow::anyhow!("Failed to fetch results: {}", e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow::anyhow!("Results server error {}: {}", status, body));
        }

        response
            .json()
            .await
            .context("Failed to parse results response")
    } else {
        let path = Path::new(source);
        info!("Reading results from {}", path.display());
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read results file: {}", path.display()))?;
        let results: RoundResults = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse results file: {}", path.display()))?;
        if results.raw_data.is_empty() {
            warn!("Results file {} contains no raw data", path.display());
        }
        Ok(results)
    }
}
