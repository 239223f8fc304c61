//! Project aggregation and statistics.
//!
//! This module provides utilities for summarizing a set of projects:
//! distributions by technology, language and database, and per test type
//! leaderboards built from each project's best result.

use crate::models::{Test, TestResult, TestType};
use crate::project::Project;
use crate::technology::Technology;
use std::collections::{BTreeMap, HashMap};

/// One row of a test type leaderboard.
#[derive(Debug, Clone, Copy)]
pub struct LeaderboardEntry<'a> {
    pub project: &'a Project,
    pub test: &'a Test,
    pub result: &'a TestResult,
}

/// Count projects per technology. Unclassified projects are not counted.
pub fn technology_distribution(projects: &[Project]) -> BTreeMap<Technology, usize> {
    let mut dist = BTreeMap::new();

    for technology in projects.iter().filter_map(|p| p.technology) {
        *dist.entry(technology).or_default() += 1;
    }

    dist
}

/// Count projects per implementation language.
pub fn language_distribution(projects: &[Project]) -> HashMap<String, usize> {
    let mut dist: HashMap<String, usize> = HashMap::new();

    for language in projects.iter().filter_map(|p| p.language.as_ref()) {
        *dist.entry(language.clone()).or_default() += 1;
    }

    dist
}

/// Count projects using each database engine.
pub fn database_usage(projects: &[Project]) -> HashMap<String, usize> {
    let mut usage: HashMap<String, usize> = HashMap::new();

    for db in projects.iter().flat_map(|p| p.db.iter()) {
        *usage.entry(db.clone()).or_default() += 1;
    }

    usage
}

/// Total number of tests across projects.
pub fn total_tests(projects: &[Project]) -> usize {
    projects.iter().map(|p| p.tests.len()).sum()
}

/// Rank projects by their best result for a test type, best first.
///
/// Projects without a result for the type are left out. Equal results
/// keep input order.
pub fn leaderboard(projects: &[Project], test_type: TestType, n: usize) -> Vec<LeaderboardEntry<'_>> {
    let mut entries: Vec<LeaderboardEntry<'_>> = projects
        .iter()
        .filter_map(|project| {
            project
                .best_of(test_type)
                .map(|(test, result)| LeaderboardEntry {
                    project,
                    test,
                    result,
                })
        })
        .collect();

    entries.sort_by(|a, b| {
        b.result
            .requests_per_second
            .partial_cmp(&a.result.requests_per_second)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    entries.truncate(n);

    entries
}

/// Projects with the highest test density.
pub fn densest_projects(projects: &[Project], n: usize) -> Vec<(&Project, f32)> {
    let mut dense: Vec<_> = projects
        .iter()
        .filter_map(|p| p.density.map(|d| (p, d)))
        .collect();

    dense.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    dense.truncate(n);

    dense
}
