//! Markdown report generation.
//!
//! This module generates Markdown and JSON insight reports from the
//! built projects.

use crate::analysis::{
    database_usage, densest_projects, language_distribution, leaderboard, technology_distribution,
};
use crate::config::ReportConfig;
use crate::models::{FailedProject, Report, ReportMetadata, TestType};
use crate::project::Project;
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &Report, options: &ReportConfig) -> String {
    let mut output = String::new();

    output.push_str("# TFB Insight Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata));
    output.push_str(&generate_table_of_contents(report));
    output.push_str(&generate_summary_section(&report.projects));
    output.push_str(&generate_leaderboard_section(
        &report.projects,
        options.leaderboard_size,
    ));
    output.push_str(&generate_projects_section(
        &report.projects,
        options.include_tests,
    ));
    output.push_str(&generate_failures_section(&report.failures));
    output.push_str(&generate_footer());

    output
}

/// Generate the metadata section.
fn generate_metadata_section(metadata: &ReportMetadata) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Source:** {}\n", metadata.source));
    if let Some(ref commit) = metadata.commit {
        section.push_str(&format!("- **Commit:** `{}`\n", commit));
    }
    if let Some(ref results) = metadata.results_source {
        section.push_str(&format!("- **Results:** {}\n", results));
    }
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!(
        "- **Projects Analyzed:** {}\n",
        metadata.projects_analyzed
    ));
    if metadata.projects_failed > 0 {
        section.push_str(&format!(
            "- **Projects Failed:** {}\n",
            metadata.projects_failed
        ));
    }
    section.push_str(&format!("- **Tests:** {}\n", metadata.tests_analyzed));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n",
        metadata.duration_seconds
    ));
    section.push('\n');

    section
}

/// Generate the table of contents.
fn generate_table_of_contents(report: &Report) -> String {
    let mut toc = String::new();

    toc.push_str("## Table of Contents\n\n");
    toc.push_str("- [Metadata](#metadata)\n");
    toc.push_str("- [Summary](#summary)\n");
    toc.push_str("- [Leaderboards](#leaderboards)\n");
    toc.push_str("- [Projects](#projects)\n");
    if !report.failures.is_empty() {
        toc.push_str("- [Failed Projects](#failed-projects)\n");
    }
    toc.push('\n');

    toc
}

/// Generate the summary section.
fn generate_summary_section(projects: &[Project]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");

    let technologies = technology_distribution(projects);
    if !technologies.is_empty() {
        section.push_str("### Projects by Technology\n\n");
        section.push_str("| Technology | Projects |\n");
        section.push_str("|:---|:---:|\n");
        for (technology, count) in &technologies {
            section.push_str(&format!("| {} | {} |\n", technology, count));
        }
        section.push('\n');
    }

    let languages = language_distribution(projects);
    if !languages.is_empty() {
        section.push_str("### Projects by Language\n\n");
        section.push_str("| Language | Projects |\n");
        section.push_str("|:---|:---:|\n");

        let mut langs: Vec<_> = languages.iter().collect();
        langs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (lang, count) in langs {
            section.push_str(&format!("| {} | {} |\n", lang, count));
        }
        section.push('\n');
    }

    let databases = database_usage(projects);
    if !databases.is_empty() {
        section.push_str("### Database Usage\n\n");
        section.push_str("| Database | Projects |\n");
        section.push_str("|:---|:---:|\n");

        let mut dbs: Vec<_> = databases.iter().collect();
        dbs.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

        for (db, count) in dbs {
            section.push_str(&format!("| {} | {} |\n", db, count));
        }
        section.push('\n');
    }

    let dense = densest_projects(projects, 5);
    if !dense.is_empty() {
        section.push_str("### Densest Projects\n\n");
        section.push_str("| Project | Tests per 1k LOC |\n");
        section.push_str("|:---|:---:|\n");
        for (project, density) in dense {
            section.push_str(&format!("| {} | {:.2} |\n", project.label(), density));
        }
        section.push('\n');
    }

    section
}

/// Generate one leaderboard per test type that has results.
fn generate_leaderboard_section(projects: &[Project], size: usize) -> String {
    let mut section = String::new();

    section.push_str("## Leaderboards\n\n");

    let mut any = false;
    for test_type in TestType::ALL {
        let board = leaderboard(projects, test_type, size);
        if board.is_empty() {
            continue;
        }
        any = true;

        section.push_str(&format!("### {}\n\n", test_type));
        section.push_str("| # | Project | Test | Requests/s | Latency | Concurrency |\n");
        section.push_str("|:---:|:---|:---|---:|---:|:---:|\n");

        for (rank, entry) in board.iter().enumerate() {
            let latency = entry
                .result
                .latency_avg_ms
                .map(|ms| format!("{:.2}ms", ms))
                .unwrap_or_else(|| "-".to_string());
            let concurrency = entry
                .result
                .concurrency
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string());

            section.push_str(&format!(
                "| {} | {} | {} | {:.0} | {} | {} |\n",
                rank + 1,
                entry.project.label(),
                entry.test.name,
                entry.result.requests_per_second,
                latency,
                concurrency
            ));
        }
        section.push('\n');
    }

    if !any {
        section.push_str("No round results were attached to the projects.\n\n");
    }

    section
}

/// Generate the projects section.
fn generate_projects_section(projects: &[Project], include_tests: bool) -> String {
    let mut section = String::new();

    section.push_str("## Projects\n\n");

    if projects.is_empty() {
        section.push_str("No projects were found.\n\n");
        return section;
    }

    section.push_str(
        "| Project | Path | Technology | Classification | Databases | Tests | LOC | Density | Color |\n",
    );
    section.push_str("|:---|:---|:---|:---|:---|:---:|---:|---:|:---:|\n");

    for project in projects {
        section.push_str(&format!(
            "| {} | `{}` | {} | {} | {} | {} | {} | {} | {} |\n",
            project.label(),
            project.project_root,
            display_or_dash(project.technology),
            display_or_dash(project.classification),
            if project.db.is_empty() {
                "-".to_string()
            } else {
                project.db.iter().cloned().collect::<Vec<_>>().join(", ")
            },
            project.tests.len(),
            project.loc,
            project
                .density
                .map(|d| format!("{:.2}", d))
                .unwrap_or_else(|| "-".to_string()),
            project.color.as_deref().unwrap_or("-"),
        ));
    }
    section.push('\n');

    if include_tests {
        for project in projects.iter().filter(|p| p.has_effective_tests()) {
            section.push_str(&generate_project_tests_section(project));
        }
    }

    section
}

/// Generate the test table of a single project.
fn generate_project_tests_section(project: &Project) -> String {
    let mut section = String::new();

    section.push_str(&format!("### {}\n\n", project.label()));
    section.push_str("| Test | Approach | Classification | Database | Test Types | Color |\n");
    section.push_str("|:---|:---|:---|:---|:---|:---:|\n");

    for test in &project.tests {
        let types: Vec<&str> = test
            .supported_test_types()
            .iter()
            .map(|t| t.key())
            .collect();

        section.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            test.name,
            display_or_dash(test.approach),
            display_or_dash(test.classification),
            test.effective_database().unwrap_or("-"),
            if types.is_empty() {
                "-".to_string()
            } else {
                types.join(", ")
            },
            test.color.as_deref().unwrap_or("-"),
        ));
    }
    section.push('\n');

    section
}

/// Generate the failed projects section.
fn generate_failures_section(failures: &[FailedProject]) -> String {
    if failures.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Failed Projects\n\n");
    for failure in failures {
        section.push_str(&format!("- **{}**: {}\n", failure.directory, failure.error));
    }
    section.push('\n');

    section
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by TFB Insight*\n");

    footer
}

fn display_or_dash<T: std::fmt::Display>(value: Option<T>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

/// Generate a JSON report.
pub fn generate_json_report(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Classification, Test, TestResult};
    use crate::technology::Technology;
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn create_test_report() -> Report {
        let metadata = ReportMetadata {
            source: "https://github.com/TechEmpower/FrameworkBenchmarks.git".to_string(),
            commit: Some("abcdef12".to_string()),
            results_source: Some("results.json".to_string()),
            analysis_date: Utc::now(),
            projects_analyzed: 1,
            projects_failed: 1,
            tests_analyzed: 1,
            duration_seconds: 2.0,
        };

        let mut test = Test {
            name: "default".to_string(),
            language: Some("Java".to_string()),
            database: Some("MySQL".to_string()),
            classification: Some(Classification::Fullstack),
            db_url: Some("/db".to_string()),
            color: Some("#9e5a1c".to_string()),
            ..Test::default()
        };
        test.best_result.insert(
            TestType::Db,
            TestResult {
                requests_per_second: 45210.4,
                latency_avg_ms: Some(2.5),
                concurrency: Some(256),
                errors: 0,
            },
        );

        Report {
            metadata,
            projects: vec![Project {
                framework: "gemini".to_string(),
                project_root: "/Java/gemini".to_string(),
                db: BTreeSet::from(["MySQL".to_string()]),
                tests: vec![test],
                language: Some("Java".to_string()),
                classification: Some(Classification::Fullstack),
                technology: Some(Technology::Jvm),
                loc: 400,
                test_count: 1,
                color: Some("#d5772b".to_string()),
                density: Some(2.5),
            }],
            failures: vec![FailedProject {
                directory: "Go/broken".to_string(),
                error: "Language not found for broken".to_string(),
            }],
        }
    }

    #[test]
    fn test_generate_markdown_report() {
        let report = create_test_report();
        let markdown = generate_markdown_report(&report, &ReportConfig::default());

        assert!(markdown.contains("# TFB Insight Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Summary"));
        assert!(markdown.contains("## Leaderboards"));
        assert!(markdown.contains("### Single Query"));
        assert!(markdown.contains("| 1 | [Java] gemini | default | 45210 | 2.50ms | 256 |"));
        assert!(markdown.contains("| JVM | 1 |"));
        assert!(markdown.contains("## Failed Projects"));
        assert!(markdown.contains("Go/broken"));
        assert!(markdown.contains("### [Java] gemini"));
    }

    #[test]
    fn test_tests_can_be_left_out() {
        let report = create_test_report();
        let options = ReportConfig {
            include_tests: false,
            ..ReportConfig::default()
        };
        let markdown = generate_markdown_report(&report, &options);
        assert!(!markdown.contains("### [Java] gemini"));
    }

    #[test]
    fn test_leaderboards_without_results() {
        let mut report = create_test_report();
        report.projects[0].tests[0].best_result.clear();

        let section = generate_leaderboard_section(&report.projects, 10);
        assert!(section.contains("No round results"));
    }

    #[test]
    fn test_generate_metadata_section() {
        let report = create_test_report();
        let section = generate_metadata_section(&report.metadata);

        assert!(section.contains("FrameworkBenchmarks"));
        assert!(section.contains("`abcdef12`"));
        assert!(section.contains("Projects Failed:"));
    }

    #[test]
    fn test_generate_json_report() {
        let report = create_test_report();
        let json = generate_json_report(&report).unwrap();

        assert!(json.contains("\"projects\""));
        assert!(json.contains("\"technology\": \"JVM\""));
        assert!(json.contains("\"failures\""));
    }
}
