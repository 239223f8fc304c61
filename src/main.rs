//! TFB Insight - project insight for TechEmpower Framework Benchmarks
//!
//! A CLI tool that scans a FrameworkBenchmarks checkout, builds one
//! project per benchmark directory, classifies its technology, attaches
//! round results and writes a Markdown or JSON report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (clone failure, broken benchmark config, etc.)
//!   2 - Some projects failed to build and --keep-going was set

mod analysis;
mod cli;
mod config;
mod models;
mod project;
mod repo;
mod report;
mod results;
mod scanner;
mod store;
mod technology;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, OutputFormat};
use config::Config;
use futures::StreamExt;
use models::{FailedProject, Report, ReportMetadata};
use project::Project;
use scanner::{BenchmarkDir, BenchmarkScanner, ScanConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use store::{InMemoryRepository, JsonFileRepository, ProjectRepository};
use technology::TechnologyFamily;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Config is loaded first so `[general] verbose` can raise the log level
    let (mut config, origin) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(log_level(&args, &config));

    info!("TFB Insight v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);
    origin.log();

    match run_insight(args, config).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Insight run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .tfb-insight.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(config::CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            config::CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", config::CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", config::CONFIG_FILE_NAME);
    Ok(())
}

/// `--quiet` wins, then `--verbose` or `[general] verbose`.
fn log_level(args: &Args, config: &Config) -> Level {
    if config.general.verbose && !args.quiet {
        Level::DEBUG
    } else {
        args.log_level()
    }
}

/// Initialize logging at the given maximum level.
fn init_logging(level: Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete insight workflow. Returns exit code (0 or 2).
async fn run_insight(args: Args, config: Config) -> Result<i32> {
    let start_time = Instant::now();

    let store = open_store(&config)?;

    if args.from_store {
        return report_from_store(&args, &config, store.as_ref(), start_time);
    }

    // Step 1: Get the checkout
    let (checkout, source) = get_checkout(&args, &config)?;
    let frameworks_root = checkout.path.join(&config.source.frameworks_dir);

    // Step 2: Discover benchmark directories
    let scanner = Arc::new(BenchmarkScanner::new(
        frameworks_root,
        ScanConfig::from(&config.scanner),
    ));
    let dirs = scanner.discover()?;
    info!("Discovered {} benchmark directories", dirs.len());

    if args.dry_run {
        return handle_dry_run(&dirs);
    }

    // Step 3: Build projects
    println!("🏗️  Building {} projects...", dirs.len());
    let families = Arc::new(config.classifier.families());
    let frameworks_dir: Arc<str> = Arc::from(config.source.frameworks_dir.as_str());
    let outcomes = build_projects(
        scanner,
        families,
        frameworks_dir,
        dirs,
        config.general.concurrency,
    )
    .await?;

    let (mut projects, failures) = split_outcomes(outcomes, config.general.keep_going)?;

    // Step 4: Attach round results
    if let Some(ref source) = config.results.source {
        println!("📈 Attaching results from {}", source);
        let round = results::load(source, config.results.timeout_seconds).await?;
        let best = round.best_results();
        let matched = results::apply(&mut projects, &best);
        info!(
            "Round {}: results for {} tests",
            round.name.as_deref().unwrap_or("unnamed"),
            matched
        );
        if matched == 0 {
            warn!("No test matched any result in {}", source);
        }
    }

    // Step 5: Derived metrics
    for project in projects.iter_mut() {
        project.update_colors();
        project.calculate_density();
    }

    // Step 6: Persist
    let (created, updated) = persist(store.as_ref(), &projects)?;
    info!("Stored projects: {} new, {} updated", created, updated);

    // Step 7: Report
    let metadata = ReportMetadata {
        source,
        commit: checkout.commit.clone(),
        results_source: config.results.source.clone(),
        analysis_date: Utc::now(),
        projects_analyzed: projects.len(),
        projects_failed: failures.len(),
        tests_analyzed: analysis::total_tests(&projects),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = Report {
        metadata,
        projects,
        failures,
    };
    write_report(&args, &config, &report)?;

    let exit_code = exit_code_for(&report.failures);
    if exit_code != 0 {
        eprintln!(
            "\n⛔ {} projects failed to build (exit code {}).",
            report.failures.len(),
            exit_code
        );
    }

    Ok(exit_code)
}

/// 2 when any project failed under `--keep-going`, otherwise 0.
fn exit_code_for(failures: &[FailedProject]) -> i32 {
    if failures.is_empty() {
        0
    } else {
        2
    }
}

/// Separate built projects from failures. A failure aborts the run
/// unless `keep_going` is set, in which case it is kept for the report.
fn split_outcomes(
    outcomes: Vec<(BenchmarkDir, Result<Project>)>,
    keep_going: bool,
) -> Result<(Vec<Project>, Vec<FailedProject>)> {
    let mut projects = Vec::new();
    let mut failures = Vec::new();

    for (dir, outcome) in outcomes {
        match outcome {
            Ok(project) => projects.push(project),
            Err(e) => {
                error!("Failed to build project {}: {:#}", dir.relative, e);
                if !keep_going {
                    return Err(e.context(format!("Failed to build project {}", dir.relative)));
                }
                failures.push(FailedProject {
                    directory: dir.relative,
                    error: format!("{:#}", e),
                });
            }
        }
    }

    Ok((projects, failures))
}

/// Build projects in parallel, keeping discovery order.
async fn build_projects(
    scanner: Arc<BenchmarkScanner>,
    families: Arc<Vec<TechnologyFamily>>,
    frameworks_dir: Arc<str>,
    dirs: Vec<BenchmarkDir>,
    concurrency: usize,
) -> Result<Vec<(BenchmarkDir, Result<Project>)>> {
    let tasks = dirs.into_iter().map(|dir| {
        let scanner = Arc::clone(&scanner);
        let families = Arc::clone(&families);
        let frameworks_dir = Arc::clone(&frameworks_dir);
        async move {
            let task_dir = dir.clone();
            let joined = tokio::task::spawn_blocking(move || {
                build_project(&scanner, &families, &frameworks_dir, &task_dir)
            })
            .await;
            (dir, joined)
        }
    });

    let mut stream = futures::stream::iter(tasks).buffered(concurrency.max(1));
    let mut outcomes = Vec::new();
    while let Some((dir, joined)) = stream.next().await {
        let outcome = joined.context("Project build task panicked")?;
        outcomes.push((dir, outcome));
    }

    Ok(outcomes)
}

/// Build one project and count its source lines.
fn build_project(
    scanner: &BenchmarkScanner,
    families: &[TechnologyFamily],
    frameworks_dir: &str,
    dir: &BenchmarkDir,
) -> Result<Project> {
    let benchmark = scanner.load_config(dir)?;
    let mut project = Project::from_config(&benchmark, &dir.path, frameworks_dir, families)?;
    project.loc = scanner.count_lines(&dir.path);

    if !project.has_effective_tests() {
        info!("{} has no effective tests", dir.relative);
    }
    debug!(
        "Built {} with {} tests, {} LOC",
        project.label(),
        project.tests.len(),
        project.loc
    );

    Ok(project)
}

/// Save projects, counting how many were new.
fn persist(store: &dyn ProjectRepository, projects: &[Project]) -> Result<(usize, usize)> {
    let mut created = 0;
    for project in projects {
        if store.load(project.id())?.is_none() {
            created += 1;
        }
    }
    let saved = store.save_all(projects)?;
    Ok((created, saved - created))
}

/// Open the configured JSON store, or an in-memory one.
fn open_store(config: &Config) -> Result<Box<dyn ProjectRepository>> {
    match config.store.path {
        Some(ref path) => {
            let repo = JsonFileRepository::open(path)
                .with_context(|| format!("Failed to open project store: {}", path))?;
            info!("Using project store at {}", repo.dir().display());
            Ok(Box::new(repo))
        }
        None => Ok(Box::new(InMemoryRepository::new())),
    }
}

/// Handle --from-store: report on previously stored projects.
fn report_from_store(
    args: &Args,
    config: &Config,
    store: &dyn ProjectRepository,
    start_time: Instant,
) -> Result<i32> {
    let projects = store.list().context("Failed to read project store")?;
    info!("Loaded {} projects from store", projects.len());

    let metadata = ReportMetadata {
        source: config.store.path.clone().unwrap_or_default(),
        commit: None,
        results_source: None,
        analysis_date: Utc::now(),
        projects_analyzed: projects.len(),
        projects_failed: 0,
        tests_analyzed: analysis::total_tests(&projects),
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = Report {
        metadata,
        projects,
        failures: Vec::new(),
    };
    write_report(args, config, &report)?;

    Ok(0)
}

/// Render the report in the requested format and write it.
fn write_report(args: &Args, config: &Config, report: &Report) -> Result<()> {
    println!("\n📝 Generating report...");

    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(report)?,
        OutputFormat::Markdown => report::generate_markdown_report(report, &config.report),
    };

    let path = Path::new(&config.general.output);
    std::fs::write(path, &output)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    println!("\n📊 Insight Summary:");
    println!("   Projects: {}", report.metadata.projects_analyzed);
    println!("   Tests: {}", report.metadata.tests_analyzed);
    for (technology, count) in analysis::technology_distribution(&report.projects) {
        println!("   - {}: {}", technology, count);
    }
    println!("   Duration: {:.1}s", report.metadata.duration_seconds);
    println!("\n✅ Report saved to: {}", path.display());

    Ok(())
}

/// Handle --dry-run: print discovered benchmark directories, exit.
fn handle_dry_run(dirs: &[BenchmarkDir]) -> Result<i32> {
    println!("\n🔍 Dry run: discovered benchmark directories...\n");

    if dirs.is_empty() {
        println!("   No benchmark directories found.");
    } else {
        for dir in dirs {
            println!("     📁 {}", dir.relative);
        }
        println!("\n   Total: {} benchmarks", dirs.len());
    }

    Ok(0)
}

/// Where the configuration came from. Logged once logging is up.
enum ConfigOrigin {
    File(PathBuf),
    Defaults,
    /// The default file exists but could not be loaded.
    Broken(anyhow::Error),
}

impl ConfigOrigin {
    fn log(&self) {
        match self {
            ConfigOrigin::File(path) => info!("Loaded config from {}", path.display()),
            ConfigOrigin::Defaults => debug!("No config file found, using defaults"),
            ConfigOrigin::Broken(e) => warn!("Failed to load config, using defaults: {:#}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigOrigin)> {
    // An explicit config path must load
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigOrigin::File(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((
            config,
            ConfigOrigin::File(PathBuf::from(config::CONFIG_FILE_NAME)),
        )),
        Ok(None) => Ok((Config::default(), ConfigOrigin::Defaults)),
        Err(e) => Ok((Config::default(), ConfigOrigin::Broken(e))),
    }
}

/// Get the checkout to scan (clone if needed) and describe its source.
fn get_checkout(args: &Args, config: &Config) -> Result<(repo::Checkout, String)> {
    if let Some(ref local) = args.local {
        let checkout = repo::open_local_checkout(local)?;
        return Ok((checkout, local.display().to_string()));
    }

    println!("📥 Cloning repository: {}", config.source.repo_url);
    let clone_options = repo::CloneOptions {
        branch: config.source.branch.clone(),
        depth: Some(1), // Shallow clone
        show_progress: !args.quiet,
    };

    let checkout = repo::clone_repository(&config.source.repo_url, clone_options)?;
    Ok((checkout, config.source.repo_url.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    const GEMINI: &str =
        r#"{"framework": "gemini", "tests": [{"default": {"language": "Java", "approach": "Realistic"}}]}"#;
    const BROKEN: &str =
        r#"{"framework": "broken", "tests": [{"default": {"approach": "Realistic"}}]}"#;

    fn checkout_in(frameworks_dir: &str, configs: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (rel, config) in configs {
            write(
                dir.path(),
                &format!("{}/{}/benchmark_config.json", frameworks_dir, rel),
                config,
            );
        }
        dir
    }

    fn checkout_with(configs: &[(&str, &str)]) -> TempDir {
        checkout_in("frameworks", configs)
    }

    fn scanner_in(dir: &TempDir, frameworks_dir: &str) -> Arc<BenchmarkScanner> {
        Arc::new(BenchmarkScanner::new(
            dir.path().join(frameworks_dir),
            ScanConfig::default(),
        ))
    }

    fn scanner_for(dir: &TempDir) -> Arc<BenchmarkScanner> {
        scanner_in(dir, "frameworks")
    }

    fn build_all(dir: &TempDir) -> Vec<(BenchmarkDir, Result<Project>)> {
        let scanner = scanner_for(dir);
        let dirs = scanner.discover().unwrap();
        let families = Arc::new(config::ClassifierConfig::default().families());
        tokio_test::block_on(build_projects(
            scanner,
            families,
            Arc::from("frameworks"),
            dirs,
            2,
        ))
        .unwrap()
    }

    fn args() -> Args {
        Args::try_parse_from(["tfb-insight"]).unwrap()
    }

    #[test]
    fn test_build_projects_keeps_order_and_reports_errors() {
        let dir = checkout_with(&[
            (
                "C#/aspnetcore",
                r#"{"framework": "aspnetcore", "tests": [{"default": {"language": "C#", "approach": "Realistic"}}]}"#,
            ),
            ("Go/broken", BROKEN),
            ("Java/gemini", GEMINI),
        ]);

        let outcomes = build_all(&dir);

        let relative: Vec<&str> = outcomes.iter().map(|(d, _)| d.relative.as_str()).collect();
        assert_eq!(relative, vec!["C#/aspnetcore", "Go/broken", "Java/gemini"]);
        assert!(outcomes[0].1.is_ok());
        let err = outcomes[1].1.as_ref().unwrap_err();
        assert!(format!("{:#}", err).contains("Language not found for broken"));
        assert_eq!(
            outcomes[2].1.as_ref().unwrap().technology,
            Some(technology::Technology::Jvm)
        );
    }

    #[test]
    fn test_persist_counts_new_and_updated() {
        let dir = checkout_with(&[(
            "Java/gemini",
            r#"{"framework": "gemini", "tests": [{"default": {"language": "Java"}}]}"#,
        )]);
        let scanner = scanner_for(&dir);
        let dirs = scanner.discover().unwrap();
        let families = config::ClassifierConfig::default().families();
        let project = build_project(&scanner, &families, "frameworks", &dirs[0]).unwrap();

        let store = InMemoryRepository::new();
        assert_eq!(persist(&store, std::slice::from_ref(&project)).unwrap(), (1, 0));
        assert_eq!(persist(&store, std::slice::from_ref(&project)).unwrap(), (0, 1));
    }

    #[test]
    fn test_custom_frameworks_dir_keeps_stable_ids() {
        let dir = checkout_in("benchmarks", &[("Java/gemini", GEMINI)]);
        let scanner = scanner_in(&dir, "benchmarks");
        let dirs = scanner.discover().unwrap();
        let families = config::ClassifierConfig::default().families();

        let project = build_project(&scanner, &families, "benchmarks", &dirs[0]).unwrap();
        assert_eq!(dirs[0].relative, "Java/gemini");
        assert_eq!(project.id(), "/Java/gemini");
    }

    #[test]
    fn test_broken_config_aborts_without_keep_going() {
        let dir = checkout_with(&[("Go/broken", BROKEN), ("Java/gemini", GEMINI)]);

        let err = split_outcomes(build_all(&dir), false).unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("Failed to build project Go/broken"));
        assert!(message.contains("Language not found for broken"));
    }

    #[test]
    fn test_broken_config_is_reported_with_keep_going() {
        let dir = checkout_with(&[("Go/broken", BROKEN), ("Java/gemini", GEMINI)]);

        let (projects, failures) = split_outcomes(build_all(&dir), true).unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0].framework, "gemini");
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].directory, "Go/broken");
        assert!(failures[0].error.contains("Language not found for broken"));
        assert_eq!(exit_code_for(&failures), 2);
    }

    #[test]
    fn test_clean_run_exits_zero() {
        let dir = checkout_with(&[("Java/gemini", GEMINI)]);

        let (projects, failures) = split_outcomes(build_all(&dir), false).unwrap();
        assert_eq!(projects.len(), 1);
        assert!(failures.is_empty());
        assert_eq!(exit_code_for(&failures), 0);
    }

    #[test]
    fn test_config_verbose_raises_log_level() {
        let mut config = Config::default();
        assert_eq!(log_level(&args(), &config), Level::INFO);

        config.general.verbose = true;
        assert_eq!(log_level(&args(), &config), Level::DEBUG);

        let mut quiet = args();
        quiet.quiet = true;
        assert_eq!(log_level(&quiet, &config), Level::ERROR);
    }
}
