//! Checkout acquisition.
//!
//! A checkout is either a fresh shallow clone (git2) living in a temporary
//! directory, or an existing local directory. Both record the HEAD commit
//! when there is one.

use anyhow::{Context, Result};
use git2::{FetchOptions, Progress, RemoteCallbacks, Repository};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tracing::{debug, info};

/// A checkout ready to be scanned.
pub struct Checkout {
    /// Path to the checkout root.
    pub path: PathBuf,
    /// Short hash of the checked out commit, if the path is a git repository.
    pub commit: Option<String>,
    /// Temporary directory handle (keeps a cloned checkout alive).
    /// If None, the checkout lives at a persistent location.
    #[allow(dead_code)] // Only held for its Drop
    pub temp_dir: Option<TempDir>,
}

/// Options for cloning a repository.
#[derive(Debug, Clone)]
pub struct CloneOptions {
    /// Branch to checkout (None for default branch).
    pub branch: Option<String>,
    /// Depth for shallow clone (None for full clone).
    pub depth: Option<i32>,
    /// Whether to show progress.
    pub show_progress: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            branch: None,
            depth: Some(1),
            show_progress: true,
        }
    }
}

/// Clone a FrameworkBenchmarks repository into a temporary checkout.
pub fn clone_repository(url: &str, options: CloneOptions) -> Result<Checkout> {
    info!("Cloning repository: {}", url);

    let temp_dir = TempDir::new().context("Failed to create temporary directory")?;
    let target = temp_dir.path().to_path_buf();
    debug!(
        "Clone target: {} (branch {}, depth {:?})",
        target.display(),
        options.branch.as_deref().unwrap_or("default"),
        options.depth
    );

    let progress = transfer_progress_bar(options.show_progress)?;

    let mut builder = git2::build::RepoBuilder::new();
    builder.fetch_options(fetch_options(options.depth, progress.clone()));
    if let Some(ref branch) = options.branch {
        builder.branch(branch);
    }

    let repo = builder
        .clone(url, &target)
        .with_context(|| format!("Failed to clone repository: {}", url))?;

    if let Some(bar) = progress {
        bar.finish_with_message("checkout ready");
    }

    let commit = get_current_commit(&repo);
    info!(
        "Cloned {} at {}",
        url,
        commit.as_deref().unwrap_or("unknown commit")
    );

    Ok(Checkout {
        path: target,
        commit,
        temp_dir: Some(temp_dir),
    })
}

/// Object transfer bar, `None` in quiet runs.
fn transfer_progress_bar(show: bool) -> Result<Option<Arc<ProgressBar>>> {
    if !show {
        return Ok(None);
    }

    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} objects")
        .context("Invalid progress bar template")?
        .progress_chars("#>-");

    Ok(Some(Arc::new(ProgressBar::new(0).with_style(style))))
}

fn fetch_options(depth: Option<i32>, progress: Option<Arc<ProgressBar>>) -> FetchOptions<'static> {
    let mut callbacks = RemoteCallbacks::new();
    callbacks.transfer_progress(move |stats: Progress<'_>| {
        if let Some(ref bar) = progress {
            bar.set_length(stats.total_objects() as u64);
            bar.set_position(stats.received_objects() as u64);
        }
        true
    });

    let mut fetch = FetchOptions::new();
    fetch.remote_callbacks(callbacks);
    if let Some(depth) = depth {
        fetch.depth(depth);
    }
    fetch
}

/// Use an existing local checkout. The commit is recorded when the
/// directory is a git repository.
pub fn open_local_checkout(path: &Path) -> Result<Checkout> {
    info!("Using local checkout: {}", path.display());

    if !path.is_dir() {
        anyhow::bail!("Checkout path is not a directory: {}", path.display());
    }

    let commit = match Repository::open(path) {
        Ok(repo) => get_current_commit(&repo),
        Err(e) => {
            debug!("{} is not a git repository: {}", path.display(), e);
            None
        }
    };

    Ok(Checkout {
        path: path.to_path_buf(),
        commit,
        temp_dir: None,
    })
}

/// Short hash of HEAD, `None` for a repository without commits.
pub fn get_current_commit(repo: &Repository) -> Option<String> {
    let commit = repo.head().ok()?.peel_to_commit().ok()?;
    let id = commit.id().to_string();
    Some(id.chars().take(8).collect())
}
