//! Project persistence.
//!
//! [`ProjectRepository`] loads and saves projects by id. The project
//! aggregate knows nothing about storage; implementations decide how it
//! is laid out.

use crate::project::Project;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid project id: {id}")]
    InvalidId { id: String },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Storage for projects, keyed by [`Project::id`].
pub trait ProjectRepository: Send + Sync {
    /// Load a project, `Ok(None)` if it was never saved.
    fn load(&self, id: &str) -> StoreResult<Option<Project>>;

    /// Insert or replace a project.
    fn save(&self, project: &Project) -> StoreResult<()>;

    /// All stored projects, ordered by id.
    fn list(&self) -> StoreResult<Vec<Project>>;

    fn save_all(&self, projects: &[Project]) -> StoreResult<usize> {
        for project in projects {
            self.save(project)?;
        }
        Ok(projects.len())
    }
}

/// Repository kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    projects: Mutex<BTreeMap<String, Project>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn projects(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Project>> {
        self.projects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ProjectRepository for InMemoryRepository {
    fn load(&self, id: &str) -> StoreResult<Option<Project>> {
        Ok(self.projects().get(id).cloned())
    }

    fn save(&self, project: &Project) -> StoreResult<()> {
        self.projects()
            .insert(project.id().to_string(), project.clone());
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<Project>> {
        Ok(self.projects().values().cloned().collect())
    }
}

/// Repository storing one pretty-printed JSON file per project.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    /// Open a store directory, creating it if needed.
    pub fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a project id. The id is percent-encoded, so distinct
    /// ids never share a file: `/Java/gemini` becomes `%2FJava%2Fgemini.json`.
    fn file_for(&self, id: &str) -> StoreResult<PathBuf> {
        let stem = urlencoding::encode(id);

        if stem.is_empty() || stem == "." || stem == ".." {
            return Err(StoreError::InvalidId { id: id.to_string() });
        }

        Ok(self.dir.join(format!("{}.json", stem)))
    }

    fn read(path: &Path) -> StoreResult<Project> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

impl ProjectRepository for JsonFileRepository {
    fn load(&self, id: &str) -> StoreResult<Option<Project>> {
        let path = self.file_for(id)?;
        if !path.exists() {
            return Ok(None);
        }

        let project = Self::read(&path)?;
        if project.id() != id {
            warn!(
                "{} holds project {} instead of {}",
                path.display(),
                project.id(),
                id
            );
            return Ok(None);
        }

        Ok(Some(project))
    }

    fn save(&self, project: &Project) -> StoreResult<()> {
        let path = self.file_for(project.id())?;
        let content = serde_json::to_string_pretty(project)?;

        // Write next to the target and rename so readers never see a partial file.
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!("Saved project {} to {}", project.id(), path.display());
        Ok(())
    }

    fn list(&self) -> StoreResult<Vec<Project>> {
        let mut paths: Vec<PathBuf> = fs::read_dir(&self.dir)?
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "json"))
            .collect();
        paths.sort();

        let mut projects = Vec::with_capacity(paths.len());
        for path in paths {
            projects.push(Self::read(&path)?);
        }
        projects.sort_by(|a, b| a.id().cmp(b.id()));

        Ok(projects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Test, TestResult, TestType};
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn create_project(root: &str) -> Project {
        let mut test = Test {
            name: "default".to_string(),
            language: Some("Java".to_string()),
            ..Test::default()
        };
        test.best_result.insert(TestType::Json, TestResult::new(1234.5));

        Project {
            framework: "gemini".to_string(),
            project_root: root.to_string(),
            db: BTreeSet::from(["MySQL".to_string()]),
            tests: vec![test],
            language: Some("Java".to_string()),
            classification: None,
            technology: Some(crate::technology::Technology::Jvm),
            loc: 120,
            test_count: 1,
            color: Some("#d9822b".to_string()),
            density: Some(8.3),
        }
    }

    fn exercise(repo: &dyn ProjectRepository) {
        assert!(repo.load("/Java/gemini").unwrap().is_none());

        let project = create_project("/Java/gemini");
        repo.save(&project).unwrap();
        assert_eq!(repo.load("/Java/gemini").unwrap(), Some(project.clone()));

        let mut updated = project.clone();
        updated.loc = 200;
        repo.save(&updated).unwrap();
        assert_eq!(repo.load("/Java/gemini").unwrap().unwrap().loc, 200);

        let saved = repo
            .save_all(&[create_project("/Rust/actix"), create_project("/C#/aspnetcore")])
            .unwrap();
        assert_eq!(saved, 2);

        let ids: Vec<String> = repo
            .list()
            .unwrap()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, vec!["/C#/aspnetcore", "/Java/gemini", "/Rust/actix"]);
    }

    #[test]
    fn test_in_memory_repository() {
        exercise(&InMemoryRepository::new());
    }

    #[test]
    fn test_json_file_repository() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::open(dir.path().join("store")).unwrap();
        exercise(&repo);
        assert!(repo.dir().join("%2FJava%2Fgemini.json").exists());
    }

    #[test]
    fn test_json_file_repository_survives_reopen() {
        let dir = TempDir::new().unwrap();
        JsonFileRepository::open(dir.path())
            .unwrap()
            .save(&create_project("/Go/gin"))
            .unwrap();

        let reopened = JsonFileRepository::open(dir.path()).unwrap();
        let project = reopened.load("/Go/gin").unwrap().unwrap();
        assert_eq!(project.tests[0].best_result[&TestType::Json].requests_per_second, 1234.5);
    }

    #[test]
    fn test_invalid_ids() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::open(dir.path()).unwrap();
        assert!(matches!(repo.load(""), Err(StoreError::InvalidId { .. })));
        assert!(matches!(repo.load(".."), Err(StoreError::InvalidId { .. })));

        // Separators are encoded, so no id escapes the store directory
        repo.save(&create_project("/../etc")).unwrap();
        assert!(repo.dir().join("%2F..%2Fetc.json").exists());
    }

    #[test]
    fn test_similar_ids_do_not_collide() {
        let dir = TempDir::new().unwrap();
        let repo = JsonFileRepository::open(dir.path()).unwrap();

        let ids = ["/Go/a__b", "/Go/a/b", "/X/y", "/X/y/", "/C#/a:b"];
        for (loc, id) in ids.iter().enumerate() {
            let mut project = create_project(id);
            project.loc = loc;
            repo.save(&project).unwrap();
        }

        for (loc, id) in ids.iter().enumerate() {
            let project = repo.load(id).unwrap().unwrap();
            assert_eq!(project.loc, loc, "{}", id);
        }
        assert_eq!(repo.list().unwrap().len(), ids.len());
    }
}
