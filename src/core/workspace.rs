// src/core/workspace.rs

//! Project discovery under the laoban directory and the selection of the projects a
//! command applies to.

use crate::constants::{IGNORED_DIRECTORIES, PROJECT_DETAILS_FILENAME};
use crate::models::{Project, ProjectDetails};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum WorkspaceError {
    #[error("Could not read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Could not parse '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("'{0}' is not a valid project filter: {1}")]
    InvalidFilter(String, String),
    #[error("'{0}' is not inside a project (no project.details.toml found)")]
    NotInProject(PathBuf),
}

/// Reads `project.details.toml` from `directory`.
pub fn load_project(directory: &Path) -> Result<Project, WorkspaceError> {
    let path = directory.join(PROJECT_DETAILS_FILENAME);
    let content = fs::read_to_string(&path).map_err(|source| WorkspaceError::Read {
        path: path.clone(),
        source,
    })?;
    let details: ProjectDetails =
        toml::from_str(&content).map_err(|source| WorkspaceError::Parse { path, source })?;
    Ok(Project::new(directory, details))
}

fn is_ignored(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| IGNORED_DIRECTORIES.contains(&name))
}

/// Every project under `root`, in directory order. The first unreadable or malformed
/// `project.details.toml` aborts discovery.
pub fn discover_projects(root: &Path) -> Result<Vec<Project>, WorkspaceError> {
    let mut projects = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_ignored(e));
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable path during discovery: {}", e);
                continue;
            }
        };
        if entry.file_type().is_dir() && entry.path().join(PROJECT_DETAILS_FILENAME).is_file() {
            log::trace!("Found project at {}", entry.path().display());
            projects.push(load_project(entry.path())?);
        }
    }
    log::debug!("Discovered {} project(s) under {}", projects.len(), root.display());
    Ok(projects)
}

/// The project directory `current` belongs to: the nearest directory between it and
/// `root` (both inclusive) that has a `project.details.toml`.
pub fn current_project_directory(root: &Path, current: &Path) -> Option<PathBuf> {
    current
        .ancestors()
        .take_while(|dir| dir.starts_with(root))
        .find(|dir| dir.join(PROJECT_DETAILS_FILENAME).is_file())
        .map(Path::to_path_buf)
}

/// How the projects for a command are chosen.
#[derive(Debug, Clone, Default)]
pub struct ProjectSelection {
    pub all: bool,
    pub one: bool,
    /// Regex matched against project names.
    pub projects: Option<String>,
}

/// Applies the selection: `--projects` filters every project by name; `--all` takes them
/// all; `--one` takes the current project; otherwise the current project if there is
/// one, else all of them.
pub fn select_projects(
    projects: Vec<Project>,
    root: &Path,
    current: &Path,
    selection: &ProjectSelection,
) -> Result<Vec<Project>, WorkspaceError> {
    if let Some(filter) = selection.projects.as_deref().filter(|f| !f.is_empty()) {
        let re = Regex::new(filter)
            .map_err(|e| WorkspaceError::InvalidFilter(filter.to_string(), e.to_string()))?;
        return Ok(projects.into_iter().filter(|p| re.is_match(p.name())).collect());
    }
    if selection.all {
        return Ok(projects);
    }
    let current_dir = current_project_directory(root, current);
    match current_dir {
        Some(dir) => Ok(projects
            .into_iter()
            .filter(|p| same_directory(&p.directory, &dir))
            .collect()),
        None if selection.one => Err(WorkspaceError::NotInProject(current.to_path_buf())),
        None => Ok(projects),
    }
}

fn same_directory(a: &Path, b: &Path) -> bool {
    match (dunce::canonicalize(a), dunce::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}
