// src/models.rs

use crate::core::dictionary::Dictionary;
use crate::system::executor::ExecutionError;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

// --- `laoban.toml` MODELS (what is read from the configuration file) ---

/// A command inside a script. Either a bare command line or a named table.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum TomlCommand {
    Simple(String),
    Extended(CommandDefn),
}

impl TomlCommand {
    /// Normalises both syntaxes into a `CommandDefn`. Bare strings get an empty name.
    pub fn into_defn(self) -> CommandDefn {
        match self {
            Self::Simple(command) => CommandDefn {
                command,
                ..Default::default()
            },
            Self::Extended(defn) => defn,
        }
    }
}

/// A script as written under `[scripts.<name>]`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ScriptDefn {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commands: Vec<TomlCommand>,
    pub guard: Option<String>,
    pub os_guard: Option<String>,
    pub pm_guard: Option<String>,
    pub guard_reason: Option<String>,
    pub env: Option<BTreeMap<String, String>>,
}

/// The deserialized structure of a `laoban.toml` file.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RawConfig {
    pub template_dir: Option<String>,
    pub log: Option<String>,
    pub status: Option<String>,
    pub profile: Option<String>,
    pub package_manager: Option<String>,
    pub throttle: Option<usize>,
    pub abort_on_error: Option<bool>,
    #[serde(default)]
    pub variables: toml::Table,
    #[serde(default)]
    pub scripts: BTreeMap<String, ScriptDefn>,
}

// --- RESOLVED MODELS ---

/// One runnable step of a script.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CommandDefn {
    #[serde(default)]
    pub name: String,
    pub command: String,
    /// Relative to the project directory.
    pub directory: Option<String>,
    /// When true, the outcome of this command is appended to the status file.
    #[serde(default)]
    pub status: bool,
}

/// A script after config processing. Immutable for the rest of the run.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScriptDetails {
    pub name: String,
    pub description: String,
    pub commands: Vec<CommandDefn>,
    pub guard: Option<String>,
    pub os_guard: Option<String>,
    pub pm_guard: Option<String>,
    pub guard_reason: Option<String>,
    pub env: Option<BTreeMap<String, String>>,
}

/// The fully processed workspace configuration.
#[derive(Serialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub laoban_directory: PathBuf,
    pub laoban_config: PathBuf,
    pub template_dir: String,
    pub log: String,
    pub status: String,
    pub profile: String,
    pub package_manager: String,
    pub throttle: usize,
    pub abort_on_error: bool,
    pub variables: BTreeMap<String, String>,
    pub scripts: Vec<ScriptDetails>,
}

impl Config {
    pub fn find_script(&self, name: &str) -> Option<&ScriptDetails> {
        self.scripts.iter().find(|s| s.name == name)
    }
}

/// Contents of a `project.details.toml` file.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ProjectDetails {
    pub name: String,
    #[serde(default)]
    pub template: String,
    pub description: Option<String>,
    /// Free-form details. `links` (an array of project names) is the only key laoban interprets.
    #[serde(default)]
    pub details: toml::Table,
}

impl ProjectDetails {
    /// Names of the projects this one depends on.
    pub fn links(&self) -> Vec<String> {
        self.details
            .get("links")
            .and_then(|v| v.as_array())
            .map(|links| {
                links
                    .iter()
                    .filter_map(|l| l.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// A project directory together with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub directory: PathBuf,
    pub project_details: ProjectDetails,
}

impl Project {
    pub fn new(directory: impl Into<PathBuf>, project_details: ProjectDetails) -> Self {
        Self {
            directory: directory.into(),
            project_details,
        }
    }

    pub fn name(&self) -> &str {
        &self.project_details.name
    }

    /// Joins a configured, project-relative file name onto the project directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.directory.join(name)
    }
}

// --- EXECUTION MODELS ---

/// Flags that shape a single invocation of a script.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub dryrun: bool,
    pub shell_debug: bool,
    pub quiet: bool,
    pub variables: bool,
    pub links: bool,
    pub generation_plan: bool,
    pub abort_on_error: bool,
    /// Maximum number of projects running at once inside a generation. 0 means unbounded.
    pub throttle: usize,
}

/// A script bound to the configuration and flags of one run.
#[derive(Debug, Clone)]
pub struct ScriptInContext<'a> {
    pub config: &'a Config,
    pub details: &'a ScriptDetails,
    pub options: RunOptions,
    /// Shared by every record written during the run.
    pub timestamp: DateTime<Local>,
}

impl<'a> ScriptInContext<'a> {
    pub fn new(config: &'a Config, details: &'a ScriptDetails, options: RunOptions) -> Self {
        Self {
            config,
            details,
            options,
            timestamp: Local::now(),
        }
    }

    pub fn is_dryrun(&self) -> bool {
        self.options.dryrun
    }
}

/// One command, fully materialized for one project.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellCommandDetails {
    pub command: CommandDefn,
    /// Everything that was available for dereferencing.
    pub dic: Dictionary,
    /// `None` means "inherit the parent environment untouched".
    pub env: Option<BTreeMap<String, String>>,
    pub directory: PathBuf,
    pub command_string: String,
}

/// The outcome of a raw executor, before timing is attached.
#[derive(Debug, Default)]
pub struct RawShellResult {
    pub err: Option<ExecutionError>,
    pub stdout: String,
    pub stderr: String,
}

/// The outcome of one command.
#[derive(Debug)]
pub struct ShellResult {
    pub details: ShellCommandDetails,
    pub duration: Duration,
    pub err: Option<ExecutionError>,
    pub stdout: String,
    pub stderr: String,
}

impl ShellResult {
    pub fn from_raw(details: ShellCommandDetails, raw: RawShellResult, duration: Duration) -> Self {
        Self {
            details,
            duration,
            err: raw.err,
            stdout: raw.stdout,
            stderr: raw.stderr,
        }
    }

    pub fn has_error(&self) -> bool {
        self.err.is_some()
    }
}

/// Why a script did or did not run for a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    Completed,
    /// The script's `guard` did not resolve for this project.
    Skipped(String),
    /// The run was aborted before the script (or one of its commands) started.
    Cancelled,
}

/// The outcome of one script across all its commands, for one project.
#[derive(Debug)]
pub struct ScriptResult {
    pub project_name: String,
    pub directory: PathBuf,
    pub script_name: String,
    pub results: Vec<ShellResult>,
    pub duration: Duration,
    pub outcome: ScriptOutcome,
}

impl ScriptResult {
    pub fn has_errors(&self) -> bool {
        self.results.iter().any(ShellResult::has_error)
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

pub type GenerationResult = Vec<ScriptResult>;
pub type GenerationsResult = Vec<GenerationResult>;
