// src/core/materializer.rs

//! Turns a script's abstract commands into fully dereferenced [`ShellCommandDetails`]
//! for one project, and evaluates the guards that decide whether a script runs at all.

use crate::core::dictionary::{Dictionary, Value};
use crate::core::variables::{dereference, dereference_strict};
use crate::models::{CommandDefn, Config, Project, ProjectDetails, ScriptDetails, ScriptInContext, ShellCommandDetails};
use regex::Regex;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("os is {os}, and this command has an osGuard of [{guard}]{}", reason_suffix(.reason))]
    Os {
        os: String,
        guard: String,
        reason: Option<String>,
    },
    #[error("Package Manager is {package_manager} and this command has a pmGuard of [{guard}]{}", reason_suffix(.reason))]
    PackageManager {
        package_manager: String,
        guard: String,
        reason: Option<String>,
    },
    #[error("Guard pattern '{pattern}' is not a valid regular expression: {message}")]
    InvalidPattern { pattern: String, message: String },
}

fn reason_suffix(reason: &Option<String>) -> String {
    reason
        .as_ref()
        .map(|r| format!("\n{}", r))
        .unwrap_or_default()
}

/// The operating system name guards are matched against (`Linux`, `Darwin`, `Windows_NT`).
pub fn os_type() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows_NT",
        other => other,
    }
}

pub fn compile_guard(pattern: &str) -> Result<Regex, GuardError> {
    Regex::new(pattern).map_err(|e| GuardError::InvalidPattern {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Checks `osGuard` and `pmGuard` for the running system. Evaluated once per script,
/// before anything is materialized or executed.
pub fn check_guard(config: &Config, script: &ScriptDetails) -> Result<(), GuardError> {
    check_guard_for(os_type(), &config.package_manager, script)
}

pub fn check_guard_for(os: &str, package_manager: &str, script: &ScriptDetails) -> Result<(), GuardError> {
    log::debug!(
        "osGuard: os={} guard={:?}, pmGuard: pm={} guard={:?}",
        os,
        script.os_guard,
        package_manager,
        script.pm_guard
    );
    if let Some(guard) = &script.os_guard
        && !compile_guard(guard)?.is_match(os)
    {
        return Err(GuardError::Os {
            os: os.to_string(),
            guard: guard.clone(),
            reason: script.guard_reason.clone(),
        });
    }
    if let Some(guard) = &script.pm_guard
        && !compile_guard(guard)?.is_match(package_manager)
    {
        return Err(GuardError::PackageManager {
            package_manager: package_manager.to_string(),
            guard: guard.clone(),
            reason: script.guard_reason.clone(),
        });
    }
    Ok(())
}

/// A `guard` passes when every reference in it resolves and the result is neither
/// empty nor `false`. No guard always passes.
pub fn guard_allows(dic: &Dictionary, guard: Option<&str>) -> bool {
    let Some(guard) = guard else {
        return true;
    };
    match dereference_strict(dic, guard) {
        Some(value) => {
            let value = value.trim();
            !value.is_empty() && value != "false"
        }
        None => false,
    }
}

fn project_details_value(details: &ProjectDetails) -> Value {
    let mut map = BTreeMap::new();
    map.insert("name".to_string(), Value::from(details.name.as_str()));
    map.insert("template".to_string(), Value::from(details.template.as_str()));
    if let Some(description) = &details.description {
        map.insert("description".to_string(), Value::from(description.as_str()));
    }
    map.insert("details".to_string(), Value::from(details.details.clone()));
    Value::Map(map)
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Builds the lookup dictionary for one project: the config fields (variables flattened
/// to the top level) as the base, plus `projectDirectory` and `projectDetails`.
pub fn build_dictionary(config: &Config, project: &Project) -> Dictionary {
    let mut dic = config_dictionary(config);
    dic.insert("projectDirectory", path_string(&project.directory));
    dic.insert("projectDetails", project_details_value(&project.project_details));
    dic
}

/// The config layer on its own.
pub fn config_dictionary(config: &Config) -> Dictionary {
    let mut dic = Dictionary::new();
    dic.insert("laobanDirectory", path_string(&config.laoban_directory));
    dic.insert("laobanConfig", path_string(&config.laoban_config));
    dic.insert("templateDir", config.template_dir.as_str());
    dic.insert("log", config.log.as_str());
    dic.insert("status", config.status.as_str());
    dic.insert("profile", config.profile.as_str());
    dic.insert("packageManager", config.package_manager.as_str());
    dic.insert("throttle", Value::Integer(i64::try_from(config.throttle).unwrap_or(i64::MAX)));
    for (name, value) in &config.variables {
        dic.insert(name.as_str(), value.as_str());
    }
    dic
}

/// Each value resolved independently. An absent block stays absent.
pub fn resolve_env(
    dic: &Dictionary,
    env: Option<&BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    env.map(|vars| {
        vars.iter()
            .map(|(k, v)| (k.clone(), dereference(dic, v)))
            .collect()
    })
}

fn calculate_directory(project_directory: &Path, command: &CommandDefn) -> PathBuf {
    match &command.directory {
        Some(relative) => project_directory.join(relative),
        None => project_directory.to_path_buf(),
    }
}

/// Materializes one command for one project.
pub fn materialize_command(
    dic: &Dictionary,
    project: &Project,
    script: &ScriptDetails,
    command: &CommandDefn,
) -> ShellCommandDetails {
    let directory = calculate_directory(&project.directory, command);
    ShellCommandDetails {
        command: command.clone(),
        dic: dic.clone(),
        env: resolve_env(dic, script.env.as_ref()),
        directory: PathBuf::from(dereference(dic, &path_string(&directory))),
        command_string: dereference(dic, &command.command),
    }
}

/// Materializes every command of the script for the project, in declared order.
pub fn build_shell_command_details(context: &ScriptInContext<'_>, project: &Project) -> Vec<ShellCommandDetails> {
    let dic = build_dictionary(context.config, project);
    context
        .details
        .commands
        .iter()
        .map(|command| materialize_command(&dic, project, context.details, command))
        .collect()
}

/// Names that appear more than once, with the directories that claim them.
pub fn duplicate_names(projects: &[Project]) -> BTreeMap<String, Vec<PathBuf>> {
    let mut by_name: HashMap<&str, Vec<PathBuf>> = HashMap::new();
    for p in projects {
        by_name.entry(p.name()).or_default().push(p.directory.clone());
    }
    by_name
        .into_iter()
        .filter(|(_, dirs)| dirs.len() > 1)
        .map(|(name, dirs)| (name.to_string(), dirs))
        .collect()
}
