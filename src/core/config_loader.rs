//! # Config Loader
//!
//! Finds the workspace's `laoban.toml`, deserializes it into a [`RawConfig`] and
//! processes it into the immutable [`Config`] used for the rest of the run.
//!
//! Processing seeds the dictionary with `laobanDirectory` and `laobanConfig`, then
//! dereferences `templateDir`, `log`, `status`, `profile`, `packageManager` and each
//! variable in that order, adding every result to the dictionary as it goes. Later
//! values can therefore refer to earlier ones. Script descriptions and env values are
//! resolved leniently against the finished config dictionary; command strings are left
//! for per-project materialization.

use crate::constants::{
    DEFAULT_LOG_FILENAME, DEFAULT_PACKAGE_MANAGER, DEFAULT_PROFILE_FILENAME, DEFAULT_STATUS_FILENAME,
    DEFAULT_TEMPLATE_DIR, LAOBAN_CONFIG_FILENAME,
};
use crate::core::dictionary::{Dictionary, Value};
use crate::core::materializer::{GuardError, compile_guard};
use crate::core::variables::{VariableError, dereference, validate_references};
use crate::models::{CommandDefn, Config, RawConfig, ScriptDefn, ScriptDetails, TomlCommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot find laoban.toml in '{0}' or any of its parents")]
    NotFound(PathBuf),
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
    #[error("Script '{script}' has an invalid guard: {source}")]
    InvalidGuard {
        script: String,
        #[source]
        source: VariableError,
    },
    #[error("Script '{script}': {source}")]
    InvalidGuardPattern {
        script: String,
        #[source]
        source: GuardError,
    },
    #[error("Script '{script}': the command '{command}' sets status = true but has no name")]
    UnnamedStatusCommand { script: String, command: String },
    #[error("Script '{script}': the name '{name}' contains whitespace")]
    NameWithWhitespace { script: String, name: String },
}

/// Walks up from `start` (inclusive) to the first directory holding `laoban.toml`.
pub fn find_laoban_directory(start: &Path) -> Result<PathBuf, ConfigError> {
    start
        .ancestors()
        .find(|dir| dir.join(LAOBAN_CONFIG_FILENAME).is_file())
        .map(Path::to_path_buf)
        .ok_or_else(|| ConfigError::NotFound(start.to_path_buf()))
}

/// Reads and processes the `laoban.toml` found in `laoban_directory`.
pub fn load_config(laoban_directory: &Path) -> Result<Config, ConfigError> {
    let path = laoban_directory.join(LAOBAN_CONFIG_FILENAME);
    log::debug!("Loading config from {}", path.display());
    let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    let raw: RawConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.clone(),
        source,
    })?;
    process_config(laoban_directory, raw)
}

/// Resolves the raw config in declaration order against a growing dictionary.
pub fn process_config(laoban_directory: &Path, raw: RawConfig) -> Result<Config, ConfigError> {
    let laoban_config = laoban_directory.join(LAOBAN_CONFIG_FILENAME);
    let mut dic = Dictionary::new();
    dic.insert("laobanDirectory", laoban_directory.to_string_lossy().to_string());
    dic.insert("laobanConfig", laoban_config.to_string_lossy().to_string());

    let template_dir = add(&mut dic, "templateDir", raw.template_dir, DEFAULT_TEMPLATE_DIR);
    let log = add(&mut dic, "log", raw.log, DEFAULT_LOG_FILENAME);
    let status = add(&mut dic, "status", raw.status, DEFAULT_STATUS_FILENAME);
    let profile = add(&mut dic, "profile", raw.profile, DEFAULT_PROFILE_FILENAME);
    let package_manager = add(&mut dic, "packageManager", raw.package_manager, DEFAULT_PACKAGE_MANAGER);

    let throttle = raw.throttle.unwrap_or(0);
    dic.insert("throttle", Value::Integer(i64::try_from(throttle).unwrap_or(i64::MAX)));

    let mut variables = BTreeMap::new();
    for (name, value) in raw.variables {
        let text = match value {
            toml::Value::String(s) => s,
            other => Value::from(other).to_string(),
        };
        let resolved = add(&mut dic, &name, Some(text), "");
        variables.insert(name, resolved);
    }

    let scripts = raw
        .scripts
        .into_iter()
        .map(|(name, defn)| process_script(&dic, &name, defn))
        .collect::<Result<Vec<_>, _>>()?;
    log::debug!("Processed {} script(s)", scripts.len());

    Ok(Config {
        laoban_directory: laoban_directory.to_path_buf(),
        laoban_config,
        template_dir,
        log,
        status,
        profile,
        package_manager,
        throttle,
        abort_on_error: raw.abort_on_error.unwrap_or(false),
        variables,
        scripts,
    })
}

/// Dereferences one value against everything resolved so far, then makes it available
/// to the values after it.
fn add(dic: &mut Dictionary, name: &str, raw_value: Option<String>, default: &str) -> String {
    let value = dereference(dic, raw_value.as_deref().unwrap_or(default));
    dic.insert(name, value.as_str());
    value
}

fn process_script(dic: &Dictionary, name: &str, defn: ScriptDefn) -> Result<ScriptDetails, ConfigError> {
    if let Some(guard) = &defn.guard {
        validate_references(guard).map_err(|source| ConfigError::InvalidGuard {
            script: name.to_string(),
            source,
        })?;
    }
    for pattern in [&defn.os_guard, &defn.pm_guard].into_iter().flatten() {
        compile_guard(pattern).map_err(|source| ConfigError::InvalidGuardPattern {
            script: name.to_string(),
            source,
        })?;
    }
    let commands: Vec<CommandDefn> = defn.commands.into_iter().map(TomlCommand::into_defn).collect();
    // Status and profile lines are whitespace separated.
    for command in &commands {
        if command.status && command.name.is_empty() {
            return Err(ConfigError::UnnamedStatusCommand {
                script: name.to_string(),
                command: command.command.clone(),
            });
        }
    }
    let script_name = dereference(dic, name);
    let mut record_names = std::iter::once(&script_name).chain(commands.iter().map(|c| &c.name));
    if let Some(bad) = record_names.find(|n| n.chars().any(char::is_whitespace)) {
        return Err(ConfigError::NameWithWhitespace {
            script: name.to_string(),
            name: bad.clone(),
        });
    }
    Ok(ScriptDetails {
        name: script_name,
        description: dereference(dic, &defn.description),
        commands,
        guard: defn.guard,
        os_guard: defn.os_guard,
        pm_guard: defn.pm_guard,
        guard_reason: defn.guard_reason,
        env: defn.env.map(|env| {
            env.into_iter()
                .map(|(k, v)| (k, dereference(dic, &v)))
                .collect()
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        log = ".laoban.log"
        packageManager = "yarn"
        throttle = 4

        [variables]
        registry = "https://npm.local"
        publishUrl = "${registry}/publish"
        retries = 3

        [scripts.install]
        description = "install with ${packageManager}"
        commands = ["${packageManager} install", { name = "check", command = "ls", status = true }]

        [scripts.serve]
        guard = "${projectDetails.details.port}"
        osGuard = "Linux|Darwin"
        env = { REGISTRY = "${registry}", PORT = "${projectDetails.details.port}" }
        commands = ["node server.js"]
    "#;

    fn sample() -> Config {
        let raw: RawConfig = toml::from_str(SAMPLE).unwrap();
        process_config(Path::new("/ws"), raw).unwrap()
    }

    #[test]
    fn test_defaults_and_ordered_dereferencing() {
        let config = sample();
        assert_eq!(config.laoban_config, PathBuf::from("/ws/laoban.toml"));
        assert_eq!(config.template_dir, "/ws/templates");
        assert_eq!(config.log, ".laoban.log");
        assert_eq!(config.status, ".status");
        assert_eq!(config.profile, ".profile");
        assert_eq!(config.package_manager, "yarn");
        assert_eq!(config.throttle, 4);
        assert!(!config.abort_on_error);
        assert_eq!(config.variables["publishUrl"], "https://npm.local/publish");
        assert_eq!(config.variables["retries"], "3");
    }

    #[test]
    fn test_scripts_are_processed() {
        let config = sample();
        let install = config.find_script("install").unwrap();
        assert_eq!(install.description, "install with yarn");
        assert_eq!(install.commands[0].command, "${packageManager} install");
        assert_eq!(install.commands[1].name, "check");
        assert!(install.commands[1].status);

        let serve = config.find_script("serve").unwrap();
        let env = serve.env.as_ref().unwrap();
        assert_eq!(env["REGISTRY"], "https://npm.local");
        assert_eq!(env["PORT"], "${projectDetails.details.port}");
        assert_eq!(serve.guard.as_deref(), Some("${projectDetails.details.port}"));
    }

    #[test]
    fn test_malformed_guards_are_rejected() {
        let raw: RawConfig = toml::from_str(
            r#"
            [scripts.bad]
            guard = "${projectDetails.details.port"
            commands = ["ls"]
            "#,
        )
        .unwrap();
        let err = process_config(Path::new("/ws"), raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGuard { .. }));

        let raw: RawConfig = toml::from_str(
            r#"
            [scripts.bad]
            pmGuard = "(npm"
            commands = ["ls"]
            "#,
        )
        .unwrap();
        let err = process_config(Path::new("/ws"), raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidGuardPattern { .. }));
    }

    #[test]
    fn test_record_names_must_be_single_words() {
        let raw: RawConfig = toml::from_str(
            r#"
            [scripts.check]
            commands = [{ command = "npm test", status = true }]
            "#,
        )
        .unwrap();
        let err = process_config(Path::new("/ws"), raw).unwrap_err();
        assert!(matches!(err, ConfigError::UnnamedStatusCommand { ref command, .. } if command == "npm test"));

        let raw: RawConfig = toml::from_str(
            r#"
            [scripts.check]
            commands = [{ name = "unit tests", command = "npm test" }]
            "#,
        )
        .unwrap();
        let err = process_config(Path::new("/ws"), raw).unwrap_err();
        assert!(matches!(err, ConfigError::NameWithWhitespace { ref name, .. } if name == "unit tests"));

        let raw: RawConfig = toml::from_str(
            r#"
            [scripts."full build"]
            commands = ["make"]
            "#,
        )
        .unwrap();
        let err = process_config(Path::new("/ws"), raw).unwrap_err();
        assert!(matches!(err, ConfigError::NameWithWhitespace { ref name, .. } if name == "full build"));
    }

    #[test]
    fn test_find_and_load_from_a_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(LAOBAN_CONFIG_FILENAME), SAMPLE).unwrap();
        let nested = dir.path().join("modules").join("api");
        fs::create_dir_all(&nested).unwrap();

        let found = find_laoban_directory(&nested).unwrap();
        assert_eq!(found, dir.path());
        let config = load_config(&found).unwrap();
        assert_eq!(config.scripts.len(), 2);
    }

    #[test]
    fn test_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_config(dir.path()),
            Err(ConfigError::Read { .. })
        ));

        fs::write(dir.path().join(LAOBAN_CONFIG_FILENAME), "unknownKey = 1").unwrap();
        assert!(matches!(
            load_config(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
