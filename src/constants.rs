// src/constants.rs

/// The name of the workspace configuration file. Its directory is the laoban directory.
pub const LAOBAN_CONFIG_FILENAME: &str = "laoban.toml";

/// The name of the metadata file that marks a directory as a project.
pub const PROJECT_DETAILS_FILENAME: &str = "project.details.toml";

/// Commands whose resolved string starts with this marker are evaluated in-process
/// by the expression engine instead of being handed to a shell.
pub const EXPRESSION_PREFIX: &str = "js:";

/// Default file names (relative to each project directory) for the execution records.
pub const DEFAULT_LOG_FILENAME: &str = ".log";
pub const DEFAULT_STATUS_FILENAME: &str = ".status";
pub const DEFAULT_PROFILE_FILENAME: &str = ".profile";

pub const DEFAULT_PACKAGE_MANAGER: &str = "npm";
pub const DEFAULT_TEMPLATE_DIR: &str = "${laobanDirectory}/templates";

/// Directories never descended into while discovering projects.
pub const IGNORED_DIRECTORIES: &[&str] = &["node_modules", ".git", "target", "dist"];
