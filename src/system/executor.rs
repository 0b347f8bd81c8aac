// src/system/executor.rs

use crate::constants::EXPRESSION_PREFIX;
use crate::core::expression::{self, ExpressionError, ExpressionScope};
use crate::models::{RawShellResult, ShellCommandDetails};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Command '{command}' exited with {}", exit_label(.code))]
    NonZeroExitStatus { command: String, code: Option<i32> },
    #[error("Expression '{expression}' failed: {source}")]
    Expression {
        expression: String,
        #[source]
        source: ExpressionError,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

/// The innermost execution primitive. Implementations never fail: problems are
/// reported through `RawShellResult::err`.
pub trait RawExecutor: Send + Sync {
    fn execute(&self, details: &ShellCommandDetails) -> RawShellResult;
}

/// Runs the command string through the platform shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellExecutor;

impl RawExecutor for ShellExecutor {
    fn execute(&self, details: &ShellCommandDetails) -> RawShellResult {
        execute_in_shell(
            &details.command_string,
            &details.directory,
            details.env.as_ref(),
        )
    }
}

/// Evaluates `js:` commands in-process, never spawning a subprocess.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExpressionExecutor;

impl RawExecutor for ExpressionExecutor {
    fn execute(&self, details: &ShellCommandDetails) -> RawShellResult {
        let source = details
            .command_string
            .strip_prefix(EXPRESSION_PREFIX)
            .unwrap_or(&details.command_string);
        let scope = ExpressionScope {
            directory: &details.directory,
            env: details.env.as_ref(),
        };
        match expression::evaluate(source, &scope) {
            Ok(value) => RawShellResult {
                err: None,
                stdout: value.to_string().trim_end().to_string(),
                stderr: String::new(),
            },
            Err(e) => RawShellResult {
                stdout: format!("Error: {} Command was [{}]", e, details.command_string),
                err: Some(ExecutionError::Expression {
                    expression: source.to_string(),
                    source: e,
                }),
                stderr: String::new(),
            },
        }
    }
}

fn shell_command(command_line: &str) -> StdCommand {
    if cfg!(target_os = "windows") {
        let mut command = StdCommand::new("cmd");
        command.arg("/C").arg(command_line);
        command
    } else {
        let mut command = StdCommand::new("sh");
        command.arg("-c").arg(command_line);
        command
    }
}

/// Executes a command line in `cwd`, capturing both output streams.
///
/// `env_vars` are layered on top of the inherited environment. Trailing whitespace is
/// stripped from stdout. A spawn failure or a non-zero exit is reported in `err`.
pub fn execute_in_shell(
    command_line: &str,
    cwd: &Path,
    env_vars: Option<&BTreeMap<String, String>>,
) -> RawShellResult {
    let clean_cwd = dunce::simplified(cwd);
    let mut command = shell_command(command_line);
    command
        .current_dir(clean_cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(env) = env_vars {
        command.envs(env);
    }

    log::debug!("Spawning '{}' in {}", command_line, clean_cwd.display());
    let output = match command.output() {
        Ok(output) => output,
        Err(e) => {
            return RawShellResult {
                err: Some(ExecutionError::CommandFailed(command_line.to_string(), e)),
                ..Default::default()
            };
        }
    };

    let stdout = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let err = (!output.status.success()).then(|| ExecutionError::NonZeroExitStatus {
        command: command_line.to_string(),
        code: output.status.code(),
    });
    if let Some(e) = &err {
        log::debug!("{}", e);
    }
    RawShellResult {
        err,
        stdout,
        stderr,
    }
}
