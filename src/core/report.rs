// src/core/report.rs

//! Console output for a run: the per-generation report and the `--generationPlan` listing.

use crate::core::generations::GenerationPlan;
use crate::core::runner::GenerationReporter;
use crate::models::{GenerationResult, RunOptions, ScriptOutcome, ScriptResult, ShellResult};
use colored::*;

/// Error, stderr, then stdout of one command, as it appears on the console.
pub fn console_output_for(result: &ShellResult) -> String {
    let error = result
        .err
        .as_ref()
        .map(|e| format!("***Error***{}\n", e))
        .unwrap_or_default();
    let stderr = if result.stderr.is_empty() {
        String::new()
    } else {
        format!("***StdError***{}\n", result.stderr)
    };
    format!("{}{}{}", error, stderr, result.stdout)
}

/// Indents every line that is not a `***` marker line.
fn prefix_lines_that_dont_start_with_star(text: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.starts_with('*') {
                line.to_string()
            } else {
                format!("        {}", line)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// The console text for one script on one project. Empty when there is nothing to show.
pub fn script_report(result: &ScriptResult, shell_debug: bool) -> String {
    let text = match &result.outcome {
        ScriptOutcome::Skipped(reason) => {
            format!("***Skipped***{} {}: {}", result.project_name, result.script_name, reason)
        }
        ScriptOutcome::Cancelled if result.results.is_empty() => {
            format!("***Cancelled***{} {}", result.project_name, result.script_name)
        }
        _ => result
            .results
            .iter()
            .map(console_output_for)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    };
    let text = text.trim_end();
    if shell_debug {
        prefix_lines_that_dont_start_with_star(text)
    } else {
        text.to_string()
    }
}

/// Prints each script's output once its generation has finished.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter {
    quiet: bool,
    shell_debug: bool,
}

impl ConsoleReporter {
    pub fn new(options: &RunOptions) -> Self {
        Self {
            quiet: options.quiet,
            shell_debug: options.shell_debug,
        }
    }
}

impl GenerationReporter for ConsoleReporter {
    fn report(&mut self, index: usize, result: &GenerationResult) {
        log::debug!("Generation {} finished with {} script result(s)", index, result.len());
        if self.quiet {
            return;
        }
        for script_result in result {
            let text = script_report(script_result, self.shell_debug);
            if text.is_empty() {
                continue;
            }
            if script_result.has_errors() {
                println!("{}", text.red());
            } else {
                println!("{}", text);
            }
        }
    }
}

/// `Generation <i>` headers with the names of each, then the names that could not be placed.
pub fn format_generation_plan(plan: &GenerationPlan) -> String {
    let mut lines = Vec::new();
    for (i, generation) in plan.generations.iter().enumerate() {
        lines.push(format!("Generation {}", i));
        lines.push(format!("  {}", generation.join(", ")));
    }
    if !plan.missing.is_empty() {
        lines.push(String::new());
        lines.push("Missing: can't put in a generation".to_string());
        lines.push(format!("  {}", plan.missing.join(",")));
    }
    lines.join("\n")
}

pub fn print_generation_plan(plan: &GenerationPlan) {
    let text = format_generation_plan(plan);
    if !text.is_empty() {
        println!("{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::dictionary::Dictionary;
    use crate::models::{CommandDefn, ShellCommandDetails};
    use crate::system::executor::ExecutionError;
    use std::path::PathBuf;
    use std::time::Duration;

    fn shell_result(stdout: &str, stderr: &str, failed: bool) -> ShellResult {
        ShellResult {
            details: ShellCommandDetails {
                command: CommandDefn::default(),
                dic: Dictionary::new(),
                env: None,
                directory: PathBuf::from("/w"),
                command_string: "make".to_string(),
            },
            duration: Duration::from_millis(3),
            err: failed.then(|| ExecutionError::NonZeroExitStatus {
                command: "make".to_string(),
                code: Some(2),
            }),
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    fn script_result(results: Vec<ShellResult>, outcome: ScriptOutcome) -> ScriptResult {
        ScriptResult {
            project_name: "api".to_string(),
            directory: PathBuf::from("/w/api"),
            script_name: "build".to_string(),
            results,
            duration: Duration::ZERO,
            outcome,
        }
    }

    #[test]
    fn test_console_output_layout() {
        assert_eq!(console_output_for(&shell_result("ok", "", false)), "ok");
        assert_eq!(
            console_output_for(&shell_result("partial", "boom\n", true)),
            "***Error***Command 'make' exited with code 2\n***StdError***boom\n\npartial"
        );
    }

    #[test]
    fn test_shell_debug_indents_plain_lines() {
        let sr = script_result(
            vec![shell_result("line one\nline two", "", true)],
            ScriptOutcome::Completed,
        );
        assert_eq!(
            script_report(&sr, true),
            "***Error***Command 'make' exited with code 2\n        line one\n        line two"
        );
    }

    #[test]
    fn test_skipped_scripts_are_reported() {
        let sr = script_result(vec![], ScriptOutcome::Skipped("no port".to_string()));
        assert_eq!(script_report(&sr, false), "***Skipped***api build: no port");
    }

    #[test]
    fn test_generation_plan_format() {
        let plan = GenerationPlan {
            generations: vec![
                vec!["core".to_string()],
                vec!["api".to_string(), "ui".to_string()],
            ],
            missing: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(
            format_generation_plan(&plan),
            "Generation 0\n  core\nGeneration 1\n  api, ui\n\nMissing: can't put in a generation\n  a,b"
        );
        assert_eq!(format_generation_plan(&GenerationPlan::default()), "");
    }
}
