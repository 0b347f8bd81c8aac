// src/cli/args.rs
use crate::core::workspace::ProjectSelection;
use crate::models::RunOptions;
use clap::{Args, Parser};

/// Which projects an action applies to.
#[derive(Args, Debug, Default, Clone)]
pub struct ProjectArgs {
    /// Execute in this project directory only (the opposite of --all).
    #[arg(short = '1', long)]
    pub one: bool,

    /// Execute in all projects, even from inside a project.
    #[arg(short, long, conflicts_with = "one")]
    pub all: bool,

    /// Execute in the projects whose name matches this regex, e.g. -p 'api'.
    #[arg(short, long)]
    pub projects: Option<String>,
}

impl ProjectArgs {
    pub fn selection(&self) -> ProjectSelection {
        ProjectSelection {
            all: self.all,
            one: self.one,
            projects: self.projects.clone(),
        }
    }
}

/// Options shared by scripts and `run`.
#[derive(Args, Debug, Default, Clone)]
pub struct ScriptOptions {
    #[command(flatten)]
    pub projects: ProjectArgs,

    /// Show the commands that would run without running them.
    #[arg(short, long)]
    pub dryrun: bool,

    /// Indent command output so the markers stand out.
    #[arg(short = 's', long = "shellDebug")]
    pub shell_debug: bool,

    /// Don't display the output of the commands.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the variables each command was resolved against.
    #[arg(short, long)]
    pub variables: bool,

    /// Split the projects into generations by their links.
    #[arg(short, long)]
    pub links: bool,

    /// Print the generations instead of running anything.
    #[arg(short, long = "generationPlan")]
    pub generation_plan: bool,

    /// Maximum number of projects running at once. Overrides `throttle` in laoban.toml.
    #[arg(short, long)]
    pub throttle: Option<usize>,

    /// Stop starting new commands after the first failure.
    #[arg(long = "abortOnError")]
    pub abort_on_error: bool,
}

impl ScriptOptions {
    /// Command-line flags merged with the config defaults.
    pub fn run_options(&self, config_throttle: usize, config_abort_on_error: bool) -> RunOptions {
        RunOptions {
            dryrun: self.dryrun,
            shell_debug: self.shell_debug,
            quiet: self.quiet,
            variables: self.variables,
            links: self.links,
            generation_plan: self.generation_plan,
            abort_on_error: self.abort_on_error || config_abort_on_error,
            throttle: self.throttle.unwrap_or(config_throttle),
        }
    }
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct ScriptArgs {
    /// The script to execute, as named in laoban.toml.
    pub script: String,

    #[command(flatten)]
    pub options: ScriptOptions,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Executes an ad hoc command in each selected project.")]
pub struct RunArgs {
    #[command(flatten)]
    pub options: ScriptOptions,

    /// The command line. A single argument is used verbatim; several are shell-quoted and joined.
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true)]
pub struct SelectionArgs {
    #[command(flatten)]
    pub projects: ProjectArgs,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_flags() {
        let args = ScriptArgs::try_parse_from([
            "test", "-d", "--shellDebug", "-l", "-t", "3", "-p", "api", "--abortOnError",
        ])
        .unwrap();
        assert_eq!(args.script, "test");
        let options = args.options.run_options(0, false);
        assert!(options.dryrun && options.shell_debug && options.links && options.abort_on_error);
        assert!(!options.quiet);
        assert_eq!(options.throttle, 3);
        assert_eq!(args.options.projects.projects.as_deref(), Some("api"));
    }

    #[test]
    fn test_config_defaults_apply_when_flags_are_absent() {
        let args = ScriptArgs::try_parse_from(["build", "-1"]).unwrap();
        let options = args.options.run_options(5, true);
        assert_eq!(options.throttle, 5);
        assert!(options.abort_on_error);
        assert!(args.options.projects.one);
        assert!(ScriptArgs::try_parse_from(["build", "-1", "-a"]).is_err());
    }

    #[test]
    fn test_run_keeps_the_command_words() {
        let args = RunArgs::try_parse_from(["-a", "git", "status", "--short"]).unwrap();
        assert!(args.options.projects.all);
        assert_eq!(args.command, vec!["git", "status", "--short"]);
        assert!(RunArgs::try_parse_from(["-a"]).is_err());
    }
}
