use clap::Parser;

pub mod args;
pub mod handlers;

/// laoban: runs scripts across the projects of a workspace, in dependency order.
///
/// The first argument is an action (`config`, `projects`, `validate`, `status`,
/// `compactStatus`, `profile`, `run`) or the name of a script from `laoban.toml`.
/// Everything after it is handed to that action.
#[derive(Parser, Debug)]
#[command(author, version, about)]
#[command(disable_help_subcommand = true)]
pub struct Cli {
    /// The action or script, followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}
