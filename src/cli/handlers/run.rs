use crate::{
    CancellationToken,
    cli::{args::RunArgs, handlers::commons::{self, Workspace}},
    models::{CommandDefn, ScriptDetails},
};
use anyhow::{Result, anyhow};
use clap::Parser;

/// Joins the command words back into one command line. A single word is taken as a
/// complete command line; several are quoted so each survives the shell as one argument.
pub fn command_line(words: &[String]) -> Result<String> {
    match words {
        [single] => Ok(single.clone()),
        _ => shlex::try_join(words.iter().map(String::as_str))
            .map_err(|e| anyhow!("Cannot build a command line from {:?}: {}", words, e)),
    }
}

/// A one-command script named `run` for an ad hoc command.
pub fn adhoc_script(command: String) -> ScriptDetails {
    ScriptDetails {
        name: "run".to_string(),
        description: format!("run {}", command),
        commands: vec![CommandDefn {
            name: "run".to_string(),
            command,
            directory: None,
            status: false,
        }],
        ..Default::default()
    }
}

/// Main entry point for `laoban run <command...>`.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let run_args = RunArgs::try_parse_from(&args)?;
    let script = adhoc_script(command_line(&run_args.command)?);
    let workspace = Workspace::load()?;
    commons::execute_script(&workspace, &script, &run_args.options, cancellation_token)
}
