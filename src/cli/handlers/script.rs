use crate::{
    CancellationToken,
    cli::{args::ScriptArgs, handlers::commons::{self, Workspace}},
};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;

/// Runs a script defined in `laoban.toml`. The first argument is the script name.
pub fn handle(args: Vec<String>, cancellation_token: &CancellationToken) -> Result<()> {
    let script_args = ScriptArgs::try_parse_from(&args)?;
    let workspace = Workspace::load()?;

    let script = workspace
        .config
        .find_script(&script_args.script)
        .ok_or_else(|| {
            let available: Vec<&str> = workspace.config.scripts.iter().map(|s| s.name.as_str()).collect();
            anyhow!(
                "Unknown action or script '{}'. Scripts in laoban.toml: {}",
                script_args.script.cyan(),
                available.join(", ")
            )
        })?;

    if script.commands.is_empty() {
        println!("{}", "Script is empty. Nothing to execute.".yellow());
        return Ok(());
    }

    commons::execute_script(&workspace, script, &script_args.options, cancellation_token)
}
