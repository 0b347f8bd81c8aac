use crate::{
    CancellationToken,
    cli::{args::SelectionArgs, handlers::commons::Workspace},
    core::status::{read_status, status_table, write_compacted_status},
};
use anyhow::{Context, Result};
use clap::Parser;
use colored::*;

/// `status`: the latest outcome of every status-tracked command, per project.
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let selection_args = SelectionArgs::try_parse_from(&args)?;
    let workspace = Workspace::load()?;
    let mut rows = Vec::new();
    for project in workspace.select(&selection_args.projects)? {
        let path = project.file(&workspace.config.status);
        let status = read_status(&path).with_context(|| format!("Could not read '{}'", path.display()))?;
        rows.push((project.name().to_string(), status));
    }
    print!("{}", status_table(&rows));
    Ok(())
}

/// `compactStatus`: rewrites each status file keeping only the latest line per command.
pub fn handle_compact(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let selection_args = SelectionArgs::try_parse_from(&args)?;
    let workspace = Workspace::load()?;
    for project in workspace.select(&selection_args.projects)? {
        let path = project.file(&workspace.config.status);
        if !path.is_file() {
            continue;
        }
        let status = read_status(&path).with_context(|| format!("Could not read '{}'", path.display()))?;
        write_compacted_status(&path, &status)
            .with_context(|| format!("Could not write '{}'", path.display()))?;
        println!("{} {} ({} command(s))", "Compacted".green(), project.name(), status.len());
    }
    Ok(())
}
