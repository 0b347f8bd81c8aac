use crate::{
    CancellationToken,
    cli::{args::SelectionArgs, handlers::commons::Workspace},
    core::profile::{format_profiles, read_profile},
};
use anyhow::{Context, Result};
use clap::Parser;

/// `profile`: latest and average durations of named commands, per project.
pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let selection_args = SelectionArgs::try_parse_from(&args)?;
    let workspace = Workspace::load()?;
    let mut rows = Vec::new();
    for project in workspace.select(&selection_args.projects)? {
        let path = project.file(&workspace.config.profile);
        let summary = read_profile(&path).with_context(|| format!("Could not read '{}'", path.display()))?;
        rows.push((project.name().to_string(), summary));
    }
    print!("{}", format_profiles(&rows));
    Ok(())
}
