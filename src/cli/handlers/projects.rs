use crate::{CancellationToken, cli::handlers::commons::Workspace, core::paths::display_relative};
use anyhow::Result;
use clap::Parser;
use colored::*;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Lists the projects under the laoban directory.")]
struct ProjectsArgs {}

pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let _projects_args = ProjectsArgs::try_parse_from(&args)?;
    let workspace = Workspace::load()?;

    if workspace.projects.is_empty() {
        println!("{}", "No projects found (no project.details.toml files).".yellow());
        return Ok(());
    }
    let width = workspace
        .projects
        .iter()
        .map(|p| p.name().len())
        .max()
        .unwrap_or_default();
    for project in &workspace.projects {
        let links = project.project_details.links();
        let links = if links.is_empty() {
            String::new()
        } else {
            format!(" -> {}", links.join(", "))
        };
        println!(
            "{}  {}{}",
            format!("{:<width$}", project.name(), width = width).cyan(),
            display_relative(&workspace.root, &project.directory),
            links.dimmed()
        );
    }
    Ok(())
}
