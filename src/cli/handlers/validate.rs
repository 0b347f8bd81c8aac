use crate::{
    CancellationToken,
    cli::handlers::commons::Workspace,
    core::{generations::ProjectGraph, materializer::duplicate_names},
};
use anyhow::{Result, anyhow};
use clap::Parser;
use colored::*;

#[derive(Parser, Debug, Default)]
#[command(
    no_binary_name = true,
    about = "Checks project names and links across the workspace."
)]
struct ValidateArgs {}

/// Every problem found, one line each.
pub fn find_problems(workspace: &Workspace) -> Vec<String> {
    let duplicates = duplicate_names(&workspace.projects);
    if !duplicates.is_empty() {
        return duplicates
            .into_iter()
            .map(|(name, dirs)| {
                let dirs: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
                format!("Project name '{}' is used by: {}", name, dirs.join(", "))
            })
            .collect();
    }
    let Ok(graph) = ProjectGraph::new(&workspace.projects) else {
        return vec!["Duplicate project names".to_string()];
    };
    let mut problems: Vec<String> = graph
        .unknown_links()
        .into_iter()
        .map(|(project, link)| format!("Project '{}' links to unknown project '{}'", project, link))
        .collect();
    let plan = graph.plan();
    if !plan.missing.is_empty() {
        problems.push(format!(
            "Can't put in a generation (cycle or unknown link): {}",
            plan.missing.join(", ")
        ));
    }
    problems
}

pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let _validate_args = ValidateArgs::try_parse_from(&args)?;
    let workspace = Workspace::load()?;
    let problems = find_problems(&workspace);
    if problems.is_empty() {
        println!(
            "{} {} project(s), no problems found.",
            "OK".green().bold(),
            workspace.projects.len()
        );
        return Ok(());
    }
    for problem in &problems {
        println!("  {} {}", "-".red(), problem);
    }
    Err(anyhow!("Validation found {} problem(s)", problems.len()))
}
