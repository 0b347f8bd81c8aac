// src/cli/handlers/commons.rs

// Shared by the handlers: workspace loading and the script execution pipeline.

use crate::{
    CancellationToken,
    cli::args::{ProjectArgs, ScriptOptions},
    core::{
        config_loader, generations,
        materializer::check_guard,
        paths,
        report::{self, ConsoleReporter},
        runner::{self, CommandFailures, GenerationExecutor},
        workspace,
    },
    models::{Config, Project, ScriptDetails, ScriptInContext},
    system::decorators::default_executor,
};
use anyhow::{Context, Result};
use colored::*;
use std::path::PathBuf;

/// The processed config plus every project discovered under the laoban directory.
#[derive(Debug)]
pub struct Workspace {
    pub root: PathBuf,
    pub current_dir: PathBuf,
    pub config: Config,
    pub projects: Vec<Project>,
}

impl Workspace {
    /// Finds `laoban.toml` from the current directory upwards and loads everything under it.
    pub fn load() -> Result<Self> {
        let current_dir = paths::current_dir()?;
        let root = config_loader::find_laoban_directory(&current_dir)?;
        let config = config_loader::load_config(&root)?;
        let projects = workspace::discover_projects(&root)
            .with_context(|| format!("Failed to discover projects under '{}'", root.display()))?;
        Ok(Self {
            root,
            current_dir,
            config,
            projects,
        })
    }

    pub fn select(&self, args: &ProjectArgs) -> Result<Vec<Project>> {
        let selected = workspace::select_projects(
            self.projects.clone(),
            &self.root,
            &self.current_dir,
            &args.selection(),
        )?;
        log::debug!("Selected {} of {} project(s)", selected.len(), self.projects.len());
        Ok(selected)
    }
}

/// Runs `script` across the selected projects and fails with [`CommandFailures`] if any
/// command failed.
pub fn execute_script(
    workspace: &Workspace,
    script: &ScriptDetails,
    options: &ScriptOptions,
    cancellation_token: &CancellationToken,
) -> Result<()> {
    let config = &workspace.config;
    if let Err(e) = check_guard(config, script) {
        println!("{}", e.to_string().yellow());
        return Ok(());
    }

    let projects = workspace.select(&options.projects)?;
    let run_options = options.run_options(config.throttle, config.abort_on_error);

    if run_options.generation_plan {
        let plan = generations::calculate_all_generations(&projects)?;
        report::print_generation_plan(&plan);
        return Ok(());
    }

    let context = ScriptInContext::new(config, script, run_options);
    let plan = runner::plan_generations(&context, &projects, run_options.links)?;
    if !plan.missing.is_empty() {
        let names: Vec<&str> = plan.missing.iter().map(|p| p.name()).collect();
        println!(
            "{}",
            format!("Missing: can't put in a generation: {}", names.join(",")).yellow()
        );
    }

    let executor = default_executor();
    let generation_executor =
        GenerationExecutor::new(&executor, run_options.throttle, cancellation_token.clone())?
            .abort_on_error(run_options.abort_on_error);
    let mut reporter = ConsoleReporter::new(&run_options);
    let results = generation_executor.execute_generations(&plan.generations, &mut reporter);

    let failures = runner::count_failures(&results);
    if failures > 0 {
        return Err(CommandFailures(failures).into());
    }
    Ok(())
}
