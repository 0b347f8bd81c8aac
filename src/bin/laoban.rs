// src/bin/laoban.rs

use anyhow::Result;
use laoban::{
    CancellationToken,
    cli::{Cli, handlers},
    core::runner::CommandFailures,
};
use clap::Parser;
use colored::*;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

// --- Command Definition and Registry ---

/// A built-in action, its aliases and its handler.
struct CommandDefinition {
    name: &'static str,
    aliases: &'static [&'static str],
    description: &'static str,
    handler: fn(Vec<String>, &CancellationToken) -> Result<()>,
}

/// Every built-in action. Any other first argument is a script name.
static COMMAND_REGISTRY: &[CommandDefinition] = &[
    CommandDefinition {
        name: "config",
        aliases: &[],
        description: "displays the processed laoban.toml",
        handler: handlers::config::handle,
    },
    CommandDefinition {
        name: "projects",
        aliases: &["ls"],
        description: "lists the projects under the laoban directory",
        handler: handlers::projects::handle,
    },
    CommandDefinition {
        name: "validate",
        aliases: &[],
        description: "checks project names and links",
        handler: handlers::validate::handle,
    },
    CommandDefinition {
        name: "status",
        aliases: &[],
        description: "shows the latest status of each project",
        handler: handlers::status::handle,
    },
    CommandDefinition {
        name: "compactStatus",
        aliases: &[],
        description: "crunches the status files",
        handler: handlers::status::handle_compact,
    },
    CommandDefinition {
        name: "profile",
        aliases: &[],
        description: "shows the time taken by named commands",
        handler: handlers::profile::handle,
    },
    CommandDefinition {
        name: "run",
        aliases: &[],
        description: "runs an ad hoc command in each project",
        handler: handlers::run::handle,
    },
];

fn find_command(name: &str) -> Option<&'static CommandDefinition> {
    COMMAND_REGISTRY
        .iter()
        .find(|cmd| cmd.name == name || cmd.aliases.contains(&name))
}

fn main() {
    let cancellation_token = Arc::new(AtomicBool::new(false));
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse(), cancellation_token) {
        if let Some(failures) = e.downcast_ref::<CommandFailures>() {
            eprintln!("\n{}", failures.to_string().red().bold());
            std::process::exit(1);
        }
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Routes the first argument to a built-in action, or to the script handler.
fn run_cli(cli: Cli, cancellation_token: CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let mut args = cli.args;
    if args.is_empty() {
        print_overview();
        return Ok(());
    }
    match find_command(&args[0]) {
        Some(command) => {
            args.remove(0);
            (command.handler)(args, &cancellation_token)
        }
        None => handlers::script::handle(args, &cancellation_token),
    }
}

fn print_overview() {
    println!("{}", "Usage: laoban <action|script> [options]".bold());
    println!("\n{}", "Actions:".yellow());
    for command in COMMAND_REGISTRY {
        println!("  {} {}", format!("{:<15}", command.name).cyan(), command.description);
    }
    match handlers::commons::Workspace::load() {
        Ok(workspace) => {
            println!("\n{}", "Scripts:".yellow());
            for script in &workspace.config.scripts {
                println!("  {} {}", format!("{:<15}", script.name).cyan(), script.description);
            }
        }
        Err(e) => log::debug!("No workspace to list scripts from: {:#}", e),
    }
}
