use crate::{CancellationToken, cli::handlers::commons::Workspace, core::materializer::config_dictionary};
use anyhow::{Context, Result};
use clap::Parser;

#[derive(Parser, Debug, Default)]
#[command(no_binary_name = true, about = "Displays the processed configuration.")]
struct ConfigArgs {
    /// Show the dictionary commands are resolved against instead of the config.
    #[arg(long)]
    dictionary: bool,
}

pub fn handle(args: Vec<String>, _cancellation_token: &CancellationToken) -> Result<()> {
    let config_args = ConfigArgs::try_parse_from(&args)?;
    let workspace = Workspace::load()?;
    if config_args.dictionary {
        println!("{}", config_dictionary(&workspace.config).to_pretty_json());
    } else {
        let json = serde_json::to_string_pretty(&workspace.config)
            .context("Could not render the configuration")?;
        println!("{}", json);
    }
    Ok(())
}
