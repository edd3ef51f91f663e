// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

use std::sync::Arc;

use anyhow::Result;
use cr_cli::{Cli, Commands, Parser, build_client, repo_commands};
use cr_client_api::ConfigRepoApi;
use cr_core::RepositoryCollection;
use cr_logging::CliLogLevel;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let resolved = cli.load_config()?;
    let settings = resolved.settings()?;

    // --log-level beats the configured level
    let default_level = settings
        .log_level
        .as_deref()
        .map(str::parse::<CliLogLevel>)
        .transpose()
        .map_err(anyhow::Error::msg)?
        .unwrap_or_default();
    cli.logging.clone().init_with_default_level("cr", default_level)?;

    let mut out = std::io::stdout().lock();

    if let Commands::Config { subcommand } = &cli.command {
        return subcommand.run(&resolved, &mut out);
    }

    let client: Arc<dyn ConfigRepoApi> = build_client(&settings)?;
    let mut collection =
        RepositoryCollection::new(client).with_poll_interval(settings.poll_interval());

    match &cli.command {
        Commands::List { search } => {
            repo_commands::list(&mut collection, search.as_deref(), &mut out).await
        }
        Commands::Show { id } => repo_commands::show(&mut collection, id, &mut out).await,
        Commands::Create { file } => repo_commands::create(&mut collection, file, &mut out).await,
        Commands::Update { id, file } => {
            repo_commands::update(&mut collection, id, file, &mut out).await
        }
        Commands::Delete { id } => repo_commands::delete(&mut collection, id, &mut out).await,
        Commands::Reparse { id, no_wait } => {
            repo_commands::reparse(&mut collection, id, *no_wait, &mut out).await
        }
        Commands::Config { .. } => Ok(()),
    }
}
