// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

pub mod config_commands;
pub mod render;
pub mod repo_commands;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use cr_config::{ClientSettings, Resolved, load_all, paths};
use cr_logging::{CliLoggingArgs, redact};
use cr_rest_client::{AuthConfig, RestClient};
use tracing::debug;

pub use clap::Parser;

#[derive(clap::Parser, Debug)]
#[command(
    name = "cr",
    about = "Manage config repositories on a GoCD-style server",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Extra config file, applied above user and environment settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(flatten)]
    pub connection: ConnectionArgs,

    #[command(flatten)]
    pub logging: CliLoggingArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Server and credential flags; each can also come from config files
#[derive(clap::Args, Debug, Default, Clone)]
pub struct ConnectionArgs {
    /// Server base URL, e.g. https://ci.example.com/go
    #[arg(long, global = true)]
    pub server_url: Option<String>,

    #[arg(long, global = true, env = "CR_USERNAME")]
    pub username: Option<String>,

    #[arg(long, global = true, env = "CR_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Bearer token; wins over username and password
    #[arg(long, global = true, env = "CR_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

impl ConnectionArgs {
    /// Flag layer for the config loader
    pub fn flag_overrides(&self) -> Vec<(&'static str, String)> {
        [
            ("server-url", &self.server_url),
            ("auth.username", &self.username),
            ("auth.password", &self.password),
            ("auth.token", &self.token),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.clone().map(|value| (key, value)))
        .collect()
    }
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// List config repos, optionally filtered by id, URL or revision prefix
    List {
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Show one config repo with its configuration and parse status
    Show { id: String },
    /// Create a config repo from a JSON file in the admin API format
    Create {
        #[arg(long, short)]
        file: PathBuf,
    },
    /// Replace a config repo's definition with the contents of a JSON file
    Update {
        id: String,
        #[arg(long, short)]
        file: PathBuf,
    },
    Delete { id: String },
    /// Trigger a material update and wait for the parse to finish
    Reparse {
        id: String,
        /// Return as soon as the update is triggered
        #[arg(long)]
        no_wait: bool,
    },
    Config {
        #[command(subcommand)]
        subcommand: config_commands::ConfigCommands,
    },
}

impl Cli {
    pub fn load_config(&self) -> Result<Resolved> {
        let paths = paths::discover_paths(self.config.as_deref());
        let overrides = self.connection.flag_overrides();
        let flags: Vec<(&str, &str)> = overrides.iter().map(|(k, v)| (*k, v.as_str())).collect();
        load_all(&paths, &flags)
    }
}

/// HTTP client for the configured server
pub fn build_client(settings: &ClientSettings) -> Result<Arc<RestClient>> {
    let server_url = settings
        .server_url
        .as_deref()
        .context("no server URL configured; pass --server-url or set CR_SERVER_URL")?;
    let auth = AuthConfig::from_parts(
        settings.auth.username.clone(),
        settings.auth.password.clone(),
        settings.auth.token.clone(),
    );
    debug!(
        server_url,
        username = settings.auth.username.as_deref().unwrap_or(""),
        password = settings.auth.password.as_deref().map_or("", |p| redact(p)),
        token = settings.auth.token.as_deref().map_or("", |t| redact(t)),
        "building REST client"
    );
    let client = RestClient::from_url(server_url, auth)
        .with_context(|| format!("invalid server URL '{server_url}'"))?;
    Ok(Arc::new(client))
}
