// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Layered settings for the config repo client.
//!
//! Layers are merged as JSON in precedence order
//! system < user < env < `--config` file < flags, then extracted into
//! [`ClientSettings`]. File layers are checked against the schema generated
//! from [`ClientSettings`] before merging.

pub mod env;
pub mod extract;
pub mod loader;
pub mod merge;
pub mod paths;
pub mod provenance;
pub mod schema;

pub use provenance::{Provenance, Scope};
pub use schema::{AuthSettings, ClientSettings, DEFAULT_POLL_INTERVAL_MS};

use anyhow::Result;
use serde_json::Value as J;
use tracing::debug;

#[derive(Debug)]
pub struct Resolved {
    pub json: J,
    pub provenance: Provenance,
}

impl Resolved {
    pub fn settings(&self) -> Result<ClientSettings> {
        extract::get(&self.json)
    }

    /// Scope that supplied `dotted_key`, if any
    pub fn origin(&self, dotted_key: &str) -> Option<Scope> {
        self.provenance.winner.get(dotted_key).copied()
    }
}

/// Load every layer from disk and the process environment
pub fn load_all(paths: &paths::Paths, flag_sets: &[(&str, &str)]) -> Result<Resolved> {
    load_with_env(paths, env::env_overlay()?, flag_sets)
}

/// Like [`load_all`] with an explicit environment overlay
pub fn load_with_env(paths: &paths::Paths, env_layer: J, flag_sets: &[(&str, &str)]) -> Result<Resolved> {
    let system_layer = read_if_exists(&paths.system, Scope::System)?;
    let user_layer = read_if_exists(&paths.user, Scope::User)?;
    // an explicit --config must exist
    let cli_layer = paths
        .cli_config
        .as_deref()
        .map(|path| loader::read_layer_from_file(path, Scope::CliConfig))
        .transpose()?;
    let flags_layer = env::flags_overlay(flag_sets);

    let layers = [
        (system_layer.map(|l| l.json), Scope::System),
        (user_layer.map(|l| l.json), Scope::User),
        (Some(env_layer), Scope::Env),
        (cli_layer.map(|l| l.json), Scope::CliConfig),
        (Some(flags_layer), Scope::Flags),
    ];

    let mut json = serde_json::json!({});
    let mut provenance = Provenance::default();
    for (layer, scope) in layers {
        let Some(layer) = layer else {
            continue;
        };
        provenance.record_layer(&layer, scope);
        merge::merge_two_json(&mut json, layer);
    }

    debug!(keys = provenance.winner.len(), "resolved client configuration");
    Ok(Resolved { json, provenance })
}

fn read_if_exists(path: &std::path::Path, scope: Scope) -> Result<Option<loader::Layer>> {
    if path.exists() {
        loader::read_layer_from_file(path, scope).map(Some)
    } else {
        Ok(None)
    }
}
