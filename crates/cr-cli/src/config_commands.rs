// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Configuration inspection commands
use std::io::Write;

use anyhow::Result;
use clap::Subcommand;
use cr_config::Resolved;
use cr_logging::redact;
use serde_json::Value as J;

/// Keys whose values are never printed
const SECRET_KEYS: &[&str] = &["auth.password", "auth.token"];

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        /// Only this dotted key, e.g. `auth.username`
        key: Option<String>,
        /// Print which layer supplied each value
        #[arg(long)]
        show_origin: bool,
    },
    /// Print a single value
    Get { key: String },
    /// List every layer that set a key, lowest precedence first
    Explain { key: String },
}

impl ConfigCommands {
    pub fn run(&self, resolved: &Resolved, out: &mut impl Write) -> Result<()> {
        match self {
            ConfigCommands::Show { key, show_origin } => {
                show_config(resolved, key.as_deref(), *show_origin, out)
            }
            ConfigCommands::Get { key } => match lookup(&resolved.json, key) {
                Some(value) => Ok(writeln!(out, "{}", display_value(key, value))?),
                None => Ok(writeln!(out, "Configuration key '{key}' not found")?),
            },
            ConfigCommands::Explain { key } => explain_config(resolved, key, out),
        }
    }
}

fn show_config(
    resolved: &Resolved,
    key_filter: Option<&str>,
    show_origin: bool,
    out: &mut impl Write,
) -> Result<()> {
    let keys: Vec<&String> = resolved
        .provenance
        .winner
        .keys()
        .filter(|key| key_filter.map_or(true, |filter| key.as_str() == filter))
        .collect();

    if keys.is_empty() {
        match key_filter {
            Some(filter) => writeln!(out, "Configuration key '{filter}' not found")?,
            None => writeln!(out, "No configuration values set")?,
        }
        return Ok(());
    }

    for key in keys {
        let Some(value) = lookup(&resolved.json, key) else {
            continue;
        };
        let value = display_value(key, value);
        match resolved.origin(key).filter(|_| show_origin) {
            Some(scope) => writeln!(out, "{key}={value} (from {scope})")?,
            None => writeln!(out, "{key}={value}")?,
        }
    }
    Ok(())
}

fn explain_config(resolved: &Resolved, key: &str, out: &mut impl Write) -> Result<()> {
    let Some(changes) = resolved.provenance.changes.get(key) else {
        writeln!(out, "Configuration key '{key}' is not set in any layer")?;
        return Ok(());
    };
    writeln!(out, "{key}:")?;
    for (scope, value) in changes {
        writeln!(out, "  {scope}: {}", display_value(key, value))?;
    }
    if let Some(winner) = resolved.origin(key) {
        writeln!(out, "  effective value from {winner}")?;
    }
    Ok(())
}

fn lookup<'a>(json: &'a J, dotted_key: &str) -> Option<&'a J> {
    dotted_key.split('.').try_fold(json, |value, part| value.get(part))
}

fn display_value(key: &str, value: &J) -> String {
    if SECRET_KEYS.contains(&key) {
        return redact(value).to_string();
    }
    match value {
        J::String(s) => s.clone(),
        other => other.to_string(),
    }
}
