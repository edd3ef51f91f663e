// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Reading and validating file layers

use anyhow::{Context, Result, anyhow};
use jsonschema::{Draft, JSONSchema};
use serde_json::Value as J;
use std::path::Path;
use std::sync::OnceLock;

use crate::provenance::Scope;
use crate::schema::ClientSettings;

pub fn parse_toml_to_json(toml_str: &str) -> Result<J> {
    let value: toml::Value = toml_str.parse::<toml::Value>()?;
    Ok(serde_json::to_value(value)?)
}

/// JSON schema of the config file
pub fn schema_json() -> Result<&'static J> {
    static SCHEMA: OnceLock<Result<J, String>> = OnceLock::new();
    SCHEMA
        .get_or_init(|| {
            serde_json::to_value(schemars::schema_for!(ClientSettings)).map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| anyhow!("generating config schema: {e}"))
}

pub fn validate_against_schema(v: &J) -> Result<()> {
    static VALIDATOR: OnceLock<Result<JSONSchema, String>> = OnceLock::new();
    let schema = schema_json()?;
    let validator = VALIDATOR
        .get_or_init(|| {
            JSONSchema::options()
                .with_draft(Draft::Draft7)
                .compile(schema)
                .map_err(|e| e.to_string())
        })
        .as_ref()
        .map_err(|e| anyhow!("compiling config schema: {e}"))?;

    if let Err(errors) = validator.validate(v) {
        let messages: Vec<String> = errors
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{path}: {e}")
                }
            })
            .collect();
        anyhow::bail!("Config schema validation failed:\n  - {}", messages.join("\n  - "));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct Layer {
    pub scope: Scope,
    pub json: J,
}

/// Read a TOML file layer and check it against the schema
pub fn read_layer_from_file(path: &Path, scope: Scope) -> Result<Layer> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let json = parse_toml_to_json(&content)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    validate_against_schema(&json).with_context(|| format!("in config file {}", path.display()))?;
    Ok(Layer { scope, json })
}
