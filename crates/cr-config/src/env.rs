// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Environment and command-line overlays
//!
//! `CR_SERVER_URL` becomes `server-url`; a double underscore nests, so
//! `CR_AUTH__TOKEN` becomes `auth.token`. Values stay strings. Variables
//! that name no config key (`CR_TEST_LOG_DIR`, `CR_HOME`) are ignored.

use anyhow::Result;
use serde_json::{Map, Value as J};
use tracing::debug;

pub const ENV_PREFIX: &str = "CR";

/// Overlay from the process environment
pub fn env_overlay() -> Result<J> {
    overlay_from(None)
}

/// Overlay from an explicit variable map instead of the process environment
pub fn env_overlay_from(vars: config::Map<String, String>) -> Result<J> {
    overlay_from(Some(vars))
}

fn overlay_from(vars: Option<config::Map<String, String>>) -> Result<J> {
    let built = config::Config::builder()
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(vars),
        )
        .build()?;

    let map = built.try_deserialize::<Map<String, J>>()?;
    let J::Object(mut overlay) = kebab_keys(J::Object(map)) else {
        return Ok(J::Object(Map::new()));
    };

    let known = crate::loader::schema_json()?
        .get("properties")
        .and_then(J::as_object)
        .map(|props| props.keys().cloned().collect::<Vec<_>>())
        .unwrap_or_default();
    overlay.retain(|key, _| {
        let keep = known.contains(key);
        if !keep {
            debug!(key = %key, "ignoring environment variable with no config key");
        }
        keep
    });
    Ok(J::Object(overlay))
}

fn kebab_keys(value: J) -> J {
    match value {
        J::Object(map) => J::Object(
            map.into_iter()
                .map(|(k, v)| (k.replace('_', "-"), kebab_keys(v)))
                .collect(),
        ),
        other => other,
    }
}

/// Overlay from `dotted.key = value` pairs given as flags
pub fn flags_overlay(kv_pairs: &[(&str, &str)]) -> J {
    let mut root = J::Object(Map::new());
    for (k, v) in kv_pairs {
        crate::merge::insert_dotted(&mut root, k, J::String(v.to_string()));
    }
    root
}
