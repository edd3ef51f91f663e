// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Typed views over the merged JSON

use serde::de::DeserializeOwned;
use serde_json::Value as J;

pub fn get<T: DeserializeOwned>(root: &J) -> anyhow::Result<T> {
    serde_path_to_error::deserialize(root.clone())
        .map_err(|e| anyhow::anyhow!("Config extraction failed at '{}': {}", e.path(), e.inner()))
}

/// Extract the table at a dotted path
pub fn get_at<T: DeserializeOwned>(root: &J, dotted: &str) -> anyhow::Result<T> {
    let mut cur = root;
    for part in dotted.split('.') {
        cur = cur.get(part).ok_or_else(|| anyhow::anyhow!("missing config path: {dotted}"))?;
    }
    serde_path_to_error::deserialize(cur.clone()).map_err(|e| {
        anyhow::anyhow!("Config extraction failed at '{dotted}.{}': {}", e.path(), e.inner())
    })
}
