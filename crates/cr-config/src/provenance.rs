// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Which layer set each config value

use serde_json::Value as J;
use std::collections::BTreeMap;
use std::fmt;

/// Config layers, lowest precedence first
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Scope {
    System,
    User,
    Env,
    CliConfig,
    Flags,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::System => "system",
            Scope::User => "user",
            Scope::Env => "env",
            Scope::CliConfig => "cli-config",
            Scope::Flags => "flags",
        };
        f.write_str(name)
    }
}

#[derive(Default, Clone, Debug)]
pub struct Provenance {
    /// Dotted key → scope whose value won
    pub winner: BTreeMap<String, Scope>,
    /// Dotted key → every value set for it, in merge order
    pub changes: BTreeMap<String, Vec<(Scope, J)>>,
}

impl Provenance {
    /// Record every leaf of `layer`. Arrays count as leaves.
    pub fn record_layer(&mut self, layer: &J, scope: Scope) {
        self.record_at(layer, scope, "");
    }

    fn record_at(&mut self, value: &J, scope: Scope, prefix: &str) {
        match value {
            J::Object(map) => {
                for (k, v) in map {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    self.record_at(v, scope, &key);
                }
            }
            J::Null => {}
            _ => {
                self.winner.insert(prefix.to_string(), scope);
                self.changes.entry(prefix.to_string()).or_default().push((scope, value.clone()));
            }
        }
    }
}
