// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Wire types for the config repository admin API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use validator::Validate;

/// Material type names accepted on the wire
pub const MATERIAL_TYPES: [&str; 6] = ["git", "hg", "svn", "p4", "tfs", "package"];

/// A config repository as exchanged with the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ConfigRepoJson {
    #[validate(length(min = 1, message = "Id must be present."))]
    pub id: String,
    #[validate(length(min = 1, message = "Plugin id must be present."))]
    pub plugin_id: String,
    pub material: MaterialJson,
    #[serde(default)]
    #[validate(nested)]
    pub configuration: Vec<ConfigurationPropertyJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub can_administer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub material_update_in_progress: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parse_info: Option<ParseInfoJson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleJson>,
}

/// Material, tagged by its `type` with kind-specific `attributes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "attributes", rename_all = "lowercase")]
pub enum MaterialJson {
    Git(GitAttributesJson),
    Hg(HgAttributesJson),
    Svn(SvnAttributesJson),
    P4(P4AttributesJson),
    Tfs(TfsAttributesJson),
    Package(PackageAttributesJson),
}

impl MaterialJson {
    /// The wire discriminator for this material
    pub fn type_name(&self) -> &'static str {
        match self {
            MaterialJson::Git(_) => "git",
            MaterialJson::Hg(_) => "hg",
            MaterialJson::Svn(_) => "svn",
            MaterialJson::P4(_) => "p4",
            MaterialJson::Tfs(_) => "tfs",
            MaterialJson::Package(_) => "package",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitAttributesJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_password: Option<String>,
}

/// Mercurial carries the same attributes as git, branch included
pub type HgAttributesJson = GitAttributesJson;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SvnAttributesJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_externals: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct P4AttributesJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_tickets: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TfsAttributesJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageAttributesJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_update: Option<bool>,
    #[serde(rename = "ref", default, skip_serializing_if = "Option::is_none")]
    pub package_ref: Option<String>,
}

/// A plugin configuration entry; exactly one of `value` / `encrypted_value` is normally set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct ConfigurationPropertyJson {
    #[validate(length(min = 1, message = "Name is required."))]
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encrypted_value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<DateTime<Utc>>,
}

/// Outcome of the most recent parse attempts, as stored by the server
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseInfoJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_parsed_modification: Option<ModificationJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_modification: Option<ModificationJson>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ParseInfoJson {
    /// Summarise parse info as a parse result.
    ///
    /// A parse is successful only when the latest parsed revision is also the
    /// last good one and no error is recorded against it.
    pub fn parse_result(&self) -> ParseResultJson {
        let latest = self.latest_parsed_modification.as_ref().and_then(|m| m.revision.clone());
        let good = self.good_modification.as_ref().and_then(|m| m.revision.clone());
        let success = latest.is_some() && self.error.is_none() && latest == good;
        ParseResultJson {
            revision: latest,
            success,
            error: self.error.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleJson {
    pub directive: String,
    pub action: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub resource: String,
}

/// Body of the `status` endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateStatusJson {
    pub in_progress: bool,
}

/// Last parse outcome of a config repo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseResultJson {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Body of the list endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigReposListJson {
    #[serde(rename = "_embedded")]
    pub embedded: EmbeddedConfigReposJson,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedConfigReposJson {
    #[serde(default)]
    pub config_repos: Vec<ConfigRepoJson>,
}

impl ConfigReposListJson {
    pub fn new(config_repos: Vec<ConfigRepoJson>) -> Self {
        Self {
            embedded: EmbeddedConfigReposJson { config_repos },
        }
    }

    pub fn into_repos(self) -> Vec<ConfigRepoJson> {
        self.embedded.config_repos
    }
}

/// Error body returned by the server, optionally echoing the rejected
/// entity annotated with `errors` maps.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessageJson {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ApiMessageJson {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    /// Collect field errors (server field names) from the echoed entity.
    ///
    /// Record-level and material-attribute errors keep their field names;
    /// errors on individual configuration entries collapse into one
    /// `configuration` entry.
    pub fn field_errors(&self) -> BTreeMap<String, Vec<String>> {
        let mut out: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let Some(data) = &self.data else {
            return out;
        };

        collect_errors(data.get("errors"), &mut out, None);
        collect_errors(
            data.pointer("/material/attributes/errors"),
            &mut out,
            None,
        );
        if let Some(Value::Array(entries)) = data.get("configuration") {
            for entry in entries {
                collect_errors(entry.get("errors"), &mut out, Some("configuration"));
            }
        }
        out
    }
}

fn collect_errors(
    errors: Option<&Value>,
    out: &mut BTreeMap<String, Vec<String>>,
    collapse_into: Option<&str>,
) {
    let Some(Value::Object(map)) = errors else {
        return;
    };
    for (field, messages) in map {
        let key = collapse_into.unwrap_or(field).to_string();
        let bucket = out.entry(key).or_default();
        let texts = match messages {
            Value::Array(items) => items.iter().filter_map(Value::as_str).map(str::to_string).collect(),
            Value::String(s) => vec![s.clone()],
            _ => Vec::new(),
        };
        for text in texts {
            if !bucket.contains(&text) {
                bucket.push(text);
            }
        }
    }
}
