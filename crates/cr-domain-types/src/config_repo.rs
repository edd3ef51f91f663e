// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Config repo records
//!
//! [`ConfigRepoRecord`] keeps its fields private; every change goes through a
//! setter and validation is recomputed on demand by [`ConfigRepoRecord::validate`].

use cr_api_contract::{ConfigRepoJson, ConfigurationPropertyJson, RuleJson};
use std::collections::HashMap;

use crate::field_errors::{invalid_id_format, is_blank, is_valid_id, FieldErrors};
use crate::material::{MaterialAttributes, MaterialKind, Secret};
use crate::parse_info::{ParseInfo, RevisionStatus};

/// Key prefix marking user-defined plugin properties
pub const USER_DEFINED_PREFIX: &str = "userdef.";

pub const DUPLICATE_KEY_MESSAGE: &str = "Names must be unique.";
pub const BLANK_KEY_MESSAGE: &str = "Name is required.";
pub const INVALID_CONFIGURATION_MESSAGE: &str = "One or more configuration properties are invalid.";

/// A plugin configuration entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigurationProperty {
    pub key: String,
    pub value: Option<Secret>,
}

impl ConfigurationProperty {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: Some(Secret::Plain(value.into())),
        }
    }

    pub fn is_user_defined(&self) -> bool {
        self.key.starts_with(USER_DEFINED_PREFIX)
    }

    /// Key without the user-defined prefix
    pub fn display_key(&self) -> &str {
        self.key.strip_prefix(USER_DEFINED_PREFIX).unwrap_or(&self.key)
    }

    pub fn from_wire(json: &ConfigurationPropertyJson) -> Self {
        Self {
            key: json.key.clone(),
            value: Secret::from_wire(json.value.clone(), json.encrypted_value.clone()),
        }
    }

    pub fn to_wire(&self) -> ConfigurationPropertyJson {
        let (value, encrypted_value) = Secret::to_wire(self.value.as_ref());
        ConfigurationPropertyJson {
            key: self.key.clone(),
            value,
            encrypted_value,
        }
    }
}

/// Permission rule attached to a config repo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub directive: String,
    pub action: String,
    pub resource_type: String,
    pub resource: String,
}

impl Rule {
    pub fn from_wire(json: &RuleJson) -> Self {
        Self {
            directive: json.directive.clone(),
            action: json.action.clone(),
            resource_type: json.resource_type.clone(),
            resource: json.resource.clone(),
        }
    }

    pub fn to_wire(&self) -> RuleJson {
        RuleJson {
            directive: self.directive.clone(),
            action: self.action.clone(),
            resource_type: self.resource_type.clone(),
            resource: self.resource.clone(),
        }
    }
}

/// Per-entry key errors, index-aligned with the input list.
///
/// A blank key is "required" whatever else holds; a non-blank key seen more
/// than once flags every occurrence as a duplicate.
pub fn validate_configuration(properties: &[ConfigurationProperty]) -> Vec<FieldErrors> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for property in properties {
        if !property.key.trim().is_empty() {
            *counts.entry(property.key.as_str()).or_default() += 1;
        }
    }

    properties
        .iter()
        .map(|property| {
            let mut errors = FieldErrors::new();
            if property.key.trim().is_empty() {
                errors.add("key", BLANK_KEY_MESSAGE);
            } else if counts.get(property.key.as_str()).copied().unwrap_or(0) > 1 {
                errors.add("key", DUPLICATE_KEY_MESSAGE);
            }
            errors
        })
        .collect()
}

/// One config repo as held by the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRepoRecord {
    id: String,
    plugin_id: String,
    material: MaterialAttributes,
    configuration: Vec<ConfigurationProperty>,
    rules: Vec<Rule>,
    can_administer: Option<bool>,
    material_update_in_progress: bool,
    parse_info: Option<ParseInfo>,
    concurrency_token: Option<String>,
    revision_status: Option<RevisionStatus>,
}

impl ConfigRepoRecord {
    pub fn new(id: impl Into<String>, plugin_id: impl Into<String>, material: MaterialAttributes) -> Self {
        Self {
            id: id.into(),
            plugin_id: plugin_id.into(),
            material,
            configuration: Vec::new(),
            rules: Vec::new(),
            can_administer: None,
            material_update_in_progress: false,
            parse_info: None,
            concurrency_token: None,
            revision_status: None,
        }
    }

    /// Blank record with a material of the given kind, as used for drafts
    pub fn empty(kind: MaterialKind) -> Self {
        Self::new("", "", MaterialAttributes::empty(kind))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn plugin_id(&self) -> &str {
        &self.plugin_id
    }

    pub fn material(&self) -> &MaterialAttributes {
        &self.material
    }

    pub fn configuration(&self) -> &[ConfigurationProperty] {
        &self.configuration
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn can_administer(&self) -> Option<bool> {
        self.can_administer
    }

    /// Busy flag: the server is fetching and parsing this repo
    pub fn material_update_in_progress(&self) -> bool {
        self.material_update_in_progress
    }

    /// `None` until parse info has been fetched from the server
    pub fn parse_info(&self) -> Option<&ParseInfo> {
        self.parse_info.as_ref()
    }

    /// `None` until the record has been fetched from the server
    pub fn concurrency_token(&self) -> Option<&str> {
        self.concurrency_token.as_deref()
    }

    pub fn revision_status(&self) -> Option<&RevisionStatus> {
        self.revision_status.as_ref()
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    pub fn set_plugin_id(&mut self, plugin_id: impl Into<String>) {
        self.plugin_id = plugin_id.into();
    }

    pub fn set_material(&mut self, material: MaterialAttributes) {
        self.material = material;
    }

    pub fn material_mut(&mut self) -> &mut MaterialAttributes {
        &mut self.material
    }

    pub fn set_configuration(&mut self, configuration: Vec<ConfigurationProperty>) {
        self.configuration = configuration;
    }

    pub fn add_configuration(&mut self, property: ConfigurationProperty) {
        self.configuration.push(property);
    }

    pub fn remove_configuration(&mut self, index: usize) -> Option<ConfigurationProperty> {
        (index < self.configuration.len()).then(|| self.configuration.remove(index))
    }

    pub fn set_rules(&mut self, rules: Vec<Rule>) {
        self.rules = rules;
    }

    pub fn set_material_update_in_progress(&mut self, in_progress: bool) {
        self.material_update_in_progress = in_progress;
    }

    pub fn set_revision_status(&mut self, status: RevisionStatus) {
        self.revision_status = Some(status);
    }

    pub fn set_concurrency_token(&mut self, token: Option<String>) {
        self.concurrency_token = token;
    }

    /// Own-field rules plus material rules plus a summary configuration error
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();

        if is_blank(Some(self.id.as_str())) {
            errors.add("id", "Id must be present.");
        } else if !is_valid_id(&self.id) {
            errors.add("id", invalid_id_format("id"));
        }
        if is_blank(Some(self.plugin_id.as_str())) {
            errors.add("pluginId", "Plugin id must be present.");
        }

        errors.merge(self.material.validate());

        if self.configuration_errors().iter().any(|e| !e.is_empty()) {
            errors.add("configuration", INVALID_CONFIGURATION_MESSAGE);
        }
        errors
    }

    pub fn configuration_errors(&self) -> Vec<FieldErrors> {
        validate_configuration(&self.configuration)
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Client-side search over id, display URL and parsed revisions
    pub fn matches(&self, search_text: &str) -> bool {
        let needle = search_text.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        if self.id.to_lowercase().contains(&needle)
            || self.material.display_url().to_lowercase().contains(&needle)
        {
            return true;
        }
        self.parse_info.as_ref().is_some_and(|info| {
            [info.latest_revision(), info.good_revision()]
                .into_iter()
                .flatten()
                .any(|revision| revision.to_lowercase().starts_with(&needle))
        })
    }

    pub fn to_wire(&self) -> ConfigRepoJson {
        ConfigRepoJson {
            id: self.id.clone(),
            plugin_id: self.plugin_id.clone(),
            material: self.material.to_wire(),
            configuration: self.configuration.iter().map(ConfigurationProperty::to_wire).collect(),
            can_administer: self.can_administer,
            material_update_in_progress: Some(self.material_update_in_progress),
            parse_info: self.parse_info.as_ref().map(ParseInfo::to_wire),
            rules: self.rules.iter().map(Rule::to_wire).collect(),
        }
    }

    /// Decode a server record. The concurrency token travels out of band and
    /// is attached with [`ConfigRepoRecord::with_token`].
    pub fn from_wire(json: &ConfigRepoJson) -> Self {
        let material_update_in_progress = json.material_update_in_progress.unwrap_or(false);
        let parse_info = json.parse_info.as_ref().map(ParseInfo::from_wire);
        let revision_status = parse_info
            .as_ref()
            .map(|info| RevisionStatus::from_parse_info(info, material_update_in_progress));
        Self {
            id: json.id.clone(),
            plugin_id: json.plugin_id.clone(),
            material: MaterialAttributes::from_wire(&json.material),
            configuration: json.configuration.iter().map(ConfigurationProperty::from_wire).collect(),
            rules: json.rules.iter().map(Rule::from_wire).collect(),
            can_administer: json.can_administer,
            material_update_in_progress,
            parse_info,
            concurrency_token: None,
            revision_status,
        }
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self, serde_json::Error> {
        let json: ConfigRepoJson = serde_json::from_value(value)?;
        Ok(Self::from_wire(&json))
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.concurrency_token = token;
        self
    }

    /// Replace all server-owned state with a fresh server copy. A revision
    /// status tracked locally survives when the copy carries no parse info.
    pub fn adopt_server_copy(&mut self, json: &ConfigRepoJson, token: Option<String>) {
        let mut fresh = Self::from_wire(json).with_token(token);
        if fresh.revision_status.is_none() {
            fresh.revision_status = self.revision_status.take();
        }
        *self = fresh;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::GitAttributes;
    use crate::parse_info::Modification;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn git(url: &str) -> MaterialAttributes {
        MaterialAttributes::Git(GitAttributes {
            url: Some(url.to_string()),
            ..Default::default()
        })
    }

    fn wire_sample() -> serde_json::Value {
        json!({
            "id": "All_Test_Pipelines",
            "plugin_id": "json.config.plugin",
            "material": {
                "type": "git",
                "attributes": {
                    "name": "",
                    "auto_update": true,
                    "url": "https://github.com/gocd/gocd",
                    "branch": "master",
                    "username": "bob",
                    "encrypted_password": "AES:xyz"
                }
            },
            "configuration": [
                {"key": "file_pattern", "value": "*.json"},
                {"key": "token", "encrypted_value": "AES:123"}
            ],
            "can_administer": true,
            "material_update_in_progress": false,
            "parse_info": {
                "latest_parsed_modification": {
                    "username": "dev",
                    "email_address": "dev@example.com",
                    "revision": "4926940143a238fefb7566141ba24a96",
                    "comment": "Update",
                    "modified_time": "2019-12-23T10:25:52Z"
                },
                "good_modification": {
                    "revision": "4926940143a238fefb7566141ba24a96"
                }
            },
            "rules": [
                {"directive": "allow", "action": "refer", "type": "pipeline_group", "resource": "*"}
            ]
        })
    }

    #[test]
    fn blank_identity_reports_exactly_id_and_plugin_id() {
        let record = ConfigRepoRecord::new("", "", git("https://example.com/repo.git"));
        assert_eq!(record.validate().fields(), vec!["id", "pluginId"]);
        assert!(!record.is_valid());
    }

    #[test]
    fn record_validation_includes_material_errors() {
        let record = ConfigRepoRecord::new("repo1", "yaml.config.plugin", MaterialAttributes::empty(MaterialKind::Perforce));
        let errors = record.validate();
        assert_eq!(errors.fields(), vec!["port", "view"]);
    }

    #[test]
    fn configuration_keys_are_checked_in_place() {
        let mut record = ConfigRepoRecord::new("repo1", "plugin", git("https://example.com/r.git"));
        record.set_configuration(vec![
            ConfigurationProperty::new("foo", "a"),
            ConfigurationProperty::new("bar", "?"),
            ConfigurationProperty::new("foo", "b"),
            ConfigurationProperty::new("", "blah"),
        ]);

        let per_entry = record.configuration_errors();
        assert_eq!(per_entry.len(), 4);
        assert_eq!(per_entry[0].messages("key"), ["Names must be unique."]);
        assert!(per_entry[1].is_empty());
        assert_eq!(per_entry[2].messages("key"), ["Names must be unique."]);
        assert_eq!(per_entry[3].messages("key"), ["Name is required."]);

        assert!(!record.is_valid());
        assert_eq!(record.validate().fields(), vec!["configuration"]);
    }

    #[test]
    fn matches_id_url_and_revision_prefix() {
        let record = ConfigRepoRecord::from_json(wire_sample()).unwrap();
        let hash = "4926940143a238fefb7566141ba24a96";

        assert!(record.matches(""));
        assert!(record.matches("All_Test"));
        assert!(record.matches("all_test"));
        assert!(record.matches("github"));
        for len in 1..=hash.len() {
            assert!(record.matches(&hash[..len]), "prefix of length {len}");
        }
        assert!(!record.matches("gitlab.example.org"));
        assert!(!record.matches("26940143"));
    }

    #[test]
    fn round_trip_is_stable() {
        let first = ConfigRepoRecord::from_json(wire_sample()).unwrap();
        let second = ConfigRepoRecord::from_wire(&first.to_wire());
        assert_eq!(first, second);

        match first.material() {
            MaterialAttributes::Git(a) => {
                assert_eq!(a.name, None);
                assert_eq!(a.password, Some(Secret::Encrypted("AES:xyz".into())));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(first.configuration()[1].value.as_ref().is_some_and(Secret::is_encrypted));
    }

    #[test]
    fn absent_parse_info_is_not_fetched() {
        let mut value = wire_sample();
        value.as_object_mut().unwrap().remove("parse_info");
        let record = ConfigRepoRecord::from_json(value).unwrap();
        assert!(record.parse_info().is_none());
        assert!(record.revision_status().is_none());
        assert!(record.concurrency_token().is_none());

        let again = ConfigRepoRecord::from_wire(&record.to_wire());
        assert_eq!(record, again);
    }

    #[test]
    fn never_parsed_repo_has_empty_parse_info() {
        let mut value = wire_sample();
        value["parse_info"] = json!({});
        let record = ConfigRepoRecord::from_json(value).unwrap();
        let info = record.parse_info().unwrap();
        assert!(!info.has_been_parsed());
        assert!(!record.revision_status().unwrap().success());
    }

    #[test]
    fn clone_does_not_alias_configuration() {
        let original = ConfigRepoRecord::from_json(wire_sample()).unwrap();
        let mut draft = original.clone();
        draft.add_configuration(ConfigurationProperty::new("extra", "1"));
        if let MaterialAttributes::Git(a) = draft.material_mut() {
            a.branch = Some("develop".into());
        }
        assert_eq!(original.configuration().len(), 2);
        assert_ne!(original.material(), draft.material());
    }

    #[test]
    fn adopt_server_copy_replaces_fields_and_token() {
        let mut record = ConfigRepoRecord::new("repo1", "plugin", git("https://old.example.com"));
        record.set_revision_status(RevisionStatus::from_parse_info(
            &ParseInfo {
                latest_modification: Some(Modification {
                    revision: Some("abc".into()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            false,
        ));

        let mut server = record.to_wire();
        server.material = git("https://new.example.com").to_wire();
        server.parse_info = None;
        record.adopt_server_copy(&server, Some("\"etag-2\"".into()));

        assert_eq!(record.material().display_url(), "https://new.example.com");
        assert_eq!(record.concurrency_token(), Some("\"etag-2\""));
        assert_eq!(record.revision_status().and_then(RevisionStatus::revision), Some("abc"));
    }

    #[test]
    fn user_defined_properties() {
        let property = ConfigurationProperty::new("userdef.owner", "team-a");
        assert!(property.is_user_defined());
        assert_eq!(property.display_key(), "owner");
        assert!(!ConfigurationProperty::new("file_pattern", "*").is_user_defined());
    }
}
