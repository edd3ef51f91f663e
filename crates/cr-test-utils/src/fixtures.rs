// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Config repo fixtures

use chrono::{TimeZone, Utc};
use cr_api_contract::*;

pub const JSON_PLUGIN: &str = "json.config.plugin";
pub const YAML_PLUGIN: &str = "yaml.config.plugin";

/// A git-backed repo that has never been parsed
pub fn git_repo_json(id: &str, url: &str) -> ConfigRepoJson {
    ConfigRepoJson {
        id: id.to_string(),
        plugin_id: JSON_PLUGIN.to_string(),
        material: MaterialJson::Git(GitAttributesJson {
            auto_update: Some(true),
            url: Some(url.to_string()),
            branch: Some("master".to_string()),
            ..Default::default()
        }),
        configuration: vec![ConfigurationPropertyJson {
            key: "file_pattern".to_string(),
            value: Some("*.gocd.json".to_string()),
            encrypted_value: None,
        }],
        can_administer: Some(true),
        material_update_in_progress: Some(false),
        parse_info: Some(ParseInfoJson::default()),
        rules: vec![RuleJson {
            directive: "allow".to_string(),
            action: "refer".to_string(),
            resource_type: "pipeline_group".to_string(),
            resource: "*".to_string(),
        }],
    }
}

pub fn modification(revision: &str) -> ModificationJson {
    ModificationJson {
        username: Some("Dev <dev@example.com>".to_string()),
        email_address: Some("dev@example.com".to_string()),
        revision: Some(revision.to_string()),
        comment: Some(format!("Commit {revision}")),
        modified_time: Utc.with_ymd_and_hms(2019, 12, 23, 10, 25, 52).single(),
    }
}

/// A repo whose latest revision parsed cleanly
pub fn parsed_repo_json(id: &str, url: &str, revision: &str) -> ConfigRepoJson {
    let mut repo = git_repo_json(id, url);
    repo.parse_info = Some(ParseInfoJson {
        latest_parsed_modification: Some(modification(revision)),
        good_modification: Some(modification(revision)),
        error: None,
    });
    repo
}

/// A repo whose latest revision failed to parse; `good` is the last revision that worked
pub fn failed_parse_repo_json(
    id: &str,
    url: &str,
    good: Option<&str>,
    latest: &str,
    error: &str,
) -> ConfigRepoJson {
    let mut repo = git_repo_json(id, url);
    repo.parse_info = Some(ParseInfoJson {
        latest_parsed_modification: Some(modification(latest)),
        good_modification: good.map(modification),
        error: Some(error.to_string()),
    });
    repo
}
