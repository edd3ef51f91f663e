// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Plain-text rendering of records and errors

use cr_core::OperationError;
use cr_domain_types::{ConfigRepoRecord, RevisionStatus};

pub fn status_line(status: Option<&RevisionStatus>) -> String {
    let Some(status) = status else {
        return "not parsed yet".to_string();
    };
    let mut line = match (status.revision(), status.success()) {
        (None, _) => "never parsed".to_string(),
        (Some(revision), true) => format!("parsed {revision}"),
        (Some(revision), false) => format!("failed at {revision}"),
    };
    if status.in_progress() {
        line.push_str(" (update in progress)");
    }
    line
}

/// One line per record for `list`
pub fn record_row(record: &ConfigRepoRecord) -> String {
    format!(
        "{:<30} {:<8} {:<50} {}",
        record.id(),
        record.material().kind().wire_name(),
        record.material().display_url(),
        status_line(record.revision_status())
    )
}

pub fn record_details(record: &ConfigRepoRecord) -> String {
    let material = record.material();
    let mut lines = vec![
        format!("Id:        {}", record.id()),
        format!("Plugin:    {}", record.plugin_id()),
        format!("Material:  {} {}", material.kind().display_name(), material.display_url()),
    ];
    if let Some(name) = material.name() {
        lines.push(format!("Name:      {name}"));
    }
    lines.push(format!("Status:    {}", status_line(record.revision_status())));
    if let Some(error) = record.revision_status().and_then(RevisionStatus::error_message) {
        lines.push(format!("Error:     {error}"));
    }
    if let Some(info) = record.parse_info() {
        if let Some(good) = info.good_revision() {
            lines.push(format!("Last good: {good}"));
        }
    }

    if !record.configuration().is_empty() {
        lines.push("Configuration:".to_string());
        for property in record.configuration() {
            // encrypted values print masked
            let value = match &property.value {
                Some(secret) => secret.plain().map_or_else(|| secret.to_string(), str::to_string),
                None => String::new(),
            };
            lines.push(format!("  {} = {}", property.display_key(), value));
        }
    }
    if !record.rules().is_empty() {
        lines.push("Rules:".to_string());
        for rule in record.rules() {
            lines.push(format!(
                "  {} {} {} {}",
                rule.directive, rule.action, rule.resource_type, rule.resource
            ));
        }
    }
    lines.join("\n")
}

/// Error text for the terminal; field errors get one line each
pub fn operation_error(err: &OperationError) -> String {
    match err {
        OperationError::StaleCopy { message } => {
            format!("{message}\nFetch the latest copy with `cr show` and apply your changes again.")
        }
        OperationError::ClientValidation(errors) | OperationError::ServerValidation { errors, .. } => {
            let mut lines = vec![match err {
                OperationError::ServerValidation { message, .. } => message.clone(),
                _ => "The config repo is invalid:".to_string(),
            }];
            for (field, messages) in errors.iter() {
                for message in messages {
                    lines.push(format!("  {field}: {message}"));
                }
            }
            lines.join("\n")
        }
        other => other.to_string(),
    }
}
