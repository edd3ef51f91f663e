// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Field-level validation errors and the messages shared by all validators

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum length of ids and material names
pub const MAX_ID_LENGTH: usize = 255;

/// Error set keyed by internal (camelCase) field name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a server error map, translating wire field names
    pub fn from_server(errors: BTreeMap<String, Vec<String>>) -> Self {
        let mut out = Self::new();
        for (field, messages) in errors {
            let key = camel_case(&field);
            for message in messages {
                out.add(&key, message);
            }
        }
        out
    }

    /// Record a message against a field; repeated messages are kept once
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        let message = message.into();
        let bucket = self.0.entry(field.to_string()).or_default();
        if !bucket.contains(&message) {
            bucket.push(message);
        }
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            for message in messages {
                self.add(&field, message);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Field names with errors, sorted
    pub fn fields(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first(&self, field: &str) -> Option<&str> {
        self.messages(field).first().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    write!(f, "; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// "<Label> must be present."
pub fn must_be_present(label: &str) -> String {
    format!("{label} must be present.")
}

/// Message for an id or name that breaks the identifier format
pub fn invalid_id_format(label: &str) -> String {
    format!(
        "Invalid {label}. This must be alphanumeric and can contain hyphens, underscores and periods \
         (however, it cannot start with a period). The maximum allowed length is {MAX_ID_LENGTH} characters."
    )
}

pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |v| v.trim().is_empty())
}

/// `[-a-zA-Z0-9_][-a-zA-Z0-9_.]*`, at most [`MAX_ID_LENGTH`] characters
pub fn is_valid_id(value: &str) -> bool {
    let allowed = |c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_';
    let mut chars = value.chars();
    match chars.next() {
        Some(c) if allowed(c) => {}
        _ => return false,
    }
    value.len() <= MAX_ID_LENGTH && chars.all(|c| allowed(c) || c == '.')
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.push(c.to_ascii_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_field_names_become_camel_case() {
        let mut server = BTreeMap::new();
        server.insert("plugin_id".to_string(), vec!["Plugin id must be present.".to_string()]);
        server.insert("project_path".to_string(), vec!["Project path must be present.".to_string()]);
        server.insert("url".to_string(), vec!["URL must be present.".to_string()]);
        let errors = FieldErrors::from_server(server);
        assert_eq!(errors.fields(), vec!["pluginId", "projectPath", "url"]);
    }

    #[test]
    fn duplicate_messages_are_collapsed() {
        let mut errors = FieldErrors::new();
        errors.add("id", "Id must be present.");
        errors.add("id", "Id must be present.");
        let mut other = FieldErrors::new();
        other.add("id", "Id must be present.");
        other.add("url", "URL must be present.");
        errors.merge(other);
        assert_eq!(errors.messages("id").len(), 1);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors.to_string(), "id: Id must be present.; url: URL must be present.");
    }

    #[test]
    fn id_format() {
        assert!(is_valid_id("All_Test_Pipelines"));
        assert!(is_valid_id("repo-1.2"));
        assert!(!is_valid_id(".hidden"));
        assert!(!is_valid_id("has space"));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(&"a".repeat(MAX_ID_LENGTH + 1)));
    }
}
