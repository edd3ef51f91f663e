// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Parse outcome of a config repo

use chrono::{DateTime, Utc};
use cr_api_contract::{ModificationJson, ParseInfoJson, ParseResultJson};

/// A commit the server has seen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Modification {
    pub username: Option<String>,
    pub email_address: Option<String>,
    pub revision: Option<String>,
    pub comment: Option<String>,
    pub modified_time: Option<DateTime<Utc>>,
}

impl Modification {
    pub fn from_wire(json: &ModificationJson) -> Self {
        Self {
            username: json.username.clone(),
            email_address: json.email_address.clone(),
            revision: json.revision.clone(),
            comment: json.comment.clone(),
            modified_time: json.modified_time,
        }
    }

    pub fn to_wire(&self) -> ModificationJson {
        ModificationJson {
            username: self.username.clone(),
            email_address: self.email_address.clone(),
            revision: self.revision.clone(),
            comment: self.comment.clone(),
            modified_time: self.modified_time,
        }
    }
}

/// Latest and last-good parsed modifications
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseInfo {
    pub latest_modification: Option<Modification>,
    pub good_modification: Option<Modification>,
    pub error: Option<String>,
}

impl ParseInfo {
    pub fn from_wire(json: &ParseInfoJson) -> Self {
        Self {
            latest_modification: json.latest_parsed_modification.as_ref().map(Modification::from_wire),
            good_modification: json.good_modification.as_ref().map(Modification::from_wire),
            error: json.error.clone(),
        }
    }

    pub fn to_wire(&self) -> ParseInfoJson {
        ParseInfoJson {
            latest_parsed_modification: self.latest_modification.as_ref().map(Modification::to_wire),
            good_modification: self.good_modification.as_ref().map(Modification::to_wire),
            error: self.error.clone(),
        }
    }

    pub fn latest_revision(&self) -> Option<&str> {
        self.latest_modification.as_ref().and_then(|m| m.revision.as_deref())
    }

    pub fn good_revision(&self) -> Option<&str> {
        self.good_modification.as_ref().and_then(|m| m.revision.as_deref())
    }

    /// Whether the server has attempted a parse at all
    pub fn has_been_parsed(&self) -> bool {
        self.latest_modification.is_some()
    }
}

/// Last known parse outcome of a record.
///
/// Only built from server data: a parse result, stored parse info, or a
/// transition of an existing status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevisionStatus {
    revision: Option<String>,
    success: bool,
    error_message: Option<String>,
    in_progress: bool,
}

impl RevisionStatus {
    pub fn from_parse_result(result: &ParseResultJson) -> Self {
        Self {
            revision: result.revision.clone(),
            success: result.success,
            error_message: result.error.clone(),
            in_progress: false,
        }
    }

    pub fn from_parse_info(info: &ParseInfo, in_progress: bool) -> Self {
        let mut status = Self::from_parse_result(&info.to_wire().parse_result());
        status.in_progress = in_progress;
        status
    }

    /// Same outcome, now with a parse running
    pub fn started(&self) -> Self {
        Self {
            in_progress: true,
            ..self.clone()
        }
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn success(&self) -> bool {
        self.success
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }
}
