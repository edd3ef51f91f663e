// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Config repository admin API contract types and validation
//!
//! These are the JSON shapes exchanged with the server. Field names follow the
//! server's lower-case-with-underscores convention; the domain layer owns the
//! translation into its own accessors. The REST client, the mock client and the
//! CLI all share these types.

pub mod error;
pub mod types;
pub mod validation;

pub use error::*;
pub use types::*;

/// Media type accepted by the config repo endpoints
pub const CONFIG_REPO_MEDIA_TYPE: &str = "application/vnd.go.cd.v4+json";
