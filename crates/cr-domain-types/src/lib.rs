// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Domain types for config repositories
//!
//! A config repo is a server-tracked, version-controlled location whose
//! contents are parsed into pipeline configuration. This crate models one
//! such record, the material (VCS connection) it points at, and the outcome
//! of the server's most recent parse. Everything here is plain data with
//! deterministic, on-demand validation; nothing performs I/O.

pub mod config_repo;
pub mod field_errors;
pub mod material;
pub mod parse_info;

pub use config_repo::*;
pub use field_errors::*;
pub use material::*;
pub use parse_info::*;
