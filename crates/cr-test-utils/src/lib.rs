// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Test utilities for the config repo crates
//!
//! - `fixtures`: wire records in the states tests keep needing (parsed,
//!   failed parse, never parsed)
//! - `logging`: per-test log files so tracing output stays out of test
//!   output unless a test fails

pub mod fixtures;
pub mod logging;

pub use fixtures::*;
pub use logging::{TestLogError, TestTracing, create_unique_test_log, init_test_tracing};
