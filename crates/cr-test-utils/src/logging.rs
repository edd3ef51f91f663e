// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Per-test log files
//!
//! Each test that calls [`init_test_tracing`] gets its own log file and a
//! thread-local subscriber writing to it. Output stays in the file; a failing
//! test can print [`TestTracing::path`] for investigation.

use std::env;
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum TestLogError {
    #[error("Failed to create test log: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid test name: {name}")]
    InvalidTestName { name: String },
}

/// Unique log path for a test under `$CR_TEST_LOG_DIR` (or the temp dir)
pub fn create_unique_test_log(test_name: &str) -> Result<PathBuf, TestLogError> {
    let sanitized: String = test_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect();
    if sanitized.is_empty() {
        return Err(TestLogError::InvalidTestName {
            name: test_name.to_string(),
        });
    }

    let dir = env::var_os("CR_TEST_LOG_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| env::temp_dir().join("cr-test-logs"));
    fs::create_dir_all(&dir)?;
    Ok(dir.join(format!("{sanitized}-{}.log", Uuid::new_v4().simple())))
}

/// Subscriber guard for one test; dropping it restores the previous default
pub struct TestTracing {
    path: PathBuf,
    _guard: DefaultGuard,
}

impl TestTracing {
    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

/// Route tracing output of the current thread into a fresh log file.
///
/// Tests using the current-thread tokio runtime capture their spawned tasks too.
pub fn init_test_tracing(test_name: &str) -> Result<TestTracing, TestLogError> {
    let path = create_unique_test_log(test_name)?;
    let file = File::create(&path)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .finish();

    Ok(TestTracing {
        path,
        _guard: tracing::subscriber::set_default(subscriber),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_paths_are_unique() {
        let first = create_unique_test_log("log_paths_are_unique").unwrap();
        let second = create_unique_test_log("log_paths_are_unique").unwrap();
        assert_ne!(first, second);
        assert!(first.parent().unwrap().exists());
    }

    #[test]
    fn tracing_output_lands_in_the_file() {
        let logs = init_test_tracing("tracing_output_lands_in_the_file").unwrap();
        tracing::info!(repo_id = "repo1", "hello from the test");
        let content = fs::read_to_string(logs.path()).unwrap();
        assert!(content.contains("hello from the test"));
        assert!(content.contains("repo1"));
    }

    #[test]
    fn rejects_empty_test_names() {
        assert!(matches!(
            create_unique_test_log(""),
            Err(TestLogError::InvalidTestName { .. })
        ));
    }
}
