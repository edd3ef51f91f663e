// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! Config file locations

use std::path::{Path, PathBuf};

const APP_DIR: &str = "config-repos";
const FILE_NAME: &str = "config.toml";

/// Overrides the user config directory
pub const HOME_ENV: &str = "CR_HOME";

#[derive(Debug, Clone)]
pub struct Paths {
    pub system: PathBuf,
    pub user: PathBuf,
    /// Explicit `--config` file
    pub cli_config: Option<PathBuf>,
}

pub fn discover_paths(cli_config: Option<&Path>) -> Paths {
    Paths {
        system: system_config_path(),
        user: user_config_path(),
        cli_config: cli_config.map(Path::to_path_buf),
    }
}

fn system_config_path() -> PathBuf {
    if cfg!(target_os = "macos") {
        PathBuf::from("/Library/Application Support").join(APP_DIR).join(FILE_NAME)
    } else if cfg!(target_os = "windows") {
        PathBuf::from(std::env::var("ProgramData").unwrap_or_else(|_| "C:\\ProgramData".into()))
            .join(APP_DIR)
            .join(FILE_NAME)
    } else {
        PathBuf::from("/etc").join(APP_DIR).join(FILE_NAME)
    }
}

/// `$CR_HOME/config.toml`, else the platform config dir
/// (`$XDG_CONFIG_HOME/config-repos/config.toml` on Linux)
fn user_config_path() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(home).join(FILE_NAME);
    }
    dirs::config_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join(FILE_NAME)
}
