/*
 * This file is part of Buttonparts.
 *
 * Copyright (C) 2025 Buttonparts contributors
 *
 * Buttonparts is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Buttonparts is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Buttonparts. If not, see <https://www.gnu.org/licenses/>.
 */

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::constants::{paths, proximity};
use crate::error::{PartsError, Result};

/// Daemon configuration, read from /etc/buttonparts/config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DaemonConfig {
    /// Where user preferences are persisted
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,
    /// Proximity input polled for pocket mode
    #[serde(default = "default_proximity_input")]
    pub proximity_input: PathBuf,
    #[serde(default = "default_max_range")]
    pub proximity_max_range: f32,
    /// tracing EnvFilter directive; RUST_LOG and --verbose take precedence
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_store_path() -> PathBuf {
    Path::new(paths::STATE_DIR).join(paths::STORE_FILE)
}

fn default_proximity_input() -> PathBuf {
    PathBuf::from(proximity::DEFAULT_INPUT)
}

fn default_max_range() -> f32 {
    proximity::DEFAULT_MAX_RANGE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            proximity_input: default_proximity_input(),
            proximity_max_range: default_max_range(),
            log_level: default_log_level(),
        }
    }
}

pub fn config_path() -> PathBuf {
    Path::new(paths::CONFIG_DIR).join(paths::CONFIG_FILE)
}

impl DaemonConfig {
    /// Load and validate `path`; a missing file yields the defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        let cfg: DaemonConfig = serde_json::from_str(&data)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.proximity_max_range.is_finite() || self.proximity_max_range <= 0.0 {
            return Err(PartsError::config(format!(
                "proximity_max_range must be a positive number, got {}",
                self.proximity_max_range
            )));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(PartsError::config("store_path is empty"));
        }
        if self.proximity_input.as_os_str().is_empty() {
            return Err(PartsError::config("proximity_input is empty"));
        }
        Ok(())
    }
}
