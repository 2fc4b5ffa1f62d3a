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

//! Unified error handling for Buttonparts
//!
//! A single error type shared by the registry, the sync pass, the pocket-mode
//! controller and the daemon configuration.

use std::io;
use std::path::PathBuf;

/// Result type alias using PartsError
pub type Result<T> = std::result::Result<T, PartsError>;

/// Unified error type for all Buttonparts operations
#[derive(thiserror::Error, Debug)]
pub enum PartsError {
    // ============================================================================
    // Control Node Errors
    // ============================================================================
    #[error("Failed to write node {path}: {source}")]
    NodeWrite {
        path: PathBuf,
        source: io::Error,
    },

    #[error("Failed to read node {path}: {source}")]
    NodeRead {
        path: PathBuf,
        source: io::Error,
    },

    // ============================================================================
    // Registry and Preference Errors
    // ============================================================================
    #[error("Unknown preference key: {0}")]
    UnknownKey(String),

    #[error("Invalid registry entry for {key}: {reason}")]
    InvalidRegistry {
        key: String,
        reason: String,
    },

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue {
        key: String,
        reason: String,
    },

    // ============================================================================
    // Sensor Errors
    // ============================================================================
    #[error("Sensor unavailable: {0}")]
    SensorUnavailable(String),

    #[error("Worker thread is no longer running")]
    WorkerGone,

    // ============================================================================
    // Configuration and Storage Errors
    // ============================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl PartsError {
    /// Create a node write error for `path`
    pub fn node_write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::NodeWrite {
            path: path.into(),
            source,
        }
    }

    /// Create a node read error for `path`
    pub fn node_read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::NodeRead {
            path: path.into(),
            source,
        }
    }

    /// Create a registry validation error
    pub fn invalid_registry(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidRegistry {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a value validation error
    pub fn invalid_value(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            reason: reason.into(),
        }
    }

    /// Create a config error from a string
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
