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

//! Control node access
//!
//! Control nodes are single-value virtual files exposed by the kernel
//! (sysfs, procfs). Writing replaces the whole content; there is no
//! structured format, only short tokens such as `"0"` and `"1"`.
//!
//! Writes are never retried. A busy or missing node fails immediately and the
//! caller decides whether to try again on the next trigger.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{PartsError, Result};

/// Overwrites the content of a control node
#[cfg_attr(test, mockall::automock)]
pub trait NodeWriter: Send + Sync {
    fn write(&self, path: &Path, value: &str) -> Result<()>;
}

/// Reads the current content of a control node
#[cfg_attr(test, mockall::automock)]
pub trait NodeReader: Send + Sync {
    /// Returns the node content with surrounding whitespace removed
    fn read(&self, path: &Path) -> Result<String>;
}

/// Direct filesystem access to control nodes.
///
/// Stateless, so a single instance can be shared between the sync pass and
/// the sensor delivery thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct SysfsNode;

impl SysfsNode {
    pub fn new() -> Self {
        Self
    }
}

impl NodeWriter for SysfsNode {
    fn write(&self, path: &Path, value: &str) -> Result<()> {
        debug!(node = %path.display(), value, "writing control node");
        fs::write(path, value).map_err(|e| PartsError::node_write(path, e))
    }
}

impl NodeReader for SysfsNode {
    fn read(&self, path: &Path) -> Result<String> {
        let content = fs::read_to_string(path).map_err(|e| PartsError::node_read(path, e))?;
        Ok(content.trim().to_string())
    }
}
