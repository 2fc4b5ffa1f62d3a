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

//! Cross-node dependency checks
//!
//! A preference with a dependency rule may only be applied while another
//! node holds an expected value. Unreadable dependency nodes fail closed.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::node::NodeReader;
use crate::registry::PreferenceRegistry;

pub struct DependencyEvaluator {
    registry: Arc<PreferenceRegistry>,
    reader: Arc<dyn NodeReader>,
}

impl DependencyEvaluator {
    pub fn new(registry: Arc<PreferenceRegistry>, reader: Arc<dyn NodeReader>) -> Self {
        Self { registry, reader }
    }

    /// Whether `key` may be written right now.
    ///
    /// Keys without a rule (including unknown keys) are always satisfied.
    /// Blocks on the dependency node read.
    pub fn is_satisfied(&self, key: &str) -> bool {
        let Some(rule) = self.registry.dependency(key) else {
            return true;
        };

        match self.reader.read(&rule.node) {
            Ok(current) => {
                let satisfied = current == rule.expected;
                debug!(
                    key,
                    node = %rule.node.display(),
                    current = %current,
                    expected = %rule.expected,
                    satisfied,
                    "dependency check"
                );
                satisfied
            }
            Err(e) => {
                warn!(key, "dependency unresolvable, treating as unsatisfied: {}", e);
                false
            }
        }
    }
}
