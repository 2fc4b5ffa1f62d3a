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

//! Preference to node synchronization
//!
//! At boot every registered preference is pushed to its control node:
//! the stored user value if there is one, the registry default otherwise.
//! A key whose dependency is not met is skipped and its node left alone.
//!
//! # Failure isolation
//!
//! One bad node never stops the pass. Each key's outcome is recorded in the
//! [`SyncReport`] and logged; nothing is returned as an error.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dependency::DependencyEvaluator;
use crate::error::{PartsError, Result};
use crate::node::{NodeReader, NodeWriter};
use crate::registry::{PrefValue, PreferenceRegistry, RegistryEntry, ValueTokens};
use crate::store::PreferenceStore;

/// What happened to one key during a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    Written { node: PathBuf, value: String },
    /// Persisted only; picked up when the service next starts
    Stored { value: PrefValue },
    SkippedDependency,
    Failed { node: PathBuf, reason: String },
}

impl fmt::Display for KeyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyOutcome::Written { node, value } => write!(f, "wrote '{}' to {}", value, node.display()),
            KeyOutcome::Stored { value } => write!(f, "stored '{}', applied at next service start", value),
            KeyOutcome::SkippedDependency => f.write_str("skipped (dependency not met)"),
            KeyOutcome::Failed { node, reason } => write!(f, "failed on {}: {}", node.display(), reason),
        }
    }
}

/// Per-key outcomes of a sync pass, in registry order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub outcomes: Vec<(String, KeyOutcome)>,
}

impl SyncReport {
    pub fn written(&self) -> usize {
        self.count(|o| matches!(o, KeyOutcome::Written { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, KeyOutcome::SkippedDependency))
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, KeyOutcome::Failed { .. }))
    }

    pub fn outcome(&self, key: &str) -> Option<&KeyOutcome> {
        self.outcomes.iter().find(|(k, _)| k == key).map(|(_, o)| o)
    }

    fn count(&self, pred: impl Fn(&KeyOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|(_, o)| pred(o)).count()
    }
}

pub struct SyncEngine {
    registry: Arc<PreferenceRegistry>,
    store: Arc<dyn PreferenceStore>,
    writer: Arc<dyn NodeWriter>,
    dependencies: DependencyEvaluator,
}

impl SyncEngine {
    pub fn new(
        registry: Arc<PreferenceRegistry>,
        store: Arc<dyn PreferenceStore>,
        writer: Arc<dyn NodeWriter>,
        reader: Arc<dyn NodeReader>,
    ) -> Self {
        let dependencies = DependencyEvaluator::new(Arc::clone(&registry), reader);
        Self {
            registry,
            store,
            writer,
            dependencies,
        }
    }

    pub fn registry(&self) -> &PreferenceRegistry {
        &self.registry
    }

    pub fn dependencies(&self) -> &DependencyEvaluator {
        &self.dependencies
    }

    /// Push every registered preference to its node, in registry order
    pub fn sync(&self) -> SyncReport {
        let mut report = SyncReport::default();

        for entry in self.registry.entries() {
            let value = self.stored_value(&entry.key, &entry.default);
            let outcome = self.apply_entry(entry, &value);
            report.outcomes.push((entry.key.clone(), outcome));
        }

        info!(
            written = report.written(),
            skipped = report.skipped(),
            failed = report.failed(),
            "preference sync complete"
        );
        report
    }

    /// Apply `value` for a single key, as when the user flips a setting
    pub fn apply(&self, key: &str, value: &PrefValue) -> Result<KeyOutcome> {
        let entry = self
            .registry
            .get(key)
            .ok_or_else(|| PartsError::UnknownKey(key.to_string()))?;
        Ok(self.apply_entry(entry, value))
    }

    /// Persist a user-supplied value and apply it.
    ///
    /// `input` is parsed against the key's default, so boolean keys accept
    /// `on/off`, `true/false` and `1/0`.
    ///
    /// The pocket mode switch has no node of its own. Its value is only
    /// persisted and reported as [`KeyOutcome::Stored`].
    pub fn set(&self, key: &str, input: &str) -> Result<KeyOutcome> {
        if let Some(pocket) = self.registry.pocket_mode().filter(|p| p.key == key) {
            let value = PrefValue::parse_like(&PrefValue::Bool(pocket.default), key, input)?;
            self.store.set_user_value(key, value.clone())?;
            info!(key, %value, "pocket mode preference stored");
            return Ok(KeyOutcome::Stored { value });
        }

        let entry = self
            .registry
            .get(key)
            .ok_or_else(|| PartsError::UnknownKey(key.to_string()))?;
        let value = PrefValue::parse_like(&entry.default, key, input)?;
        self.store.set_user_value(key, value.clone())?;
        Ok(self.apply_entry(entry, &value))
    }

    /// Whether the service should run pocket mode.
    ///
    /// False when the registry has no pocket mode entry.
    pub fn pocket_mode_enabled(&self) -> bool {
        self.registry.pocket_mode().map_or(false, |pocket| {
            let default = PrefValue::Bool(pocket.default);
            self.stored_value(&pocket.key, &default)
                .as_bool()
                .unwrap_or(pocket.default)
        })
    }

    // Stored text for a boolean key is read the same way `set` parses input
    fn stored_value(&self, key: &str, default: &PrefValue) -> PrefValue {
        match (self.store.user_value(key), default) {
            (None, _) => default.clone(),
            (Some(PrefValue::Text(text)), PrefValue::Bool(_)) => {
                PrefValue::parse_like(default, key, &text).unwrap_or_else(|e| {
                    warn!("{}, using default '{}'", e, default);
                    default.clone()
                })
            }
            (Some(value), _) => value,
        }
    }

    fn apply_entry(&self, entry: &RegistryEntry, value: &PrefValue) -> KeyOutcome {
        if !self.dependencies.is_satisfied(&entry.key) {
            warn!(key = %entry.key, "dependency not met, leaving node untouched");
            return KeyOutcome::SkippedDependency;
        }

        let tokens = self.tokens_for(entry);
        let text = tokens.render(value);

        match self.writer.write(&entry.node, &text) {
            Ok(()) => {
                debug!(key = %entry.key, node = %entry.node.display(), value = %text, "applied");
                KeyOutcome::Written {
                    node: entry.node.clone(),
                    value: text,
                }
            }
            Err(e) => {
                warn!(key = %entry.key, "{}", e);
                KeyOutcome::Failed {
                    node: entry.node.clone(),
                    reason: e.to_string(),
                }
            }
        }
    }

    // User-set [on, off] tokens take precedence over the registry's
    fn tokens_for(&self, entry: &RegistryEntry) -> ValueTokens {
        self.store
            .user_values(&entry.key)
            .and_then(|values| ValueTokens::from_values(&values))
            .unwrap_or_else(|| entry.tokens.clone())
    }
}
