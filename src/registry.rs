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

//! Preference registry
//!
//! Maps preference keys to the control node they drive, their default value
//! and an optional dependency on another node. The registry is built once,
//! validated, and then shared read-only (`Arc<PreferenceRegistry>`) between
//! the sync pass and the dependency evaluator.
//!
//! # Ordering
//!
//! `keys()` yields the button keys in declaration order. When a dependency
//! node is itself driven by another registered key, that key must be declared
//! first so a sync pass writes the dependency before checking it. The builder
//! rejects tables that violate this.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

use crate::constants::{keys, nodes, tokens};
use crate::error::{PartsError, Result};

/// A preference value as stored by the settings layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrefValue {
    Bool(bool),
    Text(String),
}

impl PrefValue {
    /// Parse user input into a value of the same kind as `like`.
    ///
    /// Boolean preferences accept `true/false`, `on/off`, `1/0`, `yes/no`.
    pub fn parse_like(like: &PrefValue, key: &str, input: &str) -> Result<PrefValue> {
        match like {
            PrefValue::Bool(_) => match input.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => Ok(PrefValue::Bool(true)),
                "0" | "false" | "off" | "no" => Ok(PrefValue::Bool(false)),
                other => Err(PartsError::invalid_value(
                    key,
                    format!("expected a boolean, got '{}'", other),
                )),
            },
            PrefValue::Text(_) => {
                let trimmed = input.trim();
                if trimmed.is_empty() {
                    return Err(PartsError::invalid_value(key, "value is empty"));
                }
                Ok(PrefValue::Text(trimmed.to_string()))
            }
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PrefValue::Bool(b) => Some(*b),
            PrefValue::Text(_) => None,
        }
    }
}

impl fmt::Display for PrefValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefValue::Bool(b) => write!(f, "{}", b),
            PrefValue::Text(t) => f.write_str(t),
        }
    }
}

/// Tokens written to a node for the two states of a boolean preference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueTokens {
    pub on: String,
    pub off: String,
}

impl ValueTokens {
    pub fn new(on: impl Into<String>, off: impl Into<String>) -> Self {
        Self {
            on: on.into(),
            off: off.into(),
        }
    }

    /// Build tokens from a user-set `[on, off]` pair.
    ///
    /// Anything other than exactly two text or boolean entries is ignored.
    pub fn from_values(values: &[PrefValue]) -> Option<Self> {
        match values {
            [on, off] => Some(Self::new(token_of(on), token_of(off))),
            _ => None,
        }
    }

    /// Render `value` the way the node expects it
    pub fn render(&self, value: &PrefValue) -> String {
        match value {
            PrefValue::Bool(true) => self.on.clone(),
            PrefValue::Bool(false) => self.off.clone(),
            PrefValue::Text(t) => t.clone(),
        }
    }
}

impl Default for ValueTokens {
    fn default() -> Self {
        Self::new(tokens::ON, tokens::OFF)
    }
}

fn token_of(value: &PrefValue) -> String {
    match value {
        PrefValue::Bool(true) => tokens::ON.to_string(),
        PrefValue::Bool(false) => tokens::OFF.to_string(),
        PrefValue::Text(t) => t.clone(),
    }
}

/// Precondition on another node: it must currently hold `expected`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRule {
    pub node: PathBuf,
    pub expected: String,
}

/// Everything the sync pass needs to know about one preference
#[derive(Debug, Clone)]
pub struct RegistryEntry {
    pub key: String,
    pub node: PathBuf,
    pub default: PrefValue,
    pub dependency: Option<DependencyRule>,
    pub tokens: ValueTokens,
}

/// Pocket mode switch and the node the proximity controller drives
#[derive(Debug, Clone)]
pub struct PocketModeEntry {
    pub key: String,
    pub node: PathBuf,
    pub default: bool,
}

/// Immutable preference tables
#[derive(Debug)]
pub struct PreferenceRegistry {
    entries: HashMap<String, RegistryEntry>,
    order: Vec<String>,
    pocket_mode: Option<PocketModeEntry>,
}

impl PreferenceRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Stock table for the fpc1020 fingerprint sensor
    pub fn device() -> Result<Self> {
        Self::builder()
            .button_keys(&[keys::FP_HOME, keys::FP_WAKEUP])
            .node(keys::FP_HOME, nodes::FP_HOME_KEY)
            .node(keys::FP_WAKEUP, nodes::FP_WAKEUP)
            .default_value(keys::FP_HOME, PrefValue::Bool(false))
            .default_value(keys::FP_WAKEUP, PrefValue::Bool(true))
            .dependency(keys::FP_HOME, nodes::VIRTUAL_KEYS, tokens::ON)
            .pocket_mode(keys::FP_POCKETMODE, nodes::FP_PROXIMITY, true)
            .build()
    }

    pub fn get(&self, key: &str) -> Option<&RegistryEntry> {
        self.entries.get(key)
    }

    pub fn node(&self, key: &str) -> Option<&Path> {
        self.entries.get(key).map(|e| e.node.as_path())
    }

    pub fn default_value(&self, key: &str) -> Option<&PrefValue> {
        self.entries.get(key).map(|e| &e.default)
    }

    pub fn dependency(&self, key: &str) -> Option<&DependencyRule> {
        self.entries.get(key).and_then(|e| e.dependency.as_ref())
    }

    /// Keys to sync, in the order they must be applied
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Entries in sync order
    pub fn entries(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.order.iter().filter_map(|k| self.entries.get(k))
    }

    pub fn pocket_mode(&self) -> Option<&PocketModeEntry> {
        self.pocket_mode.as_ref()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

lazy_static! {
    static ref DEVICE_REGISTRY: std::result::Result<Arc<PreferenceRegistry>, String> =
        PreferenceRegistry::device().map(Arc::new).map_err(|e| e.to_string());
}

/// Process-wide stock registry, built on first use
pub fn device_registry() -> Result<Arc<PreferenceRegistry>> {
    match &*DEVICE_REGISTRY {
        Ok(registry) => Ok(Arc::clone(registry)),
        Err(reason) => Err(PartsError::invalid_registry("<device>", reason.clone())),
    }
}

/// Collects the registry tables and validates them in `build()`
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    button_keys: Vec<String>,
    nodes: HashMap<String, PathBuf>,
    defaults: HashMap<String, PrefValue>,
    dependencies: HashMap<String, DependencyRule>,
    tokens: HashMap<String, ValueTokens>,
    pocket_mode: Option<PocketModeEntry>,
}

impl RegistryBuilder {
    pub fn button_keys(mut self, keys: &[&str]) -> Self {
        self.button_keys.extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn node(mut self, key: &str, path: impl Into<PathBuf>) -> Self {
        self.nodes.insert(key.to_string(), path.into());
        self
    }

    pub fn default_value(mut self, key: &str, value: PrefValue) -> Self {
        self.defaults.insert(key.to_string(), value);
        self
    }

    pub fn dependency(mut self, key: &str, node: impl Into<PathBuf>, expected: &str) -> Self {
        self.dependencies.insert(
            key.to_string(),
            DependencyRule {
                node: node.into(),
                expected: expected.to_string(),
            },
        );
        self
    }

    pub fn tokens(mut self, key: &str, tokens: ValueTokens) -> Self {
        self.tokens.insert(key.to_string(), tokens);
        self
    }

    pub fn pocket_mode(mut self, key: &str, node: impl Into<PathBuf>, default: bool) -> Self {
        self.pocket_mode = Some(PocketModeEntry {
            key: key.to_string(),
            node: node.into(),
            default,
        });
        self
    }

    pub fn build(mut self) -> Result<PreferenceRegistry> {
        let mut entries = HashMap::with_capacity(self.button_keys.len());
        // node -> index of the key that writes it
        let mut writers: HashMap<PathBuf, usize> = HashMap::new();

        for (idx, key) in self.button_keys.iter().enumerate() {
            if entries.contains_key(key) {
                return Err(PartsError::invalid_registry(key, "listed twice"));
            }
            let node = self
                .nodes
                .remove(key)
                .ok_or_else(|| PartsError::invalid_registry(key, "no control node"))?;
            if node.as_os_str().is_empty() {
                return Err(PartsError::invalid_registry(key, "control node path is empty"));
            }
            let default = self
                .defaults
                .remove(key)
                .ok_or_else(|| PartsError::invalid_registry(key, "no default value"))?;
            let dependency = self.dependencies.remove(key);
            if let Some(rule) = &dependency {
                if rule.node == node {
                    return Err(PartsError::invalid_registry(key, "depends on its own node"));
                }
                if rule.node.as_os_str().is_empty() {
                    return Err(PartsError::invalid_registry(key, "dependency node path is empty"));
                }
            }
            let tokens = self.tokens.remove(key).unwrap_or_default();

            writers.insert(node.clone(), idx);
            entries.insert(
                key.clone(),
                RegistryEntry {
                    key: key.clone(),
                    node,
                    default,
                    dependency,
                    tokens,
                },
            );
        }

        // Tables must not describe keys that are never synced
        if let Some(key) = self
            .nodes
            .keys()
            .chain(self.defaults.keys())
            .chain(self.dependencies.keys())
            .chain(self.tokens.keys())
            .next()
        {
            return Err(PartsError::invalid_registry(key, "not a button key"));
        }

        for (idx, key) in self.button_keys.iter().enumerate() {
            let Some(rule) = entries.get(key).and_then(|e| e.dependency.as_ref()) else {
                continue;
            };
            if let Some(&writer) = writers.get(&rule.node) {
                if writer > idx {
                    return Err(PartsError::invalid_registry(
                        key,
                        format!("depends on {} which is synced later", self.button_keys[writer]),
                    ));
                }
            }
        }

        if let Some(pocket) = &self.pocket_mode {
            if pocket.node.as_os_str().is_empty() {
                return Err(PartsError::invalid_registry(&pocket.key, "control node path is empty"));
            }
        }

        Ok(PreferenceRegistry {
            entries,
            order: self.button_keys,
            pocket_mode: self.pocket_mode,
        })
    }
}
