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

//! Buttonparts - fingerprint button and pocket mode node control
//!
//! This library keeps the fingerprint driver's control nodes in line with the
//! user's preferences, and mirrors the proximity sensor into the driver while
//! pocket mode is on.
//!
//! # Module Structure
//!
//! - `registry` - preference key to node tables
//! - `dependency` - cross-node preconditions
//! - `sync` - boot-time and on-change application of preferences
//! - `proximity` - pocket mode controller
//! - `node`, `sensor`, `store` - the kernel, sensor and storage seams

pub mod config;
pub mod constants;
pub mod dependency;
pub mod error;
pub mod logger;
pub mod node;
pub mod proximity;
pub mod registry;
pub mod sensor;
pub mod store;
pub mod sync;

#[cfg(test)]
pub mod test_utils;

pub use dependency::DependencyEvaluator;
pub use error::{PartsError, Result};
pub use node::{NodeReader, NodeWriter, SysfsNode};
pub use proximity::{ProximityController, ProximityState};
pub use registry::{
    device_registry, DependencyRule, PocketModeEntry, PrefValue, PreferenceRegistry, RegistryBuilder,
    RegistryEntry, ValueTokens,
};
pub use sensor::{
    ListenerId, PollingSensorManager, SamplingRate, SensorHandle, SensorHandler, SensorManager,
    SensorReading,
};
pub use store::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceStore};
pub use sync::{KeyOutcome, SyncEngine, SyncReport};
