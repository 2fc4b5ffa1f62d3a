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

//! Sensor subscription abstraction
//!
//! Consumers hand a closure to a [`SensorManager`] instead of implementing a
//! listener type. Readings are delivered on a thread owned by the manager.
//!
//! [`PollingSensorManager`] backs the proximity sensor with an IIO-style
//! input file. It delivers the first reading and then only changes, like an
//! on-change hardware sensor.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::constants::proximity::{rate, MIN_POLL_MS};
use crate::error::{PartsError, Result};

/// One distance sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub distance: f32,
}

/// A sensor as exposed by the manager
#[derive(Debug, Clone, PartialEq)]
pub struct SensorHandle {
    pub name: String,
    /// Largest distance the sensor reports; anything below counts as near
    pub max_range: f32,
}

/// Requested delivery rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingRate {
    Fastest,
    Game,
    Ui,
    Normal,
}

impl SamplingRate {
    pub fn period(self) -> Duration {
        let ms = match self {
            SamplingRate::Fastest => rate::FASTEST_MS,
            SamplingRate::Game => rate::GAME_MS,
            SamplingRate::Ui => rate::UI_MS,
            SamplingRate::Normal => rate::NORMAL_MS,
        };
        Duration::from_millis(ms)
    }
}

/// Identifies a subscriber across register/unregister calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Callback invoked for every delivered reading
pub type SensorHandler = Arc<dyn Fn(SensorReading) + Send + Sync>;

#[cfg_attr(test, mockall::automock)]
pub trait SensorManager: Send + Sync {
    fn default_proximity(&self) -> Option<SensorHandle>;

    fn register_listener(
        &self,
        listener: ListenerId,
        sensor: &SensorHandle,
        rate: SamplingRate,
        handler: SensorHandler,
    ) -> Result<()>;

    fn unregister_listener(&self, listener: ListenerId, sensor: &SensorHandle);
}

struct Subscription {
    stop: Arc<AtomicBool>,
    thread: JoinHandle<()>,
}

/// Proximity sensor backed by a polled input file
pub struct PollingSensorManager {
    input: PathBuf,
    sensor: SensorHandle,
    subscriptions: Mutex<HashMap<ListenerId, Subscription>>,
}

impl PollingSensorManager {
    pub fn new(input: impl Into<PathBuf>, max_range: f32) -> Self {
        Self {
            input: input.into(),
            sensor: SensorHandle {
                name: "proximity".to_string(),
                max_range,
            },
            subscriptions: Mutex::new(HashMap::new()),
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn is_registered(&self, listener: ListenerId) -> bool {
        self.subscriptions.lock().contains_key(&listener)
    }
}

impl SensorManager for PollingSensorManager {
    fn default_proximity(&self) -> Option<SensorHandle> {
        if self.input.exists() {
            Some(self.sensor.clone())
        } else {
            warn!("Proximity input {:?} not present", self.input);
            None
        }
    }

    fn register_listener(
        &self,
        listener: ListenerId,
        sensor: &SensorHandle,
        rate: SamplingRate,
        handler: SensorHandler,
    ) -> Result<()> {
        if sensor != &self.sensor {
            return Err(PartsError::SensorUnavailable(sensor.name.clone()));
        }

        let mut subscriptions = self.subscriptions.lock();
        if subscriptions.contains_key(&listener) {
            debug!(?listener, "listener already registered");
            return Ok(());
        }

        let stop = Arc::new(AtomicBool::new(false));
        let period = rate.period().max(Duration::from_millis(MIN_POLL_MS));
        let input = self.input.clone();
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name(format!("sensor-{}", listener.0))
            .spawn(move || poll_loop(&input, period, &thread_stop, handler))?;

        subscriptions.insert(listener, Subscription { stop, thread });
        info!(?listener, period_ms = period.as_millis() as u64, "proximity listener registered");
        Ok(())
    }

    fn unregister_listener(&self, listener: ListenerId, _sensor: &SensorHandle) {
        let removed = self.subscriptions.lock().remove(&listener);
        if let Some(sub) = removed {
            sub.stop.store(true, Ordering::SeqCst);
            if sub.thread.join().is_err() {
                warn!(?listener, "sensor thread panicked");
            }
            info!(?listener, "proximity listener unregistered");
        }
    }
}

impl Drop for PollingSensorManager {
    fn drop(&mut self) {
        for (_, sub) in self.subscriptions.lock().drain() {
            sub.stop.store(true, Ordering::SeqCst);
            let _ = sub.thread.join();
        }
    }
}

fn poll_loop(input: &Path, period: Duration, stop: &AtomicBool, handler: SensorHandler) {
    let mut last: Option<f32> = None;

    while !stop.load(Ordering::SeqCst) {
        match read_distance(input) {
            Ok(distance) => {
                if last != Some(distance) {
                    last = Some(distance);
                    handler(SensorReading { distance });
                }
            }
            Err(e) => debug!("proximity read failed: {}", e),
        }
        thread::sleep(period);
    }
}

fn read_distance(input: &Path) -> Result<f32> {
    let raw = fs::read_to_string(input).map_err(|e| PartsError::node_read(input, e))?;
    raw.trim()
        .parse::<f32>()
        .map_err(|e| PartsError::SensorUnavailable(format!("bad reading '{}': {}", raw.trim(), e)))
}
