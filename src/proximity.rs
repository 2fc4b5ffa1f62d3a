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

//! Pocket mode proximity controller
//!
//! While enabled, every proximity reading is mirrored into the fingerprint
//! driver's proximity node: `"1"` when something is near, `"0"` otherwise.
//!
//! # Threading
//!
//! - Registration and unregistration run on one dedicated worker thread fed
//!   by a FIFO channel, so an enable followed by a disable always reaches the
//!   sensor manager in that order.
//! - The enabled flag is only written by that worker.
//! - Readings arrive on the sensor manager's thread and write the node
//!   directly. Disabling stops future readings but does not cancel one that
//!   is already being handled.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use tracing::{debug, error, info, warn};

use crate::constants::tokens;
use crate::error::{PartsError, Result};
use crate::node::NodeWriter;
use crate::sensor::{ListenerId, SamplingRate, SensorHandle, SensorHandler, SensorManager, SensorReading};

static NEXT_LISTENER: AtomicU64 = AtomicU64::new(1);

/// Work items for the registration worker
enum Task {
    Enable,
    Disable,
    /// Reply once every earlier task has run
    Barrier(mpsc::Sender<()>),
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProximityState {
    Disabled,
    Enabled,
}

struct Inner {
    sensors: Arc<dyn SensorManager>,
    sensor: SensorHandle,
    writer: Arc<dyn NodeWriter>,
    node: PathBuf,
    listener: ListenerId,
    enabled: AtomicBool,
}

impl Inner {
    fn on_sensor_changed(&self, reading: SensorReading) {
        let is_near = reading.distance < self.sensor.max_range;
        let value = if is_near { tokens::ON } else { tokens::OFF };
        debug!(distance = reading.distance, is_near, "proximity changed");

        if let Err(e) = self.writer.write(&self.node, value) {
            error!("{}", e);
        }
    }

    fn register(self: &Arc<Self>) {
        let weak: Weak<Inner> = Arc::downgrade(self);
        let handler: SensorHandler = Arc::new(move |reading| {
            if let Some(inner) = weak.upgrade() {
                inner.on_sensor_changed(reading);
            }
        });

        match self
            .sensors
            .register_listener(self.listener, &self.sensor, SamplingRate::Normal, handler)
        {
            Ok(()) => {
                self.enabled.store(true, Ordering::SeqCst);
                info!(sensor = %self.sensor.name, "pocket mode enabled");
            }
            Err(e) => warn!("Failed to register proximity listener: {}", e),
        }
    }

    fn unregister(&self) {
        self.sensors.unregister_listener(self.listener, &self.sensor);
        self.enabled.store(false, Ordering::SeqCst);
        info!(sensor = %self.sensor.name, "pocket mode disabled");
    }
}

pub struct ProximityController {
    inner: Arc<Inner>,
    tasks: mpsc::Sender<Task>,
    worker: Option<JoinHandle<()>>,
}

impl ProximityController {
    /// Create a disabled controller driving `node`.
    ///
    /// Fails if the sensor manager has no proximity sensor.
    pub fn new(
        sensors: Arc<dyn SensorManager>,
        writer: Arc<dyn NodeWriter>,
        node: impl Into<PathBuf>,
    ) -> Result<Self> {
        let sensor = sensors
            .default_proximity()
            .ok_or_else(|| PartsError::SensorUnavailable("proximity".to_string()))?;

        let inner = Arc::new(Inner {
            sensors,
            sensor,
            writer,
            node: node.into(),
            listener: ListenerId(NEXT_LISTENER.fetch_add(1, Ordering::Relaxed)),
            enabled: AtomicBool::new(false),
        });

        let (tasks, rx) = mpsc::channel::<Task>();
        let worker_inner = Arc::clone(&inner);
        let worker = thread::Builder::new()
            .name("pocket-mode".to_string())
            .spawn(move || run_worker(worker_inner, rx))?;

        Ok(Self {
            inner,
            tasks,
            worker: Some(worker),
        })
    }

    /// Queue a subscription to the proximity sensor
    pub fn enable(&self) -> Result<()> {
        debug!("Enabling");
        self.submit(Task::Enable)
    }

    /// Queue removal of the subscription
    pub fn disable(&self) -> Result<()> {
        debug!("Disabling");
        self.submit(Task::Disable)
    }

    /// Block until every task queued so far has run
    pub fn wait_idle(&self) -> Result<()> {
        let (tx, rx) = mpsc::channel();
        self.submit(Task::Barrier(tx))?;
        rx.recv().map_err(|_| PartsError::WorkerGone)
    }

    pub fn state(&self) -> ProximityState {
        if self.inner.enabled.load(Ordering::SeqCst) {
            ProximityState::Enabled
        } else {
            ProximityState::Disabled
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.state() == ProximityState::Enabled
    }

    pub fn node(&self) -> &Path {
        &self.inner.node
    }

    /// Handle one reading; normally called from the sensor delivery thread
    pub fn on_sensor_changed(&self, reading: SensorReading) {
        self.inner.on_sensor_changed(reading);
    }

    /// Drain queued tasks, unsubscribe if still enabled, and stop the worker
    pub fn shutdown(mut self) {
        self.stop_worker();
    }

    fn submit(&self, task: Task) -> Result<()> {
        self.tasks.send(task).map_err(|_| PartsError::WorkerGone)
    }

    fn stop_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = self.tasks.send(Task::Shutdown);
            if worker.join().is_err() {
                warn!("pocket mode worker panicked");
            }
        }
    }
}

impl Drop for ProximityController {
    fn drop(&mut self) {
        self.stop_worker();
    }
}

fn run_worker(inner: Arc<Inner>, rx: mpsc::Receiver<Task>) {
    for task in rx {
        match task {
            Task::Enable => inner.register(),
            Task::Disable => inner.unregister(),
            Task::Barrier(done) => {
                let _ = done.send(());
            }
            Task::Shutdown => {
                if inner.enabled.load(Ordering::SeqCst) {
                    inner.unregister();
                }
                break;
            }
        }
    }
    debug!("pocket mode worker exiting");
}
