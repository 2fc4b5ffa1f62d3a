/*
 * Integration tests for Buttonparts
 *
 * These drive the public API against fake control-node trees on a temp
 * directory, the way the daemon drives the real ones.
 */

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use buttonparts::{
    device_registry, JsonPreferenceStore, KeyOutcome, ListenerId, MemoryPreferenceStore,
    PartsError, PollingSensorManager, PrefValue, PreferenceRegistry, PreferenceStore,
    ProximityController, ProximityState, SamplingRate, SensorHandle, SensorHandler, SensorManager,
    SensorReading, SyncEngine, SysfsNode,
};
use parking_lot::Mutex;
use serial_test::serial;
use tempfile::TempDir;

// Test utilities
fn registry_in(dir: &Path) -> Arc<PreferenceRegistry> {
    Arc::new(
        PreferenceRegistry::builder()
            .button_keys(&["fp_home", "fp_wakeup"])
            .node("fp_home", dir.join("a"))
            .node("fp_wakeup", dir.join("w"))
            .default_value("fp_home", PrefValue::Bool(false))
            .default_value("fp_wakeup", PrefValue::Bool(true))
            .dependency("fp_home", dir.join("v"), "1")
            .build()
            .unwrap(),
    )
}

fn engine(dir: &Path, store: Arc<dyn PreferenceStore>) -> SyncEngine {
    let node = Arc::new(SysfsNode::new());
    SyncEngine::new(registry_in(dir), store, node.clone(), node)
}

fn wait_for(what: &str, mut cond: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(3);
    while Instant::now() < deadline {
        if cond() {
            return;
        }
        thread::sleep(Duration::from_millis(10));
    }
    panic!("timed out waiting for {}", what);
}

fn read(path: impl AsRef<Path>) -> Option<String> {
    fs::read_to_string(path).ok()
}

/// Sensor manager that records calls and hands back the registered handler
#[derive(Default)]
struct RecordingSensors {
    calls: Mutex<Vec<&'static str>>,
    handler: Mutex<Option<SensorHandler>>,
}

impl SensorManager for RecordingSensors {
    fn default_proximity(&self) -> Option<SensorHandle> {
        Some(SensorHandle {
            name: "proximity".into(),
            max_range: 5.0,
        })
    }

    fn register_listener(
        &self,
        _listener: ListenerId,
        _sensor: &SensorHandle,
        rate: SamplingRate,
        handler: SensorHandler,
    ) -> buttonparts::Result<()> {
        assert_eq!(rate, SamplingRate::Normal);
        self.calls.lock().push("register");
        *self.handler.lock() = Some(handler);
        Ok(())
    }

    fn unregister_listener(&self, _listener: ListenerId, _sensor: &SensorHandle) {
        self.calls.lock().push("unregister");
        *self.handler.lock() = None;
    }
}

// ============================================================================
// Sync pass
// ============================================================================

#[test]
fn test_fp_home_written_when_virtual_keys_on() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("v"), "1").unwrap();
    let store = MemoryPreferenceStore::new().with_value("fp_home", PrefValue::Bool(true));

    let report = engine(dir.path(), Arc::new(store)).sync();

    assert_eq!(read(dir.path().join("a")).as_deref(), Some("1"));
    assert_eq!(read(dir.path().join("w")).as_deref(), Some("1"));
    assert_eq!(report.written(), 2);
}

#[test]
fn test_fp_home_untouched_when_virtual_keys_off() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("v"), "0").unwrap();
    fs::write(dir.path().join("a"), "0").unwrap();
    let store = MemoryPreferenceStore::new().with_value("fp_home", PrefValue::Bool(true));

    let report = engine(dir.path(), Arc::new(store)).sync();

    assert_eq!(read(dir.path().join("a")).as_deref(), Some("0"));
    assert_eq!(report.outcome("fp_home"), Some(&KeyOutcome::SkippedDependency));
    assert_eq!(read(dir.path().join("w")).as_deref(), Some("1"));
}

#[test]
fn test_unwritable_node_does_not_block_later_keys() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("v"), "1").unwrap();
    // A directory where fp_home's node should be makes the write fail
    fs::create_dir(dir.path().join("a")).unwrap();

    let report = engine(dir.path(), Arc::new(MemoryPreferenceStore::new())).sync();

    assert!(matches!(report.outcome("fp_home"), Some(KeyOutcome::Failed { .. })));
    assert_eq!(read(dir.path().join("w")).as_deref(), Some("1"));
    assert_eq!(report.outcomes.len(), 2);
}

#[test]
fn test_set_persists_and_resync_reapplies() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("v"), "1").unwrap();
    let store_path = dir.path().join("state").join("preferences.json");

    let store = Arc::new(JsonPreferenceStore::open(&store_path).unwrap());
    let outcome = engine(dir.path(), store).set("fp_wakeup", "off").unwrap();
    assert_eq!(
        outcome,
        KeyOutcome::Written {
            node: dir.path().join("w"),
            value: "0".into()
        }
    );

    // Simulate a reboot: node back to the kernel default, store reopened
    fs::write(dir.path().join("w"), "1").unwrap();
    let reopened = Arc::new(JsonPreferenceStore::open(&store_path).unwrap());
    engine(dir.path(), reopened).sync();

    assert_eq!(read(dir.path().join("w")).as_deref(), Some("0"));
}

#[test]
fn test_pocket_mode_switch_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let store_path = dir.path().join("preferences.json");
    let registry = Arc::new(
        PreferenceRegistry::builder()
            .button_keys(&["fp_wakeup"])
            .node("fp_wakeup", dir.path().join("w"))
            .default_value("fp_wakeup", PrefValue::Bool(true))
            .pocket_mode("fp_pocketmode", dir.path().join("p"), true)
            .build()
            .unwrap(),
    );
    let open = |registry: &Arc<PreferenceRegistry>| {
        let node = Arc::new(SysfsNode::new());
        let store = Arc::new(JsonPreferenceStore::open(&store_path).unwrap());
        SyncEngine::new(Arc::clone(registry), store, node.clone(), node)
    };

    let outcome = open(&registry).set("fp_pocketmode", "off").unwrap();
    assert_eq!(
        outcome,
        KeyOutcome::Stored {
            value: PrefValue::Bool(false)
        }
    );
    assert!(read(dir.path().join("p")).is_none());

    assert!(!open(&registry).pocket_mode_enabled());
    open(&registry).set("fp_pocketmode", "on").unwrap();
    assert!(open(&registry).pocket_mode_enabled());
}

#[test]
fn test_set_unknown_key() {
    let dir = TempDir::new().unwrap();
    let err = engine(dir.path(), Arc::new(MemoryPreferenceStore::new()))
        .set("fp_nothing", "1")
        .unwrap_err();
    assert!(matches!(err, PartsError::UnknownKey(_)));
}

#[test]
fn test_device_registry_is_shared() {
    let a = device_registry().unwrap();
    let b = device_registry().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(a.keys().collect::<Vec<_>>(), vec!["fp_home", "fp_wakeup"]);
}

// ============================================================================
// Pocket mode
// ============================================================================

#[test]
fn test_enable_disable_reach_sensor_manager_in_order() {
    let dir = TempDir::new().unwrap();
    let sensors = Arc::new(RecordingSensors::default());
    let controller = ProximityController::new(
        sensors.clone(),
        Arc::new(SysfsNode::new()),
        dir.path().join("p"),
    )
    .unwrap();

    controller.enable().unwrap();
    controller.disable().unwrap();
    controller.wait_idle().unwrap();

    assert_eq!(*sensors.calls.lock(), vec!["register", "unregister"]);
    assert_eq!(controller.state(), ProximityState::Disabled);
}

#[test]
fn test_registered_handler_writes_proximity_node() {
    let dir = TempDir::new().unwrap();
    let node = dir.path().join("p");
    let sensors = Arc::new(RecordingSensors::default());
    let controller =
        ProximityController::new(sensors.clone(), Arc::new(SysfsNode::new()), &node).unwrap();

    controller.enable().unwrap();
    controller.wait_idle().unwrap();
    let handler = sensors.handler.lock().clone().unwrap();

    handler(SensorReading { distance: 0.0 });
    assert_eq!(read(&node).as_deref(), Some("1"));
    handler(SensorReading { distance: 10.0 });
    assert_eq!(read(&node).as_deref(), Some("0"));
}

#[test]
fn test_write_failure_keeps_controller_enabled() {
    let dir = TempDir::new().unwrap();
    let missing: PathBuf = dir.path().join("detached").join("proximity_state");
    let sensors = Arc::new(RecordingSensors::default());
    let controller =
        ProximityController::new(sensors.clone(), Arc::new(SysfsNode::new()), missing).unwrap();

    controller.enable().unwrap();
    controller.wait_idle().unwrap();
    controller.on_sensor_changed(SensorReading { distance: 0.0 });

    assert!(controller.is_enabled());
    assert_eq!(*sensors.calls.lock(), vec!["register"]);
}

#[test]
#[serial]
fn test_polled_sensor_drives_pocket_mode() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in_proximity_raw");
    let node = dir.path().join("proximity_state");
    fs::write(&input, "0").unwrap();

    let sensors = Arc::new(PollingSensorManager::new(&input, 5.0));
    let controller =
        ProximityController::new(sensors.clone(), Arc::new(SysfsNode::new()), &node).unwrap();

    controller.enable().unwrap();
    wait_for("near", || read(&node).as_deref() == Some("1"));

    fs::write(&input, "10").unwrap();
    wait_for("far", || read(&node).as_deref() == Some("0"));

    controller.disable().unwrap();
    controller.wait_idle().unwrap();
    fs::write(&input, "0").unwrap();
    thread::sleep(Duration::from_millis(500));
    assert_eq!(read(&node).as_deref(), Some("0"));

    controller.shutdown();
}

#[test]
#[serial]
fn test_missing_proximity_input_fails_construction() {
    let dir = TempDir::new().unwrap();
    let sensors = Arc::new(PollingSensorManager::new(dir.path().join("absent"), 5.0));
    let result = ProximityController::new(sensors, Arc::new(SysfsNode::new()), dir.path().join("p"));
    assert!(matches!(result, Err(PartsError::SensorUnavailable(_))));
}
