/*
 * Test utilities and fakes for Buttonparts
 *
 * Fake control-node trees on a temp directory plus a writer that records
 * every write, for tests that care about the sequence of node updates.
 */

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::error::{PartsError, Result};
use crate::node::NodeWriter;
use crate::registry::{PrefValue, PreferenceRegistry};

/// A temp directory standing in for sysfs/procfs
pub struct FakeNodes {
    pub dir: TempDir,
}

impl FakeNodes {
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("create temp dir"),
        }
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Create or overwrite a node with `content`
    pub fn set(&self, name: &str, content: &str) -> PathBuf {
        let path = self.path(name);
        fs::write(&path, content).expect("write fake node");
        path
    }

    pub fn get(&self, name: &str) -> Option<String> {
        fs::read_to_string(self.path(name)).ok()
    }

    /// Registry shaped like the device table, rooted in this directory:
    /// `fp_home` -> `a` (depends on `v` == "1"), `fp_wakeup` -> `w`
    pub fn registry(&self) -> PreferenceRegistry {
        PreferenceRegistry::builder()
            .button_keys(&["fp_home", "fp_wakeup"])
            .node("fp_home", self.path("a"))
            .node("fp_wakeup", self.path("w"))
            .default_value("fp_home", PrefValue::Bool(false))
            .default_value("fp_wakeup", PrefValue::Bool(true))
            .dependency("fp_home", self.path("v"), "1")
            .pocket_mode("fp_pocketmode", self.path("p"), true)
            .build()
            .expect("valid test registry")
    }
}

/// Records writes in order; paths in `failing` return an error instead
#[derive(Default)]
pub struct RecordingWriter {
    pub writes: Mutex<Vec<(PathBuf, String)>>,
    failing: HashSet<PathBuf>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(path: impl Into<PathBuf>) -> Self {
        let mut failing = HashSet::new();
        failing.insert(path.into());
        Self {
            writes: Mutex::new(Vec::new()),
            failing,
        }
    }

    pub fn take(&self) -> Vec<(PathBuf, String)> {
        std::mem::take(&mut *self.writes.lock())
    }
}

impl NodeWriter for RecordingWriter {
    fn write(&self, path: &Path, value: &str) -> Result<()> {
        self.writes.lock().push((path.to_path_buf(), value.to_string()));
        if self.failing.contains(path) {
            return Err(PartsError::node_write(
                path,
                io::Error::new(io::ErrorKind::PermissionDenied, "Permission denied"),
            ));
        }
        Ok(())
    }
}
