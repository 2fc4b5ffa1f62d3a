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

//! Well-known keys, node paths and tunables

/// Preference keys exposed to the settings layer
pub mod keys {
    /// Fingerprint sensor acts as a home button
    pub const FP_HOME: &str = "fp_home";
    /// Proximity-gated fingerprint input while in a pocket
    pub const FP_POCKETMODE: &str = "fp_pocketmode";
    /// Fingerprint touch wakes the device
    pub const FP_WAKEUP: &str = "fp_wakeup";
}

/// Kernel control nodes for the fpc1020 fingerprint driver and touch panel
pub mod nodes {
    pub const FP_HOME_KEY: &str = "/sys/devices/soc/soc:fpc_fpc1020/enable_key_events";
    pub const FP_PROXIMITY: &str = "/sys/devices/soc/soc:fpc_fpc1020/proximity_state";
    pub const FP_WAKEUP: &str = "/sys/devices/soc/soc:fpc_fpc1020/enable_wakeup";
    /// Capacitive navigation keys; the fingerprint home key only works while these are on
    pub const VIRTUAL_KEYS: &str = "/proc/touchpanel/capacitive_keys_enable";
}

/// Textual values accepted by boolean control nodes
pub mod tokens {
    pub const ON: &str = "1";
    pub const OFF: &str = "0";
}

/// Proximity sensor defaults
pub mod proximity {
    /// IIO proximity channel polled by the daemon
    pub const DEFAULT_INPUT: &str = "/sys/bus/iio/devices/iio:device0/in_proximity_raw";

    /// Readings strictly below this are "near"
    pub const DEFAULT_MAX_RANGE: f32 = 5.0;

    /// Sampling periods, in milliseconds
    pub mod rate {
        pub const FASTEST_MS: u64 = 0;
        pub const GAME_MS: u64 = 20;
        pub const UI_MS: u64 = 66;
        pub const NORMAL_MS: u64 = 200;
    }

    /// Lower bound on the poll period so a FASTEST subscription doesn't spin
    pub const MIN_POLL_MS: u64 = 5;
}

/// Filesystem locations used by the daemon
pub mod paths {
    pub const CONFIG_DIR: &str = "/etc/buttonparts";
    pub const CONFIG_FILE: &str = "config.json";
    pub const STATE_DIR: &str = "/var/lib/buttonparts";
    pub const STORE_FILE: &str = "preferences.json";
    pub const JOURNAL_SOCKET: &str = "/run/systemd/journal/socket";
}
