// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Which optional event sources this build handles.
//!
//! Hardware support is chosen at compile time with Cargo features (`button`,
//! `display`, `matrix-display`, `gps`, `time-sync`). A feature that is off
//! removes its trampoline outright and makes its dispatch route unreachable.
//!
//! [`Config`] sits on top of that: it starts out mirroring the features, and
//! can switch off a source that is compiled in (a board variant without the
//! display fitted, say). It cannot switch on one that isn't.

mod generated {
    include!(concat!(env!("OUT_DIR"), "/time_sync.rs"));
}

/// Minutes between clock resyncs, fixed at build time from the
/// `PAXIRQ_TIME_SYNC_INTERVAL` environment variable (default 60). Zero when
/// the `time-sync` feature is off.
pub const TIME_SYNC_INTERVAL: u32 = generated::TIME_SYNC_INTERVAL;

/// Runtime selection of event sources.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Handle `Events::BUTTON`.
    pub button: bool,
    /// Handle `Events::DISPLAY`.
    pub display: bool,
    /// Handle `Events::MATRIX_DISPLAY`.
    pub matrix_display: bool,
    /// Handle `Events::GPS`.
    pub gps: bool,
    /// Minutes between time syncs. `Events::TIME_SYNC` is handled only if
    /// this is positive.
    pub time_sync_interval: u32,
}

impl Config {
    /// Configuration matching exactly what was compiled in.
    pub const fn from_features() -> Self {
        Self {
            button: cfg!(feature = "button"),
            display: cfg!(feature = "display"),
            matrix_display: cfg!(feature = "matrix-display"),
            gps: cfg!(feature = "gps"),
            time_sync_interval: TIME_SYNC_INTERVAL,
        }
    }

    /// Configuration with every optional source off. Housekeeping and payload
    /// sends are not optional and stay on.
    pub const fn minimal() -> Self {
        Self {
            button: false,
            display: false,
            matrix_display: false,
            gps: false,
            time_sync_interval: 0,
        }
    }

    pub(crate) const fn button(&self) -> bool {
        cfg!(feature = "button") && self.button
    }

    pub(crate) const fn display(&self) -> bool {
        cfg!(feature = "display") && self.display
    }

    pub(crate) const fn matrix_display(&self) -> bool {
        cfg!(feature = "matrix-display") && self.matrix_display
    }

    pub(crate) const fn gps(&self) -> bool {
        cfg!(feature = "gps") && self.gps
    }

    /// Returns `true` if time sync is both compiled in and has a positive
    /// interval.
    pub(crate) const fn time_sync(&self) -> bool {
        cfg!(feature = "time-sync") && self.time_sync_interval > 0
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_features()
    }
}
