// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::env;
use std::fs;
use std::path::PathBuf;

/// Minutes between time syncs when the environment doesn't say otherwise.
const DEFAULT_TIME_SYNC_INTERVAL: u32 = 60;

fn main() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    println!("cargo:rerun-if-env-changed=PAXIRQ_TIME_SYNC_INTERVAL");

    // Without the feature there is nothing to sync, and an interval of zero
    // is how the rest of the crate spells "off".
    let interval = if env::var("CARGO_FEATURE_TIME_SYNC").is_ok() {
        match env::var("PAXIRQ_TIME_SYNC_INTERVAL") {
            Ok(s) => s.trim().parse::<u32>().unwrap_or_else(|_| {
                panic!("PAXIRQ_TIME_SYNC_INTERVAL must be a number of minutes, got {s:?}")
            }),
            Err(_) => DEFAULT_TIME_SYNC_INTERVAL,
        }
    } else {
        0
    };

    fs::write(
        out_dir.join("time_sync.rs"),
        format!("pub const TIME_SYNC_INTERVAL: u32 = {interval};\n"),
    )
    .expect("write time_sync.rs");

    println!("cargo:rerun-if-changed=build.rs");
}
