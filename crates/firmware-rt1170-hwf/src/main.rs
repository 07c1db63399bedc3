#![no_std]
// HwFault - Hardware Failure Injection Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.
#![no_main]

//! Fault-injection harness on the MIMXRT1170-EVKB (CM7 core).
//!
//! Persisted intent lives in SNVS GPR32, shifted past the register's
//! hardware lock bit; the boot path re-enters whatever test was in
//! flight before doing any bring-up.

mod board;

use cortex_m_rt::{entry, exception};
use hwf_core::Harness;
use panic_halt as _;

#[entry]
fn main() -> ! {
    let mut scratch = board::SnvsScratch;
    let mut hw = board::BoardHw;
    let mut con = board::DebugConsole;

    // Resume first: a test that reset the board verifies its effect
    // against the pre-bring-up hardware state.
    let resumed = {
        let mut harness = Harness::new(&mut scratch, &mut hw, &mut con);
        harness.resume_after_reset()
    };
    if let Some(Err(anomaly)) = resumed {
        board::halt(anomaly);
    }

    board::bring_up();

    let mut harness = Harness::new(&mut scratch, &mut hw, &mut con);
    let anomaly = harness.run();
    board::halt(anomaly)
}

#[exception]
fn SysTick() {
    board::DELAY.on_tick();
}
