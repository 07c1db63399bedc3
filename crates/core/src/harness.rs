// HwFault - Hardware Failure Injection Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::fmt::Write as _;

use crate::console::Console;
use crate::hw::FaultHw;
use crate::mode::FailureMode;
use crate::scratch::{decode_intent, encode_intent, ScratchStore};

/// How a dispatched handler came back, for the callers that get to see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The handler ran to completion and control continues normally.
    Completed,
    /// The handler requested a warm reset. On real hardware this variant
    /// is unreachable (the reset already happened); the simulated board
    /// returns it so the runner can cycle the board.
    ResetRequested,
}

/// A self-check found the hardware tolerating an access that should have
/// faulted. This is a hard stop, not a recoverable error: firmware halts
/// on it, the simulated runner ends the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAnomaly {
    /// The read of a clock-gated peripheral register returned a plausible
    /// value instead of faulting.
    GatedReadSucceeded { value: u32 },
}

impl core::fmt::Display for FaultAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            FaultAnomaly::GatedReadSucceeded { value } => write!(
                f,
                "gated peripheral register read returned {:#x} instead of faulting",
                value
            ),
        }
    }
}

/// The harness context: the reset-surviving scratch store, the board's
/// fault primitives, and the debug console. One of these is built at boot
/// and drives everything; there is no global state.
pub struct Harness<'h> {
    store: &'h mut dyn ScratchStore,
    hw: &'h mut dyn FaultHw,
    con: &'h mut dyn Console,
}

impl<'h> Harness<'h> {
    pub fn new(
        store: &'h mut dyn ScratchStore,
        hw: &'h mut dyn FaultHw,
        con: &'h mut dyn Console,
    ) -> Self {
        Harness { store, hw, con }
    }

    /// Boot Resume Sequencer. Runs before bring-up: if the scratch store
    /// holds a known mode, that test was in flight when the last reset
    /// hit, and it is re-entered here so its verification logic sees the
    /// pre-bring-up hardware state. Returns `None` when nothing was in
    /// flight and boot should fall through to the menu.
    pub fn resume_after_reset(&mut self) -> Option<Result<Outcome, FaultAnomaly>> {
        let mode = decode_intent(self.store.read())?;
        Some(self.dispatch(mode))
    }

    /// Records intent in the scratch store, then invokes the handler.
    ///
    /// The write must land before the handler runs: several handlers
    /// never return (reset, bus fault), and the next boot's resume
    /// sequencer recovers the in-flight mode from this word.
    pub fn dispatch(&mut self, mode: FailureMode) -> Result<Outcome, FaultAnomaly> {
        self.store.write(encode_intent(mode));
        match mode {
            FailureMode::LedBlinky => {
                self.led_blinky();
                Ok(Outcome::Completed)
            }
            FailureMode::CpuWfi => {
                self.cpu_wfi();
                Ok(Outcome::Completed)
            }
            FailureMode::SystemReset => Ok(self.system_reset()),
            FailureMode::PeriphRegAccess => {
                self.periph_reg_access().map(|()| Outcome::Completed)
            }
            FailureMode::FlashMemset => {
                self.flash_memset();
                Ok(Outcome::Completed)
            }
            FailureMode::MpuRegionAccess => {
                self.mpu_region_access();
                Ok(Outcome::Completed)
            }
        }
    }

    /// Not a fault: proof that normal code still executes. Nine LED
    /// toggles a second apart, starting from on, then the tick source is
    /// disarmed again.
    fn led_blinky(&mut self) {
        self.hw.tick_arm_1ms();
        let mut toggles: u8 = 0;
        loop {
            self.hw.delay_ticks(1000);
            let _ = self.con.write_str("Toggle LED once.\r\n");
            self.hw.set_led(toggles % 2 == 0);
            toggles += 1;
            if toggles > 8 {
                self.hw.tick_disarm();
                break;
            }
        }
    }

    fn cpu_wfi(&mut self) {
        self.store.write(encode_intent(FailureMode::CpuWfi));
        self.hw.wait_for_interrupt();
    }

    fn system_reset(&mut self) -> Outcome {
        self.store.write(encode_intent(FailureMode::SystemReset));
        self.hw.system_reset();
        // Reached only when the reset is simulated.
        Outcome::ResetRequested
    }

    /// Gates off the probe peripheral's clock, then performs the guarded
    /// illegal read when the persisted intent names this mode. A nonzero
    /// value coming back means the bus tolerated the access, which is
    /// flagged as an anomaly. The diagnostic dump runs on the unclocked
    /// peripheral either way.
    fn periph_reg_access(&mut self) -> Result<(), FaultAnomaly> {
        self.hw.gate_off_test_periph();

        if decode_intent(self.store.read()) == Some(FailureMode::PeriphRegAccess) {
            let value = self.hw.read_gated_probe_reg();
            if value != 0 {
                return Err(FaultAnomaly::GatedReadSucceeded { value });
            }
        }
        self.store.write(encode_intent(FailureMode::PeriphRegAccess));

        let con = &mut *self.con;
        self.hw.for_each_probe_reg(&mut |name, value| {
            let _ = write!(con, "{} = {:x}\r\n", name, value);
        });
        Ok(())
    }

    fn flash_memset(&mut self) {
        self.store.write(encode_intent(FailureMode::FlashMemset));
        self.hw.corrupt_flash();
    }

    fn mpu_region_access(&mut self) {
        self.store.write(encode_intent(FailureMode::MpuRegionAccess));
        self.hw.clobber_protected_region();
    }

    /// Prints the command menu, one line per mode in code order.
    pub fn print_menu(&mut self) {
        let _ = self
            .con
            .write_str("\r\n########## HW Failure Harness ##########\r\n\r\n");
        let _ = self.con.write_str("Select the desired mode\r\n\r\n");
        for mode in FailureMode::ALL {
            let _ = write!(
                self.con,
                "Press {} for enter case: {}\r\n",
                mode.command_key() as char,
                mode.describe()
            );
        }
        let _ = self
            .con
            .write_str("\r\nWaiting for HW failure case select...\r\n\r\n");
    }

    /// Feeds one console byte through the registry and, when it names a
    /// mode, the dispatcher. Unrecognized input is echoed and ignored;
    /// the loop just keeps waiting.
    pub fn handle_key(&mut self, raw: u8) -> Option<Result<Outcome, FaultAnomaly>> {
        let key = raw.to_ascii_uppercase();
        let _ = write!(self.con, "Entering case {}\r\n", key as char);
        match FailureMode::from_key(raw) {
            Ok(mode) => Some(self.dispatch(mode)),
            Err(_) => None,
        }
    }

    /// The interactive loop: menu once, then one command per keypress,
    /// forever. Returns only when a handler reports an anomaly, at which
    /// point the caller halts the board.
    pub fn run(&mut self) -> FaultAnomaly {
        self.print_menu();
        loop {
            let key = self.con.read_byte();
            if let Some(Err(anomaly)) = self.handle_key(key) {
                return anomaly;
            }
            let _ = self.con.write_str("\r\nNext loop\r\n");
        }
    }
}
