// HwFault - Hardware Failure Injection Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use std::collections::VecDeque;

use hwf_core::{Console, FaultHw, ScratchStore};
use serde::Serialize;

/// Base of the simulated execute-in-place flash window the FlashMemset
/// handler overwrites: FlexSPI AMBA base + 128 KiB, as on the RT1060.
pub const FLASH_WINDOW_BASE: u32 = 0x6000_0000 + 128 * 1024;
/// Length of the overwritten flash window.
pub const FLASH_WINDOW_LEN: usize = 64 * 1024;
/// Start of the MPU-guarded region the MpuRegionAccess handler writes.
pub const PROTECTED_REGION_ADDR: u32 = 0x2020_0000;
/// Length of the MPU-guarded region.
pub const PROTECTED_REGION_LEN: usize = 0x10;
/// Fill byte used by both bulk-overwrite handlers.
pub const FILL_PATTERN: u8 = 0x5A;

/// Plain scratch register: logical value stored as-is, retained across a
/// warm reset, zeroed by a cold power-up. Mirrors the RT1060's SNVS GPR0.
#[derive(Debug, Default, Serialize)]
pub struct ScratchReg {
    value: u32,
}

impl ScratchReg {
    pub fn new() -> Self {
        ScratchReg::default()
    }

    /// Starts the register off holding `value`, as if a previous session
    /// left it there.
    pub fn preload(value: u32) -> Self {
        ScratchReg { value }
    }

    /// Warm resets do not touch the register; that is the whole point.
    pub fn warm_reset(&mut self) {}

    /// A cold power-up leaves the register zeroed.
    pub fn cold_boot(&mut self) {
        self.value = 0;
    }
}

impl ScratchStore for ScratchReg {
    fn read(&self) -> u32 {
        self.value
    }
    fn write(&mut self, value: u32) {
        self.value = value;
    }
}

/// Scratch register with a hardware lock bit in bit 0, the RT1170 GPR32
/// layout: the logical value is stored shifted left by one (truncated to
/// 16 bits, as the hardware field is) and the lock bit is masked off on
/// read.
#[derive(Debug, Default, Serialize)]
pub struct LockBitScratchReg {
    raw: u32,
}

const LOCK_BIT: u32 = 1 << 0;

impl LockBitScratchReg {
    pub fn new() -> Self {
        LockBitScratchReg::default()
    }

    /// The raw register word, lock bit and all.
    pub fn raw(&self) -> u32 {
        self.raw
    }

    pub fn warm_reset(&mut self) {}

    pub fn cold_boot(&mut self) {
        self.raw = 0;
    }
}

impl ScratchStore for LockBitScratchReg {
    fn read(&self) -> u32 {
        (self.raw & !LOCK_BIT) >> 1
    }
    fn write(&mut self, value: u32) {
        self.raw = (value as u16 as u32) << 1;
    }
}

/// Scripted console: queued input bytes in, captured transcript out.
#[derive(Debug, Default, Serialize)]
pub struct ScriptConsole {
    input: VecDeque<u8>,
    pub transcript: String,
}

impl ScriptConsole {
    pub fn new() -> Self {
        ScriptConsole::default()
    }

    pub fn push_keys(&mut self, keys: &str) {
        self.input.extend(keys.bytes());
    }

    pub fn pop_key(&mut self) -> Option<u8> {
        self.input.pop_front()
    }
}

impl core::fmt::Write for ScriptConsole {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.transcript.push_str(s);
        Ok(())
    }
}

impl Console for ScriptConsole {
    /// The real console blocks; the scripted one hands back NUL when the
    /// script is exhausted (NUL never maps to a mode).
    fn read_byte(&mut self) -> u8 {
        self.input.pop_front().unwrap_or(0)
    }
}

/// Everything the board-side fault primitives touched, in call order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum HwEvent {
    TickArmed,
    TickDisarmed,
    Delayed(u32),
    Led(bool),
    Wfi,
    ResetRequested,
    PeriphGatedOff,
    GatedProbeRead { value: u32 },
    FlashFilled { base: u32, len: u32 },
    ProtectedRegionFilled { addr: u32, len: u32 },
    /// Recorded by the runner once boot proceeds past the resume
    /// sequencer into normal bring-up.
    BringUp,
}

/// Fault a handler provoked, waiting for the runner to deliver it as a
/// warm reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PendingFault {
    BusFault { addr: u32 },
    MpuViolation { addr: u32 },
}

/// The simulated board's fault-provocation hardware.
///
/// The value a read of the unclocked probe peripheral returns is a knob,
/// so tests can exercise both the clean-fault path (zero) and the
/// silently-tolerated access the self-check exists to catch (nonzero).
#[derive(Debug, Serialize)]
pub struct SimFaultHw {
    pub tick_armed: bool,
    pub led_on: bool,
    pub periph_clocked: bool,
    /// What the bus hands back for reads of the unclocked probe
    /// peripheral.
    pub gated_read_value: u32,
    pub reset_requested: bool,
    probe_regs: [(&'static str, u32); 6],
    #[serde(skip)]
    pub flash: Vec<u8>,
    pub protected: [u8; PROTECTED_REGION_LEN],
    pub events: Vec<HwEvent>,
    pending_fault: Option<PendingFault>,
}

impl SimFaultHw {
    pub fn new() -> Self {
        SimFaultHw {
            tick_armed: false,
            led_on: false,
            periph_clocked: true,
            gated_read_value: 0,
            reset_requested: false,
            // FlexCAN register file at its reset values.
            probe_regs: [
                ("CAN1->MCR", 0x5980_000F),
                ("CAN1->CTRL1", 0x0000_0000),
                ("CAN1->TIMER", 0x0000_0000),
                ("CAN1->RXMGMASK", 0xFFFF_FFFF),
                ("CAN1->RX14MASK", 0xFFFF_FFFF),
                ("CAN1->RX15MASK", 0xFFFF_FFFF),
            ],
            flash: vec![0xFF; FLASH_WINDOW_LEN],
            protected: [0; PROTECTED_REGION_LEN],
            events: Vec::new(),
            pending_fault: None,
        }
    }

    /// Reset-domain state goes back to its power-on defaults; flash and
    /// RAM contents (and the event log, which is host-side observability)
    /// survive.
    pub fn warm_reset(&mut self) {
        self.tick_armed = false;
        self.led_on = false;
        self.periph_clocked = true;
        self.reset_requested = false;
        self.pending_fault = None;
    }

    pub fn take_fault(&mut self) -> Option<PendingFault> {
        self.pending_fault.take()
    }

    /// True while a latched fault or reset request is waiting to be
    /// delivered as a warm reset.
    pub fn has_disruption(&self) -> bool {
        self.pending_fault.is_some() || self.reset_requested
    }
}

impl Default for SimFaultHw {
    fn default() -> Self {
        SimFaultHw::new()
    }
}

impl FaultHw for SimFaultHw {
    fn tick_arm_1ms(&mut self) {
        self.tick_armed = true;
        self.events.push(HwEvent::TickArmed);
    }

    fn tick_disarm(&mut self) {
        self.tick_armed = false;
        self.events.push(HwEvent::TickDisarmed);
    }

    fn delay_ticks(&mut self, ticks: u32) {
        // Simulated time passes instantly.
        self.events.push(HwEvent::Delayed(ticks));
    }

    fn set_led(&mut self, on: bool) {
        self.led_on = on;
        self.events.push(HwEvent::Led(on));
    }

    fn wait_for_interrupt(&mut self) {
        // The next simulated interrupt arrives immediately.
        self.events.push(HwEvent::Wfi);
    }

    fn system_reset(&mut self) {
        self.reset_requested = true;
        self.events.push(HwEvent::ResetRequested);
    }

    fn gate_off_test_periph(&mut self) {
        self.periph_clocked = false;
        self.events.push(HwEvent::PeriphGatedOff);
    }

    fn read_gated_probe_reg(&mut self) -> u32 {
        let value = if self.periph_clocked {
            self.probe_regs[3].1
        } else {
            self.gated_read_value
        };
        self.events.push(HwEvent::GatedProbeRead { value });
        value
    }

    fn for_each_probe_reg(&mut self, visit: &mut dyn FnMut(&'static str, u32)) {
        for (name, stored) in self.probe_regs.iter().copied() {
            let value = if self.periph_clocked {
                stored
            } else {
                self.gated_read_value
            };
            visit(name, value);
        }
    }

    fn corrupt_flash(&mut self) {
        self.flash.fill(FILL_PATTERN);
        self.events.push(HwEvent::FlashFilled {
            base: FLASH_WINDOW_BASE,
            len: FLASH_WINDOW_LEN as u32,
        });
        self.pending_fault = Some(PendingFault::BusFault {
            addr: FLASH_WINDOW_BASE,
        });
    }

    fn clobber_protected_region(&mut self) {
        self.protected.fill(FILL_PATTERN);
        self.events.push(HwEvent::ProtectedRegionFilled {
            addr: PROTECTED_REGION_ADDR,
            len: PROTECTED_REGION_LEN as u32,
        });
        self.pending_fault = Some(PendingFault::MpuViolation {
            addr: PROTECTED_REGION_ADDR,
        });
    }
}

/// The whole simulated board: scratch register, fault hardware, console.
#[derive(Debug, Default, Serialize)]
pub struct SimBoard {
    pub scratch: ScratchReg,
    pub hw: SimFaultHw,
    pub con: ScriptConsole,
}

impl SimBoard {
    pub fn new() -> Self {
        SimBoard::default()
    }

    pub fn warm_reset(&mut self) {
        self.scratch.warm_reset();
        self.hw.warm_reset();
    }

    pub fn cold_boot(&mut self) {
        self.scratch.cold_boot();
        self.hw.warm_reset();
    }

    /// Board state as JSON, for the CLI's `--snapshot` and debugging.
    pub fn snapshot(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scratch_survives_warm_reset_but_not_cold_boot() {
        let mut reg = ScratchReg::new();
        reg.write(4);
        reg.warm_reset();
        assert_eq!(reg.read(), 4);
        reg.cold_boot();
        assert_eq!(reg.read(), 0);
    }

    #[test]
    fn scratch_read_is_idempotent() {
        let mut reg = ScratchReg::preload(3);
        assert_eq!(reg.read(), 3);
        assert_eq!(reg.read(), 3);
        assert_eq!(reg.read(), 3);
    }

    #[test]
    fn lock_bit_register_shifts_the_value_past_the_lock_bit() {
        let mut reg = LockBitScratchReg::new();
        reg.write(4);
        assert_eq!(reg.raw(), 4 << 1);
        assert_eq!(reg.raw() & LOCK_BIT, 0);
        assert_eq!(reg.read(), 4);

        // A set lock bit must not leak into the logical value.
        reg.raw |= LOCK_BIT;
        assert_eq!(reg.read(), 4);
    }

    #[test]
    fn lock_bit_register_truncates_to_the_16_bit_field() {
        let mut reg = LockBitScratchReg::new();
        reg.write(0x0001_0003);
        assert_eq!(reg.read(), 3);
    }

    #[test]
    fn gated_probe_read_uses_the_configured_bus_value() {
        let mut hw = SimFaultHw::new();
        hw.gate_off_test_periph();
        assert_eq!(hw.read_gated_probe_reg(), 0);

        hw.gated_read_value = 0xDEAD_BEEF;
        assert_eq!(hw.read_gated_probe_reg(), 0xDEAD_BEEF);
    }

    #[test]
    fn warm_reset_restores_reset_domain_state_but_keeps_flash() {
        let mut hw = SimFaultHw::new();
        hw.tick_arm_1ms();
        hw.gate_off_test_periph();
        hw.corrupt_flash();
        assert!(hw.take_fault().is_some());
        hw.corrupt_flash();

        hw.warm_reset();
        assert!(!hw.tick_armed);
        assert!(hw.periph_clocked);
        assert!(hw.take_fault().is_none());
        assert!(hw.flash.iter().all(|b| *b == FILL_PATTERN));
    }
}
