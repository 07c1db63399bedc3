// HwFault - Hardware Failure Injection Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// Board primitives the fault handlers are built from.
///
/// Each method is one terminal action or one piece of board state the
/// handlers poke. The real boards implement these with raw register
/// writes; the simulated board records them and latches the faults they
/// would provoke.
pub trait FaultHw {
    /// Arms the periodic 1 ms tick source that drives `delay_ticks`.
    fn tick_arm_1ms(&mut self);

    /// Disarms the tick source armed by `tick_arm_1ms`.
    fn tick_disarm(&mut self);

    /// Blocks until `ticks` tick periods have elapsed.
    fn delay_ticks(&mut self, ticks: u32);

    /// Drives the board's user LED.
    fn set_led(&mut self, on: bool);

    /// Data barrier, wait-for-interrupt, instruction barrier. Returns
    /// once any interrupt wakes the core.
    fn wait_for_interrupt(&mut self);

    /// Requests a system-level warm reset. Diverges on real hardware;
    /// the simulated board latches the request and returns.
    fn system_reset(&mut self);

    /// Gates off the clock(s) feeding the probe peripheral, making its
    /// registers illegal to access.
    fn gate_off_test_periph(&mut self);

    /// Reads one register of the now-unclocked probe peripheral. On a
    /// board that behaves, this access faults; a plausible value coming
    /// back means the hardware silently tolerated it.
    fn read_gated_probe_reg(&mut self) -> u32;

    /// Visits the probe peripheral's diagnostic registers in dump order.
    fn for_each_probe_reg(&mut self, visit: &mut dyn FnMut(&'static str, u32));

    /// Bulk-overwrites a fixed window of execute-in-place flash with a
    /// fixed pattern, without an erase. Expected to corrupt the running
    /// image or fault outright.
    fn corrupt_flash(&mut self);

    /// Bulk-overwrites a small fixed region guarded by the MPU,
    /// provoking an access violation.
    fn clobber_protected_region(&mut self);
}
