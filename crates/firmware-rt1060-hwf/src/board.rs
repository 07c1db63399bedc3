// HwFault - Hardware Failure Injection Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! MIMXRT1060-EVKB board backing for the harness traits. Pin mux, the
//! clock tree and the debug-console transport come up with the boot
//! image; everything here is direct register access on top of that.

use core::fmt;
use core::ptr::{read_volatile, write_volatile};

use cortex_m::asm;
use cortex_m::peripheral::SCB;
use hwf_core::{Console, FaultAnomaly, FaultHw, ScratchStore, TickCountdown};

const CORE_CLOCK_HZ: u32 = 600_000_000;

// IOMUXC SNVS GPR0: a general-purpose word in the always-on power
// domain. Keeps its value across any reset short of a power cycle.
const IOMUXC_SNVS_GPR_GPR0: *mut u32 = 0x400A_4000 as *mut u32;

// LPUART1, the EVKB debug console.
const LPUART1_STAT: *mut u32 = 0x4018_4014 as *mut u32;
const LPUART1_DATA: *mut u32 = 0x4018_401C as *mut u32;
const LPUART_STAT_RDRF: u32 = 1 << 21;
const LPUART_STAT_TDRE: u32 = 1 << 23;

// GPIO1, user LED on pin 9 (GPIO_AD_B0_09).
const GPIO1_GDIR: *mut u32 = 0x401B_8004 as *mut u32;
const GPIO1_DR_SET: *mut u32 = 0x401B_8084 as *mut u32;
const GPIO1_DR_CLEAR: *mut u32 = 0x401B_8088 as *mut u32;
const USER_LED_PIN: u32 = 9;

// CCM clock gating. CG7/CG8 feed FlexCAN1; CG11 is the trace clock.
const CCM_CCGR0: *mut u32 = 0x400F_C068 as *mut u32;
const CCGR0_CG7_CAN1: u32 = 0b11 << 14;
const CCGR0_CG8_CAN1_SERIAL: u32 = 0b11 << 16;
const CCGR0_CG11_TRACE: u32 = 0b11 << 22;

// FlexCAN1 register file, the clock-gated probe target.
const CAN1_MCR: *mut u32 = 0x401D_0000 as *mut u32;
const CAN1_CTRL1: *mut u32 = 0x401D_0004 as *mut u32;
const CAN1_TIMER: *mut u32 = 0x401D_0008 as *mut u32;
const CAN1_RXMGMASK: *mut u32 = 0x401D_0010 as *mut u32;
const CAN1_RX14MASK: *mut u32 = 0x401D_0014 as *mut u32;
const CAN1_RX15MASK: *mut u32 = 0x401D_0018 as *mut u32;

const PROBE_REGS: [(&str, *mut u32); 6] = [
    ("CAN1->MCR", CAN1_MCR),
    ("CAN1->CTRL1", CAN1_CTRL1),
    ("CAN1->TIMER", CAN1_TIMER),
    ("CAN1->RXMGMASK", CAN1_RXMGMASK),
    ("CAN1->RX14MASK", CAN1_RX14MASK),
    ("CAN1->RX15MASK", CAN1_RX15MASK),
];

// SysTick.
const SYST_CSR: *mut u32 = 0xE000_E010 as *mut u32;
const SYST_RVR: *mut u32 = 0xE000_E014 as *mut u32;
const SYST_CVR: *mut u32 = 0xE000_E018 as *mut u32;
const SYST_CSR_ENABLE: u32 = 1 << 0;
const SYST_CSR_TICKINT: u32 = 1 << 1;
const SYST_CSR_CLKSOURCE: u32 = 1 << 2;
const SYST_RELOAD_MAX: u32 = 0x00FF_FFFF;

// FlexSPI NOR flash, executed in place. The corrupt window sits past the
// image header, 128 KiB in.
const FLEXSPI_AMBA_BASE: u32 = 0x6000_0000;
const FLASH_CORRUPT_OFFSET: u32 = 128 * 1024;
const FLASH_CORRUPT_LEN: usize = 64 * 1024;

// OCRAM region the boot-image MPU setup leaves without write permission.
const PROTECTED_REGION: *mut u8 = 0x2020_0000 as *mut u8;
const PROTECTED_REGION_LEN: usize = 0x10;

const FILL_PATTERN: u8 = 0x5A;

/// Shared with the SysTick exception handler in `main.rs`.
pub static DELAY: TickCountdown = TickCountdown::new();

pub struct SnvsScratch;

impl ScratchStore for SnvsScratch {
    fn read(&self) -> u32 {
        unsafe { read_volatile(IOMUXC_SNVS_GPR_GPR0) }
    }
    fn write(&mut self, value: u32) {
        unsafe { write_volatile(IOMUXC_SNVS_GPR_GPR0, value) }
    }
}

pub struct DebugConsole;

fn putc(byte: u8) {
    unsafe {
        while read_volatile(LPUART1_STAT) & LPUART_STAT_TDRE == 0 {}
        write_volatile(LPUART1_DATA, byte as u32);
    }
}

impl fmt::Write for DebugConsole {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for byte in s.bytes() {
            putc(byte);
        }
        Ok(())
    }
}

impl Console for DebugConsole {
    fn read_byte(&mut self) -> u8 {
        unsafe {
            while read_volatile(LPUART1_STAT) & LPUART_STAT_RDRF == 0 {}
            read_volatile(LPUART1_DATA) as u8
        }
    }
}

pub struct BoardHw;

impl FaultHw for BoardHw {
    fn tick_arm_1ms(&mut self) {
        let reload = CORE_CLOCK_HZ / 1000 - 1;
        if reload > SYST_RELOAD_MAX {
            // Legacy behavior: an unarmable tick wedges the board.
            loop {
                asm::nop();
            }
        }
        unsafe {
            write_volatile(SYST_RVR, reload);
            write_volatile(SYST_CVR, 0);
            write_volatile(
                SYST_CSR,
                SYST_CSR_CLKSOURCE | SYST_CSR_TICKINT | SYST_CSR_ENABLE,
            );
        }
    }

    fn tick_disarm(&mut self) {
        unsafe {
            let csr = read_volatile(SYST_CSR);
            write_volatile(SYST_CSR, csr & !SYST_CSR_ENABLE);
        }
    }

    fn delay_ticks(&mut self, ticks: u32) {
        DELAY.start(ticks);
        while !DELAY.is_done() {
            asm::nop();
        }
    }

    fn set_led(&mut self, on: bool) {
        unsafe {
            if on {
                write_volatile(GPIO1_DR_SET, 1 << USER_LED_PIN);
            } else {
                write_volatile(GPIO1_DR_CLEAR, 1 << USER_LED_PIN);
            }
        }
    }

    fn wait_for_interrupt(&mut self) {
        asm::dsb();
        asm::wfi();
        asm::isb();
    }

    fn system_reset(&mut self) {
        SCB::sys_reset();
    }

    fn gate_off_test_periph(&mut self) {
        unsafe {
            let ccgr = read_volatile(CCM_CCGR0);
            write_volatile(CCM_CCGR0, ccgr & !(CCGR0_CG8_CAN1_SERIAL | CCGR0_CG7_CAN1));
        }
    }

    fn read_gated_probe_reg(&mut self) -> u32 {
        unsafe { read_volatile(CAN1_RXMGMASK) }
    }

    fn for_each_probe_reg(&mut self, visit: &mut dyn FnMut(&'static str, u32)) {
        for (name, reg) in PROBE_REGS {
            visit(name, unsafe { read_volatile(reg) });
        }
    }

    fn corrupt_flash(&mut self) {
        let base = (FLEXSPI_AMBA_BASE + FLASH_CORRUPT_OFFSET) as *mut u8;
        unsafe {
            for i in 0..FLASH_CORRUPT_LEN {
                write_volatile(base.add(i), FILL_PATTERN);
            }
        }
    }

    fn clobber_protected_region(&mut self) {
        unsafe {
            for i in 0..PROTECTED_REGION_LEN {
                write_volatile(PROTECTED_REGION.add(i), FILL_PATTERN);
            }
        }
    }
}

/// Post-resume bring-up: LED direction and the trace clock. CoreSight
/// setup itself is left to the debugger.
pub fn bring_up() {
    unsafe {
        let gdir = read_volatile(GPIO1_GDIR);
        write_volatile(GPIO1_GDIR, gdir | (1 << USER_LED_PIN));

        let ccgr = read_volatile(CCM_CCGR0);
        write_volatile(CCM_CCGR0, ccgr | CCGR0_CG11_TRACE);
    }
}

/// Permanent stop on a self-check anomaly.
pub fn halt(anomaly: FaultAnomaly) -> ! {
    use core::fmt::Write as _;
    let mut con = DebugConsole;
    let _ = write!(con, "\r\nHALT: {}\r\n", anomaly);
    loop {
        asm::nop();
    }
}
