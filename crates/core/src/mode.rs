// HwFault - Hardware Failure Injection Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

/// The closed set of failure modes the harness can provoke.
///
/// Codes are contiguous from zero so that a console letter maps to a mode
/// as `key - b'A'`. Adding a variant extends the menu and the resume
/// protocol in one place; every `match` on this enum is exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FailureMode {
    /// Liveness check: toggles the user LED, provokes nothing.
    LedBlinky = 0,
    /// Parks the CPU in wait-for-interrupt until something wakes it.
    CpuWfi = 1,
    /// Software-triggered warm reset of the whole system.
    SystemReset = 2,
    /// Register read on a clock-gated peripheral (expected bus fault).
    PeriphRegAccess = 3,
    /// Bulk overwrite of execute-in-place flash without an erase.
    FlashMemset = 4,
    /// Bulk overwrite of an MPU-protected RAM region.
    MpuRegionAccess = 5,
}

/// Raw byte that did not map to any failure mode. Never fatal: callers
/// ignore it and keep waiting for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidMode(pub u8);

impl FailureMode {
    /// All modes, in menu and code order.
    pub const ALL: [FailureMode; 6] = [
        FailureMode::LedBlinky,
        FailureMode::CpuWfi,
        FailureMode::SystemReset,
        FailureMode::PeriphRegAccess,
        FailureMode::FlashMemset,
        FailureMode::MpuRegionAccess,
    ];

    /// Highest valid mode code.
    pub const MAX_CODE: u32 = FailureMode::MpuRegionAccess as u32;

    pub fn code(self) -> u32 {
        self as u32
    }

    pub fn from_code(code: u32) -> Option<FailureMode> {
        FailureMode::ALL.get(code as usize).copied()
    }

    /// Console letter that selects this mode.
    pub fn command_key(self) -> u8 {
        b'A' + self.code() as u8
    }

    /// Validates a raw console byte. Lowercase letters are folded to
    /// uppercase before mapping; anything outside `A..=A + MAX_CODE`
    /// is rejected.
    pub fn from_key(raw: u8) -> Result<FailureMode, InvalidMode> {
        let key = raw.to_ascii_uppercase();
        if !(b'A'..=b'A' + FailureMode::MAX_CODE as u8).contains(&key) {
            return Err(InvalidMode(raw));
        }
        FailureMode::from_code((key - b'A') as u32).ok_or(InvalidMode(raw))
    }

    /// Menu wording for this mode.
    pub fn describe(self) -> &'static str {
        match self {
            FailureMode::LedBlinky => "LED blinky mode",
            FailureMode::CpuWfi => "CPU WFI mode",
            FailureMode::SystemReset => "System soft reset mode",
            FailureMode::PeriphRegAccess => "Peripheral register access without clocking mode",
            FailureMode::FlashMemset => "Flash access via memset mode",
            FailureMode::MpuRegionAccess => "MPU region access without permission mode",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn letters_map_to_contiguous_codes() {
        for (i, mode) in FailureMode::ALL.iter().enumerate() {
            assert_eq!(mode.code(), i as u32);
            assert_eq!(mode.command_key(), b'A' + i as u8);
            assert_eq!(FailureMode::from_code(i as u32), Some(*mode));
        }
        assert_eq!(FailureMode::MAX_CODE, 5);
    }

    #[test]
    fn from_key_accepts_exactly_the_menu_letters() {
        for c in 0u8..=255 {
            let folded = c.to_ascii_uppercase();
            let expected = if (b'A'..=b'F').contains(&folded) {
                Ok(FailureMode::from_code((folded - b'A') as u32).unwrap())
            } else {
                Err(InvalidMode(c))
            };
            assert_eq!(FailureMode::from_key(c), expected, "byte {:#x}", c);
        }
    }

    #[test]
    fn from_key_folds_case() {
        assert_eq!(FailureMode::from_key(b'a'), Ok(FailureMode::LedBlinky));
        assert_eq!(FailureMode::from_key(b'f'), Ok(FailureMode::MpuRegionAccess));
        assert_eq!(FailureMode::from_key(b'D'), Ok(FailureMode::PeriphRegAccess));
    }

    #[test]
    fn from_key_is_idempotent() {
        // Same input, same answer, no hidden state.
        assert_eq!(FailureMode::from_key(b'Q'), FailureMode::from_key(b'Q'));
        assert_eq!(FailureMode::from_key(b'c'), FailureMode::from_key(b'c'));
    }

    #[test]
    fn out_of_range_codes_are_rejected() {
        assert_eq!(FailureMode::from_code(6), None);
        assert_eq!(FailureMode::from_code(u32::MAX), None);
        assert_eq!(FailureMode::from_key(b'G'), Err(InvalidMode(b'G')));
        assert_eq!(FailureMode::from_key(b'1'), Err(InvalidMode(b'1')));
        assert_eq!(FailureMode::from_key(b'@'), Err(InvalidMode(b'@')));
    }
}
