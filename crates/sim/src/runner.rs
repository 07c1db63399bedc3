// HwFault - Hardware Failure Injection Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use core::fmt::Write as _;

use hwf_core::{decode_intent, FailureMode, FaultAnomaly, Harness, ScratchStore};
use tracing::{debug, info};

use crate::board::{HwEvent, SimBoard};

/// Whether a boot starts from power-off (scratch register cleared) or
/// from a warm reset (scratch register retained).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootKind {
    Cold,
    Warm,
}

/// One boot of the simulated board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootRecord {
    pub kind: BootKind,
    /// Mode the resume sequencer found in the scratch store, if any.
    pub resumed: Option<FailureMode>,
}

/// Everything a scripted session did.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub boots: Vec<BootRecord>,
    /// Modes actually dispatched from keypresses, in order.
    pub dispatched: Vec<FailureMode>,
    pub warm_resets: u32,
    /// Set when a self-check anomaly permanently halted the board.
    pub halted: Option<FaultAnomaly>,
}

#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The board kept faulting or resetting on every boot; a real board
    /// would warm-reset forever until someone pulls the power.
    #[error("board did not settle after {0} warm resets")]
    ResetLoop(u32),
}

/// Drives the harness over the simulated board: boots it (running the
/// resume sequencer exactly as firmware would, before bring-up), feeds
/// scripted keypresses, and turns every latched fault or reset request
/// into the warm-reset cycle a real board would go through.
pub struct Runner {
    pub board: SimBoard,
    /// Budget on consecutive warm resets before the run is declared a
    /// reset loop instead of spinning forever.
    pub max_warm_resets: u32,
}

impl Runner {
    pub fn new(board: SimBoard) -> Self {
        Runner {
            board,
            max_warm_resets: 8,
        }
    }

    /// Runs one full scripted session: first boot, then one keypress per
    /// script byte, cycling warm resets whenever a handler disrupts the
    /// board. Stops early if an anomaly halts the board.
    pub fn run_script(&mut self, keys: &str, first: BootKind) -> Result<RunReport, SimError> {
        let mut report = RunReport::default();
        self.boot_until_settled(first, &mut report)?;

        self.board.con.push_keys(keys);
        while let Some(key) = self.board.con.pop_key() {
            if report.halted.is_some() {
                break;
            }
            self.press(key, &mut report)?;
        }
        Ok(report)
    }

    /// Boots with no script: useful for resume-protocol tests.
    pub fn boot(&mut self, kind: BootKind) -> Result<RunReport, SimError> {
        self.run_script("", kind)
    }

    /// One keypress against a booted board, including any reset cycle it
    /// causes.
    pub fn press(&mut self, key: u8, report: &mut RunReport) -> Result<(), SimError> {
        debug!(key = %(key as char), "keypress");
        let result = {
            let mut harness = Harness::new(
                &mut self.board.scratch,
                &mut self.board.hw,
                &mut self.board.con,
            );
            harness.handle_key(key)
        };

        match result {
            None => {
                let _ = self.board.con.write_str("\r\nNext loop\r\n");
            }
            Some(Err(anomaly)) => {
                info!(%anomaly, "self-check anomaly, board halted");
                report.halted = Some(anomaly);
            }
            Some(Ok(outcome)) => {
                if let Ok(mode) = FailureMode::from_key(key) {
                    report.dispatched.push(mode);
                }
                debug!(?outcome, "handler returned");
                if self.take_disruption() {
                    self.cycle_warm_resets(report)?;
                } else {
                    let _ = self.board.con.write_str("\r\nNext loop\r\n");
                }
            }
        }
        Ok(())
    }

    /// Boots the board until a boot completes without faulting or
    /// requesting another reset, or the reset budget runs out.
    fn boot_until_settled(
        &mut self,
        first: BootKind,
        report: &mut RunReport,
    ) -> Result<(), SimError> {
        self.boot_once(first, report);
        if report.halted.is_some() {
            return Ok(());
        }
        if self.take_disruption() {
            self.cycle_warm_resets(report)?;
        }
        Ok(())
    }

    fn cycle_warm_resets(&mut self, report: &mut RunReport) -> Result<(), SimError> {
        loop {
            report.warm_resets += 1;
            if report.warm_resets > self.max_warm_resets {
                return Err(SimError::ResetLoop(report.warm_resets));
            }
            self.boot_once(BootKind::Warm, report);
            if report.halted.is_some() {
                return Ok(());
            }
            if !self.take_disruption() {
                return Ok(());
            }
        }
    }

    /// One boot: reset the board state, run the resume sequencer before
    /// anything else, and only if the board survives that, bring it up
    /// and print the menu.
    fn boot_once(&mut self, kind: BootKind, report: &mut RunReport) {
        match kind {
            BootKind::Cold => self.board.cold_boot(),
            BootKind::Warm => self.board.warm_reset(),
        }

        let resumed = decode_intent(self.board.scratch.read());
        report.boots.push(BootRecord { kind, resumed });
        if let Some(mode) = resumed {
            info!(?mode, ?kind, "resuming in-flight failure mode");
        } else {
            debug!(?kind, "no test in flight");
        }

        let result = {
            let mut harness = Harness::new(
                &mut self.board.scratch,
                &mut self.board.hw,
                &mut self.board.con,
            );
            harness.resume_after_reset()
        };

        if let Some(Err(anomaly)) = result {
            info!(%anomaly, "self-check anomaly during resume, board halted");
            report.halted = Some(anomaly);
            return;
        }
        if self.board.hw.has_disruption() {
            // The fault or reset preempts bring-up; the cycle loop
            // delivers the warm reset.
            return;
        }

        self.board.hw.events.push(HwEvent::BringUp);
        let mut harness = Harness::new(
            &mut self.board.scratch,
            &mut self.board.hw,
            &mut self.board.con,
        );
        harness.print_menu();
    }

    fn take_disruption(&mut self) -> bool {
        let faulted = self.board.hw.take_fault().is_some();
        let reset = std::mem::take(&mut self.board.hw.reset_requested);
        faulted || reset
    }
}
