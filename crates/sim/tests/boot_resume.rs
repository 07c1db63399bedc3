// HwFault - Hardware Failure Injection Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! The persistence-and-resume protocol, end to end on the simulated
//! board: what the boot sequencer does with whatever the scratch
//! register holds.

use hwf_core::{encode_intent, FailureMode, FaultAnomaly};
use hwf_sim::{BootKind, HwEvent, Runner, ScratchReg, SimBoard};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

fn board_with_scratch(raw: u32) -> SimBoard {
    let mut board = SimBoard::new();
    board.scratch = ScratchReg::preload(raw);
    board
}

#[test]
fn periph_resume_probes_before_bring_up() -> anyhow::Result<()> {
    init_tracing();
    let board = board_with_scratch(encode_intent(FailureMode::PeriphRegAccess));
    let mut runner = Runner::new(board);

    let report = runner.boot(BootKind::Warm)?;

    assert_eq!(report.boots.len(), 1);
    assert_eq!(report.boots[0].resumed, Some(FailureMode::PeriphRegAccess));
    assert!(report.halted.is_none());

    // The guarded read must happen before any bring-up: the whole point
    // of resuming first is probing the pre-bring-up clock state.
    let events = &runner.board.hw.events;
    let probe_at = events
        .iter()
        .position(|e| matches!(e, HwEvent::GatedProbeRead { .. }))
        .expect("resume must attempt the guarded read");
    let bring_up_at = events
        .iter()
        .position(|e| *e == HwEvent::BringUp)
        .expect("boot must finish bring-up");
    assert!(probe_at < bring_up_at);

    // The diagnostic dump ran against the unclocked peripheral.
    assert!(runner.board.con.transcript.contains("CAN1->MCR = 0"));
    assert!(runner.board.con.transcript.contains("CAN1->RX15MASK = 0"));
    Ok(())
}

#[test]
fn garbage_scratch_word_boots_straight_to_the_menu() -> anyhow::Result<()> {
    init_tracing();
    for raw in [0xFFFF_FFFFu32, FailureMode::MAX_CODE + 2] {
        let board = board_with_scratch(raw);
        let mut runner = Runner::new(board);

        let report = runner.boot(BootKind::Warm)?;

        assert_eq!(report.boots[0].resumed, None, "raw {:#x}", raw);
        assert_eq!(report.warm_resets, 0);
        assert_eq!(runner.board.hw.events, [HwEvent::BringUp]);
        assert!(runner
            .board
            .con
            .transcript
            .contains("Waiting for HW failure case select..."));
    }
    Ok(())
}

#[test]
fn cold_boot_forgets_the_persisted_intent() -> anyhow::Result<()> {
    init_tracing();
    // SystemReset left in the register would reset-loop on a warm boot;
    // a cold power-up must clear it and come up normally.
    let board = board_with_scratch(encode_intent(FailureMode::SystemReset));
    let mut runner = Runner::new(board);

    let report = runner.boot(BootKind::Cold)?;

    assert_eq!(report.boots[0].resumed, None);
    assert_eq!(report.warm_resets, 0);
    assert!(report.halted.is_none());
    Ok(())
}

#[test]
fn tolerated_gated_read_halts_the_board_during_resume() -> anyhow::Result<()> {
    init_tracing();
    let mut board = board_with_scratch(encode_intent(FailureMode::PeriphRegAccess));
    board.hw.gated_read_value = 0x1234_5678;
    let mut runner = Runner::new(board);

    let report = runner.boot(BootKind::Warm)?;

    assert_eq!(
        report.halted,
        Some(FaultAnomaly::GatedReadSucceeded { value: 0x1234_5678 })
    );
    // The halt preempts bring-up entirely.
    assert!(!runner.board.hw.events.contains(&HwEvent::BringUp));
    Ok(())
}

#[test]
fn board_snapshot_captures_the_three_sub_blocks() -> anyhow::Result<()> {
    init_tracing();
    let mut runner = Runner::new(SimBoard::new());
    let _ = runner.boot(BootKind::Cold)?;

    let snapshot = runner.board.snapshot();
    assert!(snapshot.get("scratch").is_some());
    assert!(snapshot.get("hw").is_some());
    assert!(snapshot.get("con").is_some());
    Ok(())
}
