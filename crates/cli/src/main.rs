// HwFault - Hardware Failure Injection Harness
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use clap::Parser;
use std::process::ExitCode;
use std::str::FromStr;
use tracing::{error, info};

use hwf_core::ScratchStore;
use hwf_sim::{BootKind, Runner, SimBoard, SimError};

const EXIT_PASS: u8 = 0;
const EXIT_SELF_CHECK_FAIL: u8 = 1;
const EXIT_RESET_LOOP: u8 = 2;
const EXIT_RUNTIME_ERROR: u8 = 3;

fn parse_u32_word(s: &str) -> Result<u32, String> {
    let trimmed = s.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex word '{}': {}", s, e))
    } else {
        u32::from_str(trimmed).map_err(|e| format!("Invalid word '{}': {}", s, e))
    }
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "HwFault harness on the simulated board",
    long_about = None
)]
struct Cli {
    /// Key sequence to feed the menu loop, e.g. "QA" or "DDC"
    #[arg(short, long, default_value = "")]
    script: String,

    /// Boot warm (scratch register retained) instead of from power-off
    #[arg(long)]
    warm: bool,

    /// Preload the scratch register before boot (hex or decimal).
    /// Only meaningful together with --warm; a cold boot clears it.
    #[arg(long, value_parser = parse_u32_word)]
    scratch: Option<u32>,

    /// Value the bus returns for reads of the unclocked probe peripheral
    /// (nonzero trips the self-check)
    #[arg(long, value_parser = parse_u32_word, default_value = "0")]
    gated_read: u32,

    /// Maximum warm resets before the run is declared a reset loop
    #[arg(long, default_value = "8")]
    max_resets: u32,

    /// Print the final board state as JSON
    #[arg(long)]
    snapshot: bool,

    /// Enable debug-level execution tracing
    #[arg(short, long)]
    trace: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.trace {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    ExitCode::from(run(&cli))
}

fn run(cli: &Cli) -> u8 {
    let mut board = SimBoard::new();
    if let Some(raw) = cli.scratch {
        board.scratch.write(raw);
    }
    board.hw.gated_read_value = cli.gated_read;

    let mut runner = Runner::new(board);
    runner.max_warm_resets = cli.max_resets;

    let kind = if cli.warm {
        BootKind::Warm
    } else {
        BootKind::Cold
    };
    let result = runner.run_script(&cli.script, kind);

    // The transcript is what the board would have printed on its debug
    // console; it goes to stdout verbatim.
    print!("{}", runner.board.con.transcript);

    let code = match result {
        Ok(report) => {
            if let Some(anomaly) = report.halted {
                error!(%anomaly, "board halted on self-check anomaly");
                EXIT_SELF_CHECK_FAIL
            } else {
                info!(
                    dispatched = report.dispatched.len(),
                    warm_resets = report.warm_resets,
                    "session complete"
                );
                EXIT_PASS
            }
        }
        Err(SimError::ResetLoop(resets)) => {
            error!(
                resets,
                "board did not settle; a real board would reset-loop until power-off"
            );
            EXIT_RESET_LOOP
        }
    };

    if cli.snapshot {
        match serde_json::to_string_pretty(&runner.board.snapshot()) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("failed to serialize snapshot: {}", e);
                return EXIT_RUNTIME_ERROR;
            }
        }
    }

    code
}
