//! Replay a log of round messages through the prediction engine
//!
//! Usage: replay_rounds <FILE>   (reads stdin when no file is given)
//! Each line is one message. Lines still carrying a pending-edit marker or
//! lacking an outcome marker are skipped. Prints final statistics as JSON.

use anyhow::{Context, Result};
use std::io::{BufRead, BufReader};
use suit_oracle::oracle::message_gate::{has_outcome_marker, has_pending_marker};
use suit_oracle::oracle::{PredictionEngine, TriggerResult, VerifyResult};
use tracing::{debug, info, Level};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let reader: Box<dyn BufRead> = match std::env::args().nth(1) {
        Some(path) => {
            let file = std::fs::File::open(&path)
                .with_context(|| format!("Failed to open {}", path))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(std::io::stdin())),
    };

    let mut engine = PredictionEngine::new();
    let mut replayed = 0usize;

    for line in reader.lines() {
        let line = line.context("Failed to read input line")?;
        if has_pending_marker(&line) || !has_outcome_marker(&line) {
            debug!("Skipping non-finalized line: {}", line);
            continue;
        }
        let Some(outcome) = engine.process_round(&line) else {
            continue;
        };
        replayed += 1;

        if let TriggerResult::Triggered { target_round, suit_signature, .. } = &outcome.trigger {
            info!("#{} -> predict #{} {}", outcome.round_number, target_round, suit_signature);
        }
        match outcome.verification {
            VerifyResult::Resolved { round_number, offset } => {
                info!("#{} verified #{} (offset {})", outcome.round_number, round_number, offset)
            }
            VerifyResult::Expired { round_number } => {
                info!("#{} expired #{}", outcome.round_number, round_number)
            }
            VerifyResult::NoMatch => {}
        }
        for round_number in &outcome.expired {
            info!("#{} swept #{}", outcome.round_number, round_number);
        }
    }

    info!("Replayed {} rounds", replayed);
    println!("{}", serde_json::to_string_pretty(&engine.get_statistics())?);
    Ok(())
}
