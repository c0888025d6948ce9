//! Statistics view over the resolution log

use crate::oracle::ledger::PredictionLedger;
use crate::oracle::types::{PredictionStatus, ResolutionLogEntry, Statistics};

/// Derive aggregate counters from the ledger's resolution log and pending records.
pub fn compute_statistics(ledger: &PredictionLedger) -> Statistics {
    let mut stats = summarize_log(ledger.resolution_log());
    stats.pending = ledger.pending_count();
    stats
}

/// Win/loss counters of a resolution log; `pending` is left at zero.
pub fn summarize_log(log: &[ResolutionLogEntry]) -> Statistics {
    let total = log.len();
    let wins = log
        .iter()
        .filter(|e| matches!(e.outcome, PredictionStatus::Resolved(_)))
        .count();
    let losses = log
        .iter()
        .filter(|e| matches!(e.outcome, PredictionStatus::Expired))
        .count();

    let win_rate = if total > 0 {
        (wins as f64 / total as f64) * 100.0
    } else {
        0.0
    };

    Statistics {
        total,
        wins,
        losses,
        pending: 0,
        win_rate,
    }
}
