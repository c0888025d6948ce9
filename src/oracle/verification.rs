//! Verification engine - resolves or expires pending predictions
//!
//! A result message qualifies when its second group shows exactly three suit
//! glyphs. It then resolves the Pending record at the smallest offset 0..=3
//! behind its round, or failing that expires one record already outside the
//! window.

use tracing::{debug, info};

use crate::oracle::ledger::PredictionLedger;
use crate::oracle::parser::count_suit_symbols;
use crate::oracle::types::{PredictionStatus, VerifyResult};
use crate::types::RoundNumber;

/// Largest distance between a predicted round and the round that verifies it
pub const LOOKAHEAD_WINDOW: u8 = 3;

/// Suit glyph total in group 2 that marks a result message
pub const RESOLUTION_SUIT_TOTAL: usize = 3;

/// True once `current_round` has moved past the lookahead window of `key`.
pub fn is_stale(key: RoundNumber, current_round: RoundNumber) -> bool {
    u64::from(current_round) > u64::from(key) + u64::from(LOOKAHEAD_WINDOW)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct VerificationEngine;

impl VerificationEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn verify(
        &self,
        ledger: &mut PredictionLedger,
        round_number: RoundNumber,
        groups: &[String],
    ) -> VerifyResult {
        let Some(result_group) = groups.get(1) else {
            return VerifyResult::NoMatch;
        };

        let total = count_suit_symbols(result_group).total();
        if total != RESOLUTION_SUIT_TOTAL {
            debug!("Round {} has {} suits in group 2, not a result", round_number, total);
            return VerifyResult::NoMatch;
        }

        for offset in 0..=LOOKAHEAD_WINDOW {
            let Some(candidate) = round_number.checked_sub(RoundNumber::from(offset)) else {
                break;
            };
            if ledger.settle(candidate, PredictionStatus::Resolved(offset)).is_some() {
                info!(
                    "Prediction for round {} verified by round {} (offset {})",
                    candidate, round_number, offset
                );
                return VerifyResult::Resolved { round_number: candidate, offset };
            }
        }

        // Smallest stale key first
        let stale = ledger.pending_rounds().find(|key| is_stale(*key, round_number));
        if let Some(key) = stale {
            if ledger.settle(key, PredictionStatus::Expired).is_some() {
                info!("Prediction for round {} expired at round {}", key, round_number);
                return VerifyResult::Expired { round_number: key };
            }
        }

        VerifyResult::NoMatch
    }

    /// Expire every Pending record whose window `current_round` has passed.
    /// Returns the expired keys, ascending. Records already terminal are skipped.
    pub fn expire_stale(
        &self,
        ledger: &mut PredictionLedger,
        current_round: RoundNumber,
    ) -> Vec<RoundNumber> {
        let stale: Vec<RoundNumber> = ledger
            .pending_rounds()
            .filter(|key| is_stale(*key, current_round))
            .collect();

        stale
            .into_iter()
            .filter(|key| ledger.settle(*key, PredictionStatus::Expired).is_some())
            .inspect(|key| info!("Prediction for round {} expired at sweep {}", key, current_round))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::types::{PredictionRecord, SuitSignature};
    use crate::types::Suit;

    fn ledger_with(rounds: &[RoundNumber]) -> PredictionLedger {
        let mut ledger = PredictionLedger::new();
        for round in rounds {
            let signature = SuitSignature::from_suits(vec![Suit::Hearts]).expect("non-empty");
            ledger.insert_prediction(round - 1, PredictionRecord::new(*round, signature));
        }
        ledger
    }

    fn result_groups() -> Vec<String> {
        vec!["K♠".to_string(), "♠♥♦".to_string()]
    }

    #[test]
    fn test_requires_three_suits_in_second_group() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[6]);
        let groups = vec!["♠".to_string(), "♠♥".to_string()];
        assert_eq!(engine.verify(&mut ledger, 6, &groups), VerifyResult::NoMatch);
        let groups = vec!["♠".to_string(), "♠♥♦♣".to_string()];
        assert_eq!(engine.verify(&mut ledger, 6, &groups), VerifyResult::NoMatch);
        assert_eq!(engine.verify(&mut ledger, 6, &["♠♥♦".to_string()]), VerifyResult::NoMatch);
        assert_eq!(ledger.pending_count(), 1);
    }

    #[test]
    fn test_emoji_forms_count_once() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[6]);
        let groups = vec!["♠".to_string(), "♠\u{FE0F}♥\u{FE0F}♦".to_string()];
        assert_eq!(
            engine.verify(&mut ledger, 6, &groups),
            VerifyResult::Resolved { round_number: 6, offset: 0 }
        );
    }

    #[test]
    fn test_exact_round_takes_priority() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[8, 9, 10]);
        assert_eq!(
            engine.verify(&mut ledger, 10, &result_groups()),
            VerifyResult::Resolved { round_number: 10, offset: 0 }
        );
        assert_eq!(ledger.pending_count(), 2);
    }

    #[test]
    fn test_resolves_at_window_edge() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[6]);
        assert_eq!(
            engine.verify(&mut ledger, 9, &result_groups()),
            VerifyResult::Resolved { round_number: 6, offset: 3 }
        );
    }

    #[test]
    fn test_expires_outside_window() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[6]);
        assert_eq!(
            engine.verify(&mut ledger, 10, &result_groups()),
            VerifyResult::Expired { round_number: 6 }
        );
        assert_eq!(ledger.get(6).map(|r| r.status), Some(PredictionStatus::Expired));
        assert_eq!(ledger.resolution_log().len(), 1);
    }

    #[test]
    fn test_expires_smallest_stale_key_first() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[3, 5, 20]);
        assert_eq!(
            engine.verify(&mut ledger, 15, &result_groups()),
            VerifyResult::Expired { round_number: 3 }
        );
        assert_eq!(
            engine.verify(&mut ledger, 15, &result_groups()),
            VerifyResult::Expired { round_number: 5 }
        );
        assert_eq!(engine.verify(&mut ledger, 15, &result_groups()), VerifyResult::NoMatch);
        assert_eq!(ledger.pending_count(), 1);
    }

    #[test]
    fn test_settled_records_do_not_match() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[6]);
        engine.verify(&mut ledger, 6, &result_groups());
        assert_eq!(engine.verify(&mut ledger, 6, &result_groups()), VerifyResult::NoMatch);
        assert_eq!(ledger.resolution_log().len(), 1);
    }

    #[test]
    fn test_low_round_numbers_do_not_underflow() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[1]);
        assert_eq!(
            engine.verify(&mut ledger, 2, &result_groups()),
            VerifyResult::Resolved { round_number: 1, offset: 1 }
        );
        assert_eq!(engine.verify(&mut ledger, 0, &result_groups()), VerifyResult::NoMatch);
    }

    #[test]
    fn test_expire_stale_sweeps_all_and_is_idempotent() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[3, 5, 9]);
        assert_eq!(engine.expire_stale(&mut ledger, 9), vec![3, 5]);
        assert_eq!(engine.expire_stale(&mut ledger, 9), Vec::<RoundNumber>::new());
        assert_eq!(ledger.resolution_log().len(), 2);
        assert_eq!(ledger.pending_count(), 1);
    }

    #[test]
    fn test_sweep_after_verify_expiry_is_noop() {
        let engine = VerificationEngine::new();
        let mut ledger = ledger_with(&[6]);
        assert_eq!(
            engine.verify(&mut ledger, 10, &result_groups()),
            VerifyResult::Expired { round_number: 6 }
        );
        assert!(engine.expire_stale(&mut ledger, 10).is_empty());
        assert_eq!(ledger.resolution_log().len(), 1);
    }

    #[test]
    fn test_is_stale_boundary() {
        assert!(!is_stale(6, 9));
        assert!(is_stale(6, 10));
        assert!(!is_stale(RoundNumber::MAX, RoundNumber::MAX));
    }
}
