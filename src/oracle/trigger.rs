//! Trigger evaluator - decides whether a round issues a prediction for the next one
//!
//! Gate: no jack in group 1 and exactly one jack in group 2. The signature is
//! the normalized suit set of group 1. State only changes on the success path.

use tracing::debug;

use crate::oracle::ledger::PredictionLedger;
use crate::oracle::parser::{count_jacks, suit_signature};
use crate::oracle::types::{PredictionRecord, TriggerResult, TriggerSkip};
use crate::types::RoundNumber;

#[derive(Debug, Clone, Copy, Default)]
pub struct TriggerEvaluator;

impl TriggerEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        ledger: &mut PredictionLedger,
        round_number: RoundNumber,
        groups: &[String],
    ) -> TriggerResult {
        let result = Self::check(ledger, round_number, groups);
        match &result {
            TriggerResult::Triggered { source_round, target_round, suit_signature } => {
                let record = PredictionRecord::new(*target_round, suit_signature.clone());
                let inserted = ledger.insert_prediction(*source_round, record);
                debug_assert!(inserted, "target round checked free before insert");
                debug!(
                    "Round {} triggered a prediction for round {}: {}",
                    source_round, target_round, suit_signature
                );
            }
            TriggerResult::NoTrigger(reason) => {
                debug!("Round {} did not trigger: {:?}", round_number, reason);
            }
        }
        result
    }

    /// Read-only part of the evaluation
    fn check(
        ledger: &PredictionLedger,
        round_number: RoundNumber,
        groups: &[String],
    ) -> TriggerResult {
        let (first, second) = match groups {
            [first, second, ..] => (first, second),
            _ => return TriggerResult::NoTrigger(TriggerSkip::TooFewGroups),
        };

        if count_jacks(first) != 0 || count_jacks(second) != 1 {
            return TriggerResult::NoTrigger(TriggerSkip::JackGate);
        }

        let target_round = match round_number.checked_add(1) {
            Some(target) => target,
            None => return TriggerResult::NoTrigger(TriggerSkip::RoundOverflow),
        };

        if ledger.contains(target_round) {
            return TriggerResult::NoTrigger(TriggerSkip::DuplicateTarget);
        }
        if ledger.is_source_processed(round_number) {
            return TriggerResult::NoTrigger(TriggerSkip::DuplicateSource);
        }

        match suit_signature(first) {
            Some(suit_signature) => TriggerResult::Triggered {
                source_round: round_number,
                target_round,
                suit_signature,
            },
            None => TriggerResult::NoTrigger(TriggerSkip::EmptySignature),
        }
    }
}
