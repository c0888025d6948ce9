//! PredictionEngine - single-writer facade over the ledger
//!
//! Owns the ledger exclusively. All operations are synchronous and in-memory;
//! callers that receive events concurrently must serialize access (the
//! RoundProcessor does this by draining a single queue).

use tracing::{debug, info, instrument};

use crate::oracle::ledger::PredictionLedger;
use crate::oracle::parser::{extract_groups, extract_round_number};
use crate::oracle::statistics::compute_statistics;
use crate::oracle::trigger::TriggerEvaluator;
use crate::oracle::types::{PredictionRecord, Statistics, TriggerResult, VerifyResult};
use crate::oracle::verification::VerificationEngine;
use crate::types::{MessageRef, RoundNumber};

/// Everything one finalized message changed.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    pub round_number: RoundNumber,
    pub trigger: TriggerResult,
    pub verification: VerifyResult,
    /// Keys expired by the housekeeping sweep
    pub expired: Vec<RoundNumber>,
}

#[derive(Debug, Default)]
pub struct PredictionEngine {
    ledger: PredictionLedger,
    trigger: TriggerEvaluator,
    verifier: VerificationEngine,
}

impl PredictionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the trigger gate for `round_number`, creating a prediction for the next round
    /// on success.
    pub fn evaluate_trigger(
        &mut self,
        round_number: RoundNumber,
        groups: &[String],
    ) -> TriggerResult {
        self.trigger.evaluate(&mut self.ledger, round_number, groups)
    }

    /// Resolve (or expire) at most one pending prediction using a result message.
    pub fn verify_result(&mut self, round_number: RoundNumber, groups: &[String]) -> VerifyResult {
        self.verifier.verify(&mut self.ledger, round_number, groups)
    }

    /// Expire every pending prediction whose window `current_round` has passed.
    pub fn expire_stale(&mut self, current_round: RoundNumber) -> Vec<RoundNumber> {
        self.verifier.expire_stale(&mut self.ledger, current_round)
    }

    pub fn get_statistics(&self) -> Statistics {
        compute_statistics(&self.ledger)
    }

    /// Clear the ledger, processed sources and resolution log.
    pub fn reset(&mut self) {
        self.ledger.clear();
        info!("Prediction state reset");
    }

    /// Parse a finalized message and run trigger, verification and the stale sweep in order.
    /// Returns None when the text carries no round number.
    #[instrument(skip(self, text))]
    pub fn process_round(&mut self, text: &str) -> Option<RoundOutcome> {
        let Some(round_number) = extract_round_number(text) else {
            debug!("No round number in message, skipping");
            return None;
        };
        let groups = extract_groups(text);

        let trigger = self.evaluate_trigger(round_number, &groups);
        let verification = self.verify_result(round_number, &groups);
        let expired = self.expire_stale(round_number);

        Some(RoundOutcome {
            round_number,
            trigger,
            verification,
            expired,
        })
    }

    /// Remember which message announced the prediction for `round_number`.
    pub fn attach_message_ref(
        &mut self,
        round_number: RoundNumber,
        message_ref: MessageRef,
    ) -> bool {
        self.ledger.attach_message_ref(round_number, message_ref)
    }

    /// Take back a prediction the caller could not publish. Only Pending records are removed.
    pub fn withdraw(&mut self, round_number: RoundNumber) -> Option<PredictionRecord> {
        let withdrawn = self.ledger.withdraw(round_number);
        if withdrawn.is_some() {
            info!("Prediction for round {} withdrawn", round_number);
        }
        withdrawn
    }

    pub fn message_ref(&self, round_number: RoundNumber) -> Option<MessageRef> {
        self.ledger.get(round_number).and_then(|r| r.origin_message_ref)
    }

    pub fn prediction(&self, round_number: RoundNumber) -> Option<&PredictionRecord> {
        self.ledger.get(round_number)
    }

    pub fn ledger(&self) -> &PredictionLedger {
        &self.ledger
    }

    /// Load persisted pending predictions; returns how many were accepted.
    pub fn restore_pending<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = PredictionRecord>,
    {
        let mut restored = 0;
        for record in records {
            if self.ledger.restore(record) {
                restored += 1;
            }
        }
        info!("Restored {} pending predictions", restored);
        restored
    }
}
