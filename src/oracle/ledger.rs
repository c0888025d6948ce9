//! PredictionLedger - in-memory operational memory of the prediction engine
//!
//! Holds one record per target round, the set of source rounds whose trigger
//! already fired, and the append-only resolution log used for statistics.

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::oracle::types::{PredictionRecord, PredictionStatus, ResolutionLogEntry};
use crate::types::{MessageRef, RoundNumber};

#[derive(Debug, Clone, Default)]
pub struct PredictionLedger {
    records: BTreeMap<RoundNumber, PredictionRecord>,
    processed_sources: BTreeSet<RoundNumber>,
    resolution_log: Vec<ResolutionLogEntry>,
}

impl PredictionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, round_number: RoundNumber) -> Option<&PredictionRecord> {
        self.records.get(&round_number)
    }

    /// True when a record exists for this round, whatever its status
    pub fn contains(&self, round_number: RoundNumber) -> bool {
        self.records.contains_key(&round_number)
    }

    pub fn is_source_processed(&self, source_round: RoundNumber) -> bool {
        self.processed_sources.contains(&source_round)
    }

    /// Insert a new prediction created from `source_round`.
    /// Rejected (returns false, nothing changes) if the target key already exists.
    pub fn insert_prediction(
        &mut self,
        source_round: RoundNumber,
        record: PredictionRecord,
    ) -> bool {
        if self.records.contains_key(&record.round_number) {
            return false;
        }
        self.processed_sources.insert(source_round);
        self.records.insert(record.round_number, record);
        true
    }

    /// Move a Pending record into a terminal state and append it to the log.
    /// Unknown rounds, already-terminal records and non-terminal targets are no-ops.
    pub fn settle(
        &mut self,
        round_number: RoundNumber,
        outcome: PredictionStatus,
    ) -> Option<ResolutionLogEntry> {
        if outcome.is_pending() {
            return None;
        }
        let record = self.records.get_mut(&round_number)?;
        if record.status.is_terminal() {
            debug!(
                "Round {} already settled as {:?}, ignoring {:?}",
                round_number, record.status, outcome
            );
            return None;
        }
        record.status = outcome;
        let entry = ResolutionLogEntry { round_number, outcome };
        self.resolution_log.push(entry);
        Some(entry)
    }

    /// Keys of Pending records, ascending
    pub fn pending_rounds(&self) -> impl Iterator<Item = RoundNumber> + '_ {
        self.records
            .values()
            .filter(|r| r.status.is_pending())
            .map(|r| r.round_number)
    }

    pub fn pending_count(&self) -> usize {
        self.pending_rounds().count()
    }

    pub fn records(&self) -> impl Iterator<Item = &PredictionRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn resolution_log(&self) -> &[ResolutionLogEntry] {
        &self.resolution_log
    }

    pub fn attach_message_ref(
        &mut self,
        round_number: RoundNumber,
        message_ref: MessageRef,
    ) -> bool {
        match self.records.get_mut(&round_number) {
            Some(record) => {
                record.origin_message_ref = Some(message_ref);
                true
            }
            None => false,
        }
    }

    /// Restore a persisted Pending record. Terminal records and occupied keys are refused.
    pub fn restore(&mut self, record: PredictionRecord) -> bool {
        if !record.status.is_pending() || self.records.contains_key(&record.round_number) {
            return false;
        }
        self.records.insert(record.round_number, record);
        true
    }

    /// Remove a Pending record that was never published. The source round stays processed
    /// and nothing is logged. Terminal records are kept.
    pub fn withdraw(&mut self, round_number: RoundNumber) -> Option<PredictionRecord> {
        if !self.records.get(&round_number)?.status.is_pending() {
            return None;
        }
        self.records.remove(&round_number)
    }

    /// Drop records, processed sources and the log together.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::types::SuitSignature;
    use crate::types::Suit;

    fn record(round: RoundNumber) -> PredictionRecord {
        let signature = SuitSignature::from_suits(vec![Suit::Spades]).expect("non-empty");
        PredictionRecord::new(round, signature)
    }

    #[test]
    fn test_insert_rejects_existing_key() {
        let mut ledger = PredictionLedger::new();
        assert!(ledger.insert_prediction(5, record(6)));
        assert!(!ledger.insert_prediction(7, record(6)));
        assert!(!ledger.is_source_processed(7));
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_insert_rejects_key_of_settled_record() {
        let mut ledger = PredictionLedger::new();
        ledger.insert_prediction(5, record(6));
        ledger.settle(6, PredictionStatus::Expired);
        assert!(!ledger.insert_prediction(5, record(6)));
        assert_eq!(ledger.get(6).map(|r| r.status), Some(PredictionStatus::Expired));
    }

    #[test]
    fn test_settle_only_once() {
        let mut ledger = PredictionLedger::new();
        ledger.insert_prediction(5, record(6));

        let entry = ledger.settle(6, PredictionStatus::Resolved(1));
        assert_eq!(
            entry,
            Some(ResolutionLogEntry { round_number: 6, outcome: PredictionStatus::Resolved(1) })
        );
        assert_eq!(ledger.settle(6, PredictionStatus::Expired), None);
        assert_eq!(ledger.resolution_log().len(), 1);
        assert_eq!(ledger.pending_count(), 0);
    }

    #[test]
    fn test_settle_ignores_pending_target_and_unknown_round() {
        let mut ledger = PredictionLedger::new();
        ledger.insert_prediction(5, record(6));
        assert_eq!(ledger.settle(6, PredictionStatus::Pending), None);
        assert_eq!(ledger.settle(99, PredictionStatus::Expired), None);
        assert!(ledger.resolution_log().is_empty());
    }

    #[test]
    fn test_restore_only_pending() {
        let mut ledger = PredictionLedger::new();
        let mut expired = record(3);
        expired.status = PredictionStatus::Expired;
        assert!(!ledger.restore(expired));
        assert!(ledger.restore(record(4)));
        assert!(!ledger.restore(record(4)));
        assert!(ledger.resolution_log().is_empty());
        assert!(!ledger.is_source_processed(3));
    }

    #[test]
    fn test_withdraw_only_pending() {
        let mut ledger = PredictionLedger::new();
        ledger.insert_prediction(5, record(6));
        ledger.insert_prediction(6, record(7));
        ledger.settle(7, PredictionStatus::Expired);

        assert_eq!(ledger.withdraw(7), None);
        assert_eq!(ledger.withdraw(6).map(|r| r.round_number), Some(6));
        assert!(!ledger.contains(6));
        assert!(ledger.is_source_processed(5));
        assert_eq!(ledger.resolution_log().len(), 1);
        assert_eq!(ledger.withdraw(6), None);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut ledger = PredictionLedger::new();
        ledger.insert_prediction(5, record(6));
        ledger.insert_prediction(6, record(7));
        ledger.settle(6, PredictionStatus::Resolved(0));
        ledger.clear();
        assert!(ledger.is_empty());
        assert!(ledger.resolution_log().is_empty());
        assert!(!ledger.is_source_processed(5));
    }
}
