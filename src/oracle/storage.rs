//! Storage abstraction for prediction persistence
//!
//! The engine never touches storage itself. The RoundProcessor mirrors ledger
//! changes through this contract and restores pending predictions at startup.

use anyhow::Result;
use async_trait::async_trait;

use crate::oracle::types::{PredictionRecord, PredictionStatus};
use crate::types::{MessageRef, RoundNumber};

/// Formal contract for persistent prediction memory.
#[async_trait]
pub trait PredictionStorage: Send + Sync {
    /// Saves a newly issued prediction.
    /// Returns false and leaves the stored row untouched when the round already has one.
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<bool>;

    /// Moves a stored Pending prediction to `status`. Settled rows are never changed.
    async fn update_status(
        &self,
        round_number: RoundNumber,
        status: PredictionStatus,
    ) -> Result<()>;

    /// Stores the message that announced a prediction.
    async fn attach_message_ref(
        &self,
        round_number: RoundNumber,
        message_ref: MessageRef,
    ) -> Result<()>;

    /// Retrieves every prediction still Pending, ordered by round number.
    async fn load_pending(&self) -> Result<Vec<PredictionRecord>>;

    /// Removes all stored predictions.
    async fn clear(&self) -> Result<()>;

    /// Gets the total count of stored predictions.
    async fn record_count(&self) -> Result<i64>;

    /// Remembers a processed message hash, keeping only the `keep` most recent ones.
    async fn mark_message_processed(&self, hash: &str, keep: u64) -> Result<()>;

    /// The `limit` most recently processed message hashes, newest first.
    async fn load_processed_hashes(&self, limit: u64) -> Result<Vec<String>>;

    /// Health check for the storage backend.
    async fn health_check(&self) -> Result<bool>;
}
