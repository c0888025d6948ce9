//! Oracle module - round prediction engine and the service around it
//!
//! The engine (parser, trigger, ledger, verification, statistics) is pure and
//! synchronous. The RoundProcessor wraps it as a single-consumer tokio task with
//! message gating, a suit counter and SQLite persistence.

pub mod types;
pub mod parser;
pub mod ledger;
pub mod trigger;
pub mod verification;
pub mod statistics;
pub mod prediction_engine;
pub mod card_counter;
pub mod message_gate;
pub mod storage;
pub mod sqlite_ledger;
pub mod round_processor;
pub mod bilan_scheduler;

// Re-export main types
pub use types::{
    PredictionRecord, PredictionStatus, SuitSignature, ResolutionLogEntry,
    TriggerResult, TriggerSkip, VerifyResult, Statistics, OracleConfig,
    IncomingMessage, FinalizedMessage, RoundEvent, OracleNotification,
    RoundEventSender, RoundEventReceiver, NotificationSender, NotificationReceiver,
};

// Re-export key components
pub use ledger::PredictionLedger;
pub use prediction_engine::{PredictionEngine, RoundOutcome};
pub use card_counter::SuitCounter;
pub use message_gate::MessageGate;
pub use storage::PredictionStorage;
pub use sqlite_ledger::SqliteLedger;
pub use round_processor::RoundProcessor;
pub use bilan_scheduler::BilanScheduler;

/// Builder for the service configuration with sensible defaults.
pub struct OracleBuilder {
    config: OracleConfig,
    config_path: Option<std::path::PathBuf>,
}

impl OracleBuilder {
    /// Create a new builder with default configuration.
    pub fn new() -> Self {
        Self {
            config: OracleConfig::default(),
            config_path: None,
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: OracleConfig) -> Self {
        Self {
            config,
            config_path: None,
        }
    }

    /// Set the sqlx database URL.
    pub fn with_database_url(mut self, url: impl Into<String>) -> Self {
        self.config.database_url = url.into();
        self
    }

    /// Only accept messages from this channel.
    pub fn with_source_channel(mut self, channel_id: i64) -> Self {
        self.config.source_channel_id = Some(channel_id);
        self
    }

    /// Set the channel notifications are displayed in.
    pub fn with_display_channel(mut self, channel_id: i64) -> Self {
        self.config.display_channel_id = Some(channel_id);
        self
    }

    /// Set the automatic summary interval in minutes.
    pub fn with_bilan_interval(mut self, minutes: u64) -> Self {
        self.config.bilan_interval_minutes = minutes;
        self
    }

    /// Set how many processed message hashes are remembered.
    pub fn with_dedup_capacity(mut self, capacity: u64) -> Self {
        self.config.dedup_capacity = capacity;
        self
    }

    /// Set the capacity of the event and notification channels.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.queue_capacity = capacity;
        self
    }

    /// Save runtime configuration changes to this file.
    pub fn with_config_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Build the configuration.
    pub fn build_config(self) -> OracleConfig {
        self.config
    }

    /// Build a RoundProcessor wired to the given channels.
    pub fn build(
        self,
        storage: Option<std::sync::Arc<dyn PredictionStorage>>,
        event_receiver: RoundEventReceiver,
        notification_sender: NotificationSender,
    ) -> RoundProcessor {
        let processor =
            RoundProcessor::new(&self.config, storage, event_receiver, notification_sender);
        match self.config_path {
            Some(path) => processor.with_config_path(path),
            None => processor,
        }
    }
}

impl Default for OracleBuilder {
    fn default() -> Self {
        Self::new()
    }
}
