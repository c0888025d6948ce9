//! RoundProcessor - the single consumer that serializes all engine access
//!
//! Drains one event queue, so trigger and verification always observe each
//! other's effects in arrival order. Ledger changes are mirrored to storage
//! and announced on the notification channel.

use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, instrument, warn};

use crate::oracle::bilan_scheduler::{bilan_period, clamp_interval_minutes};
use crate::oracle::card_counter::SuitCounter;
use crate::oracle::message_gate::MessageGate;
use crate::oracle::prediction_engine::{PredictionEngine, RoundOutcome};
use crate::oracle::storage::PredictionStorage;
use crate::oracle::types::{
    FinalizedMessage, NotificationSender, OracleConfig, OracleNotification, PredictionRecord,
    PredictionStatus, RoundEvent, RoundEventReceiver, TriggerResult, VerifyResult,
};
use crate::types::{MessageRef, RoundNumber};

pub struct RoundProcessor {
    engine: PredictionEngine,
    gate: MessageGate,
    counter: SuitCounter,
    config: OracleConfig,
    config_path: Option<PathBuf>,
    period_sender: watch::Sender<Duration>,
    storage: Option<Arc<dyn PredictionStorage>>,
    event_receiver: RoundEventReceiver,
    notification_sender: NotificationSender,
}

impl RoundProcessor {
    /// Create a new RoundProcessor. Without storage, predictions live in memory only.
    pub fn new(
        config: &OracleConfig,
        storage: Option<Arc<dyn PredictionStorage>>,
        event_receiver: RoundEventReceiver,
        notification_sender: NotificationSender,
    ) -> Self {
        let (period_sender, _) = watch::channel(bilan_period(config.bilan_interval_minutes));
        Self {
            engine: PredictionEngine::new(),
            gate: MessageGate::new(config.source_channel_id, config.dedup_capacity),
            counter: SuitCounter::new(),
            config: config.clone(),
            config_path: None,
            period_sender,
            storage,
            event_receiver,
            notification_sender,
        }
    }

    /// Save the configuration to `path` whenever a channel or the interval changes.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    /// Summary period updates for a BilanScheduler.
    pub fn subscribe_bilan_period(&self) -> watch::Receiver<Duration> {
        self.period_sender.subscribe()
    }

    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    /// Load pending predictions and processed message hashes from storage.
    /// Returns the number of restored predictions.
    pub async fn restore(&mut self) -> Result<usize> {
        let Some(storage) = &self.storage else {
            return Ok(0);
        };
        let hashes = storage.load_processed_hashes(self.config.dedup_capacity).await?;
        info!("Restored {} processed message hashes", hashes.len());
        self.gate.seed_processed(hashes).await;

        let pending = storage.load_pending().await?;
        Ok(self.engine.restore_pending(pending))
    }

    /// Main execution loop - processes events until the channel closes
    pub async fn run(mut self) {
        if let Err(e) = self.restore().await {
            error!("Failed to restore from storage: {:?}", e);
        }

        info!("RoundProcessor is running...");
        while let Some(event) = self.event_receiver.recv().await {
            self.handle_event(event).await;
        }
        info!("RoundProcessor channel closed. Shutting down.");
    }

    #[instrument(skip(self))]
    async fn handle_event(&mut self, event: RoundEvent) {
        match event {
            RoundEvent::NewMessage(message) => {
                if let Some(finalized) = self.gate.on_new_message(message).await {
                    self.process_finalized(finalized).await;
                }
            }
            RoundEvent::EditedMessage(message) => {
                if let Some(finalized) = self.gate.on_edited_message(message).await {
                    self.process_finalized(finalized).await;
                }
            }
            RoundEvent::AttachMessageRef { round_number, message_ref } => {
                self.attach_message_ref(round_number, message_ref).await;
            }
            RoundEvent::Bilan => {
                let report = self.counter.report_and_reset();
                self.notify(OracleNotification::CounterBilan(report)).await;
            }
            RoundEvent::Statistics(reply) => {
                if reply.send(self.engine.get_statistics()).is_err() {
                    warn!("Statistics requester went away");
                }
            }
            RoundEvent::Reset(reply) => {
                self.reset().await;
                if reply.send(()).is_err() {
                    warn!("Reset requester went away");
                }
            }
            RoundEvent::SetSourceChannel(channel_id) => {
                self.gate.set_source_channel(Some(channel_id));
                self.config.source_channel_id = Some(channel_id);
                self.save_config();
            }
            RoundEvent::SetDisplayChannel(channel_id) => {
                info!("Display channel set to {}", channel_id);
                self.config.display_channel_id = Some(channel_id);
                self.save_config();
                self.notify(OracleNotification::DisplayChannelChanged(channel_id)).await;
            }
            RoundEvent::SetBilanInterval(minutes) => {
                let minutes = clamp_interval_minutes(minutes);
                info!("Summary interval set to {} minutes", minutes);
                self.config.bilan_interval_minutes = minutes;
                self.save_config();
                self.period_sender.send_replace(bilan_period(minutes));
            }
        }
    }

    async fn process_finalized(&mut self, message: FinalizedMessage) {
        if let Some(storage) = &self.storage {
            let keep = self.config.dedup_capacity;
            if let Err(e) = storage.mark_message_processed(&message.content_hash, keep).await {
                error!("Failed to persist processed message {}: {:?}", message.message_id, e);
            }
        }

        self.counter.add(&message.text);
        self.notify(OracleNotification::CounterSnapshot(self.counter.build_report())).await;

        if let Some(outcome) = self.engine.process_round(&message.text) {
            self.publish_outcome(outcome).await;
        }
    }

    async fn publish_outcome(&mut self, outcome: RoundOutcome) {
        if let TriggerResult::Triggered { source_round, target_round, .. } = outcome.trigger {
            if let Some(record) = self.engine.prediction(target_round).cloned() {
                if self.persist_prediction(&record).await {
                    info!(
                        "Prediction issued for round {}: {}",
                        target_round, record.suit_signature
                    );
                    self.notify(OracleNotification::PredictionIssued { source_round, record })
                        .await;
                } else {
                    warn!("Round {} was already settled in storage, not reissued", target_round);
                    self.engine.withdraw(target_round);
                }
            }
        }

        match outcome.verification {
            VerifyResult::Resolved { round_number, offset } => {
                self.persist_status(round_number, PredictionStatus::Resolved(offset)).await;
                self.notify(OracleNotification::PredictionResolved { round_number, offset }).await;
            }
            VerifyResult::Expired { round_number } => {
                self.persist_status(round_number, PredictionStatus::Expired).await;
                self.notify(OracleNotification::PredictionExpired { round_number }).await;
            }
            VerifyResult::NoMatch => {}
        }

        for round_number in outcome.expired {
            self.persist_status(round_number, PredictionStatus::Expired).await;
            self.notify(OracleNotification::PredictionExpired { round_number }).await;
        }
    }

    /// False only when storage already holds a row for this round.
    /// Storage errors are logged and the prediction stays live in memory.
    async fn persist_prediction(&self, record: &PredictionRecord) -> bool {
        let Some(storage) = &self.storage else {
            return true;
        };
        match storage.save_prediction(record).await {
            Ok(inserted) => inserted,
            Err(e) => {
                error!("Failed to persist prediction for round {}: {:?}", record.round_number, e);
                true
            }
        }
    }

    async fn attach_message_ref(&mut self, round_number: RoundNumber, message_ref: MessageRef) {
        if !self.engine.attach_message_ref(round_number, message_ref) {
            warn!("No prediction for round {} to attach a message to", round_number);
            return;
        }
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.attach_message_ref(round_number, message_ref).await {
                error!("Failed to persist message reference for round {}: {:?}", round_number, e);
            }
        }
    }

    async fn reset(&mut self) {
        self.engine.reset();
        self.counter.reset();
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.clear().await {
                error!("Failed to clear stored predictions: {:?}", e);
            }
        }
    }

    fn save_config(&self) {
        if let Some(path) = &self.config_path {
            if let Err(e) = self.config.save(path) {
                error!("Failed to save configuration: {:?}", e);
            }
        }
    }

    async fn persist_status(&self, round_number: RoundNumber, status: PredictionStatus) {
        if let Some(storage) = &self.storage {
            if let Err(e) = storage.update_status(round_number, status).await {
                error!(
                    "Failed to persist status {:?} for round {}: {:?}",
                    status, round_number, e
                );
            }
        }
    }

    async fn notify(&self, notification: OracleNotification) {
        if let Err(e) = self.notification_sender.send(notification).await {
            warn!("Notification dropped, no listener: {}", e);
        }
    }
}
