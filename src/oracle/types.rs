//! Types for the prediction engine and the service around it
//!
//! Records, lifecycle states, per-operation results, statistics, configuration
//! and the channel payloads exchanged with the RoundProcessor.

use crate::oracle::sqlite_ledger::DEFAULT_DATABASE_URL;
use crate::types::{MessageRef, RoundNumber, Suit};
use anyhow::{Context, Result};
use nonempty::NonEmpty;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tokio::sync::{mpsc, oneshot};

/// Deduplicated, canonically ordered (♠ ♥ ♦ ♣) set of suits carried by a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Suit>", into = "Vec<Suit>")]
pub struct SuitSignature(NonEmpty<Suit>);

impl SuitSignature {
    /// Builds a signature from any suits, collapsing duplicates into canonical order.
    /// Returns None when no suit is given.
    pub fn from_suits<I: IntoIterator<Item = Suit>>(suits: I) -> Option<Self> {
        let mut suits: Vec<Suit> = suits.into_iter().collect();
        suits.sort();
        suits.dedup();
        NonEmpty::from_vec(suits).map(SuitSignature)
    }

    pub fn contains(&self, suit: Suit) -> bool {
        self.0.iter().any(|s| *s == suit)
    }

    pub fn to_vec(&self) -> Vec<Suit> {
        self.0.iter().copied().collect()
    }
}

impl TryFrom<Vec<Suit>> for SuitSignature {
    type Error = String;

    fn try_from(suits: Vec<Suit>) -> std::result::Result<Self, Self::Error> {
        SuitSignature::from_suits(suits)
            .ok_or_else(|| "suit signature must not be empty".to_string())
    }
}

impl From<SuitSignature> for Vec<Suit> {
    fn from(signature: SuitSignature) -> Self {
        signature.0.into()
    }
}

impl fmt::Display for SuitSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for suit in self.0.iter() {
            write!(f, "{}", suit)?;
        }
        Ok(())
    }
}

/// Lifecycle state of a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionStatus {
    /// Waiting for a result message within the lookahead window
    Pending,
    /// Verified by the round `round_number + offset`, offset in 0..=3
    Resolved(u8),
    /// Left the lookahead window without being verified
    Expired,
}

impl Default for PredictionStatus {
    fn default() -> Self {
        PredictionStatus::Pending
    }
}

impl PredictionStatus {
    pub fn is_pending(&self) -> bool {
        matches!(self, PredictionStatus::Pending)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_pending()
    }
}

/// A prediction issued for a future round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Round the prediction targets (unique ledger key)
    pub round_number: RoundNumber,
    /// Suits carried by the prediction, fixed at creation
    pub suit_signature: SuitSignature,
    /// Current lifecycle state
    pub status: PredictionStatus,
    /// Message announcing the prediction, if a collaborator published one
    pub origin_message_ref: Option<MessageRef>,
}

impl PredictionRecord {
    /// Create a new pending prediction
    pub fn new(round_number: RoundNumber, suit_signature: SuitSignature) -> Self {
        Self {
            round_number,
            suit_signature,
            status: PredictionStatus::Pending,
            origin_message_ref: None,
        }
    }
}

/// Append-only record of a prediction leaving Pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionLogEntry {
    pub round_number: RoundNumber,
    pub outcome: PredictionStatus,
}

/// Why a trigger evaluation did not create a prediction.
/// Only used for logging; every variant is handled the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerSkip {
    /// Fewer than two parenthesized groups
    TooFewGroups,
    /// Group 1 holds a jack, or group 2 does not hold exactly one
    JackGate,
    /// This source round was already evaluated successfully
    DuplicateSource,
    /// A record for the target round already exists
    DuplicateTarget,
    /// Group 1 holds no suit glyph
    EmptySignature,
    /// Target round does not fit a RoundNumber
    RoundOverflow,
}

/// Result of a trigger evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerResult {
    NoTrigger(TriggerSkip),
    Triggered {
        source_round: RoundNumber,
        target_round: RoundNumber,
        suit_signature: SuitSignature,
    },
}

impl TriggerResult {
    pub fn is_triggered(&self) -> bool {
        matches!(self, TriggerResult::Triggered { .. })
    }
}

/// Result of verifying a result message against pending predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VerifyResult {
    NoMatch,
    Resolved { round_number: RoundNumber, offset: u8 },
    Expired { round_number: RoundNumber },
}

/// Aggregate win/loss counters derived from the resolution log.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Statistics {
    /// Number of predictions that left Pending
    pub total: usize,
    /// Predictions resolved at any offset
    pub wins: usize,
    /// Predictions that expired
    pub losses: usize,
    /// Predictions still waiting in the ledger
    pub pending: usize,
    /// wins / total * 100, or 0 when nothing resolved yet
    pub win_rate: f64,
}

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// sqlx connection URL for prediction persistence
    pub database_url: String,
    /// Only messages from this channel are processed (any channel when None)
    pub source_channel_id: Option<i64>,
    /// Channel notifications are meant for
    pub display_channel_id: Option<i64>,
    /// Minutes between automatic counter summaries
    pub bilan_interval_minutes: u64,
    /// Number of message hashes remembered for deduplication
    pub dedup_capacity: u64,
    /// Capacity of the event and notification channels
    pub queue_capacity: usize,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            source_channel_id: None,
            display_channel_id: None,
            bilan_interval_minutes: 30,
            dedup_capacity: 1000,
            queue_capacity: 100,
        }
    }
}

impl OracleConfig {
    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: OracleConfig = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON, the format `load` reads.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let raw = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, raw)
            .with_context(|| format!("Failed to write config file {}", path.display()))?;
        Ok(())
    }

    /// Apply `SUIT_ORACLE_*` environment variables on top of this configuration.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup("SUIT_ORACLE_DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(raw) = lookup("SUIT_ORACLE_SOURCE_CHANNEL") {
            let channel = raw.trim().parse().context("Invalid SUIT_ORACLE_SOURCE_CHANNEL")?;
            self.source_channel_id = Some(channel);
        }
        if let Some(raw) = lookup("SUIT_ORACLE_DISPLAY_CHANNEL") {
            let channel = raw.trim().parse().context("Invalid SUIT_ORACLE_DISPLAY_CHANNEL")?;
            self.display_channel_id = Some(channel);
        }
        if let Some(raw) = lookup("SUIT_ORACLE_BILAN_MINUTES") {
            self.bilan_interval_minutes =
                raw.trim().parse().context("Invalid SUIT_ORACLE_BILAN_MINUTES")?;
        }
        Ok(self)
    }
}

/// A raw chat message as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub channel_id: i64,
    pub message_id: i64,
    pub text: String,
}

/// A message that passed the gate: no pending-edit marker, has an outcome marker,
/// not seen before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizedMessage {
    pub channel_id: i64,
    pub message_id: i64,
    pub text: String,
    /// Dedup key, see `message_gate::content_hash`
    pub content_hash: String,
}

/// Events consumed by the RoundProcessor, strictly one at a time.
#[derive(Debug)]
pub enum RoundEvent {
    /// A freshly posted message
    NewMessage(IncomingMessage),
    /// A new version of a previously posted message
    EditedMessage(IncomingMessage),
    /// Record where the announcement of a prediction was published
    AttachMessageRef {
        round_number: RoundNumber,
        message_ref: MessageRef,
    },
    /// Emit the interval counter summary and reset the counter
    Bilan,
    /// Query the current statistics
    Statistics(oneshot::Sender<Statistics>),
    /// Clear all prediction state and the counter
    Reset(oneshot::Sender<()>),
    /// Only accept round messages from this channel from now on
    SetSourceChannel(i64),
    /// Send notifications to this channel from now on
    SetDisplayChannel(i64),
    /// Change the automatic summary interval, clamped to 1..=120 minutes
    SetBilanInterval(u64),
}

/// Notifications produced by the RoundProcessor for a display collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum OracleNotification {
    PredictionIssued {
        source_round: RoundNumber,
        record: PredictionRecord,
    },
    PredictionResolved {
        round_number: RoundNumber,
        offset: u8,
    },
    PredictionExpired {
        round_number: RoundNumber,
    },
    /// Instant counter report after each finalized message
    CounterSnapshot(String),
    /// Interval counter summary
    CounterBilan(String),
    /// The display collaborator should publish to this channel from now on
    DisplayChannelChanged(i64),
}

impl OracleNotification {
    /// Human readable text for the display channel
    pub fn render(&self) -> String {
        match self {
            OracleNotification::PredictionIssued { source_round, record } => format!(
                "🔮 Round #{}: {} (from round #{})",
                record.round_number, record.suit_signature, source_round
            ),
            OracleNotification::PredictionResolved { round_number, offset } => {
                format!("✅ Round #{} verified (offset {})", round_number, offset)
            }
            OracleNotification::PredictionExpired { round_number } => {
                format!("❌ Round #{} expired", round_number)
            }
            OracleNotification::CounterSnapshot(report)
            | OracleNotification::CounterBilan(report) => report.clone(),
            OracleNotification::DisplayChannelChanged(channel_id) => {
                format!("📺 Display channel set to {}", channel_id)
            }
        }
    }
}

// --- Communication Channels for RoundProcessor ---

pub type RoundEventSender = mpsc::Sender<RoundEvent>;
pub type RoundEventReceiver = mpsc::Receiver<RoundEvent>;

pub type NotificationSender = mpsc::Sender<OracleNotification>;
pub type NotificationReceiver = mpsc::Receiver<OracleNotification>;
