//! MessageGate - turns raw channel traffic into finalized round messages
//!
//! Messages still being edited (⏰ / 🕐) are buffered until an edit removes the
//! marker. Messages without an outcome marker (✅ 🔰 ❌ ⭕) are dropped, and exact
//! repeats of the same content on the same channel are delivered only once.

use moka::future::Cache;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::oracle::types::{FinalizedMessage, IncomingMessage};

pub const PENDING_EDIT_MARKERS: [char; 2] = ['⏰', '🕐'];
pub const OUTCOME_MARKERS: [char; 4] = ['✅', '🔰', '❌', '⭕'];

pub fn has_pending_marker(text: &str) -> bool {
    text.contains(&PENDING_EDIT_MARKERS[..])
}

pub fn has_outcome_marker(text: &str) -> bool {
    text.contains(&OUTCOME_MARKERS[..])
}

/// SHA-256 of "{channel_id}:{content}", hex encoded
pub fn content_hash(channel_id: i64, content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{}:{}", channel_id, content).as_bytes());
    format!("{:x}", hasher.finalize())
}

fn preview(text: &str) -> String {
    text.chars().take(50).collect()
}

pub struct MessageGate {
    source_channel_id: Option<i64>,
    pending_edits: Cache<i64, String>,
    processed: Cache<String, ()>,
}

impl MessageGate {
    /// Create a gate that remembers up to `capacity` processed messages and buffers
    /// at most as many messages waiting for their final edit.
    pub fn new(source_channel_id: Option<i64>, capacity: u64) -> Self {
        Self {
            source_channel_id,
            pending_edits: Cache::new(capacity),
            processed: Cache::new(capacity),
        }
    }

    pub fn source_channel_id(&self) -> Option<i64> {
        self.source_channel_id
    }

    pub fn set_source_channel(&mut self, channel_id: Option<i64>) {
        info!("Source channel set to {:?}", channel_id);
        self.source_channel_id = channel_id;
    }

    /// Mark hashes as already processed, e.g. the ones persisted before a restart.
    pub async fn seed_processed<I: IntoIterator<Item = String>>(&self, hashes: I) {
        for hash in hashes {
            self.processed.insert(hash, ()).await;
        }
    }

    fn accepts_channel(&self, channel_id: i64) -> bool {
        self.source_channel_id.map_or(true, |source| source == channel_id)
    }

    /// Handle a freshly posted message.
    pub async fn on_new_message(&mut self, message: IncomingMessage) -> Option<FinalizedMessage> {
        if !self.accepts_channel(message.channel_id) {
            return None;
        }
        if has_pending_marker(&message.text) {
            debug!(
                "Buffering message {} until finalized: {}",
                message.message_id,
                preview(&message.text)
            );
            self.pending_edits.insert(message.message_id, message.text).await;
            return None;
        }
        if !has_outcome_marker(&message.text) {
            debug!("Ignoring non-finalized message: {}", preview(&message.text));
            return None;
        }
        self.finalize(message).await
    }

    /// Handle an edit. Only messages buffered as pending are considered.
    pub async fn on_edited_message(
        &mut self,
        message: IncomingMessage,
    ) -> Option<FinalizedMessage> {
        if !self.accepts_channel(message.channel_id)
            || !self.pending_edits.contains_key(&message.message_id)
        {
            return None;
        }
        if has_pending_marker(&message.text) {
            self.pending_edits.insert(message.message_id, message.text).await;
            return None;
        }
        self.pending_edits.invalidate(&message.message_id).await;
        if !has_outcome_marker(&message.text) {
            debug!(
                "Edited message {} lost its pending marker without an outcome, dropped",
                message.message_id
            );
            return None;
        }
        self.finalize(message).await
    }

    async fn finalize(&mut self, message: IncomingMessage) -> Option<FinalizedMessage> {
        let hash = content_hash(message.channel_id, &message.text);
        if self.processed.contains_key(&hash) {
            info!("Message {} already processed, skipping", message.message_id);
            return None;
        }
        self.processed.insert(hash.clone(), ()).await;

        Some(FinalizedMessage {
            channel_id: message.channel_id,
            message_id: message.message_id,
            text: message.text,
            content_hash: hash,
        })
    }

    /// Number of messages waiting for their final edit
    pub async fn pending_edit_count(&self) -> u64 {
        self.pending_edits.run_pending_tasks().await;
        self.pending_edits.entry_count()
    }
}
