//! SqliteLedger module - SQLite implementation of prediction storage
//!
//! One row per predicted round. The suit signature and status are stored as
//! JSON so the schema does not change with the status enum.

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{sqlite::SqlitePoolOptions, FromRow, Pool, Sqlite};
use tracing::{debug, info, warn};

use crate::oracle::storage::PredictionStorage;
use crate::oracle::types::{PredictionRecord, PredictionStatus, SuitSignature};
use crate::types::{MessageRef, RoundNumber};

pub const DEFAULT_DATABASE_URL: &str = "sqlite:./predictions.db?mode=rwc";

#[derive(FromRow)]
struct PredictionRow {
    round_number: i64,
    suit_signature: String, // JSON
    status: String,         // JSON
    origin_chat_id: Option<i64>,
    origin_message_id: Option<i64>,
}

impl PredictionRow {
    fn into_record(self) -> Result<PredictionRecord> {
        let round_number = RoundNumber::try_from(self.round_number)
            .with_context(|| format!("Stored round number {} out of range", self.round_number))?;
        let suit_signature: SuitSignature = serde_json::from_str(&self.suit_signature)
            .with_context(|| format!("Invalid suit signature for round {}", round_number))?;
        let status: PredictionStatus = serde_json::from_str(&self.status)
            .with_context(|| format!("Invalid status for round {}", round_number))?;
        let origin_message_ref = match (self.origin_chat_id, self.origin_message_id) {
            (Some(chat_id), Some(message_id)) => Some(MessageRef { chat_id, message_id }),
            _ => None,
        };

        Ok(PredictionRecord {
            round_number,
            suit_signature,
            status,
            origin_message_ref,
        })
    }
}

/// SqliteLedger provides persistent storage for predictions using SQLite
pub struct SqliteLedger {
    pool: Pool<Sqlite>,
}

impl SqliteLedger {
    /// Connect to `database_url` and create the schema if needed.
    /// In-memory databases are pinned to a single connection so every query sees
    /// the same data.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };

        let pool = options
            .connect(database_url)
            .await
            .with_context(|| format!("Failed to connect to SQLite database {}", database_url))?;

        Self::create_schema(&pool).await?;

        info!("SqliteLedger initialized and connected to {}", database_url);

        Ok(Self { pool })
    }

    async fn create_schema(pool: &Pool<Sqlite>) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS predictions (
                round_number INTEGER PRIMARY KEY,
                suit_signature TEXT NOT NULL,
                status TEXT NOT NULL,
                origin_chat_id INTEGER,
                origin_message_id INTEGER,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await
        .context("Failed to create predictions table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS processed_messages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                hash TEXT NOT NULL UNIQUE,
                processed_at INTEGER NOT NULL
            );
            "#,
        )
        .execute(pool)
        .await
        .context("Failed to create processed_messages table")?;

        Ok(())
    }
}

#[async_trait]
impl PredictionStorage for SqliteLedger {
    async fn save_prediction(&self, record: &PredictionRecord) -> Result<bool> {
        debug!("Saving prediction for round {}", record.round_number);
        let now = chrono::Utc::now().timestamp_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO predictions (
                round_number, suit_signature, status,
                origin_chat_id, origin_message_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(round_number) DO NOTHING;
            "#,
        )
        .bind(i64::from(record.round_number))
        .bind(serde_json::to_string(&record.suit_signature)?)
        .bind(serde_json::to_string(&record.status)?)
        .bind(record.origin_message_ref.map(|r| r.chat_id))
        .bind(record.origin_message_ref.map(|r| r.message_id))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .context("Failed to insert prediction into DB")?;

        let inserted = result.rows_affected() == 1;
        if !inserted {
            warn!("Round {} already stored, prediction not saved", record.round_number);
        }
        Ok(inserted)
    }

    async fn update_status(
        &self,
        round_number: RoundNumber,
        status: PredictionStatus,
    ) -> Result<()> {
        debug!("Updating status for round {} to {:?}", round_number, status);

        sqlx::query(
            r#"
            UPDATE predictions SET status = ?, updated_at = ?
            WHERE round_number = ? AND status = ?;
            "#,
        )
        .bind(serde_json::to_string(&status)?)
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(i64::from(round_number))
        .bind(serde_json::to_string(&PredictionStatus::Pending)?)
        .execute(&self.pool)
        .await
        .context("Failed to update prediction status")?;

        Ok(())
    }

    async fn attach_message_ref(
        &self,
        round_number: RoundNumber,
        message_ref: MessageRef,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE predictions
            SET origin_chat_id = ?, origin_message_id = ?, updated_at = ?
            WHERE round_number = ?;
            "#,
        )
        .bind(message_ref.chat_id)
        .bind(message_ref.message_id)
        .bind(chrono::Utc::now().timestamp_millis())
        .bind(i64::from(round_number))
        .execute(&self.pool)
        .await
        .context("Failed to store prediction message reference")?;

        Ok(())
    }

    async fn load_pending(&self) -> Result<Vec<PredictionRecord>> {
        let pending_status = serde_json::to_string(&PredictionStatus::Pending)?;
        let rows: Vec<PredictionRow> = sqlx::query_as(
            r#"
            SELECT round_number, suit_signature, status, origin_chat_id, origin_message_id
            FROM predictions
            WHERE status = ?
            ORDER BY round_number ASC;
            "#,
        )
        .bind(pending_status)
        .fetch_all(&self.pool)
        .await
        .context("Failed to fetch pending predictions")?;

        rows.into_iter().map(PredictionRow::into_record).collect()
    }

    async fn clear(&self) -> Result<()> {
        sqlx::query("DELETE FROM predictions")
            .execute(&self.pool)
            .await
            .context("Failed to clear predictions")?;
        Ok(())
    }

    async fn record_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM predictions")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count predictions")?;
        Ok(count)
    }

    async fn mark_message_processed(&self, hash: &str, keep: u64) -> Result<()> {
        let keep = i64::try_from(keep).context("Processed hash capacity out of range")?;

        sqlx::query("INSERT OR IGNORE INTO processed_messages (hash, processed_at) VALUES (?, ?)")
            .bind(hash)
            .bind(chrono::Utc::now().timestamp_millis())
            .execute(&self.pool)
            .await
            .context("Failed to store processed message hash")?;

        sqlx::query(
            r#"
            DELETE FROM processed_messages
            WHERE id NOT IN (SELECT id FROM processed_messages ORDER BY id DESC LIMIT ?);
            "#,
        )
        .bind(keep)
        .execute(&self.pool)
        .await
        .context("Failed to trim processed message hashes")?;

        Ok(())
    }

    async fn load_processed_hashes(&self, limit: u64) -> Result<Vec<String>> {
        let limit = i64::try_from(limit).context("Processed hash limit out of range")?;
        let hashes: Vec<String> =
            sqlx::query_scalar("SELECT hash FROM processed_messages ORDER BY id DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await
                .context("Failed to fetch processed message hashes")?;
        Ok(hashes)
    }

    async fn health_check(&self) -> Result<bool> {
        let one: i64 = sqlx::query_scalar("SELECT 1").fetch_one(&self.pool).await?;
        Ok(one == 1)
    }
}
