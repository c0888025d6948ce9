//! Main entry point for the suit-oracle service demo
//!
//! Wires the RoundProcessor, BilanScheduler and SQLite storage together and
//! drives them with a scripted feed followed by simulated rounds.

use anyhow::{Context, Result};
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use suit_oracle::oracle::{
    BilanScheduler, IncomingMessage, NotificationReceiver, OracleBuilder, OracleConfig,
    OracleNotification, PredictionStorage, RoundEvent, RoundEventSender, SqliteLedger,
};
use suit_oracle::{RoundNumber, Suit};
use tokio::sync::{mpsc, oneshot};
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEMO_CHANNEL: i64 = -1002682552255;
const RANKS: [&str; 13] = ["A", "2", "3", "4", "5", "6", "7", "8", "9", "10", "J", "Q", "K"];

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config_path = std::env::args().nth(1);
    let config = match &config_path {
        Some(path) => OracleConfig::load(path)?,
        None => OracleConfig::default(),
    }
    .with_env_overrides()?;

    info!("Starting suit-oracle demo");

    let storage: Arc<dyn PredictionStorage> =
        Arc::new(SqliteLedger::connect(&config.database_url).await?);

    // Create communication channels
    let (event_sender, event_receiver) = mpsc::channel::<RoundEvent>(config.queue_capacity);
    let (notification_sender, notification_receiver) = mpsc::channel(config.queue_capacity);

    let mut builder = OracleBuilder::from_config(config.clone());
    if let Some(path) = &config_path {
        builder = builder.with_config_path(path);
    }
    let processor = builder.build(Some(storage), event_receiver, notification_sender);
    let scheduler =
        BilanScheduler::from_updates(event_sender.clone(), processor.subscribe_bilan_period());

    let processor_handle = tokio::spawn(processor.run());
    let scheduler_handle = tokio::spawn(scheduler.run());
    let display_handle =
        tokio::spawn(display_notifications(notification_receiver, config.display_channel_id));

    let channel_id = config.source_channel_id.unwrap_or(DEMO_CHANNEL);
    demo_scripted_feed(&event_sender, channel_id).await?;
    demo_simulated_feed(&event_sender, channel_id, 20).await?;

    event_sender.send(RoundEvent::Bilan).await?;

    let (reply_sender, reply_receiver) = oneshot::channel();
    event_sender.send(RoundEvent::Statistics(reply_sender)).await?;
    let stats = reply_receiver.await.context("RoundProcessor stopped before answering")?;
    info!("Final statistics: {}", serde_json::to_string(&stats)?);

    // The scheduler holds a sender; stop it so the processor's queue can close
    scheduler_handle.abort();
    drop(event_sender);
    processor_handle.await?;
    display_handle.await?;

    info!("Demo completed. Predictions are stored in {}", config.database_url);
    Ok(())
}

async fn display_notifications(
    mut receiver: NotificationReceiver,
    mut display_channel: Option<i64>,
) {
    while let Some(notification) = receiver.recv().await {
        if let OracleNotification::DisplayChannelChanged(channel) = notification {
            display_channel = Some(channel);
        }
        match display_channel {
            Some(channel) => info!("[display {}]\n{}", channel, notification.render()),
            None => info!("\n{}", notification.render()),
        }
    }
}

/// A short hand-written sequence: a buffered edit that triggers, a verification and a
/// duplicate delivery.
async fn demo_scripted_feed(sender: &RoundEventSender, channel_id: i64) -> Result<()> {
    info!("Sending scripted rounds...");

    sender
        .send(RoundEvent::NewMessage(IncomingMessage {
            channel_id,
            message_id: 1,
            text: "⏰ #N5. 9(♠️A♥️8) - 7(♦️J♣4".to_string(),
        }))
        .await?;
    sender
        .send(RoundEvent::EditedMessage(IncomingMessage {
            channel_id,
            message_id: 1,
            text: "✅ #N5. 9(♠️A♥️8) - 7(♦️J♣4)".to_string(),
        }))
        .await?;

    let result = IncomingMessage {
        channel_id,
        message_id: 2,
        text: "✅ #N6. 8(K♣8♠) - 6(2♠3♥Q♦)".to_string(),
    };
    sender.send(RoundEvent::NewMessage(result.clone())).await?;
    // Same content delivered twice
    sender.send(RoundEvent::NewMessage(result)).await?;

    Ok(())
}

fn random_hand<R: Rng>(rng: &mut R, cards: usize) -> String {
    (0..cards)
        .map(|_| {
            let rank = RANKS[rng.gen_range(0..RANKS.len())];
            format!("{}{}", rank, Suit::ALL[rng.gen_range(0..4)])
        })
        .collect()
}

fn simulate_round_text<R: Rng>(rng: &mut R, round: RoundNumber) -> String {
    let first_cards = rng.gen_range(2..=3);
    let first = random_hand(rng, first_cards);
    let second_cards = rng.gen_range(2..=3);
    let second = random_hand(rng, second_cards);
    format!(
        "✅ #N{}. {}({}) - {}({})",
        round,
        rng.gen_range(0..10),
        first,
        rng.gen_range(0..10),
        second
    )
}

async fn demo_simulated_feed(
    sender: &RoundEventSender,
    channel_id: i64,
    rounds: RoundNumber,
) -> Result<()> {
    info!("Sending {} simulated rounds...", rounds);
    let texts: Vec<String> = {
        let mut rng = rand::thread_rng();
        (0..rounds).map(|i| simulate_round_text(&mut rng, 100 + i)).collect()
    };

    for (i, text) in texts.into_iter().enumerate() {
        sender
            .send(RoundEvent::NewMessage(IncomingMessage {
                channel_id,
                message_id: 100 + i as i64,
                text,
            }))
            .await?;
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    Ok(())
}
