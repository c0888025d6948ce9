//! Core types and data structures shared across the suit-oracle system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Round number extracted from a "#N" marker
pub type RoundNumber = u32;

/// Presentation variant selector that may follow a suit glyph (emoji form)
pub const VARIANT_SELECTOR: char = '\u{FE0F}';

/// One of the four card suits, in canonical order ♠ ♥ ♦ ♣.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spades,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♦")]
    Diamonds,
    #[serde(rename = "♣")]
    Clubs,
}

impl Suit {
    /// All suits in canonical order.
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    /// The bare glyph for this suit (no variant selector).
    pub fn glyph(&self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }

    /// Maps a bare glyph back to its suit.
    pub fn from_glyph(c: char) -> Option<Suit> {
        Suit::ALL.into_iter().find(|s| s.glyph() == c)
    }

    /// Position in canonical order, used as an array index.
    pub fn index(&self) -> usize {
        match self {
            Suit::Spades => 0,
            Suit::Hearts => 1,
            Suit::Diamonds => 2,
            Suit::Clubs => 3,
        }
    }

    /// Display name used in interval reports
    pub fn name(&self) -> &'static str {
        match self {
            Suit::Spades => "SPADES",
            Suit::Hearts => "HEARTS",
            Suit::Diamonds => "DIAMONDS",
            Suit::Clubs => "CLUBS",
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.glyph())
    }
}

/// Reference to the chat message that announced a prediction.
/// Carried for downstream editing, never interpreted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
    /// Chat or channel the message lives in
    pub chat_id: i64,
    /// Message id within that chat
    pub message_id: i64,
}
