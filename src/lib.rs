//! suit-oracle - round prediction engine for suit/rank card game feeds
//!
//! This crate ingests finalized round messages, issues predictions for upcoming
//! rounds and verifies them within a bounded lookahead window.

pub mod types;
pub mod oracle;

// Re-export main types for convenience
pub use types::{MessageRef, RoundNumber, Suit};
