//! Symbol parser for round messages
//!
//! Extracts the round number and the parenthesized groups from raw text, and
//! counts suit glyphs. A suit may be written as a bare glyph (♠) or followed by
//! the emoji presentation selector (♠️). The emoji form starts with the bare
//! glyph, so counting bare glyphs counts every physical occurrence exactly once.

use crate::oracle::types::SuitSignature;
use crate::types::{RoundNumber, Suit};
use regex::Regex;
use std::sync::OnceLock;

/// Rank marker checked by the trigger gate
pub const JACK_MARKER: char = 'J';

fn round_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)#N\s*(\d+)\.?").expect("round marker regex is valid"))
}

fn game_marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)jeu\s*#?\s*(\d+)").expect("game marker regex is valid"))
}

fn group_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\(([^)]*)\)").expect("group regex is valid"))
}

/// Per-suit glyph counts for one group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SuitCounts([usize; 4]);

impl SuitCounts {
    pub fn get(&self, suit: Suit) -> usize {
        self.0[suit.index()]
    }

    /// Sum over the four suits
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Suits with a non-zero count, in canonical order
    fn present(&self) -> impl Iterator<Item = Suit> + '_ {
        Suit::ALL.into_iter().filter(move |s| self.get(*s) > 0)
    }

    pub(crate) fn add(&mut self, other: &SuitCounts) {
        for (total, count) in self.0.iter_mut().zip(other.0.iter()) {
            *total += count;
        }
    }
}

/// Extract the round number from "#N123" (optionally "#N 123."), falling back to "jeu #123".
/// Returns None when neither marker is present or the digits do not fit a RoundNumber.
pub fn extract_round_number(text: &str) -> Option<RoundNumber> {
    let caps = round_marker_regex()
        .captures(text)
        .or_else(|| game_marker_regex().captures(text))?;
    caps.get(1)?.as_str().parse().ok()
}

/// Every parenthesized group, left to right, without the parentheses.
pub fn extract_groups(text: &str) -> Vec<String> {
    group_regex()
        .captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Count suit glyphs in a group, both presentation forms folded into one key.
pub fn count_suit_symbols(group: &str) -> SuitCounts {
    let mut counts = SuitCounts::default();
    for c in group.chars() {
        if let Some(suit) = Suit::from_glyph(c) {
            counts.0[suit.index()] += 1;
        }
    }
    counts
}

/// Unique suits of a group in canonical order ♠ ♥ ♦ ♣.
pub fn normalize_suit_set(group: &str) -> Vec<Suit> {
    count_suit_symbols(group).present().collect()
}

/// Suit signature of a group, None when the group holds no suit glyph.
pub fn suit_signature(group: &str) -> Option<SuitSignature> {
    SuitSignature::from_suits(normalize_suit_set(group))
}

/// Occurrences of the jack marker in a group
pub fn count_jacks(group: &str) -> usize {
    group.matches(JACK_MARKER).count()
}
