//! Suit counter - running tally of suits shown in the first group of each round
//!
//! Produces an instant snapshot after every finalized message and an interval
//! summary ("bilan") that resets the tally.

use crate::oracle::parser::{count_suit_symbols, extract_groups, SuitCounts};
use crate::types::{Suit, VARIANT_SELECTOR};

const BAR_CELLS: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct SuitCounter {
    totals: SuitCounts,
}

fn bar_tile(suit: Suit) -> &'static str {
    match suit {
        Suit::Spades => "⬛",
        Suit::Hearts => "🟥",
        Suit::Diamonds => "🔶",
        Suit::Clubs => "🟩",
    }
}

fn plural(count: usize) -> &'static str {
    if count > 1 {
        "s"
    } else {
        ""
    }
}

impl SuitCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the suits of the first group of `text`. Texts without a group are ignored.
    pub fn add(&mut self, text: &str) {
        let groups = extract_groups(text);
        let Some(first) = groups.first() else {
            return;
        };
        self.totals.add(&count_suit_symbols(first));
    }

    pub fn totals(&self) -> SuitCounts {
        self.totals
    }

    fn percent(&self, suit: Suit) -> f64 {
        let total = self.totals.total();
        if total == 0 {
            0.0
        } else {
            self.totals.get(suit) as f64 * 100.0 / total as f64
        }
    }

    /// Snapshot report, counter untouched
    pub fn build_report(&self) -> String {
        let mut lines = vec!["📈 Instant counter".to_string()];
        for suit in Suit::ALL {
            lines.push(format!(
                "{}{} : {}  ({:.1} %)",
                suit.glyph(),
                VARIANT_SELECTOR,
                self.totals.get(suit),
                self.percent(suit)
            ));
        }
        lines.join("\n")
    }

    /// Interval summary with a bar per suit, then reset.
    pub fn report_and_reset(&mut self) -> String {
        let total = self.totals.total();
        let report = if total == 0 {
            "📊 Summary 📊\n\n🔍 No cards counted".to_string()
        } else {
            let mut lines = vec!["📊 Summary 📊".to_string(), String::new()];
            for suit in Suit::ALL {
                let count = self.totals.get(suit);
                let pct = self.percent(suit);
                let filled = ((pct / 10.0) as usize).min(BAR_CELLS);
                let bar = format!(
                    "{}{}",
                    bar_tile(suit).repeat(filled),
                    "⬜".repeat(BAR_CELLS - filled)
                );

                lines.push(format!("**{}{} {}**", suit.glyph(), VARIANT_SELECTOR, suit.name()));
                lines.push(format!("├─ Count: **{}** card{}", count, plural(count)));
                lines.push(format!("├─ Share: **{:.1}%**", pct));
                lines.push(format!("└─ {}", bar));
                lines.push(String::new());
            }
            lines.push(format!("📌 Total: {} card{}", total, plural(total)));
            lines.join("\n")
        };
        self.reset();
        report
    }

    pub fn reset(&mut self) {
        self.totals = SuitCounts::default();
    }
}
