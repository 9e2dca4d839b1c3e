//! Advisory meters shown while the player types.
//!
//! Meters never influence classification. They are cheap enough to recompute
//! on every keystroke.

use serde::{Deserialize, Serialize};

use crate::catalog::Level;
use crate::classifier::flagged_terms;

/// Words at least this many characters long count toward specificity.
const LONG_WORD_CHARS: usize = 6;

/// Real-time display metrics, each in `0..=100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meters {
    /// How many substantial words the prompt uses.
    pub specificity: u8,
    /// How fully formed the prompt is.
    pub clarity: u8,
    /// How unlikely the prompt is to trip the guard.
    pub stealth: u8,
}

impl Meters {
    /// Reading for an empty prompt.
    pub const EMPTY: Self = Self {
        specificity: 0,
        clarity: 0,
        stealth: 100,
    };
}

/// Computes the advisory meters for `text` on `level`.
///
/// Blank text reads as [`Meters::EMPTY`].
#[must_use]
pub fn meters(text: &str, level: &Level) -> Meters {
    if text.trim().is_empty() {
        return Meters::EMPTY;
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let word_count = words.len();
    let long_words = words
        .iter()
        .filter(|word| word.chars().count() >= LONG_WORD_CHARS)
        .count();

    let specificity = capped(long_words.saturating_mul(10));
    let clarity = if word_count >= 3 {
        capped(word_count.saturating_mul(5))
    } else {
        10
    };
    let stealth = if flagged_terms(text, level).is_empty() {
        capped(word_count.saturating_mul(2).saturating_add(70))
    } else {
        10
    };

    Meters {
        specificity,
        clarity,
        stealth,
    }
}

fn capped(value: usize) -> u8 {
    u8::try_from(value.min(100)).unwrap_or(100)
}
