//! Final rank and session summaries.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::level_state::VaultState;

/// Coarse final grade, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    /// At most 8 attempts.
    Phantom,
    /// At most 16 attempts.
    Infiltrator,
    /// At most 30 attempts.
    Operative,
    /// Anything more.
    Recruit,
}

impl Rank {
    /// Display title.
    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::Phantom => "Phantom",
            Self::Infiltrator => "Infiltrator",
            Self::Operative => "Operative",
            Self::Recruit => "Recruit",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Maps aggregate attempts across all levels to a rank.
///
/// Alarms and hints do not affect the rank.
///
/// ```
/// use vault_engine::{final_rank, Rank};
///
/// assert_eq!(final_rank(5), Rank::Phantom);
/// assert_eq!(final_rank(31), Rank::Recruit);
/// ```
#[must_use]
pub const fn final_rank(total_attempts: u32) -> Rank {
    match total_attempts {
        0..=8 => Rank::Phantom,
        9..=16 => Rank::Infiltrator,
        17..=30 => Rank::Operative,
        _ => Rank::Recruit,
    }
}

/// Per-level line of a [`SessionSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSummary {
    /// Level identifier.
    pub id: String,
    /// Level display name.
    pub name: String,
    /// Difficulty label.
    pub difficulty: String,
    /// Vault state when the summary was taken.
    pub state: VaultState,
    /// Evaluated prompts.
    pub attempts: u32,
    /// Alarms raised.
    pub alarms: u32,
    /// Hints revealed.
    pub hints_revealed: usize,
    /// Whether the example prompt was disclosed.
    pub example_disclosed: bool,
    /// Whether the level was completed.
    pub completed: bool,
}

/// Snapshot of a play-through, for hosts and reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    /// One entry per catalog level, in catalog order.
    pub levels: Vec<LevelSummary>,
    /// Sum of attempts over all levels.
    pub total_attempts: u32,
    /// Sum of alarms over all levels.
    pub total_alarms: u32,
    /// Sum of revealed hints over all levels.
    pub total_hints: usize,
    /// Number of completed levels.
    pub completed_levels: usize,
    /// Whether the last level was cleared and advanced past.
    pub finished: bool,
    /// Rank for `total_attempts`.
    pub rank: Rank,
    /// When the session started.
    pub started_at: DateTime<Utc>,
}

impl SessionSummary {
    /// Number of levels in the catalog.
    #[must_use]
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }
}
