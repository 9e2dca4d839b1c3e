//! Prompt Vault Debrief Reports
//!
//! This crate turns a [`SessionSummary`] into a debrief report. Reports can be
//! serialized to JSON for programmatic access or rendered to Markdown for the
//! player.
//!
//! # Types
//!
//! - [`SessionReport`] - A session summary plus report metadata
//! - [`Recommendation`] - A prioritized suggestion derived from the session
//!
//! # Generators
//!
//! - [`json::JsonGenerator`] - Generate JSON reports with compact or pretty formatting
//! - [`MarkdownGenerator`] - Generate human-readable Markdown reports
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vault_engine::{Catalog, Session, SessionSettings};
//! use vault_report::{MarkdownGenerator, SessionReport};
//!
//! let catalog = Arc::new(Catalog::builtin().unwrap());
//! let session = Session::new(catalog, SessionSettings::default());
//!
//! let report = SessionReport::new("Builtin levels", session.summary());
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.contains("# Prompt Vault Debrief: Builtin levels"));
//! ```

pub mod json;
mod markdown;

pub use markdown::MarkdownGenerator;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use vault_engine::{LevelSummary, SessionSummary};

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to serialize the report to JSON.
    #[error("failed to serialize report: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Failed to read or write report files.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid report data.
    #[error("invalid report data: {0}")]
    InvalidData(String),
}

/// Result type for report operations.
pub type Result<T> = std::result::Result<T, ReportError>;

/// Levels that took at least this many attempts get a precision note.
const MANY_ATTEMPTS: u32 = 5;

// ============================================================================
// SessionReport
// ============================================================================

/// Debrief report for one play-through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionReport {
    /// Title shown at the top of the report, usually the catalog name.
    pub title: String,

    /// The session being reported on.
    pub summary: SessionSummary,

    /// Wall-clock seconds from session start to report creation.
    pub duration_seconds: u64,

    /// When the report was created.
    pub generated_at: DateTime<Utc>,
}

impl SessionReport {
    /// Creates a report stamped with the current time.
    #[must_use]
    pub fn new(title: impl Into<String>, summary: SessionSummary) -> Self {
        Self::at(title, summary, Utc::now())
    }

    /// Creates a report as of `generated_at`.
    #[must_use]
    pub fn at(title: impl Into<String>, summary: SessionSummary, generated_at: DateTime<Utc>) -> Self {
        let duration_seconds = u64::try_from((generated_at - summary.started_at).num_seconds())
            .unwrap_or(0);
        Self {
            title: title.into(),
            summary,
            duration_seconds,
            generated_at,
        }
    }

    /// Serializes the report to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(ReportError::from)
    }

    /// Checks that the summary totals agree with its per-level lines.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::InvalidData`] naming the first mismatch.
    pub fn validate(&self) -> Result<()> {
        let levels = &self.summary.levels;
        let attempts: u32 = levels.iter().map(|level| level.attempts).sum();
        if attempts != self.summary.total_attempts {
            return Err(ReportError::InvalidData(format!(
                "totalAttempts is {} but levels add up to {attempts}",
                self.summary.total_attempts
            )));
        }
        let alarms: u32 = levels.iter().map(|level| level.alarms).sum();
        if alarms != self.summary.total_alarms {
            return Err(ReportError::InvalidData(format!(
                "totalAlarms is {} but levels add up to {alarms}",
                self.summary.total_alarms
            )));
        }
        let completed = levels.iter().filter(|level| level.completed).count();
        if completed != self.summary.completed_levels {
            return Err(ReportError::InvalidData(format!(
                "completedLevels is {} but {completed} levels are marked completed",
                self.summary.completed_levels
            )));
        }
        Ok(())
    }

    /// Suggestions for the next play-through, highest priority first.
    #[must_use]
    pub fn recommendations(&self) -> Vec<Recommendation> {
        let mut recs = Vec::new();

        for level in &self.summary.levels {
            if level.alarms > 0 {
                recs.push(Recommendation::new(
                    1,
                    "stealth",
                    format!(
                        "{}: {} raised. Red-flag terms trip the guard no matter what else the prompt covers.",
                        level.name,
                        plural(level.alarms, "alarm")
                    ),
                ));
            }
            if level.example_disclosed {
                recs.push(Recommendation::new(
                    2,
                    "hints",
                    format!("{}: the example prompt was needed. Replay it without hints.", level.name),
                ));
            }
            if level.completed && level.attempts >= MANY_ATTEMPTS {
                recs.push(Recommendation::new(
                    3,
                    "precision",
                    format!(
                        "{}: cleared after {}. Cover every required element in a single prompt.",
                        level.name,
                        plural(level.attempts, "attempt")
                    ),
                ));
            }
        }

        let remaining = self.remaining_levels().count();
        if remaining > 0 {
            recs.push(Recommendation::new(
                2,
                "progress",
                format!(
                    "{} still sealed.",
                    plural(u32::try_from(remaining).unwrap_or(u32::MAX), "level")
                ),
            ));
        }

        recs.sort_by_key(|rec| rec.priority);
        recs
    }

    fn remaining_levels(&self) -> impl Iterator<Item = &LevelSummary> {
        self.summary.levels.iter().filter(|level| !level.completed)
    }
}

fn plural(count: u32, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

// ============================================================================
// Recommendation
// ============================================================================

/// A prioritized suggestion derived from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Priority (1 = highest).
    pub priority: u32,

    /// Category such as "stealth" or "hints".
    pub category: String,

    /// What to do differently.
    pub description: String,
}

impl Recommendation {
    /// Creates a new recommendation.
    #[must_use]
    pub fn new(priority: u32, category: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            priority,
            category: category.into(),
            description: description.into(),
        }
    }
}

// ============================================================================
// Test Fixtures
// ============================================================================


// ============================================================================
// Tests
// ============================================================================
