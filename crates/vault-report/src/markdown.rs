//! Markdown report generation for Prompt Vault sessions.
//!
//! [`MarkdownGenerator`] converts a [`SessionReport`] into a debrief document
//! with:
//!
//! - A summary table with rank and totals
//! - A per-level table
//! - Prioritized recommendations
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
//! let report = SessionReport::new("Builtin levels", session.summary());
//!
//! let markdown = MarkdownGenerator::new(&report).generate();
//! assert!(markdown.contains("| Levels Cleared | 0 / 5 |"));
//! ```

use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::SessionReport;

/// Generates Markdown debriefs from session reports.
pub struct MarkdownGenerator<'a> {
    report: &'a SessionReport,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given report.
    #[must_use]
    pub const fn new(report: &'a SessionReport) -> Self {
        Self { report }
    }

    /// Generates the complete Markdown report.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        self.write_title(&mut output);
        self.write_summary(&mut output);
        self.write_levels(&mut output);
        self.write_recommendations(&mut output);
        self.write_footer(&mut output);

        output
    }

    /// Writes the report title.
    fn write_title(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "# Prompt Vault Debrief: {}\n",
            escape_markdown(&self.report.title)
        );
    }

    /// Writes the summary section with metrics table.
    fn write_summary(&self, output: &mut String) {
        let summary = &self.report.summary;
        let status = if summary.finished {
            "Finished"
        } else {
            "In progress"
        };

        let _ = writeln!(output, "## Summary\n");
        let _ = writeln!(output, "| Metric | Value |");
        let _ = writeln!(output, "|--------|-------|");
        let _ = writeln!(output, "| Rank | {} |", summary.rank);
        let _ = writeln!(output, "| Status | {status} |");
        let _ = writeln!(
            output,
            "| Levels Cleared | {} / {} |",
            summary.completed_levels,
            summary.level_count()
        );
        let _ = writeln!(output, "| Attempts | {} |", summary.total_attempts);
        let _ = writeln!(output, "| Alarms | {} |", summary.total_alarms);
        let _ = writeln!(output, "| Hints Used | {} |", summary.total_hints);
        let _ = writeln!(
            output,
            "| Duration | {} |",
            format_duration(self.report.duration_seconds)
        );
        let _ = writeln!(output);
    }

    /// Writes the per-level section.
    fn write_levels(&self, output: &mut String) {
        let _ = writeln!(output, "## Levels\n");
        if self.report.summary.levels.is_empty() {
            let _ = writeln!(output, "*No levels played.*\n");
            return;
        }
        self.write_level_table(output);
        let _ = writeln!(output);
    }

    fn write_level_table(&self, output: &mut String) {
        let _ = writeln!(
            output,
            "| # | Level | Difficulty | State | Attempts | Alarms | Hints | Example |"
        );
        let _ = writeln!(
            output,
            "|---|-------|------------|-------|----------|--------|-------|---------|"
        );
        for (index, level) in self.report.summary.levels.iter().enumerate() {
            let _ = writeln!(
                output,
                "| {} | {} | {} | {} | {} | {} | {} | {} |",
                index + 1,
                escape_markdown(&level.name),
                escape_markdown(&level.difficulty),
                level.state,
                level.attempts,
                level.alarms,
                level.hints_revealed,
                if level.example_disclosed { "yes" } else { "no" }
            );
        }
    }

    /// Writes the recommendations section.
    fn write_recommendations(&self, output: &mut String) {
        let _ = writeln!(output, "## Recommendations\n");

        let recs = self.report.recommendations();
        if recs.is_empty() {
            let _ = writeln!(output, "*A clean run. Nothing to improve.*\n");
            return;
        }

        for (index, rec) in recs.iter().enumerate() {
            let _ = writeln!(
                output,
                "{}. **[{}]** {}",
                index + 1,
                rec.category,
                escape_markdown(&rec.description)
            );
        }
        let _ = writeln!(output);
    }

    /// Writes the report footer.
    fn write_footer(&self, output: &mut String) {
        let _ = writeln!(output, "---");
        let timestamp = format_timestamp(&self.report.generated_at);
        let _ = writeln!(output, "*Generated by Prompt Vault at {timestamp}*");
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Formats a duration in seconds to a human-readable string.
///
/// Examples:
/// - 65 seconds -> "1m 5s"
/// - 3661 seconds -> "1h 1m 1s"
/// - 45 seconds -> "45s"
fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();

    if hours > 0 {
        parts.push(format!("{hours}h"));
    }
    if minutes > 0 {
        parts.push(format!("{minutes}m"));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{secs}s"));
    }

    parts.join(" ")
}

/// Formats a timestamp as "YYYY-MM-DD HH:MM:SS UTC".
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Escapes special Markdown characters in text.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            // table cells cannot hold raw newlines
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
