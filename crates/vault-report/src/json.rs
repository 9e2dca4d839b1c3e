//! JSON report generation for Prompt Vault.
//!
//! [`JsonGenerator`] serializes a [`SessionReport`] together with its
//! recommendations, as compact single-line JSON or pretty-printed.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use vault_engine::{Catalog, Session, SessionSettings};
//! use vault_report::{json::JsonGenerator, SessionReport};
//!
//! let catalog = Arc::new(Catalog::builtin().unwrap());
//! let session = Session::new(catalog, SessionSettings::default());
//! let report = SessionReport::new("Builtin levels", session.summary());
//!
//! let generator = JsonGenerator::new(&report);
//! let compact = generator.generate().unwrap();
//! assert!(!compact.contains('\n'));
//! assert!(compact.contains(r#""recommendations":"#));
//! ```

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::{Recommendation, ReportError, Result, SessionReport};

/// Serialized shape: the report's fields plus derived recommendations.
#[derive(Serialize)]
struct Document<'a> {
    #[serde(flatten)]
    report: &'a SessionReport,
    recommendations: Vec<Recommendation>,
}

/// JSON report generator.
pub struct JsonGenerator<'a> {
    report: &'a SessionReport,
}

impl<'a> JsonGenerator<'a> {
    /// Creates a new JSON generator for the given report.
    #[must_use]
    pub const fn new(report: &'a SessionReport) -> Self {
        Self { report }
    }

    fn document(&self) -> Document<'a> {
        Document {
            report: self.report,
            recommendations: self.report.recommendations(),
        }
    }

    /// Generates compact JSON output (single line, no extra whitespace).
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    pub fn generate(&self) -> Result<String> {
        serde_json::to_string(&self.document()).map_err(ReportError::from)
    }

    /// Generates pretty-printed JSON output with indentation.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    pub fn generate_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.document()).map_err(ReportError::from)
    }

    /// Writes the JSON report to `path`, creating or overwriting it.
    ///
    /// Parent directories must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Serialization`] if JSON serialization fails.
    /// Returns [`ReportError::Io`] if file creation or writing fails.
    pub fn write_to_file(&self, path: &Path, pretty: bool) -> Result<()> {
        let json = if pretty {
            self.generate_pretty()?
        } else {
            self.generate()?
        };

        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;

        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::fixtures;

    fn sample_report() -> SessionReport {
        SessionReport::at(
            "Builtin levels",
            fixtures::summary(),
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 5, 32).unwrap(),
        )
    }

    #[test]
    fn test_generate_compact_json() {
        let report = sample_report();
        let json = JsonGenerator::new(&report).generate().unwrap();

        assert!(!json.contains('\n'));
        assert!(json.contains(r#""title":"Builtin levels""#));
        assert!(json.contains(r#""totalAttempts":11"#));
        assert!(json.contains(r#""rank":"infiltrator""#));
        assert!(json.contains(r#""state":"locked""#));
    }

    #[test]
    fn test_generate_pretty_json() {
        let report = sample_report();
        let json = JsonGenerator::new(&report).generate_pretty().unwrap();

        assert!(json.contains('\n'));
        assert!(json.contains("  "));
        assert!(json.contains("\"durationSeconds\": 332"));
    }

    #[test]
    fn test_json_includes_recommendations() {
        let report = sample_report();
        let json = JsonGenerator::new(&report).generate().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let recs = value["recommendations"].as_array().unwrap();
        assert_eq!(recs.len(), 5);
        assert_eq!(recs[0]["category"], "stealth");
        assert_eq!(recs[0]["priority"], 1);
    }

    #[test]
    fn test_json_roundtrip_ignores_recommendations() {
        let report = sample_report();
        let json = JsonGenerator::new(&report).generate().unwrap();
        let parsed: SessionReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn test_write_to_file() {
        let report = sample_report();
        let generator = JsonGenerator::new(&report);
        let file_path = std::env::temp_dir().join("vault-test-report.json");

        generator.write_to_file(&file_path, true).unwrap();
        let contents = std::fs::read_to_string(&file_path).unwrap();
        assert!(contents.contains('\n'));
        assert!(contents.contains("\"Builtin levels\""));

        generator.write_to_file(&file_path, false).unwrap();
        let contents = std::fs::read_to_string(&file_path).unwrap();
        assert!(!contents.contains('\n'));

        std::fs::remove_file(&file_path).unwrap();
    }

    #[test]
    fn test_write_to_file_invalid_path() {
        let report = sample_report();
        let result =
            JsonGenerator::new(&report).write_to_file(Path::new("/nonexistent/dir/report.json"), true);

        assert!(matches!(result.unwrap_err(), ReportError::Io(_)));
    }
}
