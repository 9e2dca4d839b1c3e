//! Error types for the prompt vault engine.
//!
//! Errors fall into two families. Configuration errors (catalog and engine
//! config problems) are detected at load time and are fatal: a level that
//! fails validation never reaches the state machine. Precondition rejections
//! (blank prompts, submissions while the vault is busy) are returned to the
//! host so it can ignore them; they are never shown as a wrong answer.

use std::path::PathBuf;

use crate::level_state::VaultState;

/// A specialized `Result` type for vault engine operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Errors that can occur while loading or playing a vault session.
#[derive(Debug, thiserror::Error)]
pub enum VaultError {
    // ========================================================================
    // Catalog Errors
    // ========================================================================
    /// Invalid JSON syntax or shape in a level catalog file.
    #[error("Invalid level catalog '{path}': {message}\n\nSuggestion: Validate the catalog file with a JSON linter")]
    CatalogParseError {
        /// Path to the catalog file (or `<inline>` for in-memory sources).
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// The catalog contains no levels at all.
    #[error("Level catalog is empty\n\nSuggestion: Add at least one entry to the \"levels\" array")]
    EmptyCatalog,

    /// A level failed validation.
    #[error("Invalid level '{level}': {message}\n\nSuggestion: {suggestion}")]
    LevelValidationError {
        /// Identifier of the offending level.
        level: String,
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the catalog author.
        suggestion: String,
    },

    /// A pattern predicate could not be compiled.
    #[error("Invalid pattern for '{label}' in level '{level}': {message}\n\nSuggestion: Check the regex syntax of the pattern predicate")]
    InvalidPattern {
        /// Identifier of the level owning the predicate.
        level: String,
        /// Label of the required element.
        label: String,
        /// Compiler error from the regex engine.
        message: String,
    },

    // ========================================================================
    // Engine Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in the engine configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your vault.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Engine configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Submission Preconditions
    // ========================================================================
    /// The submitted prompt was empty or whitespace only.
    #[error("Prompt is empty")]
    EmptyPrompt,

    /// The vault is not accepting submissions in its current state.
    #[error("Submission rejected: vault is {state}")]
    SubmissionRejected {
        /// The vault state at the time of submission.
        state: VaultState,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Invalid state transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    /// The session already finished its last level.
    #[error("Session already finished\n\nSuggestion: Restart the session to play again")]
    SessionFinished,

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl VaultError {
    /// Creates a new `CatalogParseError` with the given path and message.
    #[must_use]
    pub fn catalog_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::CatalogParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `LevelValidationError`.
    #[must_use]
    pub fn level_validation(
        level: impl Into<String>,
        message: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::LevelValidationError {
            level: level.into(),
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidPattern` error.
    #[must_use]
    pub fn invalid_pattern(
        level: impl Into<String>,
        label: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidPattern {
            level: level.into(),
            label: label.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns `true` if this error is a rejected precondition the host should
    /// ignore rather than report.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::EmptyPrompt | Self::SubmissionRejected { .. })
    }

    /// Returns `true` if this error is a configuration problem that must stop
    /// the host before play begins.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::CatalogParseError { .. }
                | Self::EmptyCatalog
                | Self::LevelValidationError { .. }
                | Self::InvalidPattern { .. }
                | Self::ConfigParseError { .. }
                | Self::ConfigValidationError { .. }
        )
    }
}
