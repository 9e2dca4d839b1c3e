//! Prompt classification against a level's rule set.
//!
//! [`classify`] is pure: the same text and level always produce the same
//! [`ClassificationResult`]. Red flags are checked first and override any
//! required-element score.

use serde::{Deserialize, Serialize};

use crate::catalog::Level;

/// Minimum score for a `Partial` outcome, independent of element count.
///
/// With three required elements one match scores 0.33 and is `Denied`; with
/// four, two matches score 0.5 and are `Partial`.
pub const PARTIAL_FLOOR: f64 = 0.4;

/// Verdict for one evaluated prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Score below the partial floor.
    Denied,
    /// Score at or above the partial floor but below the level threshold.
    Partial,
    /// Score at or above the level threshold with no red flag.
    Success,
    /// A red flag was present.
    Alarm,
}

impl Outcome {
    /// Every outcome kind, in declaration order.
    pub const ALL: [Self; 4] = [Self::Denied, Self::Partial, Self::Success, Self::Alarm];
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Denied => write!(f, "denied"),
            Self::Partial => write!(f, "partial"),
            Self::Success => write!(f, "success"),
            Self::Alarm => write!(f, "alarm"),
        }
    }
}

/// Result of classifying one prompt against one level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// The verdict.
    pub outcome: Outcome,
    /// Labels of the matched required elements, in catalog order.
    pub matched_elements: Vec<String>,
    /// Number of required elements in the level.
    pub total_elements: usize,
    /// `matched / total`, or `0` on alarm.
    pub score: f64,
    /// Red flags found in the text, in catalog order.
    pub flagged_terms: Vec<String>,
}

impl ClassificationResult {
    /// Number of matched required elements.
    #[must_use]
    pub fn matched_count(&self) -> usize {
        self.matched_elements.len()
    }
}

/// Case-folds text for matching.
#[must_use]
pub fn normalize(text: &str) -> String {
    text.to_lowercase()
}

/// Returns the level's red flags present in `text`, in catalog order.
#[must_use]
pub fn flagged_terms(text: &str, level: &Level) -> Vec<String> {
    flags_in(&normalize(text), level)
}

fn flags_in(normalized: &str, level: &Level) -> Vec<String> {
    level
        .red_flags()
        .iter()
        .filter(|flag| normalized.contains(flag.as_str()))
        .cloned()
        .collect()
}

/// Classifies a prompt against a level.
///
/// Callers reject blank prompts before calling this; a verdict on empty text
/// has no meaning.
#[must_use]
pub fn classify(text: &str, level: &Level) -> ClassificationResult {
    let normalized = normalize(text);
    let total = level.required_elements().len();

    let flagged = flags_in(&normalized, level);
    if !flagged.is_empty() {
        return ClassificationResult {
            outcome: Outcome::Alarm,
            matched_elements: Vec::new(),
            total_elements: total,
            score: 0.0,
            flagged_terms: flagged,
        };
    }

    let matched_elements: Vec<String> = level
        .required_elements()
        .iter()
        .filter(|element| element.matches(&normalized))
        .map(|element| element.label().to_string())
        .collect();

    #[allow(clippy::cast_precision_loss)]
    let score = matched_elements.len() as f64 / total as f64;

    let outcome = if score >= level.success_threshold() {
        Outcome::Success
    } else if score >= PARTIAL_FLOOR {
        Outcome::Partial
    } else {
        Outcome::Denied
    };

    ClassificationResult {
        outcome,
        matched_elements,
        total_elements: total,
        score,
        flagged_terms: Vec::new(),
    }
}
