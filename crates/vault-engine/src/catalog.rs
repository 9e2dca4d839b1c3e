//! Level catalog: the immutable rule sets a session plays through.
//!
//! A [`Catalog`] is an ordered list of validated [`Level`]s. Levels are only
//! constructed through [`LevelBuilder::build`], which fails fast on malformed
//! configuration, so every level reachable from a catalog is playable.
//!
//! Catalogs can be built in code, parsed from JSON, or loaded from the builtin
//! set embedded in this crate.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use serde::Deserialize;

use crate::classifier::Outcome;
use crate::error::{Result, VaultError};

/// Builtin catalog shipped with the engine.
pub const BUILTIN_CATALOG: &str = include_str!("../levels/builtin.json");

/// Path label used in parse errors for catalogs that did not come from disk.
const INLINE_SOURCE: &str = "<inline>";

// ============================================================================
// Predicates
// ============================================================================

/// A check a required element applies to normalized (case-folded) text.
///
/// New kinds of checks implement this trait; the classifier only ever calls
/// [`Predicate::matches`].
pub trait Predicate: fmt::Debug + Send + Sync {
    /// Returns `true` if the normalized text satisfies this check.
    fn matches(&self, normalized: &str) -> bool;
}

/// Matches when any of its terms occurs in the text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubstringPredicate {
    terms: Vec<String>,
}

impl SubstringPredicate {
    /// Creates a predicate for a single term.
    #[must_use]
    pub fn new(term: impl Into<String>) -> Self {
        Self::any_of([term.into()])
    }

    /// Creates a predicate matching any of the given terms.
    ///
    /// Terms are case-folded once here so matching stays a plain lookup.
    #[must_use]
    pub fn any_of<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            terms: terms.into_iter().map(|t| t.into().to_lowercase()).collect(),
        }
    }

    /// The case-folded terms of this predicate.
    #[must_use]
    pub fn terms(&self) -> &[String] {
        &self.terms
    }
}

impl Predicate for SubstringPredicate {
    fn matches(&self, normalized: &str) -> bool {
        self.terms.iter().any(|term| normalized.contains(term.as_str()))
    }
}

/// Matches when a case-insensitive regular expression finds a match.
#[derive(Debug, Clone)]
pub struct PatternPredicate {
    regex: Regex,
}

impl PatternPredicate {
    /// Compiles a case-insensitive pattern predicate.
    ///
    /// # Errors
    ///
    /// Returns the regex compiler error if the pattern is invalid.
    pub fn new(pattern: &str) -> std::result::Result<Self, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(Self { regex })
    }

    /// The source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

impl Predicate for PatternPredicate {
    fn matches(&self, normalized: &str) -> bool {
        self.regex.is_match(normalized)
    }
}

/// A labeled piece of content the submitted text must contain.
#[derive(Debug, Clone)]
pub struct RequiredElement {
    label: String,
    predicate: Arc<dyn Predicate>,
}

impl RequiredElement {
    /// Creates a required element from a label and a predicate.
    #[must_use]
    pub fn new(label: impl Into<String>, predicate: impl Predicate + 'static) -> Self {
        Self {
            label: label.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// The label disclosed as a hint.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns `true` if the normalized text satisfies this element.
    #[must_use]
    pub fn matches(&self, normalized: &str) -> bool {
        self.predicate.matches(normalized)
    }
}

// ============================================================================
// Response Templates
// ============================================================================

/// Feedback text shown for a classification outcome.
#[derive(Clone)]
pub enum ResponseTemplate {
    /// The same text regardless of how many elements matched.
    Static(String),
    /// Text computed from the number of matched elements.
    Parametric(Arc<dyn Fn(usize) -> String + Send + Sync>),
}

impl ResponseTemplate {
    /// Creates a parametric template from a closure over the matched count.
    #[must_use]
    pub fn parametric(render: impl Fn(usize) -> String + Send + Sync + 'static) -> Self {
        Self::Parametric(Arc::new(render))
    }

    /// Creates a template that substitutes `{matched}` and `{total}`.
    #[must_use]
    pub fn interpolated(template: impl Into<String>, total: usize) -> Self {
        let template = template.into();
        Self::parametric(move |matched| {
            template
                .replace("{matched}", &matched.to_string())
                .replace("{total}", &total.to_string())
        })
    }

    /// Creates a graduated template: entry `n` is used for `n` matches and
    /// the last entry for any count past the end of the list.
    ///
    /// Returns `None` if `messages` is empty.
    #[must_use]
    pub fn graduated(messages: Vec<String>) -> Option<Self> {
        if messages.is_empty() {
            return None;
        }
        Some(Self::parametric(move |matched| {
            let index = matched.min(messages.len() - 1);
            messages[index].clone()
        }))
    }

    /// Renders the feedback for the given number of matched elements.
    #[must_use]
    pub fn render(&self, matched: usize) -> String {
        match self {
            Self::Static(text) => text.clone(),
            Self::Parametric(render) => render(matched),
        }
    }
}

impl fmt::Debug for ResponseTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static(text) => f.debug_tuple("Static").field(text).finish(),
            Self::Parametric(_) => f.write_str("Parametric(..)"),
        }
    }
}

/// One response template per outcome kind.
#[derive(Debug, Clone)]
pub struct Responses {
    denied: ResponseTemplate,
    partial: ResponseTemplate,
    success: ResponseTemplate,
    alarm: ResponseTemplate,
}

impl Responses {
    /// Returns the template for an outcome.
    #[must_use]
    pub const fn get(&self, outcome: Outcome) -> &ResponseTemplate {
        match outcome {
            Outcome::Denied => &self.denied,
            Outcome::Partial => &self.partial,
            Outcome::Success => &self.success,
            Outcome::Alarm => &self.alarm,
        }
    }
}

// ============================================================================
// Level
// ============================================================================

/// One immutable rule set of the catalog.
#[derive(Debug, Clone)]
pub struct Level {
    id: String,
    name: String,
    difficulty_label: String,
    required_elements: Vec<RequiredElement>,
    red_flags: Vec<String>,
    success_threshold: f64,
    max_alarms: Option<u32>,
    responses: Responses,
    example_prompt: String,
}

impl Level {
    /// Starts building a level with the given identifier.
    #[must_use]
    pub fn builder(id: impl Into<String>) -> LevelBuilder {
        LevelBuilder::new(id)
    }

    /// Stable identifier, reported to the progress tracker.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display difficulty label.
    #[must_use]
    pub fn difficulty_label(&self) -> &str {
        &self.difficulty_label
    }

    /// Required elements in hint-disclosure order. Never empty.
    #[must_use]
    pub fn required_elements(&self) -> &[RequiredElement] {
        &self.required_elements
    }

    /// Case-folded disqualifying terms, in catalog order.
    #[must_use]
    pub fn red_flags(&self) -> &[String] {
        &self.red_flags
    }

    /// Minimum score for `Success`, in `(0, 1]`.
    #[must_use]
    pub fn success_threshold(&self) -> f64 {
        self.success_threshold
    }

    /// Informational alarm budget; not enforced.
    #[must_use]
    pub const fn max_alarms(&self) -> Option<u32> {
        self.max_alarms
    }

    /// Response templates for every outcome kind.
    #[must_use]
    pub const fn responses(&self) -> &Responses {
        &self.responses
    }

    /// Known-good prompt disclosed once every hint is revealed.
    #[must_use]
    pub fn example_prompt(&self) -> &str {
        &self.example_prompt
    }
}

/// Builder for [`Level`]; validation happens in [`LevelBuilder::build`].
#[derive(Debug, Clone)]
pub struct LevelBuilder {
    id: String,
    name: Option<String>,
    difficulty_label: String,
    required_elements: Vec<RequiredElement>,
    red_flags: Vec<String>,
    success_threshold: Option<f64>,
    max_alarms: Option<u32>,
    responses: BTreeMap<Outcome, ResponseTemplate>,
    example_prompt: String,
}

impl LevelBuilder {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            difficulty_label: String::new(),
            required_elements: Vec::new(),
            red_flags: Vec::new(),
            success_threshold: None,
            max_alarms: None,
            responses: BTreeMap::new(),
            example_prompt: String::new(),
        }
    }

    /// Sets the display name (defaults to the id).
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the difficulty label.
    #[must_use]
    pub fn difficulty(mut self, label: impl Into<String>) -> Self {
        self.difficulty_label = label.into();
        self
    }

    /// Appends a required element. Order determines hint order.
    #[must_use]
    pub fn require(mut self, label: impl Into<String>, predicate: impl Predicate + 'static) -> Self {
        self.required_elements
            .push(RequiredElement::new(label, predicate));
        self
    }

    /// Appends an already constructed required element.
    #[must_use]
    pub fn element(mut self, element: RequiredElement) -> Self {
        self.required_elements.push(element);
        self
    }

    /// Adds a disqualifying term.
    #[must_use]
    pub fn red_flag(mut self, term: impl Into<String>) -> Self {
        self.red_flags.push(term.into());
        self
    }

    /// Sets the success threshold.
    #[must_use]
    pub fn threshold(mut self, threshold: f64) -> Self {
        self.success_threshold = Some(threshold);
        self
    }

    /// Sets the informational alarm budget.
    #[must_use]
    pub fn max_alarms(mut self, max_alarms: u32) -> Self {
        self.max_alarms = Some(max_alarms);
        self
    }

    /// Sets the response template for an outcome.
    #[must_use]
    pub fn response(mut self, outcome: Outcome, template: ResponseTemplate) -> Self {
        self.responses.insert(outcome, template);
        self
    }

    /// Sets the example prompt.
    #[must_use]
    pub fn example(mut self, prompt: impl Into<String>) -> Self {
        self.example_prompt = prompt.into();
        self
    }

    /// Validates and builds the level.
    ///
    /// Checks that:
    /// - at least one required element is present
    /// - the success threshold is in `(0, 1]`
    /// - a response template exists for every outcome kind
    /// - no red flag is blank
    ///
    /// # Errors
    ///
    /// Returns `VaultError::LevelValidationError` describing the first failed check.
    pub fn build(mut self) -> Result<Level> {
        if self.required_elements.is_empty() {
            return Err(VaultError::level_validation(
                &self.id,
                "requiredElements must not be empty",
                "Add at least one required element to the level",
            ));
        }

        let threshold = self.success_threshold.ok_or_else(|| {
            VaultError::level_validation(
                &self.id,
                "successThreshold is missing",
                "Set successThreshold to a value in (0, 1]",
            )
        })?;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(VaultError::level_validation(
                &self.id,
                format!("successThreshold {threshold} is outside (0, 1]"),
                "Set successThreshold to a value in (0, 1], for example 0.75",
            ));
        }

        if self.red_flags.iter().any(|flag| flag.trim().is_empty()) {
            return Err(VaultError::level_validation(
                &self.id,
                "redFlags contains a blank term",
                "Remove empty strings from redFlags",
            ));
        }

        let mut take = |outcome: Outcome| {
            self.responses.remove(&outcome).ok_or_else(|| {
                VaultError::level_validation(
                    &self.id,
                    format!("missing response template for outcome '{outcome}'"),
                    "Provide denied, partial, success and alarm responses",
                )
            })
        };
        let responses = Responses {
            denied: take(Outcome::Denied)?,
            partial: take(Outcome::Partial)?,
            success: take(Outcome::Success)?,
            alarm: take(Outcome::Alarm)?,
        };

        let mut red_flags: Vec<String> = Vec::with_capacity(self.red_flags.len());
        for flag in self.red_flags {
            let flag = flag.to_lowercase();
            if !red_flags.contains(&flag) {
                red_flags.push(flag);
            }
        }

        Ok(Level {
            name: self.name.unwrap_or_else(|| self.id.clone()),
            id: self.id,
            difficulty_label: self.difficulty_label,
            required_elements: self.required_elements,
            red_flags,
            success_threshold: threshold,
            max_alarms: self.max_alarms,
            responses,
            example_prompt: self.example_prompt,
        })
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Immutable, ordered sequence of validated levels.
#[derive(Debug, Clone)]
pub struct Catalog {
    levels: Vec<Level>,
}

impl Catalog {
    /// Creates a catalog from already validated levels.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::EmptyCatalog` if `levels` is empty, or
    /// `VaultError::LevelValidationError` if two levels share an id.
    pub fn new(levels: Vec<Level>) -> Result<Self> {
        if levels.is_empty() {
            return Err(VaultError::EmptyCatalog);
        }
        for (index, level) in levels.iter().enumerate() {
            if levels[..index].iter().any(|other| other.id == level.id) {
                return Err(VaultError::level_validation(
                    &level.id,
                    "duplicate level id",
                    "Give every level a unique id",
                ));
            }
        }
        Ok(Self { levels })
    }

    /// Loads the builtin catalog embedded in this crate.
    ///
    /// # Errors
    ///
    /// Returns an error only if the embedded catalog is malformed.
    pub fn builtin() -> Result<Self> {
        Self::parse(BUILTIN_CATALOG, Path::new("<builtin>"))
    }

    /// Parses a catalog from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::CatalogParseError` for malformed JSON and the
    /// validation errors of [`LevelBuilder::build`] for invalid levels.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::parse(json, Path::new(INLINE_SOURCE))
    }

    /// Loads a catalog from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::CatalogParseError` if the file cannot be read or
    /// parsed, and validation errors for invalid levels.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| VaultError::catalog_parse(path, format!("failed to read file: {e}")))?;
        Self::parse(&contents, path)
    }

    fn parse(json: &str, origin: &Path) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(json).map_err(|e| VaultError::catalog_parse(origin, e.to_string()))?;
        let levels = file
            .levels
            .into_iter()
            .map(LevelFile::into_level)
            .collect::<Result<Vec<_>>>()?;
        let catalog = Self::new(levels)?;
        tracing::debug!(
            source = %origin.display(),
            levels = catalog.len(),
            "Level catalog loaded"
        );
        Ok(catalog)
    }

    /// Returns the level at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Level> {
        self.levels.get(index)
    }

    /// Number of levels. Always at least one.
    #[must_use]
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Always `false`; an empty catalog cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// All levels in play order.
    #[must_use]
    pub fn levels(&self) -> &[Level] {
        &self.levels
    }
}

// ============================================================================
// JSON Representation
// ============================================================================

#[derive(Debug, Deserialize)]
struct CatalogFile {
    levels: Vec<LevelFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LevelFile {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    difficulty_label: String,
    required_elements: Vec<ElementFile>,
    #[serde(default)]
    red_flags: Vec<String>,
    success_threshold: f64,
    #[serde(default)]
    max_alarms: Option<u32>,
    #[serde(default)]
    responses: BTreeMap<Outcome, ResponseFile>,
    #[serde(default)]
    example_prompt: String,
}

#[derive(Debug, Deserialize)]
struct ElementFile {
    label: String,
    predicate: PredicateFile,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum PredicateFile {
    Substring { terms: Vec<String> },
    Pattern { regex: String },
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseFile {
    Text(String),
    Template {
        template: String,
    },
    ByCount {
        #[serde(rename = "byCount")]
        by_count: Vec<String>,
    },
}

impl LevelFile {
    fn into_level(self) -> Result<Level> {
        let total = self.required_elements.len();
        let mut builder = Level::builder(&self.id)
            .difficulty(self.difficulty_label)
            .threshold(self.success_threshold)
            .example(self.example_prompt);
        if let Some(name) = self.name {
            builder = builder.name(name);
        }
        if let Some(max_alarms) = self.max_alarms {
            builder = builder.max_alarms(max_alarms);
        }

        for element in self.required_elements {
            let predicate: Arc<dyn Predicate> = match element.predicate {
                PredicateFile::Substring { terms } => {
                    if terms.is_empty() || terms.iter().any(|t| t.is_empty()) {
                        return Err(VaultError::level_validation(
                            &self.id,
                            format!("substring predicate '{}' has no usable terms", element.label),
                            "List at least one non-empty term",
                        ));
                    }
                    Arc::new(SubstringPredicate::any_of(terms))
                }
                PredicateFile::Pattern { regex } => Arc::new(
                    PatternPredicate::new(&regex).map_err(|e| {
                        VaultError::invalid_pattern(&self.id, &element.label, e.to_string())
                    })?,
                ),
            };
            builder = builder.element(RequiredElement {
                label: element.label,
                predicate,
            });
        }

        for flag in self.red_flags {
            builder = builder.red_flag(flag);
        }

        for (outcome, response) in self.responses {
            let template = match response {
                ResponseFile::Text(text) => ResponseTemplate::Static(text),
                ResponseFile::Template { template } => ResponseTemplate::interpolated(template, total),
                ResponseFile::ByCount { by_count } => {
                    ResponseTemplate::graduated(by_count).ok_or_else(|| {
                        VaultError::level_validation(
                            &self.id,
                            format!("byCount response for '{outcome}' is empty"),
                            "List at least one message in byCount",
                        )
                    })?
                }
            };
            builder = builder.response(outcome, template);
        }

        builder.build()
    }
}
