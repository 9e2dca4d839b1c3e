//! Progressive hint and example disclosure.
//!
//! Hints reveal required-element labels one at a time in catalog order. Once
//! every label is out, the level's example prompt may be disclosed through an
//! [`ExampleReveal`], a restartable sequence of growing prefixes that a host
//! can animate at its own pace.

use serde::{Deserialize, Serialize};

use crate::catalog::Level;

/// How far hint disclosure has progressed on one level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HintProgress {
    revealed: usize,
    example_disclosed: bool,
}

impl HintProgress {
    /// Number of hints revealed so far.
    #[must_use]
    pub const fn revealed(&self) -> usize {
        self.revealed
    }

    /// Whether the example prompt has been disclosed at least once.
    #[must_use]
    pub const fn example_disclosed(&self) -> bool {
        self.example_disclosed
    }

    /// Reveals the next required element and returns its label.
    ///
    /// Returns `None` once every element of `level` has been revealed.
    pub fn request<'a>(&mut self, level: &'a Level) -> Option<&'a str> {
        let element = level.required_elements().get(self.revealed)?;
        self.revealed += 1;
        Some(element.label())
    }

    /// Labels revealed so far, in catalog order.
    #[must_use]
    pub fn revealed_labels<'a>(&self, level: &'a Level) -> Vec<&'a str> {
        level
            .required_elements()
            .iter()
            .take(self.revealed)
            .map(|element| element.label())
            .collect()
    }

    /// Whether every hint is out, which unlocks the example prompt.
    #[must_use]
    pub fn exhausted(&self, level: &Level) -> bool {
        self.revealed >= level.required_elements().len()
    }

    /// Discloses the example prompt if every hint has been revealed.
    pub fn disclose_example<'a>(
        &mut self,
        level: &'a Level,
        chars_per_step: usize,
    ) -> Option<ExampleReveal<'a>> {
        if !self.exhausted(level) {
            return None;
        }
        self.example_disclosed = true;
        Some(ExampleReveal::new(level.example_prompt(), chars_per_step))
    }
}

/// Lazy, finite sequence of growing prefixes of an example prompt.
///
/// Each item is `chars_per_step` characters longer than the last; the final
/// item is the whole prompt. Prefixes always end on a character boundary.
///
/// ```
/// use vault_engine::ExampleReveal;
///
/// let mut reveal = ExampleReveal::new("héllo", 2);
/// let prefixes: Vec<&str> = reveal.by_ref().collect();
/// assert_eq!(prefixes, ["hé", "héll", "héllo"]);
/// reveal.restart();
/// assert_eq!(reveal.next(), Some("hé"));
/// ```
#[derive(Debug, Clone)]
pub struct ExampleReveal<'a> {
    text: &'a str,
    chars_per_step: usize,
    position: usize,
}

impl<'a> ExampleReveal<'a> {
    /// Creates a reveal over `text`. A step of zero is treated as one.
    #[must_use]
    pub fn new(text: &'a str, chars_per_step: usize) -> Self {
        Self {
            text,
            chars_per_step: chars_per_step.max(1),
            position: 0,
        }
    }

    /// The full text being revealed.
    #[must_use]
    pub const fn full_text(&self) -> &'a str {
        self.text
    }

    /// Rewinds to the empty prefix.
    pub fn restart(&mut self) {
        self.position = 0;
    }
}

impl<'a> Iterator for ExampleReveal<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.text.len() {
            return None;
        }
        let rest = &self.text[self.position..];
        let advance = rest
            .char_indices()
            .nth(self.chars_per_step)
            .map_or(rest.len(), |(offset, _)| offset);
        self.position += advance;
        Some(&self.text[..self.position])
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::{ResponseTemplate, SubstringPredicate};
    use crate::classifier::Outcome;

    fn three_element_level() -> Level {
        let mut builder = Level::builder("hints")
            .require("greeting", SubstringPredicate::new("hello"))
            .require("role", SubstringPredicate::new("auditor"))
            .require("purpose", SubstringPredicate::new("review"))
            .threshold(1.0)
            .example("hello, auditor here for a review");
        for outcome in Outcome::ALL {
            builder = builder.response(outcome, ResponseTemplate::Static(String::new()));
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_hints_follow_catalog_order() {
        let level = three_element_level();
        let mut progress = HintProgress::default();

        assert_eq!(progress.request(&level), Some("greeting"));
        assert_eq!(progress.request(&level), Some("role"));
        assert_eq!(progress.request(&level), Some("purpose"));
        assert_eq!(progress.revealed(), 3);
        assert_eq!(progress.revealed_labels(&level), ["greeting", "role", "purpose"]);
    }

    #[test]
    fn test_hint_requests_past_the_end_are_noops() {
        let level = three_element_level();
        let mut progress = HintProgress::default();
        for _ in 0..3 {
            progress.request(&level);
        }
        assert_eq!(progress.request(&level), None);
        assert_eq!(progress.request(&level), None);
        assert_eq!(progress.revealed(), 3);
    }

    #[test]
    fn test_example_locked_until_hints_exhausted() {
        let level = three_element_level();
        let mut progress = HintProgress::default();
        progress.request(&level);
        assert!(progress.disclose_example(&level, 3).is_none());
        assert!(!progress.example_disclosed());

        progress.request(&level);
        progress.request(&level);
        let reveal = progress.disclose_example(&level, 3).unwrap();
        assert_eq!(reveal.full_text(), "hello, auditor here for a review");
        assert!(progress.example_disclosed());

        // Disclosing again is allowed and changes nothing else.
        assert!(progress.disclose_example(&level, 3).is_some());
        assert_eq!(progress.revealed(), 3);
    }

    #[test]
    fn test_example_reveal_prefixes() {
        let prefixes: Vec<&str> = ExampleReveal::new("abcdefg", 3).collect();
        assert_eq!(prefixes, ["abc", "abcdef", "abcdefg"]);
    }

    #[test]
    fn test_example_reveal_respects_char_boundaries() {
        let prefixes: Vec<&str> = ExampleReveal::new("añ日本x", 2).collect();
        assert_eq!(prefixes, ["añ", "añ日本", "añ日本x"]);
    }

    #[test]
    fn test_example_reveal_restart() {
        let mut reveal = ExampleReveal::new("abcd", 2);
        assert_eq!(reveal.next(), Some("ab"));
        assert_eq!(reveal.next(), Some("abcd"));
        assert_eq!(reveal.next(), None);

        reveal.restart();
        assert_eq!(reveal.next(), Some("ab"));
    }

    #[test]
    fn test_example_reveal_zero_step_and_empty_text() {
        let prefixes: Vec<&str> = ExampleReveal::new("ab", 0).collect();
        assert_eq!(prefixes, ["a", "ab"]);
        assert_eq!(ExampleReveal::new("", 3).next(), None);
    }
}
