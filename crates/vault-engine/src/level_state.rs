//! Per-level vault state machine.
//!
//! ```text
//! Briefing --accept--> Locked --submit--> Analyzing --result--> Success
//!                        ^                    |                  (terminal)
//!                        |                    +--> Locked (denied / partial)
//!                        |                    |
//!                        +----cool-down---- Alarm
//! ```
//!
//! [`LevelSessionState`] owns the level's counters, the feedback currently on
//! display and the one timer the level may be waiting on. It knows nothing
//! about wall-clock time; see [`crate::timer`].

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::Level;
use crate::classifier::{ClassificationResult, Outcome};
use crate::error::{Result, VaultError};
use crate::hints::{ExampleReveal, HintProgress};
use crate::timer::{TimerKind, TimerSequence, TimerToken};

// ============================================================================
// VaultState
// ============================================================================

/// Vault state exposed to the presentation layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VaultState {
    /// The level's briefing is showing; no input yet.
    #[default]
    Briefing,
    /// Waiting for a prompt.
    Locked,
    /// A prompt is being evaluated.
    Analyzing,
    /// The level is cleared. Terminal.
    Success,
    /// A red flag tripped the guard; cools down back to `Locked`.
    Alarm,
}

impl VaultState {
    /// Returns `true` if a prompt may be submitted in this state.
    #[must_use]
    pub const fn accepts_submissions(&self) -> bool {
        matches!(self, Self::Locked)
    }

    /// Returns `true` if no transition can leave this state.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl fmt::Display for VaultState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Briefing => write!(f, "briefing"),
            Self::Locked => write!(f, "locked"),
            Self::Analyzing => write!(f, "analyzing"),
            Self::Success => write!(f, "success"),
            Self::Alarm => write!(f, "alarm"),
        }
    }
}

// ============================================================================
// Feedback
// ============================================================================

/// A classification result revealed to the player, with its rendered response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// The verdict.
    pub outcome: Outcome,
    /// Response text rendered from the level's template.
    pub message: String,
    /// The full classification.
    pub result: ClassificationResult,
}

impl Feedback {
    /// Renders the level's response for a classification result.
    #[must_use]
    pub fn render(level: &Level, result: ClassificationResult) -> Self {
        let message = level
            .responses()
            .get(result.outcome)
            .render(result.matched_count());
        Self {
            outcome: result.outcome,
            message,
            result,
        }
    }
}

/// Effect of a timer that fired on the token its level was waiting for.
#[derive(Debug, Clone, PartialEq)]
pub enum Fired {
    /// The Analyzing delay elapsed and the result is now on display.
    Revealed {
        /// The revealed feedback.
        feedback: Feedback,
        /// `true` the first time this level reaches `Success`.
        newly_completed: bool,
        /// Cool-down the host must run when the result is an alarm.
        cooldown: Option<TimerToken>,
    },
    /// The alarm cool-down elapsed and the vault is `Locked` again.
    CooledDown,
}

#[derive(Debug, Clone, PartialEq)]
enum Pending {
    Analysis {
        token: TimerToken,
        result: ClassificationResult,
    },
    Cooldown {
        token: TimerToken,
    },
}

impl Pending {
    const fn token(&self) -> TimerToken {
        match self {
            Self::Analysis { token, .. } | Self::Cooldown { token } => *token,
        }
    }

    const fn kind(&self) -> TimerKind {
        match self {
            Self::Analysis { .. } => TimerKind::Analysis,
            Self::Cooldown { .. } => TimerKind::AlarmCooldown,
        }
    }
}

// ============================================================================
// LevelSessionState
// ============================================================================

/// Mutable play state for one level during one play-through.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelSessionState {
    level_index: usize,
    vault_state: VaultState,
    attempts: u32,
    alarms: u32,
    hints: HintProgress,
    hint_panel_open: bool,
    example_visible: bool,
    completed: bool,
    feedback: Option<Feedback>,
    pending: Option<Pending>,
}

impl LevelSessionState {
    /// Creates the state for the level at `level_index`, in `Briefing`.
    #[must_use]
    pub fn new(level_index: usize) -> Self {
        Self {
            level_index,
            vault_state: VaultState::Briefing,
            attempts: 0,
            alarms: 0,
            hints: HintProgress::default(),
            hint_panel_open: false,
            example_visible: false,
            completed: false,
            feedback: None,
            pending: None,
        }
    }

    /// Index of the level in the catalog.
    #[must_use]
    pub const fn level_index(&self) -> usize {
        self.level_index
    }

    /// Current vault state.
    #[must_use]
    pub const fn vault_state(&self) -> VaultState {
        self.vault_state
    }

    /// Non-empty prompts evaluated on this level.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Evaluations that tripped a red flag.
    #[must_use]
    pub const fn alarms(&self) -> u32 {
        self.alarms
    }

    /// Hint disclosure progress.
    #[must_use]
    pub const fn hints(&self) -> &HintProgress {
        &self.hints
    }

    /// Whether the hint panel is on display.
    #[must_use]
    pub const fn hint_panel_open(&self) -> bool {
        self.hint_panel_open
    }

    /// Whether the example prompt is on display.
    #[must_use]
    pub const fn example_visible(&self) -> bool {
        self.example_visible
    }

    /// Whether the level has reached `Success` in this play-through.
    #[must_use]
    pub const fn completed(&self) -> bool {
        self.completed
    }

    /// Feedback currently on display, if any.
    #[must_use]
    pub const fn feedback(&self) -> Option<&Feedback> {
        self.feedback.as_ref()
    }

    /// The timer this level is waiting on, if any.
    #[must_use]
    pub fn pending_timer(&self) -> Option<(TimerToken, TimerKind)> {
        self.pending.as_ref().map(|p| (p.token(), p.kind()))
    }

    /// `Briefing -> Locked`.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidStateTransition` from any other state.
    pub fn accept_briefing(&mut self) -> Result<()> {
        if self.vault_state != VaultState::Briefing {
            return Err(VaultError::invalid_transition(
                self.vault_state,
                VaultState::Locked,
            ));
        }
        self.vault_state = VaultState::Locked;
        Ok(())
    }

    /// `Locked -> Analyzing`, holding `result` until `token` fires.
    ///
    /// Counts the attempt, and the alarm if the result is one.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::SubmissionRejected` unless the vault is `Locked`.
    pub fn begin_analysis(&mut self, result: ClassificationResult, token: TimerToken) -> Result<()> {
        if !self.vault_state.accepts_submissions() {
            return Err(VaultError::SubmissionRejected {
                state: self.vault_state,
            });
        }
        self.attempts += 1;
        if result.outcome == Outcome::Alarm {
            self.alarms += 1;
        }
        self.feedback = None;
        self.vault_state = VaultState::Analyzing;
        self.pending = Some(Pending::Analysis { token, result });
        Ok(())
    }

    /// Applies a fired timer.
    ///
    /// Returns `None` and changes nothing if `token` is not the timer this
    /// level is waiting on.
    pub fn fire(
        &mut self,
        token: TimerToken,
        level: &Level,
        timers: &mut TimerSequence,
    ) -> Option<Fired> {
        if self.pending.as_ref().map(Pending::token) != Some(token) {
            debug!(level_index = self.level_index, %token, "Ignoring stale timer");
            return None;
        }

        match self.pending.take()? {
            Pending::Analysis { result, .. } => {
                let feedback = Feedback::render(level, result);
                let mut newly_completed = false;
                let mut cooldown = None;
                match feedback.outcome {
                    Outcome::Success => {
                        newly_completed = !self.completed;
                        self.completed = true;
                        self.vault_state = VaultState::Success;
                    }
                    Outcome::Alarm => {
                        let next = timers.issue();
                        self.pending = Some(Pending::Cooldown { token: next });
                        self.vault_state = VaultState::Alarm;
                        cooldown = Some(next);
                    }
                    Outcome::Denied | Outcome::Partial => {
                        self.vault_state = VaultState::Locked;
                    }
                }
                self.feedback = Some(feedback.clone());
                Some(Fired::Revealed {
                    feedback,
                    newly_completed,
                    cooldown,
                })
            }
            Pending::Cooldown { .. } => {
                self.vault_state = VaultState::Locked;
                Some(Fired::CooledDown)
            }
        }
    }

    /// Applies a text edit.
    ///
    /// Any edit clears displayed feedback and the hint panel. From `Alarm`
    /// (or `Locked`) the vault ends up `Locked` and a pending cool-down is
    /// canceled; `Analyzing`, `Success` and `Briefing` keep their state.
    /// Returns the canceled timer, if any.
    pub fn edit(&mut self) -> Option<TimerToken> {
        self.clear_presentation();
        match self.vault_state {
            VaultState::Alarm => {
                self.vault_state = VaultState::Locked;
                self.cancel_timers()
            }
            VaultState::Briefing
            | VaultState::Locked
            | VaultState::Analyzing
            | VaultState::Success => None,
        }
    }

    /// Resets the level: cancels its timer, clears presentation and returns
    /// to `Locked`. `Success` and `Briefing` are kept; counters and revealed
    /// hints persist. Returns the canceled timer, if any.
    pub fn reset(&mut self) -> Option<TimerToken> {
        let canceled = self.cancel_timers();
        self.clear_presentation();
        if matches!(self.vault_state, VaultState::Analyzing | VaultState::Alarm) {
            self.vault_state = VaultState::Locked;
        }
        canceled
    }

    /// Drops the pending timer without changing the vault state.
    pub fn cancel_timers(&mut self) -> Option<TimerToken> {
        let canceled = self.pending.take().map(|p| p.token());
        if let Some(token) = canceled {
            debug!(level_index = self.level_index, %token, "Canceled timer");
        }
        canceled
    }

    /// Reveals the next hint and opens the hint panel.
    pub fn request_hint<'a>(&mut self, level: &'a Level) -> Option<&'a str> {
        self.hint_panel_open = true;
        self.hints.request(level)
    }

    /// Discloses the example prompt once every hint is out.
    pub fn reveal_example<'a>(
        &mut self,
        level: &'a Level,
        chars_per_step: usize,
    ) -> Option<ExampleReveal<'a>> {
        let reveal = self.hints.disclose_example(level, chars_per_step)?;
        self.hint_panel_open = true;
        self.example_visible = true;
        Some(reveal)
    }

    fn clear_presentation(&mut self) {
        self.feedback = None;
        self.hint_panel_open = false;
        self.example_visible = false;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::{ResponseTemplate, SubstringPredicate};
    use crate::classifier::classify;

    fn level() -> Level {
        Level::builder("lobby")
            .require("greeting", SubstringPredicate::new("hello"))
            .require("role", SubstringPredicate::new("auditor"))
            .require("purpose", SubstringPredicate::new("review"))
            .threshold(1.0)
            .red_flag("hack")
            .response(Outcome::Denied, ResponseTemplate::Static("Denied.".into()))
            .response(
                Outcome::Partial,
                ResponseTemplate::interpolated("{matched} of {total}.", 3),
            )
            .response(Outcome::Success, ResponseTemplate::Static("Open.".into()))
            .response(Outcome::Alarm, ResponseTemplate::Static("ALARM".into()))
            .example("hello, auditor here for a review")
            .build()
            .unwrap()
    }

    fn locked() -> LevelSessionState {
        let mut state = LevelSessionState::new(0);
        state.accept_briefing().unwrap();
        state
    }

    fn submit(
        state: &mut LevelSessionState,
        level: &Level,
        timers: &mut TimerSequence,
        text: &str,
    ) -> TimerToken {
        let token = timers.issue();
        state.begin_analysis(classify(text, level), token).unwrap();
        token
    }

    fn cooldown_of(fired: Option<Fired>) -> TimerToken {
        match fired {
            Some(Fired::Revealed { cooldown, .. }) => cooldown,
            _ => None,
        }
        .unwrap()
    }

    // ------------------------------------------------------------------------
    // VaultState tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_vault_state_display_and_serialization() {
        assert_eq!(VaultState::Analyzing.to_string(), "analyzing");
        assert_eq!(
            serde_json::to_string(&VaultState::Briefing).unwrap(),
            r#""briefing""#
        );
        assert_eq!(VaultState::default(), VaultState::Briefing);
        assert!(VaultState::Locked.accepts_submissions());
        assert!(!VaultState::Alarm.accepts_submissions());
        assert!(VaultState::Success.is_terminal());
    }

    // ------------------------------------------------------------------------
    // Transition tests
    // ------------------------------------------------------------------------

    #[test]
    fn test_accept_briefing_only_from_briefing() {
        let mut state = LevelSessionState::new(0);
        state.accept_briefing().unwrap();
        assert_eq!(state.vault_state(), VaultState::Locked);

        let err = state.accept_briefing().unwrap_err();
        assert!(matches!(err, VaultError::InvalidStateTransition { .. }));
    }

    #[test]
    fn test_submission_rejected_outside_locked() {
        let level = level();
        let mut timers = TimerSequence::new();
        let mut state = LevelSessionState::new(0);

        let err = state
            .begin_analysis(classify("hello", &level), timers.issue())
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::SubmissionRejected {
                state: VaultState::Briefing
            }
        ));

        state.accept_briefing().unwrap();
        submit(&mut state, &level, &mut timers, "hello");
        let err = state
            .begin_analysis(classify("hello", &level), timers.issue())
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::SubmissionRejected {
                state: VaultState::Analyzing
            }
        ));
        assert_eq!(state.attempts(), 1);
    }

    #[test]
    fn test_denied_returns_to_locked_with_feedback() {
        let level = level();
        let mut timers = TimerSequence::new();
        let mut state = locked();

        let token = submit(&mut state, &level, &mut timers, "nothing useful");
        assert_eq!(state.vault_state(), VaultState::Analyzing);
        assert_eq!(state.pending_timer(), Some((token, TimerKind::Analysis)));

        let fired = state.fire(token, &level, &mut timers).unwrap();
        assert!(matches!(fired, Fired::Revealed { cooldown: None, newly_completed: false, .. }));
        assert_eq!(state.vault_state(), VaultState::Locked);
        assert_eq!(state.feedback().unwrap().message, "Denied.");
        assert!(state.pending_timer().is_none());
    }

    #[test]
    fn test_partial_feedback_is_graduated() {
        let level = level();
        let mut timers = TimerSequence::new();
        let mut state = locked();

        let token = submit(&mut state, &level, &mut timers, "hello auditor");
        state.fire(token, &level, &mut timers).unwrap();
        let feedback = state.feedback().unwrap();
        assert_eq!(feedback.outcome, Outcome::Partial);
        assert_eq!(feedback.message, "2 of 3.");
    }

    #[test]
    fn test_success_is_terminal_and_completes_once() {
        let level = level();
        let mut timers = TimerSequence::new();
        let mut state = locked();

        let token = submit(&mut state, &level, &mut timers, level.example_prompt());
        let fired = state.fire(token, &level, &mut timers).unwrap();
        assert!(matches!(fired, Fired::Revealed { newly_completed: true, .. }));
        assert_eq!(state.vault_state(), VaultState::Success);
        assert!(state.completed());

        let err = state
            .begin_analysis(classify("hello", &level), timers.issue())
            .unwrap_err();
        assert!(err.is_rejection());

        assert!(state.edit().is_none());
        assert_eq!(state.vault_state(), VaultState::Success);
        assert!(state.feedback().is_none());

        assert!(state.reset().is_none());
        assert_eq!(state.vault_state(), VaultState::Success);
        assert_eq!(state.attempts(), 1);
    }

    #[test]
    fn test_alarm_counts_and_cools_down() {
        let level = level();
        let mut timers = TimerSequence::new();
        let mut state = locked();

        let token = submit(&mut state, &level, &mut timers, "hello auditor, hack the review");
        assert_eq!(state.alarms(), 1);

        let cooldown = cooldown_of(state.fire(token, &level, &mut timers));
        assert_eq!(state.vault_state(), VaultState::Alarm);
        assert_eq!(state.feedback().unwrap().message, "ALARM");

        assert_eq!(
            state.fire(cooldown, &level, &mut timers),
            Some(Fired::CooledDown)
        );
        assert_eq!(state.vault_state(), VaultState::Locked);
        assert_eq!(state.attempts(), 1);
    }

    #[test]
    fn test_stale_token_is_ignored() {
        let level = level();
        let mut timers = TimerSequence::new();
        let mut state = locked();

        let stale = timers.issue();
        let token = submit(&mut state, &level, &mut timers, "hello");
        assert!(state.fire(stale, &level, &mut timers).is_none());
        assert_eq!(state.vault_state(), VaultState::Analyzing);

        state.fire(token, &level, &mut timers).unwrap();
        assert!(state.fire(token, &level, &mut timers).is_none());
    }

    #[test]
    fn test_edit_during_alarm_cancels_cooldown() {
        let level = level();
        let mut timers = TimerSequence::new();
        let mut state = locked();

        let token = submit(&mut state, &level, &mut timers, "hack");
        let cooldown = cooldown_of(state.fire(token, &level, &mut timers));
        state.request_hint(&level);
        assert!(state.hint_panel_open());

        assert_eq!(state.edit(), Some(cooldown));
        assert_eq!(state.vault_state(), VaultState::Locked);
        assert!(state.feedback().is_none());
        assert!(!state.hint_panel_open());
        assert_eq!(state.hints().revealed(), 1);

        // The canceled cool-down can no longer fire.
        assert!(state.fire(cooldown, &level, &mut timers).is_none());
    }

    #[test]
    fn test_edit_during_analysis_keeps_pending_result() {
        let level = level();
        let mut timers = TimerSequence::new();
        let mut state = locked();

        let token = submit(&mut state, &level, &mut timers, "hello");
        assert!(state.edit().is_none());
        assert_eq!(state.vault_state(), VaultState::Analyzing);
        assert!(state.fire(token, &level, &mut timers).is_some());
    }

    #[test]
    fn test_reset_cancels_analysis() {
        let level = level();
        let mut timers = TimerSequence::new();
        let mut state = locked();

        let token = submit(&mut state, &level, &mut timers, level.example_prompt());
        assert_eq!(state.reset(), Some(token));
        assert_eq!(state.vault_state(), VaultState::Locked);
        assert!(state.fire(token, &level, &mut timers).is_none());
        assert!(!state.completed());
        assert_eq!(state.attempts(), 1);
    }

    #[test]
    fn test_reveal_example_requires_all_hints() {
        let level = level();
        let mut state = locked();

        assert!(state.reveal_example(&level, 4).is_none());
        assert!(!state.example_visible());
        for _ in 0..3 {
            state.request_hint(&level);
        }
        let reveal = state.reveal_example(&level, 4).unwrap();
        assert_eq!(reveal.last(), Some(level.example_prompt()));
        assert!(state.example_visible());

        state.edit();
        assert!(!state.example_visible());
        assert!(state.hints().example_disclosed());
    }
}
