//! Session controller: one play-through of the level catalog.
//!
//! [`Session`] is the single owner of all mutable play state. Hosts thread it
//! explicitly (or share it through [`SessionDriver`](crate::SessionDriver));
//! there is no global state.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, Level};
use crate::classifier::classify;
use crate::config::SessionSettings;
use crate::error::{Result, VaultError};
use crate::hints::ExampleReveal;
use crate::level_state::{Feedback, Fired, LevelSessionState, VaultState};
use crate::progress::{NoopTracker, ProgressTracker};
use crate::summary::{final_rank, LevelSummary, Rank, SessionSummary};
use crate::timer::{ScheduledTimer, TimerKind, TimerSequence, TimerToken};

/// What a fired timer changed.
#[derive(Debug, Clone, PartialEq)]
pub enum TimerOutcome {
    /// A classification result was revealed.
    Revealed {
        /// Level the result belongs to.
        level_index: usize,
        /// The revealed feedback.
        feedback: Feedback,
        /// `true` if this reveal completed the level for the first time.
        newly_completed: bool,
        /// Alarm cool-down the host must run next.
        cooldown: Option<ScheduledTimer>,
    },
    /// An alarm cooled down and the vault is locked again.
    CooledDown {
        /// Level that cooled down.
        level_index: usize,
    },
}

/// Result of [`Session::advance`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// Moved to the level at this index; its briefing is showing.
    Next(usize),
    /// The last level was cleared; the session is over.
    Finished(SessionSummary),
}

/// One play-through across the ordered level catalog.
pub struct Session {
    catalog: Arc<Catalog>,
    settings: SessionSettings,
    tracker: Arc<dyn ProgressTracker>,
    timers: TimerSequence,
    levels: Vec<LevelSessionState>,
    current: usize,
    completed_levels: BTreeSet<usize>,
    first_completion_signaled: bool,
    finished: bool,
    started_at: DateTime<Utc>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("settings", &self.settings)
            .field("current", &self.current)
            .field("levels", &self.levels)
            .field("completed_levels", &self.completed_levels)
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Starts a session at level 0 with a no-op progress tracker.
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, settings: SessionSettings) -> Self {
        let levels = (0..catalog.len()).map(LevelSessionState::new).collect();
        Self {
            catalog,
            settings,
            tracker: Arc::new(NoopTracker),
            timers: TimerSequence::new(),
            levels,
            current: 0,
            completed_levels: BTreeSet::new(),
            first_completion_signaled: false,
            finished: false,
            started_at: Utc::now(),
        }
    }

    /// Replaces the progress tracker.
    #[must_use]
    pub fn with_tracker(mut self, tracker: Arc<dyn ProgressTracker>) -> Self {
        self.tracker = tracker;
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The catalog being played.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Pacing settings.
    #[must_use]
    pub const fn settings(&self) -> SessionSettings {
        self.settings
    }

    /// Index of the current level.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current
    }

    /// The current level's configuration.
    #[must_use]
    pub fn current_level(&self) -> &Level {
        &self.catalog.levels()[self.current]
    }

    /// The current level's play state.
    #[must_use]
    pub fn current_state(&self) -> &LevelSessionState {
        &self.levels[self.current]
    }

    /// Play state of every level, in catalog order.
    #[must_use]
    pub fn level_states(&self) -> &[LevelSessionState] {
        &self.levels
    }

    /// Indices of completed levels.
    #[must_use]
    pub const fn completed_levels(&self) -> &BTreeSet<usize> {
        &self.completed_levels
    }

    /// Whether the last level was cleared and advanced past.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Attempts across all levels.
    #[must_use]
    pub fn total_attempts(&self) -> u32 {
        self.levels.iter().map(LevelSessionState::attempts).sum()
    }

    /// Alarms across all levels.
    #[must_use]
    pub fn total_alarms(&self) -> u32 {
        self.levels.iter().map(LevelSessionState::alarms).sum()
    }

    /// Hints revealed across all levels.
    #[must_use]
    pub fn total_hints(&self) -> usize {
        self.levels.iter().map(|state| state.hints().revealed()).sum()
    }

    /// Rank for the attempts made so far.
    #[must_use]
    pub fn final_rank(&self) -> Rank {
        final_rank(self.total_attempts())
    }

    /// Snapshot of the session for hosts and reports.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        let levels = self
            .catalog
            .levels()
            .iter()
            .zip(&self.levels)
            .map(|(level, state)| LevelSummary {
                id: level.id().to_string(),
                name: level.name().to_string(),
                difficulty: level.difficulty_label().to_string(),
                state: state.vault_state(),
                attempts: state.attempts(),
                alarms: state.alarms(),
                hints_revealed: state.hints().revealed(),
                example_disclosed: state.hints().example_disclosed(),
                completed: state.completed(),
            })
            .collect();

        SessionSummary {
            levels,
            total_attempts: self.total_attempts(),
            total_alarms: self.total_alarms(),
            total_hints: self.total_hints(),
            completed_levels: self.completed_levels.len(),
            finished: self.finished,
            rank: self.final_rank(),
            started_at: self.started_at,
        }
    }

    // ------------------------------------------------------------------------
    // Operations
    // ------------------------------------------------------------------------

    /// Accepts the current level's briefing and signals the level start.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::SessionFinished` after the last level, or
    /// `VaultError::InvalidStateTransition` if the briefing was already
    /// accepted.
    pub fn accept_briefing(&mut self) -> Result<()> {
        self.ensure_running()?;
        self.levels[self.current].accept_briefing()?;
        let level = &self.catalog.levels()[self.current];
        info!(level = level.id(), index = self.current, "Level started");
        self.tracker.on_level_started(level.id());
        Ok(())
    }

    /// Submits a prompt for the current level.
    ///
    /// The prompt is classified immediately, but the result stays hidden
    /// until the returned Analysis timer is fired.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::EmptyPrompt` for blank text and
    /// `VaultError::SubmissionRejected` unless the vault is `Locked`; neither
    /// counts as an attempt. Returns `VaultError::SessionFinished` after the
    /// last level.
    pub fn submit(&mut self, text: &str) -> Result<ScheduledTimer> {
        self.ensure_running()?;
        if text.trim().is_empty() {
            warn!(index = self.current, "Ignoring empty prompt");
            return Err(VaultError::EmptyPrompt);
        }
        let state = &mut self.levels[self.current];
        if !state.vault_state().accepts_submissions() {
            warn!(
                index = self.current,
                state = %state.vault_state(),
                "Ignoring submission"
            );
            return Err(VaultError::SubmissionRejected {
                state: state.vault_state(),
            });
        }

        let level = &self.catalog.levels()[self.current];
        let result = classify(text, level);
        let token = self.timers.issue();
        debug!(
            level = level.id(),
            outcome = %result.outcome,
            matched = result.matched_count(),
            total = result.total_elements,
            %token,
            "Prompt classified"
        );
        state.begin_analysis(result, token)?;

        Ok(ScheduledTimer {
            token,
            kind: TimerKind::Analysis,
            delay: self.settings.analyzing_delay,
            level_index: self.current,
        })
    }

    /// Reports that a scheduled timer elapsed.
    ///
    /// Returns `None` if the timer was canceled or superseded.
    pub fn fire_timer(&mut self, token: TimerToken) -> Option<TimerOutcome> {
        let index = self.current;
        let level = &self.catalog.levels()[index];
        let fired = self.levels[index].fire(token, level, &mut self.timers)?;

        match fired {
            Fired::Revealed {
                feedback,
                newly_completed,
                cooldown,
            } => {
                debug!(level = level.id(), outcome = %feedback.outcome, "Result revealed");
                if newly_completed {
                    self.completed_levels.insert(index);
                    info!(
                        level = level.id(),
                        attempts = self.levels[index].attempts(),
                        "Level completed"
                    );
                    if !self.first_completion_signaled {
                        self.first_completion_signaled = true;
                        self.tracker.on_first_session_completion();
                    }
                }
                let cooldown = cooldown.map(|token| ScheduledTimer {
                    token,
                    kind: TimerKind::AlarmCooldown,
                    delay: self.settings.alarm_cooldown,
                    level_index: index,
                });
                Some(TimerOutcome::Revealed {
                    level_index: index,
                    feedback,
                    newly_completed,
                    cooldown,
                })
            }
            Fired::CooledDown => {
                debug!(level = level.id(), "Alarm cooled down");
                Some(TimerOutcome::CooledDown { level_index: index })
            }
        }
    }

    /// Reports a change to the prompt text. Returns the canceled timer, if any.
    pub fn edit(&mut self) -> Option<TimerToken> {
        self.levels[self.current].edit()
    }

    /// Reveals the next hint on the current level and returns its label.
    pub fn request_hint(&mut self) -> Option<String> {
        let level = &self.catalog.levels()[self.current];
        let label = self.levels[self.current].request_hint(level)?;
        debug!(level = level.id(), hint = label, "Hint revealed");
        Some(label.to_string())
    }

    /// Discloses the current level's example prompt once every hint is out.
    pub fn reveal_example(&mut self) -> Option<ExampleReveal<'_>> {
        let level = &self.catalog.levels()[self.current];
        let reveal =
            self.levels[self.current].reveal_example(level, self.settings.autotype_chars_per_step)?;
        debug!(level = level.id(), "Example disclosed");
        Some(reveal)
    }

    /// Resets the current level. Returns the canceled timer, if any.
    pub fn reset_level(&mut self) -> Option<TimerToken> {
        let canceled = self.levels[self.current].reset();
        debug!(index = self.current, "Level reset");
        canceled
    }

    /// Moves past a cleared level.
    ///
    /// # Errors
    ///
    /// Returns `VaultError::InvalidStateTransition` unless the current vault
    /// is `Success`, or `VaultError::SessionFinished` if already finished.
    pub fn advance(&mut self) -> Result<Advance> {
        self.ensure_running()?;
        let state = &mut self.levels[self.current];
        if state.vault_state() != VaultState::Success {
            return Err(VaultError::invalid_transition(
                state.vault_state(),
                "next level",
            ));
        }
        state.cancel_timers();

        if self.current + 1 >= self.levels.len() {
            self.finished = true;
            let summary = self.summary();
            info!(
                attempts = summary.total_attempts,
                alarms = summary.total_alarms,
                rank = %summary.rank,
                "Session finished"
            );
            return Ok(Advance::Finished(summary));
        }

        self.current += 1;
        debug!(index = self.current, "Advanced to next level");
        Ok(Advance::Next(self.current))
    }

    /// Discards all progress and starts over at level 0.
    ///
    /// Timer tokens keep counting, so timers from the old session can never
    /// match the new one. Returns the canceled timer, if any.
    pub fn restart(&mut self) -> Option<TimerToken> {
        let canceled = self.levels[self.current].cancel_timers();
        let timers = std::mem::take(&mut self.timers);
        let fresh = Self::new(Arc::clone(&self.catalog), self.settings)
            .with_tracker(Arc::clone(&self.tracker));
        *self = Self { timers, ..fresh };
        info!("Session restarted");
        canceled
    }

    fn ensure_running(&self) -> Result<()> {
        if self.finished {
            return Err(VaultError::SessionFinished);
        }
        Ok(())
    }
}
