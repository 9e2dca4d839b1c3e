//! Async session driver and event broadcasting.
//!
//! [`SessionDriver`] owns a [`Session`] behind a tokio mutex and runs its
//! timers on the tokio clock. Every state change is broadcast as a
//! [`SessionEvent`] so any number of observers (a terminal, a UI, a test) can
//! follow along.
//!
//! # Event Types
//!
//! - `level_started` - A briefing was accepted
//! - `submitted` - A prompt entered analysis
//! - `revealed` - A classification result is on display
//! - `cooled_down` - An alarm ended and the vault is locked again
//! - `hint_revealed` - A required element label was disclosed
//! - `level_reset` - The current level was reset
//! - `advanced` - Play moved to the next level
//! - `finished` - The last level was cleared
//! - `restarted` - The session started over
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use vault_engine::{Catalog, Session, SessionDriver, SessionSettings};
//!
//! # async fn example() -> vault_engine::Result<()> {
//! let catalog = Arc::new(Catalog::builtin()?);
//! let driver = SessionDriver::new(Session::new(catalog, SessionSettings::default()));
//! let mut events = driver.subscribe();
//!
//! driver.accept_briefing().await?;
//! driver.submit("Hello, my name is Sam and I need to check a form, please.").await?;
//!
//! while let Ok(event) = events.recv().await {
//!     println!("{}", event.event_name());
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Result;
use crate::level_state::Feedback;
use crate::session::{Advance, Session, TimerOutcome};
use crate::summary::SessionSummary;
use crate::timer::ScheduledTimer;

// ============================================================================
// Events
// ============================================================================

/// Session events, serialized with "event" and "payload" fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "event",
    content = "payload",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum SessionEvent {
    /// A level's briefing was accepted.
    LevelStarted {
        /// Catalog index of the level.
        level_index: usize,
        /// Level identifier.
        level_id: String,
    },
    /// A prompt was accepted for analysis.
    Submitted {
        /// Catalog index of the level.
        level_index: usize,
        /// Attempts on this level, including this one.
        attempt: u32,
    },
    /// A classification result was revealed.
    Revealed {
        /// Catalog index of the level.
        level_index: usize,
        /// The revealed feedback.
        feedback: Feedback,
        /// `true` if this completed the level for the first time.
        newly_completed: bool,
    },
    /// An alarm cooled down.
    CooledDown {
        /// Catalog index of the level.
        level_index: usize,
    },
    /// A hint was revealed.
    HintRevealed {
        /// Catalog index of the level.
        level_index: usize,
        /// Label of the revealed required element.
        label: String,
    },
    /// The current level was reset.
    LevelReset {
        /// Catalog index of the level.
        level_index: usize,
    },
    /// Play moved to another level.
    Advanced {
        /// Catalog index of the new level.
        level_index: usize,
    },
    /// The session is over.
    Finished {
        /// Final summary.
        summary: SessionSummary,
    },
    /// The session started over.
    Restarted,
}

impl SessionEvent {
    /// Returns the event name as a string.
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::LevelStarted { .. } => "level_started",
            Self::Submitted { .. } => "submitted",
            Self::Revealed { .. } => "revealed",
            Self::CooledDown { .. } => "cooled_down",
            Self::HintRevealed { .. } => "hint_revealed",
            Self::LevelReset { .. } => "level_reset",
            Self::Advanced { .. } => "advanced",
            Self::Finished { .. } => "finished",
            Self::Restarted => "restarted",
        }
    }
}

// ============================================================================
// Event Broadcaster
// ============================================================================

/// Broadcasts session events to all subscribers.
///
/// Events are not kept for subscribers that join later.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<SessionEvent>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with the given per-subscriber buffer.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new subscriber.
    ///
    /// A subscriber that falls behind receives a `Lagged` error and misses
    /// some events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    /// Broadcasts an event. Returns the number of receivers.
    pub fn send(&self, event: SessionEvent) -> usize {
        // send() only fails when nobody is listening
        self.sender.send(event).unwrap_or(0)
    }

    /// Returns the number of active subscribers.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

// ============================================================================
// Session Driver
// ============================================================================

#[derive(Debug)]
struct DriverState {
    session: Session,
    timer_task: Option<JoinHandle<()>>,
}

impl DriverState {
    fn abort_timer_task(&mut self) {
        if let Some(task) = self.timer_task.take() {
            task.abort();
        }
    }
}

/// Runs a [`Session`] on tokio timers and broadcasts its events.
///
/// Cloning is cheap; clones drive the same session.
#[derive(Debug, Clone)]
pub struct SessionDriver {
    state: Arc<Mutex<DriverState>>,
    events: EventBroadcaster,
}

impl SessionDriver {
    /// Wraps a session with a default broadcaster.
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self::with_events(session, EventBroadcaster::default())
    }

    /// Wraps a session with the given broadcaster.
    #[must_use]
    pub fn with_events(session: Session, events: EventBroadcaster) -> Self {
        Self {
            state: Arc::new(Mutex::new(DriverState {
                session,
                timer_task: None,
            })),
            events,
        }
    }

    /// Subscribes to session events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Runs `f` with read access to the session.
    pub async fn inspect<R>(&self, f: impl FnOnce(&Session) -> R) -> R {
        let state = self.state.lock().await;
        f(&state.session)
    }

    /// Current session summary.
    pub async fn summary(&self) -> SessionSummary {
        self.inspect(Session::summary).await
    }

    /// Accepts the current briefing.
    ///
    /// # Errors
    ///
    /// See [`Session::accept_briefing`].
    pub async fn accept_briefing(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        state.session.accept_briefing()?;
        let level_index = state.session.current_index();
        let level_id = state.session.current_level().id().to_string();
        self.events.send(SessionEvent::LevelStarted {
            level_index,
            level_id,
        });
        Ok(())
    }

    /// Submits a prompt and starts its Analysis timer.
    ///
    /// # Errors
    ///
    /// See [`Session::submit`].
    pub async fn submit(&self, text: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let timer = state.session.submit(text)?;
        self.events.send(SessionEvent::Submitted {
            level_index: timer.level_index,
            attempt: state.session.current_state().attempts(),
        });
        state.abort_timer_task();
        state.timer_task = Some(tokio::spawn(run_timers(
            Arc::clone(&self.state),
            self.events.clone(),
            timer,
        )));
        Ok(())
    }

    /// Reports a text edit, canceling an alarm cool-down if one was pending.
    pub async fn edit(&self) {
        let mut state = self.state.lock().await;
        if state.session.edit().is_some() {
            state.abort_timer_task();
        }
    }

    /// Reveals the next hint.
    pub async fn request_hint(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        let label = state.session.request_hint()?;
        self.events.send(SessionEvent::HintRevealed {
            level_index: state.session.current_index(),
            label: label.clone(),
        });
        Some(label)
    }

    /// Discloses the example prompt once every hint is out.
    pub async fn reveal_example(&self) -> Option<String> {
        let mut state = self.state.lock().await;
        state
            .session
            .reveal_example()
            .map(|reveal| reveal.full_text().to_string())
    }

    /// Resets the current level and cancels its timer.
    pub async fn reset_level(&self) {
        let mut state = self.state.lock().await;
        state.session.reset_level();
        state.abort_timer_task();
        self.events.send(SessionEvent::LevelReset {
            level_index: state.session.current_index(),
        });
    }

    /// Moves past a cleared level.
    ///
    /// # Errors
    ///
    /// See [`Session::advance`].
    pub async fn advance(&self) -> Result<Advance> {
        let mut state = self.state.lock().await;
        let advance = state.session.advance()?;
        state.abort_timer_task();
        let event = match &advance {
            Advance::Next(level_index) => SessionEvent::Advanced {
                level_index: *level_index,
            },
            Advance::Finished(summary) => SessionEvent::Finished {
                summary: summary.clone(),
            },
        };
        self.events.send(event);
        Ok(advance)
    }

    /// Discards all progress and starts over.
    pub async fn restart(&self) {
        let mut state = self.state.lock().await;
        state.session.restart();
        state.abort_timer_task();
        self.events.send(SessionEvent::Restarted);
    }
}

/// Sleeps through a timer chain, firing each timer into the session.
async fn run_timers(
    state: Arc<Mutex<DriverState>>,
    events: EventBroadcaster,
    first: ScheduledTimer,
) {
    let mut next = Some(first);
    while let Some(timer) = next.take() {
        debug!(token = %timer.token, kind = %timer.kind, delay = ?timer.delay, "Timer scheduled");
        tokio::time::sleep(timer.delay).await;

        let mut guard = state.lock().await;
        match guard.session.fire_timer(timer.token) {
            Some(TimerOutcome::Revealed {
                level_index,
                feedback,
                newly_completed,
                cooldown,
            }) => {
                events.send(SessionEvent::Revealed {
                    level_index,
                    feedback,
                    newly_completed,
                });
                next = cooldown;
            }
            Some(TimerOutcome::CooledDown { level_index }) => {
                events.send(SessionEvent::CooledDown { level_index });
            }
            None => debug!(token = %timer.token, "Timer no longer pending"),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
