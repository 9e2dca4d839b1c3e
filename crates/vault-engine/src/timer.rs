//! Logical timers for the Analyzing delay and the Alarm cool-down.
//!
//! The engine never sleeps. A transition that needs to wait hands back a
//! [`ScheduledTimer`]; the host runs the delay however it likes and then
//! reports the token back. A level only honours the token it is currently
//! waiting on, so a timer canceled by reset, advance or restart is ignored
//! even if the host fails to drop it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identifier of one scheduled timer. Unique within a [`TimerSequence`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimerToken(u64);

impl TimerToken {
    /// Raw token value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

/// What a timer does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Reveals the pending classification result.
    Analysis,
    /// Returns the vault from `Alarm` to `Locked`.
    AlarmCooldown,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => write!(f, "analysis"),
            Self::AlarmCooldown => write!(f, "alarm cool-down"),
        }
    }
}

/// A timer the host must run and then report back with
/// [`Session::fire_timer`](crate::Session::fire_timer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledTimer {
    /// Token to report when the delay has elapsed.
    pub token: TimerToken,
    /// What the timer does.
    pub kind: TimerKind,
    /// How long to wait.
    pub delay: Duration,
    /// Index of the level the timer belongs to.
    pub level_index: usize,
}

/// Monotonic source of timer tokens.
#[derive(Debug, Default, Clone)]
pub struct TimerSequence {
    next: u64,
}

impl TimerSequence {
    /// Creates a sequence starting at token 1.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Returns a token never handed out before by this sequence.
    pub fn issue(&mut self) -> TimerToken {
        self.next += 1;
        TimerToken(self.next)
    }
}
