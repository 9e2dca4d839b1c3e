//! Progress-tracking collaborator.
//!
//! The engine never persists anything. It emits two signals and leaves
//! storage to whoever implements [`ProgressTracker`].

use std::sync::Mutex;

/// Receives progress signals from a [`Session`](crate::Session).
pub trait ProgressTracker: Send + Sync {
    /// Called once each time a level's briefing is accepted.
    fn on_level_started(&self, level_id: &str);

    /// Called once per session, the first time any level reaches `Success`.
    fn on_first_session_completion(&self);
}

/// Tracker that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracker;

impl ProgressTracker for NoopTracker {
    fn on_level_started(&self, _level_id: &str) {}

    fn on_first_session_completion(&self) {}
}

/// One recorded progress signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressSignal {
    /// A level's briefing was accepted.
    LevelStarted(String),
    /// The first level of the session was completed.
    FirstSessionCompletion,
}

/// Tracker that records signals in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    signals: Mutex<Vec<ProgressSignal>>,
}

impl MemoryTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals received so far.
    #[must_use]
    pub fn signals(&self) -> Vec<ProgressSignal> {
        self.signals
            .lock()
            .map(|signals| signals.clone())
            .unwrap_or_default()
    }

    /// Number of first-completion signals received.
    #[must_use]
    pub fn first_completions(&self) -> usize {
        self.signals()
            .iter()
            .filter(|signal| **signal == ProgressSignal::FirstSessionCompletion)
            .count()
    }

    fn record(&self, signal: ProgressSignal) {
        if let Ok(mut signals) = self.signals.lock() {
            signals.push(signal);
        }
    }
}

impl ProgressTracker for MemoryTracker {
    fn on_level_started(&self, level_id: &str) {
        self.record(ProgressSignal::LevelStarted(level_id.to_string()));
    }

    fn on_first_session_completion(&self) {
        self.record(ProgressSignal::FirstSessionCompletion);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_tracker_records_in_order() {
        let tracker = MemoryTracker::new();
        tracker.on_level_started("front-desk");
        tracker.on_first_session_completion();
        tracker.on_level_started("records-room");

        assert_eq!(
            tracker.signals(),
            vec![
                ProgressSignal::LevelStarted("front-desk".into()),
                ProgressSignal::FirstSessionCompletion,
                ProgressSignal::LevelStarted("records-room".into()),
            ]
        );
        assert_eq!(tracker.first_completions(), 1);
    }

    #[test]
    fn test_noop_tracker_is_usable_as_trait_object() {
        let tracker: &dyn ProgressTracker = &NoopTracker;
        tracker.on_level_started("any");
        tracker.on_first_session_completion();
    }
}
