//! Prompt Vault engine
//!
//! Evaluates free-text prompts against an ordered catalog of access-control
//! levels and drives the per-level vault state machine, hint disclosure and
//! session scoring.
//!
//! ```
//! use std::sync::Arc;
//! use vault_engine::{Catalog, Outcome, Session, SessionSettings, TimerOutcome};
//!
//! let catalog = Arc::new(Catalog::builtin()?);
//! let mut session = Session::new(catalog, SessionSettings::default());
//!
//! session.accept_briefing()?;
//! let timer = session.submit("Hi, my name is Kim and I need to pay an invoice, thank you.")?;
//! let Some(TimerOutcome::Revealed { feedback, .. }) = session.fire_timer(timer.token) else {
//!     unreachable!();
//! };
//! assert_eq!(feedback.outcome, Outcome::Success);
//! # Ok::<(), vault_engine::VaultError>(())
//! ```

pub mod catalog;
pub mod classifier;
pub mod config;
pub mod driver;
pub mod error;
pub mod hints;
pub mod level_state;
pub mod meter;
pub mod progress;
pub mod session;
pub mod summary;
pub mod timer;

pub use catalog::{
    Catalog, Level, LevelBuilder, PatternPredicate, Predicate, RequiredElement, ResponseTemplate,
    Responses, SubstringPredicate, BUILTIN_CATALOG,
};
pub use classifier::{classify, flagged_terms, ClassificationResult, Outcome, PARTIAL_FLOOR};
pub use config::{EngineConfig, SessionSettings, CONFIG_FILE_NAME};
pub use driver::{EventBroadcaster, SessionDriver, SessionEvent};
pub use error::{Result, VaultError};
pub use hints::{ExampleReveal, HintProgress};
pub use level_state::{Feedback, Fired, LevelSessionState, VaultState};
pub use meter::{meters, Meters};
pub use progress::{MemoryTracker, NoopTracker, ProgressSignal, ProgressTracker};
pub use session::{Advance, Session, TimerOutcome};
pub use summary::{final_rank, LevelSummary, Rank, SessionSummary};
pub use timer::{ScheduledTimer, TimerKind, TimerSequence, TimerToken};
