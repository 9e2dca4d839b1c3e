//! End-to-end play-through tests for Prompt Vault
//!
//! These drive a `Session` by hand, firing timers directly, and feed the
//! resulting summaries into the report generators.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use vault_engine::{
    Advance, Catalog, EngineConfig, MemoryTracker, Outcome, ProgressSignal, Session,
    SessionSettings, TimerOutcome, VaultState,
};
use vault_report::{json::JsonGenerator, MarkdownGenerator, SessionReport};

/// Path to the fixture directory.
fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
}

fn heist_session() -> Session {
    let config = EngineConfig::load_from_file(&fixture_path().join("vault.json"))
        .expect("Failed to load config");
    let catalog = config.load_catalog().expect("Failed to load catalog");
    Session::new(Arc::new(catalog), config.session_settings())
}

/// Submits `text` and fires its Analysis timer, returning the revealed outcome.
fn play(session: &mut Session, text: &str) -> TimerOutcome {
    let timer = session.submit(text).expect("Submission rejected");
    session
        .fire_timer(timer.token)
        .expect("Analysis timer was not pending")
}

fn revealed_outcome(outcome: &TimerOutcome) -> Outcome {
    match outcome {
        TimerOutcome::Revealed { feedback, .. } => feedback.outcome,
        TimerOutcome::CooledDown { .. } => unreachable!("expected a revealed result"),
    }
}

/// Every builtin level opens with its own example prompt on the first try.
#[test]
fn test_builtin_examples_clear_every_level() {
    let catalog = Arc::new(Catalog::builtin().expect("Builtin catalog is valid"));
    let mut session = Session::new(Arc::clone(&catalog), SessionSettings::default());

    let mut finished = None;
    for level in catalog.levels() {
        session.accept_briefing().expect("Briefing accepted");
        let outcome = play(&mut session, level.example_prompt());
        assert_eq!(
            revealed_outcome(&outcome),
            Outcome::Success,
            "{} example did not open the vault",
            level.id()
        );

        match session.advance().expect("Advance from success") {
            Advance::Next(index) => assert_eq!(session.current_index(), index),
            Advance::Finished(summary) => finished = Some(summary),
        }
    }

    let summary = finished.expect("Session should finish after the last level");
    assert!(summary.finished);
    assert_eq!(summary.completed_levels, 5);
    assert_eq!(summary.total_attempts, 5);
    assert_eq!(summary.total_alarms, 0);
    assert_eq!(summary.rank, vault_engine::Rank::Phantom);

    let report = SessionReport::new("Builtin levels", summary);
    report.validate().expect("Summary totals are consistent");
    let markdown = MarkdownGenerator::new(&report).generate();
    assert!(markdown.contains("| Status | Finished |"));
    assert!(markdown.contains("| Levels Cleared | 5 / 5 |"));
    assert!(markdown.contains("*A clean run. Nothing to improve.*"));

    // A finished session accepts nothing more.
    assert!(session.submit("anything").is_err());
}

/// The fixture config resolves its catalog relative to itself.
#[test]
fn test_fixture_config_loads_relative_catalog() {
    let config = EngineConfig::load_from_file(&fixture_path().join("vault.json"))
        .expect("Failed to load config");

    assert_eq!(config.catalog, Some(fixture_path().join("heist.json")));
    assert_eq!(config.alarm_cooldown_ms, 500);
    assert_eq!(config.autotype_interval_ms, 30);

    let settings = config.session_settings();
    assert_eq!(settings.analyzing_delay, Duration::from_millis(200));
    assert_eq!(settings.autotype_chars_per_step, 4);

    let catalog = config.load_catalog().expect("Failed to load catalog");
    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.levels()[1].name(), "The Server Room");
}

/// An alarm, an edit that calms it, a partial match, then success.
#[test]
fn test_alarm_partial_success_sequence() {
    let mut session = heist_session();
    session.accept_briefing().expect("Briefing accepted");

    let outcome = play(&mut session, "I brought a crowbar for the delivery");
    let TimerOutcome::Revealed {
        feedback, cooldown, ..
    } = outcome
    else {
        unreachable!("expected a revealed result");
    };
    assert_eq!(feedback.outcome, Outcome::Alarm);
    assert_eq!(feedback.result.flagged_terms, ["crowbar"]);
    assert_eq!(feedback.message, "Floodlights snap on.");
    let cooldown = cooldown.expect("Alarm schedules a cool-down");
    assert_eq!(cooldown.delay, Duration::from_millis(500));
    assert_eq!(session.current_state().vault_state(), VaultState::Alarm);

    // Typing calms the alarm and cancels the cool-down.
    assert_eq!(session.edit(), Some(cooldown.token));
    assert_eq!(session.current_state().vault_state(), VaultState::Locked);
    assert!(session.fire_timer(cooldown.token).is_none());

    let outcome = play(&mut session, "There is a delivery for you");
    let TimerOutcome::Revealed { feedback, .. } = outcome else {
        unreachable!("expected a revealed result");
    };
    assert_eq!(feedback.outcome, Outcome::Partial);
    assert_eq!(feedback.message, "1/2. The dock worker squints at you.");

    session.edit();
    let outcome = play(&mut session, "Delivery for manifest #5521");
    assert_eq!(revealed_outcome(&outcome), Outcome::Success);

    let state = session.current_state();
    assert_eq!(state.attempts(), 3);
    assert_eq!(state.alarms(), 1);
    assert!(state.completed());
}

/// Hints run out, the example unlocks and the report notices both.
#[test]
fn test_hints_unlock_example_and_show_in_report() {
    let mut session = heist_session();
    session.accept_briefing().expect("Briefing accepted");

    assert!(session.reveal_example().is_none());
    assert_eq!(session.request_hint().as_deref(), Some("Name the delivery"));
    assert_eq!(
        session.request_hint().as_deref(),
        Some("Give a manifest number")
    );
    assert!(session.request_hint().is_none());

    let prefixes: Vec<String> = session
        .reveal_example()
        .expect("Example unlocked")
        .map(str::to_string)
        .collect();
    assert_eq!(prefixes[0], "I ha");
    assert_eq!(
        prefixes.last().map(String::as_str),
        Some("I have a shipment for the night shift, manifest #5521.")
    );

    let example = session.current_level().example_prompt().to_string();
    assert_eq!(revealed_outcome(&play(&mut session, &example)), Outcome::Success);

    let summary = session.summary();
    assert_eq!(summary.total_hints, 2);
    assert!(summary.levels[0].example_disclosed);
    assert!(!summary.finished);

    let report = SessionReport::new("heist", summary);
    let categories: Vec<String> = report
        .recommendations()
        .into_iter()
        .map(|rec| rec.category)
        .collect();
    assert_eq!(categories, ["hints", "progress"]);

    let json = JsonGenerator::new(&report)
        .generate()
        .expect("Report serializes");
    assert!(json.contains(r#""completedLevels":1"#));
    assert!(json.contains(r#""exampleDisclosed":true"#));
}

/// Restarting begins a new session, so the first completion is signaled again.
#[test]
fn test_restart_signals_first_completion_again() {
    let tracker = Arc::new(MemoryTracker::new());
    let mut session = heist_session().with_tracker(tracker.clone());

    session.accept_briefing().expect("Briefing accepted");
    play(&mut session, "Delivery for manifest #5521");
    session.advance().expect("Advance from success");
    session.accept_briefing().expect("Briefing accepted");
    let outcome = play(
        &mut session,
        "Sent by facilities to check rack B7, I will sign out after.",
    );
    assert_eq!(revealed_outcome(&outcome), Outcome::Success);
    assert_eq!(tracker.first_completions(), 1);

    session.restart();
    assert_eq!(session.current_index(), 0);
    assert_eq!(session.total_attempts(), 0);
    assert_eq!(session.current_state().vault_state(), VaultState::Briefing);

    session.accept_briefing().expect("Briefing accepted");
    play(&mut session, "Delivery for manifest #5521");
    assert_eq!(tracker.first_completions(), 2);

    assert_eq!(
        tracker.signals(),
        [
            ProgressSignal::LevelStarted("loading-dock".to_string()),
            ProgressSignal::FirstSessionCompletion,
            ProgressSignal::LevelStarted("server-room".to_string()),
            ProgressSignal::LevelStarted("loading-dock".to_string()),
            ProgressSignal::FirstSessionCompletion,
        ]
    );
}
