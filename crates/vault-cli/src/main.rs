//! Prompt Vault CLI
//!
//! Plays a Prompt Vault session in the terminal.

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;
use vault_engine::{
    meters, Advance, Catalog, EngineConfig, ExampleReveal, Level, Outcome, Session,
    SessionDriver, SessionEvent, SessionSummary, VaultState,
};
use vault_report::{json::JsonGenerator, MarkdownGenerator, SessionReport};

/// Report title used when playing the builtin levels.
const BUILTIN_TITLE: &str = "Builtin levels";

/// Prompt Vault - talk your way past the vault
///
/// Each level guards a vault. Write a prompt that covers every required
/// element without tripping a red flag.
#[derive(Parser, Debug)]
#[command(name = "vault")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to a level catalog JSON file (overrides the config file)
    #[arg(long, value_name = "FILE")]
    catalog: Option<PathBuf>,

    /// Path to configuration file (default: vault.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,

    /// Write Markdown and JSON debriefs to this directory on exit
    #[arg(short, long, value_name = "DIR")]
    report: Option<PathBuf>,
}

/// A parsed line of terminal input.
#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Hint,
    Example,
    Reset,
    Next,
    Restart,
    Meters(Option<&'a str>),
    Quit,
    Help,
    Unknown(&'a str),
    Prompt(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        let line = line.trim();
        let Some(rest) = line.strip_prefix(':') else {
            return Self::Prompt(line);
        };
        let (name, arg) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, None), |(name, arg)| (name, Some(arg.trim())));
        match name {
            "hint" => Self::Hint,
            "example" => Self::Example,
            "reset" => Self::Reset,
            "next" => Self::Next,
            "restart" => Self::Restart,
            "meters" => Self::Meters(arg.filter(|arg| !arg.is_empty())),
            "quit" | "q" => Self::Quit,
            "help" => Self::Help,
            _ => Self::Unknown(name),
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, catalog = ?args.catalog, "Starting Prompt Vault");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Loads configuration and catalog, then plays until finish or quit.
#[allow(clippy::too_many_lines)]
async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    if let Some(catalog) = args.catalog {
        config.catalog = Some(catalog);
    }
    config.validate()?;

    let catalog = Arc::new(config.load_catalog()?);
    let title = report_title(&config);
    print_intro(&title, &catalog);

    let driver = SessionDriver::new(Session::new(
        Arc::clone(&catalog),
        config.session_settings(),
    ));
    let printer = tokio::spawn(print_events(driver.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut last_prompt = String::new();
    let mut briefed = None;

    loop {
        let (index, state) = driver
            .inspect(|session| (session.current_index(), session.current_state().vault_state()))
            .await;
        if state == VaultState::Briefing && briefed != Some(index) {
            print_briefing(index, &catalog.levels()[index]);
            briefed = Some(index);
        }

        let line = tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            line = lines.next_line() => line?,
        };
        // stdin closed
        let Some(line) = line else { break };

        match Command::parse(&line) {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Unknown(name) => println!("  Unknown command :{name}. Type :help."),
            Command::Hint => {
                if driver.request_hint().await.is_none() {
                    println!("  No more hints on this level.");
                }
            }
            Command::Example => match driver.reveal_example().await {
                Some(example) => autotype(&example, &config).await,
                None => println!("  The example unlocks once every hint is revealed."),
            },
            Command::Reset => driver.reset_level().await,
            Command::Restart => {
                driver.restart().await;
                briefed = None;
                last_prompt.clear();
            }
            Command::Next => match driver.advance().await {
                Ok(Advance::Next(_)) => last_prompt.clear(),
                Ok(Advance::Finished(summary)) => {
                    println!("  Every vault is open. Rank: {}", summary.rank);
                    break;
                }
                Err(e) => println!("  {e}"),
            },
            Command::Meters(text) => {
                let text = text.unwrap_or(last_prompt.as_str()).to_string();
                let readings = driver
                    .inspect(|session| meters(&text, session.current_level()))
                    .await;
                println!(
                    "  specificity {:>3} | clarity {:>3} | stealth {:>3}",
                    readings.specificity, readings.clarity, readings.stealth
                );
            }
            Command::Prompt(text) => {
                if state == VaultState::Briefing {
                    driver.accept_briefing().await?;
                    if text.is_empty() {
                        continue;
                    }
                }
                driver.edit().await;
                match driver.submit(text).await {
                    Ok(()) => text.clone_into(&mut last_prompt),
                    Err(e) if e.is_rejection() => {
                        tracing::debug!(error = %e, "Prompt ignored");
                        if !text.is_empty() {
                            println!("  The vault is not listening right now.");
                        }
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
    }

    let summary = driver.summary().await;
    printer.abort();

    println!();
    print_summary(&summary);

    if let Some(dir) = args.report {
        write_reports(&title, summary, &dir)?;
    }

    Ok(())
}

/// Loads configuration from the given path or from `vault.json` in the
/// current directory.
fn load_config(config_path: Option<&Path>) -> anyhow::Result<EngineConfig> {
    match config_path {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Ok(EngineConfig::load_from_file(path)?)
        }
        None => Ok(EngineConfig::load_from_dir(Path::new("."))?),
    }
}

fn report_title(config: &EngineConfig) -> String {
    config
        .catalog
        .as_deref()
        .and_then(Path::file_stem)
        .map_or_else(
            || BUILTIN_TITLE.to_string(),
            |stem| stem.to_string_lossy().to_string(),
        )
}

/// Types the example out a few characters at a time.
async fn autotype(example: &str, config: &EngineConfig) {
    let mut stdout = std::io::stdout();
    for prefix in ExampleReveal::new(example, config.autotype_chars_per_step) {
        print!("\r  {prefix}");
        let _ = stdout.flush();
        tokio::time::sleep(config.autotype_interval()).await;
    }
    println!();
}

/// Prints session events until the channel closes.
async fn print_events(mut events: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => print_event(&event),
            Err(RecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Event printer fell behind");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::LevelStarted { level_id, .. } => {
            tracing::debug!(level = %level_id, "Level started");
            println!("  Vault locked. Write your prompt.");
        }
        SessionEvent::Submitted { attempt, .. } => {
            println!("  Analyzing... (attempt {attempt})");
        }
        SessionEvent::Revealed {
            feedback,
            newly_completed,
            ..
        } => {
            let result = &feedback.result;
            println!(
                "  [{}] {}/{} elements",
                feedback.outcome,
                result.matched_count(),
                result.total_elements
            );
            println!("  {}", feedback.message);
            if feedback.outcome == Outcome::Alarm {
                println!("  Flagged: {}", result.flagged_terms.join(", "));
            }
            if *newly_completed {
                println!("  Vault open. Type :next to continue.");
            }
        }
        SessionEvent::CooledDown { .. } => println!("  Alarm cleared. The vault is locked."),
        SessionEvent::HintRevealed { label, .. } => println!("  Hint: {label}"),
        SessionEvent::LevelReset { .. } => println!("  Level reset."),
        SessionEvent::Advanced { .. } | SessionEvent::Finished { .. } => {}
        SessionEvent::Restarted => println!("  Starting over."),
    }
}

fn print_intro(title: &str, catalog: &Catalog) {
    println!("Prompt Vault: {title} ({} levels)", catalog.len());
    println!("Type :help for commands.");
}

fn print_briefing(index: usize, level: &Level) {
    println!();
    println!(
        "Level {}: {} [{}]",
        index + 1,
        level.name(),
        level.difficulty_label()
    );
    println!(
        "  The guard expects {} things from you.",
        level.required_elements().len()
    );
    println!("  Press Enter to begin, or start typing your prompt.");
}

fn print_help() {
    println!("  :hint           reveal the next required element");
    println!("  :example        show the example prompt (after all hints)");
    println!("  :meters [TEXT]  rate TEXT, or your last prompt");
    println!("  :reset          reset the current level");
    println!("  :next           move to the next level once cleared");
    println!("  :restart        start the whole session over");
    println!("  :quit           stop playing");
    println!("  anything else is sent to the vault as a prompt");
}

fn print_summary(summary: &SessionSummary) {
    println!("=== Prompt Vault Summary ===");
    println!(
        "Levels cleared: {} / {}",
        summary.completed_levels,
        summary.level_count()
    );
    println!("Attempts: {}", summary.total_attempts);
    println!("Alarms: {}", summary.total_alarms);
    println!("Hints used: {}", summary.total_hints);
    println!("Rank: {}", summary.rank);
}

/// Writes Markdown and JSON debriefs into `output_dir`.
fn write_reports(title: &str, summary: SessionSummary, output_dir: &Path) -> anyhow::Result<()> {
    println!();
    println!("Generating reports...");

    let report = SessionReport::new(title, summary);
    report.validate()?;

    std::fs::create_dir_all(output_dir)?;

    let md_path = output_dir.join("vault-report.md");
    std::fs::write(&md_path, MarkdownGenerator::new(&report).generate())?;
    println!("  Markdown report: {}", md_path.display());

    let json_path = output_dir.join("vault-report.json");
    JsonGenerator::new(&report).write_to_file(&json_path, true)?;
    println!("  JSON report: {}", json_path.display());

    Ok(())
}
