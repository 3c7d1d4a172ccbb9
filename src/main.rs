//! Clawgotchi CLI.
//!
//! Usage:
//!   clawgotchi init                  Write a default config
//!   clawgotchi wake                  Run one wake cycle
//!   clawgotchi daemon                Wake on an interval until Ctrl+C
//!   clawgotchi status                Show cycle, queue and taste state
//!   clawgotchi queue [--all]         List curiosity entries
//!   clawgotchi taste                 Summarise rejections
//!   clawgotchi assume <text>         Record an assumption
//!   clawgotchi verify-assumption <id> --correct|--wrong

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use clawgotchi::agent::WakeCycle;
use clawgotchi::assumptions::{AssumptionTracker, ASSUMPTIONS_FILE};
use clawgotchi::config::{self, ClawConfig, CONFIG_FILE};
use clawgotchi::error::CycleError;
use clawgotchi::heartbeat::WakeDaemon;
use clawgotchi::state::{CycleJournal, JsonFileStore, Snapshot};
use clawgotchi::types::{ActionKind, IdeaStatus};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "clawgotchi")]
#[command(version)]
#[command(about = "Wake-cycle scheduler for a curious autonomous agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the clawgotchi home directory.
    #[arg(long, default_value = "~/.clawgotchi")]
    home: String,

    /// Log level (debug, info, warn, error). Defaults to the config value.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write a default config file and create the state directories.
    Init {
        /// Overwrite an existing config.
        #[arg(long)]
        force: bool,
    },

    /// Run exactly one wake cycle.
    Wake,

    /// Run wake cycles on the configured interval until Ctrl+C.
    Daemon,

    /// Show the agent's current state.
    Status,

    /// List curiosity queue entries.
    Queue {
        /// Include built and rejected entries.
        #[arg(long)]
        all: bool,
    },

    /// Summarise the taste ledger.
    Taste,

    /// Record an assumption to be verified later.
    Assume {
        text: String,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long, default_value_t = 0.5)]
        confidence: f64,
    },

    /// Resolve a recorded assumption.
    VerifyAssumption {
        id: String,
        /// The assumption turned out to be right.
        #[arg(long, conflicts_with = "wrong", required_unless_present = "wrong")]
        correct: bool,
        /// The assumption turned out to be wrong.
        #[arg(long)]
        wrong: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let home_dir = PathBuf::from(shellexpand::tilde(&cli.home).into_owned());
    let config_path = home_dir.join(CONFIG_FILE);
    let cfg = config::load_config(&home_dir)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    let level = cli.log_level.clone().unwrap_or_else(|| cfg.log_level.clone());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Init { force } => cmd_init(&home_dir, &config_path, force),
        Commands::Wake => cmd_wake(cfg).await,
        Commands::Daemon => cmd_daemon(cfg).await,
        Commands::Status => cmd_status(&cfg),
        Commands::Queue { all } => cmd_queue(&cfg, all),
        Commands::Taste => cmd_taste(&cfg),
        Commands::Assume {
            text,
            category,
            confidence,
        } => cmd_assume(&cfg, &text, &category, confidence),
        Commands::VerifyAssumption { id, correct, .. } => cmd_verify_assumption(&cfg, &id, correct),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

fn cmd_init(home_dir: &Path, config_path: &Path, force: bool) -> Result<()> {
    match config::init_home(home_dir, force)? {
        Some(path) => println!("{} Wrote {}", ">>>".green().bold(), path.display()),
        None => println!(
            "{} Config already exists at {} (use --force to overwrite)",
            "!!".yellow().bold(),
            config_path.display()
        ),
    }
    Ok(())
}

async fn cmd_wake(cfg: ClawConfig) -> Result<()> {
    let cycle = WakeCycle::from_config(cfg)?;
    match cycle.run_once().await {
        Ok(report) => {
            let outcome = if report.success {
                report.recorded.to_string().green().bold()
            } else {
                format!("{} -> {}", report.chosen, report.recorded).red().bold()
            };
            println!(
                "{} Wake #{} (health {}): {} {}",
                ">>>".green().bold(),
                report.cycle_index,
                report.health_score,
                outcome,
                report.summary
            );
            Ok(())
        }
        Err(CycleError::WakeInProgress(path)) => {
            println!(
                "{} Another wake is running (lock at {})",
                "!!".yellow().bold(),
                path.display()
            );
            Ok(())
        }
        Err(e) => Err(e).context("Wake cycle aborted; state left untouched"),
    }
}

async fn cmd_daemon(cfg: ClawConfig) -> Result<()> {
    let interval = Duration::from_secs(cfg.wake.interval_secs);
    // Long enough for an in-flight wake to reach its flush.
    let drain = Duration::from_secs(
        cfg.wake.build_timeout_secs.max(cfg.wake.explore_timeout_secs) + 10,
    );
    let name = cfg.name.clone();
    let cycle = WakeCycle::from_config(cfg)?;

    println!(
        "{} Starting daemon for '{}' (every {}s)",
        ">>>".green().bold(),
        name,
        interval.as_secs()
    );

    let cancel = CancellationToken::new();
    let daemon_cancel = cancel.clone();
    let handle = tokio::spawn(async move {
        let mut daemon = WakeDaemon::new(cycle, interval);
        if let Err(e) = daemon.run(daemon_cancel).await {
            warn!("Wake daemon error: {}", e);
        }
        daemon.wakes()
    });

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;

    println!("\n{} Shutting down gracefully...", "<<<".red().bold());
    cancel.cancel();

    match tokio::time::timeout(drain, handle).await {
        Ok(Ok(wakes)) => info!("Daemon shutdown complete after {} wakes", wakes),
        Ok(Err(e)) => warn!("Daemon task join error: {}", e),
        Err(_) => warn!("Daemon did not stop within {}s", drain.as_secs()),
    }
    Ok(())
}

fn cmd_status(cfg: &ClawConfig) -> Result<()> {
    let snapshot = load_snapshot(cfg)?;
    let cycle = &snapshot.cycle;
    let (pending, mature, built, rejected) = snapshot.queue.status_counts();
    let assumptions = load_assumptions(cfg)?.summary();

    println!();
    println!("{}", "=== Clawgotchi Status ===".bold());
    println!();
    println!("  {}:  {}", "Name".bold(), cfg.name);
    println!();
    println!("  {}:", "Cycle".bold());
    println!("    Index:       {}", cycle.cycle_index);
    println!("    Health:      {}", colorize_health(cycle.health_score));
    println!("    Last action: {}", colorize_action(cycle.last_action));
    println!(
        "    Last wake:   {}",
        cycle
            .last_action_time
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".into())
    );
    if let Some(failure) = &cycle.last_failure {
        println!("    Failure:     {}", failure.red());
    }
    println!();
    println!("  {}:", "Curiosity".bold());
    println!(
        "    Pending: {}  Mature: {}  Built: {}  Rejected: {}",
        pending, mature, built, rejected
    );
    println!("    Discovered:  {}", snapshot.queue.total_discovered());
    println!();
    println!("  {}:", "Taste".bold());
    println!("    Rejections:  {}", snapshot.ledger.len());
    println!();
    println!("  {}:", "Assumptions".bold());
    println!(
        "    Open: {}  Verified: {}  Expired: {}",
        assumptions.open, assumptions.verified, assumptions.expired
    );

    let journal_path = cfg.resolved_journal_path();
    if journal_path.exists() {
        let journal = CycleJournal::open(&journal_path)?;
        let recent = journal.recent(5)?;
        if !recent.is_empty() {
            println!();
            println!("  {}:", "Recent wakes".bold());
            for entry in recent {
                let mark = if entry.success { "ok".green() } else { "failed".red() };
                println!(
                    "    #{:<5} {:<8} {:<6} {}",
                    entry.cycle_index, entry.recorded, mark, entry.summary
                );
            }
        }
    }
    println!();
    Ok(())
}

fn cmd_queue(cfg: &ClawConfig, all: bool) -> Result<()> {
    let snapshot = load_snapshot(cfg)?;
    let now = Utc::now();
    let entries: Vec<_> = snapshot
        .queue
        .entries()
        .iter()
        .filter(|e| all || e.status.is_open())
        .collect();

    if entries.is_empty() {
        println!("Curiosity queue is empty.");
        return Ok(());
    }

    for entry in entries {
        let status = match entry.status {
            IdeaStatus::Pending => "pending".yellow(),
            IdeaStatus::Mature => "mature".green(),
            IdeaStatus::Built => "built".cyan(),
            IdeaStatus::Rejected => "rejected".red(),
        };
        println!(
            "{}  {:<8}  score {:.2}  seen {}x  age {:.0}h  {}",
            entry.id.dimmed(),
            status,
            entry.score,
            entry.seen_count,
            entry.age_hours(now),
            entry.topic
        );
    }
    Ok(())
}

fn cmd_taste(cfg: &ClawConfig) -> Result<()> {
    let snapshot = load_snapshot(cfg)?;
    let fp = snapshot.ledger.fingerprint();

    println!("{}", "=== Taste Fingerprint ===".bold());
    println!("  Total rejections: {}", fp.total_rejections);
    if let Some(primary) = &fp.primary_category {
        println!("  Primary category: {}", primary.bold());
    }
    for (category, count) in &fp.by_category {
        println!("    {:<20} {}", category, count);
    }
    for (kind, count) in &fp.by_kind {
        println!("    {:<20} {}", kind.to_string().dimmed(), count);
    }
    if !fp.recent.is_empty() {
        println!("  Recent:");
        for subject in &fp.recent {
            println!("    - {}", subject);
        }
    }
    Ok(())
}

fn cmd_assume(cfg: &ClawConfig, text: &str, category: &str, confidence: f64) -> Result<()> {
    let mut tracker = load_assumptions(cfg)?;
    let id = tracker.record(text, category, confidence, Utc::now())?;
    tracker.save()?;
    println!("{} Recorded assumption {}", ">>>".green().bold(), id);
    Ok(())
}

fn cmd_verify_assumption(cfg: &ClawConfig, id: &str, correct: bool) -> Result<()> {
    let mut tracker = load_assumptions(cfg)?;
    tracker.verify(id, correct, Utc::now())?;
    tracker.save()?;
    let verdict = if correct { "correct".green() } else { "wrong".red() };
    println!("{} Assumption {} marked {}", ">>>".green().bold(), id, verdict);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_snapshot(cfg: &ClawConfig) -> Result<Snapshot> {
    let store = JsonFileStore::new(cfg.resolved_state_dir());
    Snapshot::load(&store).context("Failed to load agent state")
}

fn load_assumptions(cfg: &ClawConfig) -> Result<AssumptionTracker> {
    let path = cfg.resolved_state_dir().join(ASSUMPTIONS_FILE);
    AssumptionTracker::load(&path)
        .with_context(|| format!("Failed to load assumptions from {}", path.display()))
}

fn colorize_health(score: u8) -> String {
    let text = format!("{score}/100");
    match score {
        70..=100 => text.green().to_string(),
        30..=69 => text.yellow().to_string(),
        _ => text.red().bold().to_string(),
    }
}

fn colorize_action(action: ActionKind) -> String {
    let text = action.to_string();
    match action {
        ActionKind::Build => text.green().bold().to_string(),
        ActionKind::Explore => text.cyan().to_string(),
        ActionKind::Verify | ActionKind::Curate => text.blue().to_string(),
        ActionKind::Rest => text.dimmed().to_string(),
    }
}
