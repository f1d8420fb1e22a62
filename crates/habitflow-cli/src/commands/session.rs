use std::time::Duration;

use clap::Subcommand;
use log::info;
use uuid::Uuid;

use habitflow_core::{
    Config, Database, SessionManager, SessionTicker, SystemClock, TickerOutcome,
};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Start a focus session in the background
    Start {
        /// Habit to attribute the session to
        #[arg(long)]
        habit: Option<Uuid>,
        /// Target length in minutes (5..=240; defaults from config)
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Start a session and keep it ticking in the foreground;
    /// Ctrl-C cancels
    Run {
        /// Habit to attribute the session to
        #[arg(long)]
        habit: Option<Uuid>,
        /// Target length in minutes (5..=240; defaults from config)
        #[arg(long)]
        minutes: Option<u32>,
    },
    /// Print the active session, if any
    Status,
    /// Report elapsed seconds for an active session
    Progress {
        id: Uuid,
        /// Elapsed seconds since the session started
        #[arg(long)]
        elapsed: u64,
    },
    /// Complete an active session
    Complete { id: Uuid },
    /// Cancel an active session
    Cancel { id: Uuid },
    /// List recent sessions
    List {
        #[arg(long, default_value = "10")]
        limit: u32,
    },
}

pub fn run(action: SessionAction) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let manager = SessionManager::with_flush_interval(
        &db,
        SystemClock,
        config.session.progress_flush_secs,
    );

    match action {
        SessionAction::Start { habit, minutes } => {
            let minutes = minutes.unwrap_or(config.session.default_focus_minutes);
            let session = manager.start(habit, minutes)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Run { habit, minutes } => {
            let minutes = minutes.unwrap_or(config.session.default_focus_minutes);
            run_foreground(&manager, habit, minutes, &config)?;
        }
        SessionAction::Status => match manager.active()? {
            Some(session) => {
                println!("{}", serde_json::to_string_pretty(&session)?);
                eprintln!(
                    "elapsed: {}s / {}s",
                    manager.elapsed_secs(&session),
                    session.target_secs
                );
            }
            None => println!("null"),
        },
        SessionAction::Progress { id, elapsed } => {
            let progress = manager.record_progress(id, elapsed)?;
            println!("{}", serde_json::to_string_pretty(&progress.session)?);
            if progress.reached_target {
                eprintln!("target reached; run `session complete {id}`");
            }
        }
        SessionAction::Complete { id } => {
            let session = manager.complete(id)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::Cancel { id } => {
            let session = manager.cancel(id)?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        SessionAction::List { limit } => {
            let sessions = db.list_sessions(limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
    }
    Ok(())
}

/// Drive a session to its deadline with a foreground ticker.
fn run_foreground(
    manager: &SessionManager<'_, SystemClock>,
    habit: Option<Uuid>,
    minutes: u32,
    config: &Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = manager.start(habit, minutes)?;
    println!("{}", serde_json::to_string_pretty(&session)?);
    info!("session {} running for {minutes} minutes", session.id);

    // The ticker owns its own connection; ours keeps serving the manager.
    let ticker_db = Database::open()?;
    let tick = Duration::from_secs(config.session.tick_interval_secs.max(1));

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(async {
        let mut ticker = SessionTicker::spawn(ticker_db, SystemClock, session.id, tick);
        tokio::select! {
            outcome = ticker.wait() => match outcome? {
                TickerOutcome::Completed(done) => {
                    println!("{}", serde_json::to_string_pretty(&done)?);
                }
                TickerOutcome::AlreadyEnded => {
                    eprintln!("session was ended by another caller");
                }
                TickerOutcome::Aborted => {}
            },
            _ = tokio::signal::ctrl_c() => {
                ticker.abort();
                let cancelled = manager.cancel(session.id)?;
                println!("{}", serde_json::to_string_pretty(&cancelled)?);
            }
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}
