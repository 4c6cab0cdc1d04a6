mod report;

use anyhow::Context;
use chrono::{Duration, Local, NaiveDate, NaiveTime};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::services::rest_timer::spawn_ticker;
use crate::services::{
    calendar, Aggregator, OfflineQueue, StateStore, SupabaseClient, SyncWorker, ToastLevel,
    WorkoutApi, WorkoutSessionService, WorkoutStore,
};
use crate::types::{Session, SessionKind, WeeklySchedule, WorkoutDay};

/// Offline-first workout tracker
#[derive(Parser)]
#[command(name = "liftlog")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show training statistics (default)
    Stats {
        /// Exported sessions (JSON array); fetched from the API when omitted
        #[arg(long)]
        sessions: Option<PathBuf>,

        /// Weekly schedule (JSON); every day counts as scheduled when omitted
        #[arg(long)]
        schedule: Option<PathBuf>,

        /// Number of days ending today to cover
        #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u32).range(1..=366))]
        days: u32,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start a workout; it stays active until `complete`
    Start {
        #[command(subcommand)]
        kind: StartKind,
    },

    /// Log a completed set for the active workout
    LogSet {
        /// Exercise id
        exercise: String,

        #[arg(long)]
        reps: u32,

        /// Weight in kg
        #[arg(long)]
        weight: Option<f64>,
    },

    /// Finish the active workout
    Complete {
        #[arg(long)]
        notes: Option<String>,
    },

    /// Count down a rest period
    Rest {
        #[arg(value_parser = clap::value_parser!(u32).range(1..=3600))]
        seconds: u32,
    },

    /// List writes waiting in the offline queue
    Queue {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay the offline queue against the hosted database
    Sync,

    /// Drop every queued write
    ClearQueue,
}

#[derive(Subcommand)]
enum StartKind {
    /// Structured plan day
    Weights {
        /// Plan day with its exercises (JSON)
        #[arg(long)]
        day: PathBuf,
    },

    /// Cardio template
    Cardio {
        #[arg(long)]
        template: String,

        /// Display name; defaults to the template id
        #[arg(long)]
        name: Option<String>,

        /// Distance in km
        #[arg(long)]
        distance: Option<f64>,
    },

    /// Mobility template
    Mobility {
        #[arg(long)]
        template: String,

        /// Display name; defaults to the template id
        #[arg(long)]
        name: Option<String>,
    },
}

impl StartKind {
    fn resolve(self) -> anyhow::Result<(SessionKind, Option<WorkoutDay>)> {
        match self {
            StartKind::Weights { day } => {
                let day: WorkoutDay = read_json(&day)?;
                let kind = SessionKind::Weights {
                    day_id: day.id.clone(),
                    day_name: day.name.clone(),
                };
                Ok((kind, Some(day)))
            }
            StartKind::Cardio {
                template,
                name,
                distance,
            } => Ok((
                SessionKind::Cardio {
                    template_name: name.unwrap_or_else(|| template.clone()),
                    template_id: template,
                    distance_km: distance,
                },
                None,
            )),
            StartKind::Mobility { template, name } => Ok((
                SessionKind::Mobility {
                    template_name: name.unwrap_or_else(|| template.clone()),
                    template_id: template,
                },
                None,
            )),
        }
    }
}

/// One write against the active workout
enum WorkoutStep {
    Start {
        kind: SessionKind,
        day: Option<WorkoutDay>,
    },
    LogSet {
        exercise: String,
        reps: u32,
        weight: Option<f64>,
    },
    Complete {
        notes: Option<String>,
    },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::from_env()?;

        match self.command.unwrap_or(Commands::Stats {
            sessions: None,
            schedule: None,
            days: 30,
            json: false,
        }) {
            Commands::Stats {
                sessions,
                schedule,
                days,
                json,
            } => run_stats(&config, sessions.as_deref(), schedule.as_deref(), days, json).await,
            Commands::Start { kind } => {
                let (kind, day) = kind.resolve()?;
                run_workout(&config, WorkoutStep::Start { kind, day }).await
            }
            Commands::LogSet {
                exercise,
                reps,
                weight,
            } => {
                run_workout(
                    &config,
                    WorkoutStep::LogSet {
                        exercise,
                        reps,
                        weight,
                    },
                )
                .await
            }
            Commands::Complete { notes } => {
                run_workout(&config, WorkoutStep::Complete { notes }).await
            }
            Commands::Rest { seconds } => run_rest(seconds).await,
            Commands::Queue { json } => run_queue(&config, json),
            Commands::Sync => run_sync(&config).await,
            Commands::ClearQueue => run_clear_queue(&config),
        }
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing {}", path.display()))
}

/// First date of a window of `days` days ending on `today`
fn window_start(today: NaiveDate, days: u32) -> NaiveDate {
    today - Duration::days(i64::from(days) - 1)
}

async fn run_stats(
    config: &Config,
    sessions_path: Option<&Path>,
    schedule_path: Option<&Path>,
    days: u32,
    json: bool,
) -> anyhow::Result<()> {
    let today = Local::now().date_naive();
    let from = window_start(today, days);

    let sessions: Vec<Session> = match sessions_path {
        Some(path) => read_json(path)?,
        None => {
            let api = SupabaseClient::new(config)?;
            // One day of slack each side; days are matched by local date below
            let start = (from - Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
            let end = (today + Duration::days(2)).and_time(NaiveTime::MIN).and_utc();
            api.list_sessions(start, end).await?
        }
    };

    let schedule = match schedule_path {
        Some(path) => read_json(path)?,
        None => WeeklySchedule::daily(from),
    };

    let calendar_days = calendar::build_days(&sessions, Some(&schedule), from, today);
    let stats = Aggregator::stats(&calendar_days, today);

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print!("{}", report::render_stats(&stats));
    }
    Ok(())
}

fn restore_queue(state: &StateStore) -> OfflineQueue {
    let (contents, warning) = state.load_queue();
    if let Some(warning) = warning {
        eprintln!("[liftlog] Warning: {}", warning);
    }
    OfflineQueue::restore(contents)
}

/// Offline queue and in-progress workout carried between runs
struct Workspace {
    state: StateStore,
    queue: Arc<OfflineQueue>,
    workout: WorkoutStore,
}

impl Workspace {
    fn open(config: &Config) -> anyhow::Result<Self> {
        let state = StateStore::new(config.data_dir.clone());
        let queue = Arc::new(restore_queue(&state));
        let workout = WorkoutStore::from_state(state.load_workout()?);
        Ok(Self {
            state,
            queue,
            workout,
        })
    }

    fn save(&self) -> anyhow::Result<()> {
        self.state.save_queue(&self.queue.snapshot())?;
        self.state.save_workout(&self.workout.snapshot())?;
        Ok(())
    }
}

async fn run_workout(config: &Config, step: WorkoutStep) -> anyhow::Result<()> {
    let workspace = Workspace::open(config)?;
    let api = Arc::new(SupabaseClient::new(config)?);

    // Earlier offline writes go first so this one can use server ids
    SyncWorker::new(workspace.queue.clone(), api.clone())
        .sync_now()
        .await;

    let service = WorkoutSessionService::new(api, workspace.queue.clone(), workspace.workout.clone());
    let result = match step {
        WorkoutStep::Start { kind, day } => service
            .start_session(kind, day)
            .await
            .map(|s| report::render_started(&s)),
        WorkoutStep::LogSet {
            exercise,
            reps,
            weight,
        } => service
            .log_set(&exercise, reps, weight)
            .await
            .map(|set| report::render_set(&set)),
        WorkoutStep::Complete { notes } => service
            .complete_session(notes)
            .await
            .map(|s| report::render_completed(&s)),
    };

    // Errors are reported by the returned error instead
    for toast in service.toasts().visible() {
        if toast.level != ToastLevel::Error {
            eprintln!("[liftlog] {}", toast.message);
        }
    }
    workspace.save()?;

    print!("{}", result?);
    Ok(())
}

async fn run_rest(seconds: u32) -> anyhow::Result<()> {
    let store = WorkoutStore::new();
    let mut changes = store.subscribe();
    let ticker = spawn_ticker(store.clone());
    store.start_rest_timer(seconds);

    let mut stdout = std::io::stdout();
    while changes.changed().await.is_ok() {
        let timer = changes.borrow_and_update().rest_timer;
        write!(stdout, "\rRest {}  ", report::format_clock(timer.seconds))?;
        stdout.flush()?;
        if !timer.active {
            break;
        }
    }
    ticker.abort();
    writeln!(stdout, "\nRest over.")?;
    Ok(())
}

fn run_queue(config: &Config, json: bool) -> anyhow::Result<()> {
    let queue = restore_queue(&StateStore::new(config.data_dir.clone()));
    let entries = queue.entries();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        print!("{}", report::render_queue(&entries));
    }
    Ok(())
}

async fn run_sync(config: &Config) -> anyhow::Result<()> {
    let state = StateStore::new(config.data_dir.clone());
    let queue = Arc::new(restore_queue(&state));
    if queue.is_empty() {
        println!("Nothing to sync.");
        return Ok(());
    }

    let api = Arc::new(SupabaseClient::new(config)?);
    let report = SyncWorker::new(queue.clone(), api).sync_now().await;
    state.save_queue(&queue.snapshot())?;

    print!("{}", report::render_replay(&report));
    Ok(())
}

/// Drops queued entries; id mappings of already synced entities stay
fn run_clear_queue(config: &Config) -> anyhow::Result<()> {
    let state = StateStore::new(config.data_dir.clone());
    let queue = restore_queue(&state);
    let dropped = queue.clear();
    state.save_queue(&queue.snapshot())?;
    println!("Dropped {} queued write(s).", dropped);
    Ok(())
}
