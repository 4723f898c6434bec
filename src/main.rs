//! fitplan - Personal workout plan tracker

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::EnvFilter;

use fitplan::config::{StorageConfig, StorageKind};
use fitplan::db::Storage;
use fitplan::plan::{FileFormat, Plan, ingest};
use fitplan::progress::{week_of, weekday_of};
use fitplan::server::{self, AppState};
use fitplan::timer::{self, RestTimer};
use fitplan::tracker;
use fitplan::tui::App;

#[derive(Parser)]
#[command(name = "fitplan")]
#[command(author, version, about = "Personal workout plan tracker")]
struct Cli {
    #[command(flatten)]
    storage: StorageConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the REST API
    Serve {
        /// Address to bind
        #[arg(long, env = "FITPLAN_BIND", default_value = "127.0.0.1")]
        bind: String,

        /// Port to listen on
        #[arg(short, long, env = "FITPLAN_PORT", default_value = "5000")]
        port: u16,
    },

    /// Import a plan from a .json or .csv file
    Import {
        file: PathBuf,
    },

    /// Check a plan file without storing it
    Validate {
        file: PathBuf,
    },

    /// List stored plans
    Plans,

    /// Show a plan, or one day of it
    Show {
        plan: i64,

        /// Day to show
        #[arg(short, long)]
        day: Option<u32>,
    },

    /// Mark a workout completed
    Complete {
        workout: i64,
    },

    /// Mark an exercise completed
    CompleteExercise {
        exercise: i64,
    },

    /// Show progress for a plan
    Progress {
        plan: i64,
    },

    /// Print a stored plan as JSON
    Export {
        plan: i64,
    },

    /// Run a rest timer countdown
    Timer {
        /// Seconds to count down
        #[arg(short, long, default_value_t = timer::DEFAULT_SECS)]
        secs: u32,
    },

    /// Open the TUI day browser for a plan
    Tui {
        plan: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // The TUI owns the terminal
    if !matches!(cli.command, Commands::Tui { .. }) {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            )
            .init();
    }

    match cli.command {
        Commands::Serve { bind, port } => {
            let state = AppState::new(cli.storage.open()?)?;
            server::run_serve(state, &bind, port).await?;
        }

        Commands::Import { file } => {
            if cli.storage.storage == StorageKind::Memory {
                warn!("Importing into in-memory storage; the plan is discarded on exit");
            }
            let plan = read_plan(&file)?;
            let mut store = cli.storage.open()?;
            let user_id = tracker::ensure_default_user(&mut *store)?;
            let row = tracker::import_plan(&mut *store, user_id, &plan)?;
            println!(
                "Imported: {} - {} days, {} workouts (id: {})",
                row.name,
                row.total_days,
                plan.workouts.len(),
                row.id
            );
        }

        Commands::Validate { file } => {
            let plan = read_plan(&file)?;
            println!(
                "OK: {} - {} days declared, {} workouts, {} exercises",
                plan.name,
                plan.total_days,
                plan.workouts.len(),
                plan.exercise_count()
            );
        }

        Commands::Plans => {
            let store = cli.storage.open()?;
            println!("Workout plans:");
            println!("{:-<60}", "");
            for p in store.plans()? {
                println!(
                    "{:>4} | {:30} | {:>3} days | {}",
                    p.id,
                    p.name,
                    p.total_days,
                    p.created_at.format("%Y-%m-%d")
                );
            }
        }

        Commands::Show { plan, day } => {
            let store = cli.storage.open()?;
            show_plan(&*store, plan, day)?;
        }

        Commands::Complete { workout } => {
            let mut store = cli.storage.open()?;
            let user_id = tracker::ensure_default_user(&mut *store)?;
            let w = tracker::complete_workout(&mut *store, user_id, workout)?
                .with_context(|| format!("workout {workout} not found"))?;
            println!("Completed: day {} - {}", w.day, w.name);
            if let Some(report) = tracker::progress_report(&*store, user_id, w.workout_plan_id)? {
                println!(
                    "Progress: {}/{} days ({}%), streak {}",
                    report.progress.completed_days,
                    report.total_days,
                    report.completion_percentage,
                    report.progress.current_streak
                );
            }
        }

        Commands::CompleteExercise { exercise } => {
            let mut store = cli.storage.open()?;
            let e = tracker::complete_exercise(&mut *store, exercise)?
                .with_context(|| format!("exercise {exercise} not found"))?;
            println!("Completed: {} - {}x{}", e.name, e.sets, e.reps);
        }

        Commands::Progress { plan } => {
            let mut store = cli.storage.open()?;
            let user_id = tracker::ensure_default_user(&mut *store)?;
            let report = tracker::progress_report(&*store, user_id, plan)?
                .with_context(|| format!("no progress for plan {plan}"))?;

            println!("Progress");
            println!("{:-<40}", "");
            println!(
                "Completed: {}/{} days ({}%)",
                report.progress.completed_days, report.total_days, report.completion_percentage
            );
            println!("Next day: {}", report.progress.current_day);
            println!(
                "Streak: {} (longest {})",
                report.progress.current_streak, report.progress.longest_streak
            );
            if let Some(at) = report.progress.last_completed_at {
                println!("Last completed: {}", at.format("%Y-%m-%d %H:%M"));
            }
            if !report.recent_completed_workouts.is_empty() {
                println!("Recent:");
                for w in &report.recent_completed_workouts {
                    let at = w
                        .completed_at
                        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!("  {} | day {:>3} | {}", at, w.day, w.name);
                }
            }
        }

        Commands::Export { plan } => {
            let store = cli.storage.open()?;
            let exported = tracker::export_plan(&*store, plan)?
                .with_context(|| format!("workout plan {plan} not found"))?;
            println!("{}", serde_json::to_string_pretty(&exported)?);
        }

        Commands::Timer { secs } => {
            run_timer(secs).await?;
        }

        Commands::Tui { plan } => {
            let mut app = App::new(cli.storage.open()?, plan)?;
            app.run()?;
        }
    }

    Ok(())
}

fn read_plan(file: &Path) -> Result<Plan> {
    let format = FileFormat::from_path(file)?;
    let bytes = std::fs::read(file).with_context(|| format!("failed to read {}", file.display()))?;
    let plan = ingest(&bytes, format)?;
    Ok(plan)
}

fn show_plan(store: &dyn Storage, plan_id: i64, day: Option<u32>) -> Result<()> {
    let plan = store
        .plan(plan_id)?
        .with_context(|| format!("workout plan {plan_id} not found"))?;

    if let Some(day) = day {
        let Some(view) = tracker::day_view(store, plan_id, day)? else {
            bail!("no workout for day {day} of plan {plan_id} (rest day?)");
        };
        println!(
            "Day {} (week {}, {}): {}",
            day,
            week_of(day),
            weekday_of(day),
            view.workout.name
        );
        if let Some(notes) = view.workout.notes.as_deref().filter(|n| !n.is_empty()) {
            println!("{notes}");
        }
        println!("{:-<60}", "");
        for e in &view.exercises {
            println!(
                "{} {:25} | {:>2} x {:10} | {}",
                if e.is_completed { "✓" } else { " " },
                e.name,
                e.sets,
                e.reps,
                e.notes.as_deref().filter(|n| !n.is_empty()).unwrap_or("-")
            );
        }
        return Ok(());
    }

    println!("{} - {} days", plan.name, plan.total_days);
    println!("{:-<60}", "");
    for w in store.workouts_for_plan(plan_id)? {
        let exercises = store.exercises_for_workout(w.id)?;
        println!(
            "{} day {:>3} | W{} {} | {:25} | {} exercises (id: {})",
            if w.is_completed { "✓" } else { " " },
            w.day,
            week_of(w.day),
            weekday_of(w.day),
            w.name,
            exercises.len(),
            w.id
        );
    }
    Ok(())
}

async fn run_timer(secs: u32) -> Result<()> {
    let mut rest = RestTimer::new(secs);
    rest.start();

    let mut ticker = tokio::time::interval(Duration::from_secs(1));
    let mut out = std::io::stdout();
    // first tick completes immediately
    ticker.tick().await;

    loop {
        write!(out, "\rRest {}", rest.display())?;
        out.flush()?;
        if !rest.is_running() {
            break;
        }

        tokio::select! {
            _ = ticker.tick() => {
                rest.tick();
            }
            _ = tokio::signal::ctrl_c() => {
                rest.pause();
                println!("\nTimer stopped at {}", rest.display());
                return Ok(());
            }
        }
    }

    println!("\nRest over - next set!");
    Ok(())
}
