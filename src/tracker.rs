//! Tracker - plan import, completion and progress on top of [`Storage`]

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::db::{Exercise, NewExercise, NewWorkout, Progress, Storage, Workout, WorkoutPlan};
use crate::plan::{DayRecord, ExerciseRecord, Plan};

/// Owner of all plans and progress
pub const DEFAULT_USER: &str = "default";

/// How many completed workouts the progress report lists
const RECENT_LIMIT: usize = 5;

/// One day of a stored plan with its exercises
#[derive(Debug, Clone, Serialize)]
pub struct DayView {
    pub workout: Workout,
    pub exercises: Vec<Exercise>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressReport {
    pub progress: Progress,
    pub completion_percentage: u32,
    pub total_days: u32,
    pub recent_completed_workouts: Vec<Workout>,
}

/// Id of the default user, creating it on first use
pub fn ensure_default_user(store: &mut dyn Storage) -> Result<i64> {
    if let Some(user) = store.user_by_name(DEFAULT_USER)? {
        return Ok(user.id);
    }
    let user = store.create_user(DEFAULT_USER)?;
    info!("Created default user (id: {})", user.id);
    Ok(user.id)
}

/// Store a validated plan with one workout per day record and fresh progress.
///
/// All rows are written in one transaction; on failure nothing is kept.
pub fn import_plan(store: &mut dyn Storage, user_id: i64, plan: &Plan) -> Result<WorkoutPlan> {
    store.begin()?;
    match write_plan(store, user_id, plan) {
        Ok(row) => {
            store.commit()?;
            info!(
                "Imported plan {:?} (id: {}, {} days declared, {} enumerated)",
                row.name,
                row.id,
                row.total_days,
                plan.workouts.len()
            );
            Ok(row)
        }
        Err(err) => {
            if let Err(rollback_err) = store.rollback() {
                warn!("Rollback after failed import also failed: {rollback_err:#}");
            }
            Err(err.context(format!("failed to import plan {:?}", plan.name)))
        }
    }
}

fn write_plan(store: &mut dyn Storage, user_id: i64, plan: &Plan) -> Result<WorkoutPlan> {
    let row = store.create_plan(&plan.name, plan.total_days, user_id)?;

    for day in &plan.workouts {
        let workout = store.create_workout(&NewWorkout {
            workout_plan_id: row.id,
            day: day.day,
            name: day.name.clone(),
            notes: Some(day.notes.clone().unwrap_or_default()),
        })?;

        for exercise in &day.exercises {
            store.create_exercise(&NewExercise {
                workout_id: workout.id,
                name: exercise.name.clone(),
                sets: exercise.sets,
                reps: exercise.reps.clone(),
                notes: Some(exercise.notes.clone().unwrap_or_default()),
            })?;
        }
    }

    store.create_progress(user_id, row.id)?;
    Ok(row)
}

pub fn day_view(store: &dyn Storage, plan_id: i64, day: u32) -> Result<Option<DayView>> {
    let Some(workout) = store.workout_for_day(plan_id, day)? else {
        return Ok(None);
    };
    let exercises = store.exercises_for_workout(workout.id)?;
    Ok(Some(DayView { workout, exercises }))
}

/// Mark a workout completed and update the plan's progress.
///
/// Only the first completion of a workout counts toward progress;
/// repeats return the workout unchanged.
pub fn complete_workout(
    store: &mut dyn Storage,
    user_id: i64,
    workout_id: i64,
) -> Result<Option<Workout>> {
    let Some(workout) = store.workout(workout_id)? else {
        return Ok(None);
    };
    if workout.is_completed {
        debug!("Workout {} already completed", workout_id);
        return Ok(Some(workout));
    }

    let now = Utc::now();
    let updated = store
        .complete_workout(workout_id, now)?
        .with_context(|| format!("workout {workout_id} vanished during completion"))?;

    if let Some(mut progress) = store.progress_for_plan(user_id, workout.workout_plan_id)? {
        progress.record_completion(workout.day, now);
        store.update_progress(&progress)?;
        info!(
            "Completed day {} of plan {} (streak: {}, completed: {})",
            workout.day, workout.workout_plan_id, progress.current_streak, progress.completed_days
        );
    }

    Ok(Some(updated))
}

pub fn complete_exercise(store: &mut dyn Storage, exercise_id: i64) -> Result<Option<Exercise>> {
    let exercise = store.complete_exercise(exercise_id)?;
    if let Some(e) = &exercise {
        debug!("Completed exercise {} ({})", e.id, e.name);
    }
    Ok(exercise)
}

pub fn progress_report(
    store: &dyn Storage,
    user_id: i64,
    plan_id: i64,
) -> Result<Option<ProgressReport>> {
    let Some(progress) = store.progress_for_plan(user_id, plan_id)? else {
        return Ok(None);
    };
    let Some(plan) = store.plan(plan_id)? else {
        return Ok(None);
    };

    let mut recent: Vec<Workout> = store
        .workouts_for_plan(plan_id)?
        .into_iter()
        .filter(|w| w.is_completed)
        .collect();
    recent.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
    recent.truncate(RECENT_LIMIT);

    Ok(Some(ProgressReport {
        completion_percentage: progress.completion_percentage(plan.total_days),
        total_days: plan.total_days,
        progress,
        recent_completed_workouts: recent,
    }))
}

/// Rebuild the normalized plan from stored rows
pub fn export_plan(store: &dyn Storage, plan_id: i64) -> Result<Option<Plan>> {
    let Some(row) = store.plan(plan_id)? else {
        return Ok(None);
    };

    let mut workouts = Vec::new();
    for workout in store.workouts_for_plan(plan_id)? {
        let exercises = store
            .exercises_for_workout(workout.id)?
            .into_iter()
            .map(|e| ExerciseRecord {
                name: e.name,
                sets: e.sets,
                reps: e.reps,
                notes: non_empty(e.notes),
            })
            .collect();
        workouts.push(DayRecord {
            day: workout.day,
            name: workout.name,
            notes: non_empty(workout.notes),
            exercises,
        });
    }

    Ok(Some(Plan {
        name: row.name,
        total_days: row.total_days,
        workouts,
    }))
}

fn non_empty(notes: Option<String>) -> Option<String> {
    notes.filter(|n| !n.is_empty())
}
