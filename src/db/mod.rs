//! Database module - storage for plans, workouts, exercises and progress
//!
//! Two backends implement [`Storage`]: [`Database`] (SQLite) and
//! [`MemStorage`] (in-process maps, lost on exit).

mod memory;
mod sqlite;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use memory::MemStorage;
pub use sqlite::Database;

pub use crate::progress::Progress;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

/// Stored plan header; days live in [`Workout`] rows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutPlan {
    pub id: i64,
    pub name: String,
    pub total_days: u32,
    pub user_id: Option<i64>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workout {
    pub id: i64,
    pub workout_plan_id: i64,
    pub day: u32,
    pub name: String,
    pub notes: Option<String>,
    pub is_completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exercise {
    pub id: i64,
    pub workout_id: i64,
    pub name: String,
    pub sets: u32,
    pub reps: String,
    pub notes: Option<String>,
    pub is_completed: bool,
}

#[derive(Debug, Clone)]
pub struct NewWorkout {
    pub workout_plan_id: i64,
    pub day: u32,
    pub name: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewExercise {
    pub workout_id: i64,
    pub name: String,
    pub sets: u32,
    pub reps: String,
    pub notes: Option<String>,
}

/// Record storage shared by the server, CLI and TUI
pub trait Storage {
    fn user_by_name(&self, username: &str) -> Result<Option<User>>;
    fn create_user(&mut self, username: &str) -> Result<User>;

    fn create_plan(&mut self, name: &str, total_days: u32, user_id: i64) -> Result<WorkoutPlan>;
    fn plan(&self, id: i64) -> Result<Option<WorkoutPlan>>;
    fn plans(&self) -> Result<Vec<WorkoutPlan>>;

    fn create_workout(&mut self, workout: &NewWorkout) -> Result<Workout>;
    fn workout(&self, id: i64) -> Result<Option<Workout>>;
    /// Workouts of a plan ordered by day
    fn workouts_for_plan(&self, plan_id: i64) -> Result<Vec<Workout>>;
    fn workout_for_day(&self, plan_id: i64, day: u32) -> Result<Option<Workout>>;
    /// Mark completed. `completed_at` is only set on the first completion.
    fn complete_workout(&mut self, id: i64, at: DateTime<Utc>) -> Result<Option<Workout>>;

    fn create_exercise(&mut self, exercise: &NewExercise) -> Result<Exercise>;
    /// Exercises of a workout in insertion order
    fn exercises_for_workout(&self, workout_id: i64) -> Result<Vec<Exercise>>;
    fn complete_exercise(&mut self, id: i64) -> Result<Option<Exercise>>;

    fn create_progress(&mut self, user_id: i64, plan_id: i64) -> Result<Progress>;
    fn progress_for_plan(&self, user_id: i64, plan_id: i64) -> Result<Option<Progress>>;
    fn update_progress(&mut self, progress: &Progress) -> Result<()>;

    /// Start a unit of writes. No-op for backends whose writes cannot fail halfway.
    fn begin(&mut self) -> Result<()> {
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }
}
