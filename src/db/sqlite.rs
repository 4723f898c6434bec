//! SQLite storage backend

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::{Exercise, NewExercise, NewWorkout, Progress, Storage, User, Workout, WorkoutPlan};

const WORKOUT_COLUMNS: &str = "id, workout_plan_id, day, name, notes, is_completed, completed_at";
const EXERCISE_COLUMNS: &str = "id, workout_id, name, sets, reps, notes, is_completed";
const PROGRESS_COLUMNS: &str = "id, user_id, workout_plan_id, current_day, completed_days, current_streak, longest_streak, last_completed_at";

/// Database wrapper
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database, creating the parent directory if needed
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database {}", path.display()))?;
        let db = Self { conn };
        db.init_schema()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Self {
            conn: Connection::open_in_memory()?,
        };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT UNIQUE NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS workout_plans (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                total_days INTEGER NOT NULL,
                user_id INTEGER REFERENCES users(id),
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS workouts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_plan_id INTEGER NOT NULL REFERENCES workout_plans(id),
                day INTEGER NOT NULL,
                name TEXT NOT NULL,
                notes TEXT,
                is_completed INTEGER NOT NULL DEFAULT 0,
                completed_at TEXT
            );

            CREATE TABLE IF NOT EXISTS exercises (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                workout_id INTEGER NOT NULL REFERENCES workouts(id),
                name TEXT NOT NULL,
                sets INTEGER NOT NULL,
                reps TEXT NOT NULL,
                notes TEXT,
                is_completed INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS user_progress (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL REFERENCES users(id),
                workout_plan_id INTEGER NOT NULL REFERENCES workout_plans(id),
                current_day INTEGER NOT NULL DEFAULT 1,
                completed_days INTEGER NOT NULL DEFAULT 0,
                current_streak INTEGER NOT NULL DEFAULT 0,
                longest_streak INTEGER NOT NULL DEFAULT 0,
                last_completed_at TEXT
            );",
        )?;
        Ok(())
    }
}

fn parse_date(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_opt_date(s: Option<String>) -> Option<DateTime<Utc>> {
    s.as_deref().map(parse_date)
}

fn user_from_row(row: &Row) -> rusqlite::Result<User> {
    let created_at: String = row.get(2)?;
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        created_at: parse_date(&created_at),
    })
}

fn plan_from_row(row: &Row) -> rusqlite::Result<WorkoutPlan> {
    let created_at: String = row.get(4)?;
    Ok(WorkoutPlan {
        id: row.get(0)?,
        name: row.get(1)?,
        total_days: row.get(2)?,
        user_id: row.get(3)?,
        created_at: parse_date(&created_at),
    })
}

fn workout_from_row(row: &Row) -> rusqlite::Result<Workout> {
    Ok(Workout {
        id: row.get(0)?,
        workout_plan_id: row.get(1)?,
        day: row.get(2)?,
        name: row.get(3)?,
        notes: row.get(4)?,
        is_completed: row.get(5)?,
        completed_at: parse_opt_date(row.get(6)?),
    })
}

fn exercise_from_row(row: &Row) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: row.get(0)?,
        workout_id: row.get(1)?,
        name: row.get(2)?,
        sets: row.get(3)?,
        reps: row.get(4)?,
        notes: row.get(5)?,
        is_completed: row.get(6)?,
    })
}

fn progress_from_row(row: &Row) -> rusqlite::Result<Progress> {
    Ok(Progress {
        id: row.get(0)?,
        user_id: row.get(1)?,
        workout_plan_id: row.get(2)?,
        current_day: row.get(3)?,
        completed_days: row.get(4)?,
        current_streak: row.get(5)?,
        longest_streak: row.get(6)?,
        last_completed_at: parse_opt_date(row.get(7)?),
    })
}

impl Storage for Database {
    fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        let user = self
            .conn
            .query_row(
                "SELECT id, username, created_at FROM users WHERE username = ?1",
                params![username],
                user_from_row,
            )
            .optional()?;
        Ok(user)
    }

    fn create_user(&mut self, username: &str) -> Result<User> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO users (username, created_at) VALUES (?1, ?2)",
            params![username, created_at.to_rfc3339()],
        )?;
        Ok(User {
            id: self.conn.last_insert_rowid(),
            username: username.to_string(),
            created_at,
        })
    }

    fn create_plan(&mut self, name: &str, total_days: u32, user_id: i64) -> Result<WorkoutPlan> {
        let created_at = Utc::now();
        self.conn.execute(
            "INSERT INTO workout_plans (name, total_days, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, total_days, user_id, created_at.to_rfc3339()],
        )?;
        Ok(WorkoutPlan {
            id: self.conn.last_insert_rowid(),
            name: name.to_string(),
            total_days,
            user_id: Some(user_id),
            created_at,
        })
    }

    fn plan(&self, id: i64) -> Result<Option<WorkoutPlan>> {
        let plan = self
            .conn
            .query_row(
                "SELECT id, name, total_days, user_id, created_at FROM workout_plans WHERE id = ?1",
                params![id],
                plan_from_row,
            )
            .optional()?;
        Ok(plan)
    }

    fn plans(&self) -> Result<Vec<WorkoutPlan>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, total_days, user_id, created_at FROM workout_plans ORDER BY id",
        )?;
        let plans = stmt
            .query_map([], plan_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(plans)
    }

    fn create_workout(&mut self, workout: &NewWorkout) -> Result<Workout> {
        self.conn.execute(
            "INSERT INTO workouts (workout_plan_id, day, name, notes) VALUES (?1, ?2, ?3, ?4)",
            params![workout.workout_plan_id, workout.day, workout.name, workout.notes],
        )?;
        Ok(Workout {
            id: self.conn.last_insert_rowid(),
            workout_plan_id: workout.workout_plan_id,
            day: workout.day,
            name: workout.name.clone(),
            notes: workout.notes.clone(),
            is_completed: false,
            completed_at: None,
        })
    }

    fn workout(&self, id: i64) -> Result<Option<Workout>> {
        let sql = format!("SELECT {WORKOUT_COLUMNS} FROM workouts WHERE id = ?1");
        let workout = self
            .conn
            .query_row(&sql, params![id], workout_from_row)
            .optional()?;
        Ok(workout)
    }

    fn workouts_for_plan(&self, plan_id: i64) -> Result<Vec<Workout>> {
        let sql = format!(
            "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE workout_plan_id = ?1 ORDER BY day ASC, id ASC"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let workouts = stmt
            .query_map(params![plan_id], workout_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(workouts)
    }

    fn workout_for_day(&self, plan_id: i64, day: u32) -> Result<Option<Workout>> {
        let sql = format!(
            "SELECT {WORKOUT_COLUMNS} FROM workouts WHERE workout_plan_id = ?1 AND day = ?2 ORDER BY id LIMIT 1"
        );
        let workout = self
            .conn
            .query_row(&sql, params![plan_id, day], workout_from_row)
            .optional()?;
        Ok(workout)
    }

    fn complete_workout(&mut self, id: i64, at: DateTime<Utc>) -> Result<Option<Workout>> {
        self.conn.execute(
            "UPDATE workouts
             SET completed_at = CASE WHEN is_completed THEN completed_at ELSE ?2 END,
                 is_completed = 1
             WHERE id = ?1",
            params![id, at.to_rfc3339()],
        )?;
        self.workout(id)
    }

    fn create_exercise(&mut self, exercise: &NewExercise) -> Result<Exercise> {
        self.conn.execute(
            "INSERT INTO exercises (workout_id, name, sets, reps, notes) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                exercise.workout_id,
                exercise.name,
                exercise.sets,
                exercise.reps,
                exercise.notes,
            ],
        )?;
        Ok(Exercise {
            id: self.conn.last_insert_rowid(),
            workout_id: exercise.workout_id,
            name: exercise.name.clone(),
            sets: exercise.sets,
            reps: exercise.reps.clone(),
            notes: exercise.notes.clone(),
            is_completed: false,
        })
    }

    fn exercises_for_workout(&self, workout_id: i64) -> Result<Vec<Exercise>> {
        let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE workout_id = ?1 ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let exercises = stmt
            .query_map(params![workout_id], exercise_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exercises)
    }

    fn complete_exercise(&mut self, id: i64) -> Result<Option<Exercise>> {
        self.conn.execute(
            "UPDATE exercises SET is_completed = 1 WHERE id = ?1",
            params![id],
        )?;
        let sql = format!("SELECT {EXERCISE_COLUMNS} FROM exercises WHERE id = ?1");
        let exercise = self
            .conn
            .query_row(&sql, params![id], exercise_from_row)
            .optional()?;
        Ok(exercise)
    }

    fn create_progress(&mut self, user_id: i64, plan_id: i64) -> Result<Progress> {
        self.conn.execute(
            "INSERT INTO user_progress (user_id, workout_plan_id) VALUES (?1, ?2)",
            params![user_id, plan_id],
        )?;
        Ok(Progress::new(self.conn.last_insert_rowid(), user_id, plan_id))
    }

    fn progress_for_plan(&self, user_id: i64, plan_id: i64) -> Result<Option<Progress>> {
        let sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM user_progress WHERE user_id = ?1 AND workout_plan_id = ?2"
        );
        let progress = self
            .conn
            .query_row(&sql, params![user_id, plan_id], progress_from_row)
            .optional()?;
        Ok(progress)
    }

    fn update_progress(&mut self, progress: &Progress) -> Result<()> {
        let updated = self.conn.execute(
            "UPDATE user_progress
             SET current_day = ?2, completed_days = ?3, current_streak = ?4,
                 longest_streak = ?5, last_completed_at = ?6
             WHERE id = ?1",
            params![
                progress.id,
                progress.current_day,
                progress.completed_days,
                progress.current_streak,
                progress.longest_streak,
                progress.last_completed_at.map(|d| d.to_rfc3339()),
            ],
        )?;
        if updated == 0 {
            anyhow::bail!("progress {} not found", progress.id);
        }
        Ok(())
    }

    fn begin(&mut self) -> Result<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.conn.execute_batch("COMMIT")?;
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_creates_parent_dir_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("fitness.db");

        {
            let mut db = Database::open(&path).unwrap();
            let user = db.create_user("default").unwrap();
            db.create_plan("Persisted", 10, user.id).unwrap();
        }

        let db = Database::open(&path).unwrap();
        let plans = db.plans().unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(plans[0].name, "Persisted");
        assert_eq!(plans[0].total_days, 10);
    }

    #[test]
    fn test_schema_init_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.init_schema().unwrap();
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let mut db = Database::open_in_memory().unwrap();
        db.create_user("default").unwrap();
        assert!(db.create_user("default").is_err());
    }

    #[test]
    fn test_failed_import_leaves_nothing_behind() {
        let mut db = Database::open_in_memory().unwrap();
        db.conn
            .execute_batch(
                "CREATE TRIGGER reject_exercise BEFORE INSERT ON exercises
                 WHEN NEW.name = 'Broken'
                 BEGIN SELECT RAISE(ABORT, 'rejected exercise'); END;",
            )
            .unwrap();

        let plan = crate::plan::validate(&serde_json::json!({
            "name": "Half Written",
            "totalDays": 7,
            "workouts": [
                {
                    "day": 1,
                    "name": "A",
                    "exercises": [{ "name": "Squat", "sets": 3, "reps": "5" }]
                },
                {
                    "day": 2,
                    "name": "B",
                    "exercises": [{ "name": "Broken", "sets": 3, "reps": "5" }]
                }
            ]
        }))
        .unwrap();

        let user_id = crate::tracker::ensure_default_user(&mut db).unwrap();
        assert!(crate::tracker::import_plan(&mut db, user_id, &plan).is_err());

        assert!(db.plans().unwrap().is_empty());
        let workouts: i64 = db
            .conn
            .query_row("SELECT COUNT(*) FROM workouts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(workouts, 0);

        // the connection is usable again after the rollback
        let row = crate::tracker::import_plan(&mut db, user_id, &plan_without_broken()).unwrap();
        assert!(db.progress_for_plan(user_id, row.id).unwrap().is_some());
    }

    fn plan_without_broken() -> crate::plan::Plan {
        crate::plan::validate(&serde_json::json!({
            "name": "Whole",
            "totalDays": 7,
            "workouts": [{ "day": 1, "name": "A", "exercises": [] }]
        }))
        .unwrap()
    }

    #[test]
    fn test_update_missing_progress_fails() {
        let mut db = Database::open_in_memory().unwrap();
        assert!(db.update_progress(&Progress::new(7, 1, 1)).is_err());
    }
}
