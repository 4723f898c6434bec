//! In-memory storage backend

use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::{Exercise, NewExercise, NewWorkout, Progress, Storage, User, Workout, WorkoutPlan};

/// Id sequence starting at 1, like SQLite AUTOINCREMENT
#[derive(Debug, Default)]
struct Sequence(i64);

impl Sequence {
    fn next(&mut self) -> i64 {
        self.0 += 1;
        self.0
    }
}

/// Map-backed storage; records are ordered by id
#[derive(Debug, Default)]
pub struct MemStorage {
    users: BTreeMap<i64, User>,
    plans: BTreeMap<i64, WorkoutPlan>,
    workouts: BTreeMap<i64, Workout>,
    exercises: BTreeMap<i64, Exercise>,
    progress: BTreeMap<i64, Progress>,

    user_ids: Sequence,
    plan_ids: Sequence,
    workout_ids: Sequence,
    exercise_ids: Sequence,
    progress_ids: Sequence,
}

impl MemStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemStorage {
    fn user_by_name(&self, username: &str) -> Result<Option<User>> {
        Ok(self.users.values().find(|u| u.username == username).cloned())
    }

    fn create_user(&mut self, username: &str) -> Result<User> {
        if self.user_by_name(username)?.is_some() {
            anyhow::bail!("user {:?} already exists", username);
        }
        let user = User {
            id: self.user_ids.next(),
            username: username.to_string(),
            created_at: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn create_plan(&mut self, name: &str, total_days: u32, user_id: i64) -> Result<WorkoutPlan> {
        let plan = WorkoutPlan {
            id: self.plan_ids.next(),
            name: name.to_string(),
            total_days,
            user_id: Some(user_id),
            created_at: Utc::now(),
        };
        self.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    fn plan(&self, id: i64) -> Result<Option<WorkoutPlan>> {
        Ok(self.plans.get(&id).cloned())
    }

    fn plans(&self) -> Result<Vec<WorkoutPlan>> {
        Ok(self.plans.values().cloned().collect())
    }

    fn create_workout(&mut self, workout: &NewWorkout) -> Result<Workout> {
        let workout = Workout {
            id: self.workout_ids.next(),
            workout_plan_id: workout.workout_plan_id,
            day: workout.day,
            name: workout.name.clone(),
            notes: workout.notes.clone(),
            is_completed: false,
            completed_at: None,
        };
        self.workouts.insert(workout.id, workout.clone());
        Ok(workout)
    }

    fn workout(&self, id: i64) -> Result<Option<Workout>> {
        Ok(self.workouts.get(&id).cloned())
    }

    fn workouts_for_plan(&self, plan_id: i64) -> Result<Vec<Workout>> {
        let mut workouts: Vec<Workout> = self
            .workouts
            .values()
            .filter(|w| w.workout_plan_id == plan_id)
            .cloned()
            .collect();
        workouts.sort_by_key(|w| w.day);
        Ok(workouts)
    }

    fn workout_for_day(&self, plan_id: i64, day: u32) -> Result<Option<Workout>> {
        Ok(self
            .workouts
            .values()
            .find(|w| w.workout_plan_id == plan_id && w.day == day)
            .cloned())
    }

    fn complete_workout(&mut self, id: i64, at: DateTime<Utc>) -> Result<Option<Workout>> {
        let Some(workout) = self.workouts.get_mut(&id) else {
            return Ok(None);
        };
        if !workout.is_completed {
            workout.is_completed = true;
            workout.completed_at = Some(at);
        }
        Ok(Some(workout.clone()))
    }

    fn create_exercise(&mut self, exercise: &NewExercise) -> Result<Exercise> {
        let exercise = Exercise {
            id: self.exercise_ids.next(),
            workout_id: exercise.workout_id,
            name: exercise.name.clone(),
            sets: exercise.sets,
            reps: exercise.reps.clone(),
            notes: exercise.notes.clone(),
            is_completed: false,
        };
        self.exercises.insert(exercise.id, exercise.clone());
        Ok(exercise)
    }

    fn exercises_for_workout(&self, workout_id: i64) -> Result<Vec<Exercise>> {
        Ok(self
            .exercises
            .values()
            .filter(|e| e.workout_id == workout_id)
            .cloned()
            .collect())
    }

    fn complete_exercise(&mut self, id: i64) -> Result<Option<Exercise>> {
        Ok(self.exercises.get_mut(&id).map(|e| {
            e.is_completed = true;
            e.clone()
        }))
    }

    fn create_progress(&mut self, user_id: i64, plan_id: i64) -> Result<Progress> {
        let progress = Progress::new(self.progress_ids.next(), user_id, plan_id);
        self.progress.insert(progress.id, progress.clone());
        Ok(progress)
    }

    fn progress_for_plan(&self, user_id: i64, plan_id: i64) -> Result<Option<Progress>> {
        Ok(self
            .progress
            .values()
            .find(|p| p.user_id == user_id && p.workout_plan_id == plan_id)
            .cloned())
    }

    fn update_progress(&mut self, progress: &Progress) -> Result<()> {
        match self.progress.get_mut(&progress.id) {
            Some(existing) => {
                *existing = progress.clone();
                Ok(())
            }
            None => anyhow::bail!("progress {} not found", progress.id),
        }
    }
}
