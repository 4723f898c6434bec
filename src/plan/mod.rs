//! Plan module - normalized workout plan and its schema
//!
//! Every plan that enters the system, whether uploaded as JSON, as a CSV
//! file or posted by the manual entry form, goes through [`validate`].

pub mod ingest;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use ingest::{FileFormat, IngestError, ingest, ingest_file};

/// Multi-day workout program
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub name: String,
    /// Declared length; independent of how many days are enumerated
    pub total_days: u32,
    pub workouts: Vec<DayRecord>,
}

/// One day's workout within a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayRecord {
    pub day: u32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub exercises: Vec<ExerciseRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseRecord {
    pub name: String,
    pub sets: u32,
    /// "8-12", "30 sec", "AMRAP" - kept as written
    pub reps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Plan {
    /// Day record for a given day index, if the plan enumerates it
    pub fn day(&self, day: u32) -> Option<&DayRecord> {
        self.workouts.iter().find(|w| w.day == day)
    }

    pub fn exercise_count(&self) -> usize {
        self.workouts.iter().map(|w| w.exercises.len()).sum()
    }
}

/// Validate a JSON value against the plan schema and build the plan.
///
/// Errors carry the path of the first offending field, e.g.
/// `workouts[1].exercises[0].sets`.
pub fn validate(value: &Value) -> Result<Plan, IngestError> {
    let root = as_object(value, "")?;

    let name = string_field(root, "", "name")?;
    let total_days = positive_field(root, "", "totalDays")?;

    let mut workouts = Vec::new();
    let mut seen_days = HashSet::new();
    for (i, item) in array_field(root, "", "workouts")?.iter().enumerate() {
        let path = format!("workouts[{i}]");
        let workout = as_object(item, &path)?;
        let day = positive_field(workout, &path, "day")?;
        if !seen_days.insert(day) {
            return Err(schema_error(join(&path, "day"), "unique day"));
        }
        let day_name = string_field(workout, &path, "name")?;
        let notes = optional_string_field(workout, &path, "notes")?;

        let mut exercises = Vec::new();
        for (j, item) in array_field(workout, &path, "exercises")?.iter().enumerate() {
            let path = format!("{path}.exercises[{j}]");
            let exercise = as_object(item, &path)?;
            exercises.push(ExerciseRecord {
                name: string_field(exercise, &path, "name")?,
                sets: positive_field(exercise, &path, "sets")?,
                reps: string_field(exercise, &path, "reps")?,
                notes: optional_string_field(exercise, &path, "notes")?,
            });
        }

        workouts.push(DayRecord {
            day,
            name: day_name,
            notes,
            exercises,
        });
    }

    Ok(Plan { name, total_days, workouts })
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

fn schema_error(path: impl Into<String>, expected: &'static str) -> IngestError {
    let path = path.into();
    IngestError::Schema {
        path: if path.is_empty() { "(root)".to_string() } else { path },
        expected,
    }
}

fn as_object<'a>(value: &'a Value, path: &str) -> Result<&'a Map<String, Value>, IngestError> {
    value.as_object().ok_or_else(|| schema_error(path, "object"))
}

fn string_field(obj: &Map<String, Value>, path: &str, key: &str) -> Result<String, IngestError> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        _ => Err(schema_error(join(path, key), "string")),
    }
}

fn optional_string_field(
    obj: &Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<Option<String>, IngestError> {
    match obj.get(key) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(schema_error(join(path, key), "string")),
    }
}

fn array_field<'a>(
    obj: &'a Map<String, Value>,
    path: &str,
    key: &str,
) -> Result<&'a Vec<Value>, IngestError> {
    match obj.get(key) {
        Some(Value::Array(items)) => Ok(items),
        _ => Err(schema_error(join(path, key), "array")),
    }
}

/// Whole number >= 1 that fits in u32. `3.0` is accepted as 3.
fn positive_field(obj: &Map<String, Value>, path: &str, key: &str) -> Result<u32, IngestError> {
    let number = match obj.get(key) {
        Some(Value::Number(n)) => n,
        _ => return Err(schema_error(join(path, key), "number")),
    };

    let whole = number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u32::MAX as f64)
            .map(|f| f as u64)
    });

    match whole.and_then(|n| u32::try_from(n).ok()) {
        Some(n) if n >= 1 => Ok(n),
        _ => Err(schema_error(join(path, key), "positive integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Value {
        json!({
            "name": "Starter",
            "totalDays": 7,
            "workouts": [{
                "day": 1,
                "name": "Push",
                "notes": "Warm up first",
                "exercises": [
                    { "name": "Push-ups", "sets": 3, "reps": "10-12" },
                    { "name": "Plank", "sets": 2, "reps": "30 sec", "notes": "Brace" }
                ]
            }]
        })
    }

    #[test]
    fn test_validate_builds_plan() {
        let plan = validate(&sample()).unwrap();
        assert_eq!(plan.name, "Starter");
        assert_eq!(plan.total_days, 7);
        assert_eq!(plan.workouts.len(), 1);
        assert_eq!(plan.workouts[0].notes.as_deref(), Some("Warm up first"));
        assert_eq!(plan.workouts[0].exercises[0].notes, None);
        assert_eq!(plan.workouts[0].exercises[1].reps, "30 sec");
        assert_eq!(plan.exercise_count(), 2);
    }

    #[test]
    fn test_validate_missing_name() {
        let mut value = sample();
        value.as_object_mut().unwrap().remove("name");
        let err = validate(&value).unwrap_err();
        assert!(matches!(err, IngestError::Schema { ref path, .. } if path == "name"));
    }

    #[test]
    fn test_validate_reports_nested_path() {
        let mut value = sample();
        value["workouts"][0]["exercises"][1]["sets"] = json!("three");
        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains("workouts[0].exercises[1].sets"));
    }

    #[test]
    fn test_validate_reps_must_be_string() {
        let mut value = sample();
        value["workouts"][0]["exercises"][0]["reps"] = json!(10);
        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains("workouts[0].exercises[0].reps"));
    }

    #[test]
    fn test_validate_rejects_non_object_root() {
        let err = validate(&json!([1, 2, 3])).unwrap_err();
        assert!(err.to_string().contains("(root)"));
    }

    #[test]
    fn test_validate_rejects_fractional_and_zero_numbers() {
        let mut value = sample();
        value["totalDays"] = json!(7.5);
        assert!(validate(&value).is_err());

        value["totalDays"] = json!(0);
        assert!(validate(&value).is_err());

        value["totalDays"] = json!(7.0);
        assert_eq!(validate(&value).unwrap().total_days, 7);
    }

    #[test]
    fn test_validate_rejects_null_notes() {
        let mut value = sample();
        value["workouts"][0]["notes"] = Value::Null;
        let err = validate(&value).unwrap_err();
        assert!(matches!(err, IngestError::Schema { ref path, .. } if path == "workouts[0].notes"));

        let mut value = sample();
        value["workouts"][0]["exercises"][1]["notes"] = Value::Null;
        let err = validate(&value).unwrap_err();
        assert!(err.to_string().contains("workouts[0].exercises[1].notes"));
    }

    #[test]
    fn test_validate_rejects_duplicate_days() {
        let value = json!({
            "name": "Twice",
            "totalDays": 7,
            "workouts": [
                { "day": 1, "name": "A", "exercises": [] },
                { "day": 2, "name": "B", "exercises": [] },
                { "day": 1, "name": "C", "exercises": [] }
            ]
        });
        let err = validate(&value).unwrap_err();
        assert!(matches!(
            err,
            IngestError::Schema { ref path, expected: "unique day" } if path == "workouts[2].day"
        ));
    }

    #[test]
    fn test_validate_ignores_unknown_keys() {
        let mut value = sample();
        value["author"] = json!("coach");
        assert!(validate(&value).is_ok());
    }

    #[test]
    fn test_plan_day_lookup() {
        let plan = validate(&sample()).unwrap();
        assert_eq!(plan.day(1).map(|d| d.name.as_str()), Some("Push"));
        assert!(plan.day(2).is_none());
    }
}
