//! Progress tracking - completed days, streaks and display helpers

use chrono::{DateTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

/// Per-plan progress for a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: i64,
    pub user_id: i64,
    pub workout_plan_id: i64,
    /// Next day expected to keep the streak going
    pub current_day: u32,
    pub completed_days: u32,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl Progress {
    /// Fresh progress for a newly imported plan
    pub fn new(id: i64, user_id: i64, workout_plan_id: i64) -> Self {
        Self {
            id,
            user_id,
            workout_plan_id,
            current_day: 1,
            completed_days: 0,
            current_streak: 0,
            longest_streak: 0,
            last_completed_at: None,
        }
    }

    /// Count a completed day.
    ///
    /// Always bumps `completed_days`. The streak only grows (and the
    /// expected day only advances) when `day` is the expected day.
    pub fn record_completion(&mut self, day: u32, at: DateTime<Utc>) {
        self.completed_days += 1;
        self.last_completed_at = Some(at);

        if day == self.current_day {
            self.current_streak += 1;
            self.current_day = day + 1;
        }

        self.longest_streak = self.longest_streak.max(self.current_streak);
    }

    /// Share of declared days completed, rounded. Not clamped to 100.
    pub fn completion_percentage(&self, total_days: u32) -> u32 {
        completion_percentage(self.completed_days, total_days)
    }
}

pub fn completion_percentage(completed_days: u32, total_days: u32) -> u32 {
    if total_days == 0 {
        return 0;
    }
    (completed_days as f64 / total_days as f64 * 100.0).round() as u32
}

/// Week number of a plan day, day 1 being in week 1
pub fn week_of(day: u32) -> u32 {
    day.saturating_sub(1) / 7 + 1
}

/// Weekday label for a plan day, day 1 being a Monday
pub fn weekday_of(day: u32) -> Weekday {
    const WEEK: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];
    WEEK[(day.saturating_sub(1) % 7) as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(current_day: u32, completed_days: u32, current_streak: u32) -> Progress {
        Progress {
            current_day,
            completed_days,
            current_streak,
            longest_streak: current_streak,
            ..Progress::new(1, 1, 1)
        }
    }

    #[test]
    fn test_new_progress_defaults() {
        let p = Progress::new(3, 1, 7);
        assert_eq!(p.current_day, 1);
        assert_eq!(p.completed_days, 0);
        assert_eq!(p.current_streak, 0);
        assert_eq!(p.longest_streak, 0);
        assert!(p.last_completed_at.is_none());
    }

    #[test]
    fn test_off_sequence_day_keeps_streak() {
        let mut p = progress(3, 2, 2);
        p.record_completion(5, Utc::now());
        assert_eq!(p.completed_days, 3);
        assert_eq!(p.current_streak, 2);
        assert_eq!(p.current_day, 3);
        assert!(p.last_completed_at.is_some());
    }

    #[test]
    fn test_expected_day_extends_streak() {
        let mut p = progress(3, 2, 2);
        p.record_completion(5, Utc::now());
        p.record_completion(3, Utc::now());
        assert_eq!(p.completed_days, 4);
        assert_eq!(p.current_streak, 3);
        assert_eq!(p.current_day, 4);
        assert_eq!(p.longest_streak, 3);
    }

    #[test]
    fn test_repeated_call_double_counts() {
        let mut p = Progress::new(1, 1, 1);
        p.record_completion(1, Utc::now());
        p.record_completion(1, Utc::now());
        assert_eq!(p.completed_days, 2);
        assert_eq!(p.current_streak, 1);
        assert_eq!(p.current_day, 2);
    }

    #[test]
    fn test_longest_streak_is_running_max() {
        let mut p = Progress {
            longest_streak: 5,
            ..Progress::new(1, 1, 1)
        };
        p.record_completion(1, Utc::now());
        assert_eq!(p.current_streak, 1);
        assert_eq!(p.longest_streak, 5);
    }

    #[test]
    fn test_completion_percentage() {
        assert_eq!(completion_percentage(0, 30), 0);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
        assert_eq!(completion_percentage(7, 7), 100);
        assert_eq!(completion_percentage(9, 6), 150);
        assert_eq!(completion_percentage(4, 0), 0);
    }

    #[test]
    fn test_week_and_weekday() {
        assert_eq!(week_of(1), 1);
        assert_eq!(week_of(7), 1);
        assert_eq!(week_of(8), 2);
        assert_eq!(weekday_of(1), Weekday::Mon);
        assert_eq!(weekday_of(7), Weekday::Sun);
        assert_eq!(weekday_of(10), Weekday::Wed);
        assert_eq!(weekday_of(8), Weekday::Mon);
        assert_eq!(weekday_of(14), Weekday::Sun);
        assert_eq!(weekday_of(0), Weekday::Mon);
        assert_eq!(weekday_of(u32::MAX), Weekday::Wed);
    }
}
