//! Progress surface: day-status history, streak counters, and period
//! rollups in one snapshot.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::db::HabitDb;
use crate::engine::classify::{classify_range, DayStatus};
use crate::engine::dates::{date_key, reference_date};
use crate::engine::periods::{activity_totals, habit_completions, ActivityTotals, HabitCompletion};
use crate::engine::streaks::{streaks, StreakSummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    pub date: String,
    pub status: DayStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub days: Vec<DayEntry>,
    pub streaks: StreakSummary,
    pub activity: Vec<ActivityTotals>,
    pub habits: Vec<HabitCompletion>,
}

/// Build the progress dashboard data for the lookback window ending today.
pub fn progress_snapshot(
    db: &HabitDb,
    tz: Tz,
    now: DateTime<Utc>,
    lookback_days: u32,
) -> ProgressSnapshot {
    let today = reference_date(now, tz);
    let start = today - Duration::days(i64::from(lookback_days));

    let window = super::window_or_empty(db, start, today);
    let statuses = classify_range(&window, start, today);
    let streak_summary = streaks(&statuses, today);

    let days = statuses
        .iter()
        .map(|(date, status)| DayEntry {
            date: date_key(*date),
            status: *status,
        })
        .collect();

    ProgressSnapshot {
        days,
        streaks: streak_summary,
        activity: activity_totals(&window.activity, today),
        habits: habit_completions(&window, start, today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ActivityLog, RoutineItem};
    use chrono::{NaiveDate, TimeZone};
    use chrono_tz::UTC;

    fn test_db() -> (HabitDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = HabitDb::open_at(dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn noon_utc(date: &str) -> DateTime<Utc> {
        Utc.from_utc_datetime(&d(date).and_hms_opt(12, 0, 0).unwrap())
    }

    #[test]
    fn snapshot_covers_window_and_sums_activity() {
        let (db, _dir) = test_db();
        db.upsert_routine_item(&RoutineItem {
            id: "water".to_string(),
            label: "Water".to_string(),
            emoji: String::new(),
            section: String::new(),
            is_core: true,
            days_of_week: None,
            active: true,
            sort_order: 0,
        })
        .unwrap();
        db.set_check(d("2024-06-12"), "water", true).unwrap();
        db.insert_activity_log(&ActivityLog {
            id: "a1".to_string(),
            date: d("2024-06-11"),
            activity_key: "run".to_string(),
            value: 5.0,
            unit: "km".to_string(),
            notes: None,
        })
        .unwrap();

        let snapshot = progress_snapshot(&db, UTC, noon_utc("2024-06-12"), 7);
        assert_eq!(snapshot.days.len(), 8); // inclusive window
        assert_eq!(snapshot.days.last().unwrap().date, "2024-06-12");
        assert_eq!(snapshot.days.last().unwrap().status, DayStatus::Green);
        assert_eq!(snapshot.streaks.current, 1);
        assert_eq!(snapshot.activity.len(), 1);
        assert_eq!(snapshot.activity[0].week, 5.0);
        assert_eq!(snapshot.habits.len(), 1);
        assert_eq!(snapshot.habits[0].all_time, 1);
    }

    #[test]
    fn empty_store_degrades_to_empty_days_and_zero_sums() {
        let (db, _dir) = test_db();
        let snapshot = progress_snapshot(&db, UTC, noon_utc("2024-06-12"), 7);
        assert!(snapshot.days.iter().all(|d| d.status == DayStatus::Empty));
        assert_eq!(snapshot.streaks.best, 0);
        assert!(snapshot.activity.is_empty());
        assert!(snapshot.habits.is_empty());
    }
}
