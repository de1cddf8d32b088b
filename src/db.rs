//! SQLite-based local store for routine items, checks, logs, and the
//! achieved-milestone set.
//!
//! The database lives at `~/.momentum/momentum.db`. The engine itself never
//! touches it: callers fetch an [`EngineWindow`] here with one batched range
//! read per recomputation and hand the engine plain data. Malformed stored
//! values (weekday lists, day modes, notes JSON) map to safe defaults on
//! load, never to errors.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::PathBuf;

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use crate::engine::EngineWindow;
use crate::types::{
    sanitize_days_of_week, ActivityLog, ActivityNotes, DailyCheck, DailyLog, DayMode,
    PushSubscription, Reminder, RestDayConfig, RoutineItem,
};

/// Errors specific to database operations.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Home directory not found")]
    HomeDirNotFound,

    #[error("Failed to create database directory: {0}")]
    CreateDir(std::io::Error),
}

/// SQLite connection wrapper. Held behind a `std::sync::Mutex` in `AppState`
/// so the job loop and any embedding surface can share it safely.
pub struct HabitDb {
    conn: Connection,
}

impl HabitDb {
    /// Borrow the underlying connection for ad-hoc queries.
    pub fn conn_ref(&self) -> &Connection {
        &self.conn
    }

    /// Open (or create) the database at `~/.momentum/momentum.db` and apply
    /// the schema.
    pub fn open() -> Result<Self, DbError> {
        let path = Self::db_path()?;
        Self::open_at(path)
    }

    /// Open a database at an explicit path. Useful for testing.
    pub fn open_at(path: PathBuf) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent).map_err(DbError::CreateDir)?;
            }
        }

        let conn = Connection::open(&path)?;

        // WAL for better concurrent read behavior
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;

        // All statements use IF NOT EXISTS, so this is idempotent
        conn.execute_batch(include_str!("schema.sql"))?;

        Ok(Self { conn })
    }

    /// Resolve the default database path: `~/.momentum/momentum.db`.
    fn db_path() -> Result<PathBuf, DbError> {
        let home = dirs::home_dir().ok_or(DbError::HomeDirNotFound)?;
        Ok(home.join(".momentum").join("momentum.db"))
    }

    // =========================================================================
    // Batched window read
    // =========================================================================

    /// Fetch everything the engine needs for `[start, end]` in one pass:
    /// all routine items, done-checks, day modes, activity logs, and the
    /// rest-day config. This is the only read path a recomputation uses —
    /// never one query per item.
    pub fn fetch_window(&self, start: NaiveDate, end: NaiveDate) -> Result<EngineWindow, DbError> {
        let start_key = start.format("%Y-%m-%d").to_string();
        let end_key = end.format("%Y-%m-%d").to_string();

        let items = self.get_routine_items()?;

        let mut done: BTreeMap<NaiveDate, HashSet<String>> = BTreeMap::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT date, routine_item_id FROM daily_checks
                 WHERE done = 1 AND date >= ?1 AND date <= ?2",
            )?;
            let rows = stmt.query_map(params![start_key, end_key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (date, item_id) = row?;
                match parse_date(&date) {
                    Some(date) => {
                        done.entry(date).or_default().insert(item_id);
                    }
                    None => log::warn!("Skipping daily_check with malformed date: {date}"),
                }
            }
        }

        let mut day_modes: BTreeMap<NaiveDate, DayMode> = BTreeMap::new();
        {
            let mut stmt = self.conn.prepare(
                "SELECT date, day_mode FROM daily_logs WHERE date >= ?1 AND date <= ?2",
            )?;
            let rows = stmt.query_map(params![start_key, end_key], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            for row in rows {
                let (date, mode) = row?;
                if let Some(date) = parse_date(&date) {
                    day_modes.insert(date, DayMode::from_str_or_normal(&mode));
                }
            }
        }

        let activity = self.get_activity_logs(start, end)?;
        let rest_days = self.get_rest_days()?;

        Ok(EngineWindow {
            items,
            done,
            day_modes,
            activity,
            rest_days,
        })
    }

    // =========================================================================
    // Routine items
    // =========================================================================

    /// All routine items, inactive included — the schedule filter decides
    /// scope, and retired items must stay loadable for historical integrity.
    pub fn get_routine_items(&self) -> Result<Vec<RoutineItem>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, label, emoji, section, is_core, days_of_week, active, sort_order
             FROM routine_items ORDER BY sort_order, id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(RoutineItem {
                id: row.get(0)?,
                label: row.get(1)?,
                emoji: row.get(2)?,
                section: row.get(3)?,
                is_core: row.get(4)?,
                days_of_week: parse_days_of_week(row.get::<_, Option<String>>(5)?),
                active: row.get(6)?,
                sort_order: row.get(7)?,
            })
        })?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?);
        }
        Ok(items)
    }

    pub fn upsert_routine_item(&self, item: &RoutineItem) -> Result<(), DbError> {
        let days = item
            .days_of_week
            .as_ref()
            .map(|d| serde_json::to_string(d).unwrap_or_default());
        self.conn.execute(
            "INSERT INTO routine_items (id, label, emoji, section, is_core, days_of_week, active, sort_order)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
             ON CONFLICT(id) DO UPDATE SET
               label = excluded.label,
               emoji = excluded.emoji,
               section = excluded.section,
               is_core = excluded.is_core,
               days_of_week = excluded.days_of_week,
               active = excluded.active,
               sort_order = excluded.sort_order,
               updated_at = datetime('now')",
            params![
                item.id,
                item.label,
                item.emoji,
                item.section,
                item.is_core,
                days,
                item.active,
                item.sort_order
            ],
        )?;
        Ok(())
    }

    /// Soft delete: past day classifications must stay reproducible.
    pub fn retire_routine_item(&self, id: &str) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE routine_items SET active = 0, updated_at = datetime('now') WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    // =========================================================================
    // Checks, logs, rest days
    // =========================================================================

    pub fn set_check(&self, date: NaiveDate, routine_item_id: &str, done: bool) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO daily_checks (date, routine_item_id, done)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(date, routine_item_id) DO UPDATE SET
               done = excluded.done,
               updated_at = datetime('now')",
            params![date.format("%Y-%m-%d").to_string(), routine_item_id, done],
        )?;
        Ok(())
    }

    /// All check rows for one date (done and not-done alike), for the today
    /// view's item list.
    pub fn get_checks_for_date(&self, date: NaiveDate) -> Result<Vec<DailyCheck>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT date, routine_item_id, done FROM daily_checks
             WHERE date = ?1 ORDER BY routine_item_id",
        )?;
        let rows = stmt.query_map(params![date.format("%Y-%m-%d").to_string()], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, bool>(2)?))
        })?;

        let mut checks = Vec::new();
        for row in rows {
            let (raw_date, routine_item_id, done) = row?;
            let Some(date) = parse_date(&raw_date) else {
                continue;
            };
            checks.push(DailyCheck {
                date,
                routine_item_id,
                done,
            });
        }
        Ok(checks)
    }

    pub fn get_daily_log(&self, date: NaiveDate) -> Result<Option<DailyLog>, DbError> {
        let log_row = self
            .conn
            .query_row(
                "SELECT day_mode, slept_well, note FROM daily_logs WHERE date = ?1",
                params![date.format("%Y-%m-%d").to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<bool>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()?;
        Ok(log_row.map(|(mode, slept_well, note)| DailyLog {
            date,
            day_mode: DayMode::from_str_or_normal(&mode),
            slept_well,
            note,
        }))
    }

    pub fn set_day_mode(&self, date: NaiveDate, mode: DayMode) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT INTO daily_logs (date, day_mode) VALUES (?1, ?2)
             ON CONFLICT(date) DO UPDATE SET day_mode = excluded.day_mode",
            params![date.format("%Y-%m-%d").to_string(), mode.as_str()],
        )?;
        Ok(())
    }

    pub fn get_rest_days(&self) -> Result<RestDayConfig, DbError> {
        let mut stmt = self.conn.prepare("SELECT weekday FROM rest_days")?;
        let rows = stmt.query_map([], |row| row.get::<_, i64>(0))?;
        let mut days = BTreeSet::new();
        for row in rows {
            let day = row?;
            if (1..=7).contains(&day) {
                days.insert(day as u8);
            }
        }
        Ok(RestDayConfig(days))
    }

    /// Replace the rest-day config wholesale (it is one small set per user).
    pub fn set_rest_days(&self, config: &RestDayConfig) -> Result<(), DbError> {
        self.conn.execute("DELETE FROM rest_days", [])?;
        for day in &config.0 {
            self.conn.execute(
                "INSERT OR IGNORE INTO rest_days (weekday) VALUES (?1)",
                params![i64::from(*day)],
            )?;
        }
        Ok(())
    }

    pub fn insert_activity_log(&self, log_entry: &ActivityLog) -> Result<(), DbError> {
        let notes = log_entry
            .notes
            .as_ref()
            .map(|n| serde_json::to_string(n).unwrap_or_default());
        self.conn.execute(
            "INSERT INTO activity_logs (id, date, activity_key, value, unit, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(id) DO UPDATE SET
               date = excluded.date,
               activity_key = excluded.activity_key,
               value = excluded.value,
               unit = excluded.unit,
               notes = excluded.notes",
            params![
                log_entry.id,
                log_entry.date.format("%Y-%m-%d").to_string(),
                log_entry.activity_key,
                log_entry.value,
                log_entry.unit,
                notes
            ],
        )?;
        Ok(())
    }

    pub fn get_activity_logs(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<ActivityLog>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, activity_key, value, unit, notes FROM activity_logs
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date",
        )?;
        let rows = stmt.query_map(
            params![
                start.format("%Y-%m-%d").to_string(),
                end.format("%Y-%m-%d").to_string()
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, f64>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            },
        )?;

        let mut logs = Vec::new();
        for row in rows {
            let (id, date, activity_key, value, unit, notes) = row?;
            let Some(date) = parse_date(&date) else {
                log::warn!("Skipping activity_log {id} with malformed date: {date}");
                continue;
            };
            logs.push(ActivityLog {
                id,
                date,
                activity_key,
                value,
                unit,
                notes: notes.and_then(|n| parse_notes(&n)),
            });
        }
        Ok(logs)
    }

    // =========================================================================
    // Achieved milestones (monotone set)
    // =========================================================================

    pub fn load_achieved(&self) -> Result<BTreeSet<String>, DbError> {
        let mut stmt = self.conn.prepare("SELECT id FROM achieved_milestones")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut set = BTreeSet::new();
        for row in rows {
            set.insert(row?);
        }
        Ok(set)
    }

    /// Achieved ids with their earned timestamps, for the trophy case.
    pub fn load_achieved_with_dates(&self) -> Result<BTreeMap<String, String>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, achieved_at FROM achieved_milestones")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        let mut map = BTreeMap::new();
        for row in rows {
            let (id, at) = row?;
            map.insert(id, at);
        }
        Ok(map)
    }

    /// INSERT OR IGNORE keeps the set monotone: an id, once earned, is never
    /// re-inserted or removed.
    pub fn record_achieved(&self, ids: &[String]) -> Result<(), DbError> {
        for id in ids {
            self.conn.execute(
                "INSERT OR IGNORE INTO achieved_milestones (id) VALUES (?1)",
                params![id],
            )?;
        }
        Ok(())
    }

    // =========================================================================
    // Reminders + subscriptions (scheduled jobs)
    // =========================================================================

    pub fn get_enabled_reminders(&self) -> Result<Vec<Reminder>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, label, time, days_of_week, enabled FROM reminders WHERE enabled = 1",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Reminder {
                id: row.get(0)?,
                label: row.get(1)?,
                time: row.get(2)?,
                days_of_week: parse_days_of_week(row.get::<_, Option<String>>(3)?),
                enabled: row.get(4)?,
            })
        })?;
        let mut reminders = Vec::new();
        for row in rows {
            reminders.push(row?);
        }
        Ok(reminders)
    }

    pub fn upsert_reminder(&self, reminder: &Reminder) -> Result<(), DbError> {
        let days = reminder
            .days_of_week
            .as_ref()
            .map(|d| serde_json::to_string(d).unwrap_or_default());
        self.conn.execute(
            "INSERT INTO reminders (id, label, time, days_of_week, enabled)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
               label = excluded.label,
               time = excluded.time,
               days_of_week = excluded.days_of_week,
               enabled = excluded.enabled",
            params![reminder.id, reminder.label, reminder.time, days, reminder.enabled],
        )?;
        Ok(())
    }

    pub fn get_subscriptions(&self) -> Result<Vec<PushSubscription>, DbError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, endpoint, created_at FROM subscriptions")?;
        let rows = stmt.query_map([], |row| {
            Ok(PushSubscription {
                id: row.get(0)?,
                endpoint: row.get(1)?,
                created_at: row.get(2)?,
            })
        })?;
        let mut subs = Vec::new();
        for row in rows {
            subs.push(row?);
        }
        Ok(subs)
    }

    pub fn insert_subscription(&self, sub: &PushSubscription) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO subscriptions (id, endpoint, created_at)
             VALUES (?1, ?2, ?3)",
            params![sub.id, sub.endpoint, sub.created_at],
        )?;
        Ok(())
    }

    /// Remove a subscription whose endpoint is permanently gone, so it is
    /// never retried.
    pub fn delete_subscription(&self, id: &str) -> Result<(), DbError> {
        self.conn
            .execute("DELETE FROM subscriptions WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn get_subscription(&self, id: &str) -> Result<Option<PushSubscription>, DbError> {
        let sub = self
            .conn
            .query_row(
                "SELECT id, endpoint, created_at FROM subscriptions WHERE id = ?1",
                params![id],
                |row| {
                    Ok(PushSubscription {
                        id: row.get(0)?,
                        endpoint: row.get(1)?,
                        created_at: row.get(2)?,
                    })
                },
            )
            .optional()?;
        Ok(sub)
    }
}

fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// Stored weekday lists are JSON arrays. Unparsable or empty values mean
/// "every day" rather than an error.
fn parse_days_of_week(raw: Option<String>) -> Option<Vec<u8>> {
    let raw = raw?;
    let parsed: Option<Vec<u8>> = serde_json::from_str(&raw).ok();
    sanitize_days_of_week(parsed)
}

fn parse_notes(raw: &str) -> Option<ActivityNotes> {
    match serde_json::from_str(raw) {
        Ok(notes) => Some(notes),
        Err(_) => {
            log::warn!("Ignoring unparsable activity notes payload");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (HabitDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = HabitDb::open_at(dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn item(id: &str, is_core: bool) -> RoutineItem {
        RoutineItem {
            id: id.to_string(),
            label: id.to_string(),
            emoji: String::new(),
            section: String::new(),
            is_core,
            days_of_week: None,
            active: true,
            sort_order: 0,
        }
    }

    #[test]
    fn checks_and_log_read_back_for_one_date() {
        let (db, _dir) = test_db();
        db.set_check(d("2024-06-10"), "water", true).unwrap();
        db.set_check(d("2024-06-10"), "stretch", false).unwrap();
        db.set_day_mode(d("2024-06-10"), DayMode::Travel).unwrap();

        let checks = db.get_checks_for_date(d("2024-06-10")).unwrap();
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].routine_item_id, "stretch");
        assert!(!checks[0].done);
        assert!(checks[1].done);

        let log = db.get_daily_log(d("2024-06-10")).unwrap().unwrap();
        assert_eq!(log.day_mode, DayMode::Travel);
        assert!(db.get_daily_log(d("2024-06-11")).unwrap().is_none());
    }

    #[test]
    fn fetch_window_returns_batched_records() {
        let (db, _dir) = test_db();
        db.upsert_routine_item(&item("water", true)).unwrap();
        db.upsert_routine_item(&item("stretch", false)).unwrap();
        db.set_check(d("2024-06-10"), "water", true).unwrap();
        db.set_check(d("2024-06-10"), "stretch", false).unwrap();
        db.set_day_mode(d("2024-06-11"), DayMode::Travel).unwrap();
        db.insert_activity_log(&ActivityLog {
            id: "a1".to_string(),
            date: d("2024-06-10"),
            activity_key: "run".to_string(),
            value: 5.0,
            unit: "km".to_string(),
            notes: Some(ActivityNotes::Note {
                text: "easy pace".to_string(),
            }),
        })
        .unwrap();

        let window = db.fetch_window(d("2024-06-01"), d("2024-06-30")).unwrap();
        assert_eq!(window.items.len(), 2);
        // Only done=1 rows land in the done map.
        assert!(window.done[&d("2024-06-10")].contains("water"));
        assert!(!window.done[&d("2024-06-10")].contains("stretch"));
        assert_eq!(window.day_modes[&d("2024-06-11")], DayMode::Travel);
        assert_eq!(window.activity.len(), 1);
        assert_eq!(
            window.activity[0].notes,
            Some(ActivityNotes::Note {
                text: "easy pace".to_string()
            })
        );
    }

    #[test]
    fn fetch_window_is_range_bounded() {
        let (db, _dir) = test_db();
        db.upsert_routine_item(&item("water", true)).unwrap();
        db.set_check(d("2024-05-01"), "water", true).unwrap();
        db.set_check(d("2024-06-10"), "water", true).unwrap();

        let window = db.fetch_window(d("2024-06-01"), d("2024-06-30")).unwrap();
        assert!(!window.done.contains_key(&d("2024-05-01")));
        assert!(window.done.contains_key(&d("2024-06-10")));
    }

    #[test]
    fn malformed_days_of_week_loads_as_every_day() {
        let (db, _dir) = test_db();
        db.conn_ref()
            .execute(
                "INSERT INTO routine_items (id, label, is_core, days_of_week)
                 VALUES ('x', 'X', 1, 'not json')",
                [],
            )
            .unwrap();
        let items = db.get_routine_items().unwrap();
        assert_eq!(items[0].days_of_week, None);
    }

    #[test]
    fn malformed_day_mode_loads_as_normal() {
        let (db, _dir) = test_db();
        db.conn_ref()
            .execute(
                "INSERT INTO daily_logs (date, day_mode) VALUES ('2024-06-10', 'vacation')",
                [],
            )
            .unwrap();
        let window = db.fetch_window(d("2024-06-01"), d("2024-06-30")).unwrap();
        assert_eq!(window.day_modes[&d("2024-06-10")], DayMode::Normal);
    }

    #[test]
    fn achieved_set_survives_and_never_shrinks() {
        let (db, _dir) = test_db();
        db.record_achieved(&["streak-3".to_string(), "streak-7".to_string()])
            .unwrap();
        // Recording an already-earned id is a no-op, not a duplicate.
        db.record_achieved(&["streak-3".to_string()]).unwrap();

        let achieved = db.load_achieved().unwrap();
        assert_eq!(achieved.len(), 2);
        assert!(achieved.contains("streak-3"));

        let dated = db.load_achieved_with_dates().unwrap();
        assert_eq!(dated.len(), 2);
    }

    #[test]
    fn rest_days_round_trip_and_drop_invalid() {
        let (db, _dir) = test_db();
        let mut config = RestDayConfig::default();
        config.0.insert(7);
        db.set_rest_days(&config).unwrap();
        assert!(db.get_rest_days().unwrap().contains(7));

        // Out-of-range rows (manual edits, old bugs) are filtered on load.
        db.conn_ref()
            .execute("INSERT OR IGNORE INTO rest_days (weekday) VALUES (9)", [])
            .unwrap();
        let loaded = db.get_rest_days().unwrap();
        assert!(!loaded.contains(9));
        assert!(loaded.contains(7));
    }

    #[test]
    fn gone_subscription_is_deleted() {
        let (db, _dir) = test_db();
        db.insert_subscription(&PushSubscription {
            id: "s1".to_string(),
            endpoint: "https://push.example/s1".to_string(),
            created_at: "2024-06-10T00:00:00Z".to_string(),
        })
        .unwrap();
        assert_eq!(db.get_subscriptions().unwrap().len(), 1);
        db.delete_subscription("s1").unwrap();
        assert!(db.get_subscriptions().unwrap().is_empty());
        assert!(db.get_subscription("s1").unwrap().is_none());
    }

    #[test]
    fn disabled_reminders_are_not_returned() {
        let (db, _dir) = test_db();
        db.upsert_reminder(&Reminder {
            id: "r1".to_string(),
            label: "Evening check-in".to_string(),
            time: "21:00".to_string(),
            days_of_week: None,
            enabled: true,
        })
        .unwrap();
        db.upsert_reminder(&Reminder {
            id: "r2".to_string(),
            label: "Off".to_string(),
            time: "08:00".to_string(),
            days_of_week: Some(vec![1]),
            enabled: false,
        })
        .unwrap();

        let reminders = db.get_enabled_reminders().unwrap();
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].id, "r1");
    }
}
