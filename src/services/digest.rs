//! Weekly digest assembly for the scheduled job.
//!
//! Classifies the most recently completed Monday-Sunday week and turns it
//! into a notification payload. Runs with no session context: one window
//! fetch, then pure engine calls.

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::db::HabitDb;
use crate::engine::classify::{classify_day, DayStatus};
use crate::engine::dates::{date_key, previous_week_start, reference_date};
use crate::engine::digest::{weekly_digest, WeeklyDigest};
use crate::types::NotificationPayload;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestReport {
    pub week_start: String,
    pub digest: WeeklyDigest,
}

/// Build the digest for the week that just ended.
pub fn build_weekly_digest(db: &HabitDb, tz: Tz, now: DateTime<Utc>) -> DigestReport {
    let today = reference_date(now, tz);
    let week_start = previous_week_start(today);
    let week_end = week_start + Duration::days(6);

    let window = super::window_or_empty(db, week_start, week_end);

    let mut statuses = [DayStatus::Empty; 7];
    for (offset, status) in statuses.iter_mut().enumerate() {
        let date = week_start + Duration::days(offset as i64);
        *status = classify_day(
            date,
            &window.items,
            window.done_on(date),
            window.day_modes.get(&date).copied(),
            &window.rest_days,
        );
    }

    DigestReport {
        week_start: date_key(week_start),
        digest: weekly_digest(&statuses),
    }
}

/// Render the digest as a push payload.
pub fn digest_notification(report: &DigestReport) -> NotificationPayload {
    let d = &report.digest;
    let body = if d.glyph_line.is_empty() {
        "No tracked days last week. This week is a fresh start.".to_string()
    } else {
        format!(
            "{} — {} green, {} yellow, {} red",
            d.glyph_line, d.green_count, d.yellow_count, d.red_count
        )
    };
    NotificationPayload {
        title: format!("Weekly recap: {}", d.headline),
        body,
        tag: format!("weekly-digest-{}", report.week_start),
        url: "/progress".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DayMode, RoutineItem};
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
    fn digest_covers_the_completed_week() {
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

        // Week of Mon 06-10..Sun 06-16: green Mon-Wed + Fri, travel Thu,
        // nothing Sat/Sun.
        for day in ["2024-06-10", "2024-06-11", "2024-06-12", "2024-06-14"] {
            db.set_check(d(day), "water", true).unwrap();
        }
        db.set_day_mode(d("2024-06-13"), DayMode::Travel).unwrap();

        // Job runs the following Monday.
        let report = build_weekly_digest(&db, UTC, noon_utc("2024-06-17"));
        assert_eq!(report.week_start, "2024-06-10");
        assert_eq!(report.digest.green_count, 5);
        assert_eq!(report.digest.yellow_count, 2); // unchecked Sat+Sun
        assert_eq!(report.digest.headline, "Strong week");
    }

    #[test]
    fn notification_payload_carries_headline_and_glyphs() {
        let report = DigestReport {
            week_start: "2024-06-10".to_string(),
            digest: weekly_digest(&[
                DayStatus::Green,
                DayStatus::Green,
                DayStatus::Green,
                DayStatus::Yellow,
                DayStatus::Green,
                DayStatus::Empty,
                DayStatus::Green,
            ]),
        };
        let payload = digest_notification(&report);
        assert_eq!(payload.title, "Weekly recap: Strong week");
        assert!(payload.body.contains("🟩🟩🟩🟨🟩🟩"));
        assert!(payload.body.contains("5 green"));
        assert_eq!(payload.tag, "weekly-digest-2024-06-10");
    }

    #[test]
    fn empty_week_degrades_to_fresh_start_copy() {
        let (db, _dir) = test_db();
        let report = build_weekly_digest(&db, UTC, noon_utc("2024-06-17"));
        let payload = digest_notification(&report);
        assert!(payload.body.contains("fresh start"));
    }
}
