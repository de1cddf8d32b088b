//! Date normalization in the fixed reference timezone.
//!
//! Every component of the engine resolves timestamps through this module —
//! never the device or session timezone — so a user's "day" boundary is
//! stable regardless of travel. All functions are pure and total.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use chrono_tz::Tz;

/// The calendar date a timestamp falls on in the reference timezone.
pub fn reference_date(ts: DateTime<Utc>, tz: Tz) -> NaiveDate {
    ts.with_timezone(&tz).date_naive()
}

/// Stable `YYYY-MM-DD` date key.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// ISO weekday, 1 = Monday .. 7 = Sunday.
pub fn iso_weekday(date: NaiveDate) -> u8 {
    date.weekday().number_from_monday() as u8
}

/// Monday of the ISO week containing `date`.
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(iso_weekday(date)) - 1)
}

/// First day of the month containing `date`.
pub fn month_start(date: NaiveDate) -> NaiveDate {
    // The 1st always exists for a valid (year, month).
    date.with_day(1).unwrap_or(date)
}

/// January 1st of the year containing `date`.
pub fn year_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

/// Monday of the most recently *completed* ISO week: the digest job covers
/// the week that just ended, not the one in progress.
pub fn previous_week_start(today: NaiveDate) -> NaiveDate {
    week_start(today) - Duration::days(7)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::America::New_York;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn reference_date_uses_fixed_zone_not_utc() {
        // 2024-06-11 01:30 UTC is still 2024-06-10 in New York.
        let ts = Utc.with_ymd_and_hms(2024, 6, 11, 1, 30, 0).unwrap();
        assert_eq!(reference_date(ts, New_York), d("2024-06-10"));
    }

    #[test]
    fn date_key_is_iso_formatted() {
        assert_eq!(date_key(d("2024-06-10")), "2024-06-10");
        assert_eq!(date_key(d("2024-01-05")), "2024-01-05");
    }

    #[test]
    fn iso_weekday_is_monday_first() {
        assert_eq!(iso_weekday(d("2024-06-10")), 1); // Monday
        assert_eq!(iso_weekday(d("2024-06-15")), 6); // Saturday
        assert_eq!(iso_weekday(d("2024-06-16")), 7); // Sunday
    }

    #[test]
    fn period_starts() {
        let date = d("2024-06-12"); // Wednesday
        assert_eq!(week_start(date), d("2024-06-10"));
        assert_eq!(month_start(date), d("2024-06-01"));
        assert_eq!(year_start(date), d("2024-01-01"));
    }

    #[test]
    fn week_start_is_identity_on_monday() {
        assert_eq!(week_start(d("2024-06-10")), d("2024-06-10"));
    }

    #[test]
    fn previous_week_start_covers_completed_week() {
        // Monday morning job: digest covers the prior Mon-Sun.
        assert_eq!(previous_week_start(d("2024-06-17")), d("2024-06-10"));
        // Mid-week invocation still points at the last completed week.
        assert_eq!(previous_week_start(d("2024-06-19")), d("2024-06-10"));
    }
}
