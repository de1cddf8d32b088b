use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Configuration stored in ~/.momentum/config.json
///
/// All fields have defaults so a missing or partial file still yields a
/// working configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Fixed reference timezone (IANA name) for all date-key normalization.
    /// Every surface and job resolves "today" in this zone, never the device
    /// zone, so a traveling user's day boundary stays put.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// How many days of history to fetch per recomputation.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default)]
    pub digest: ScheduleEntry,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            lookback_days: default_lookback_days(),
            digest: ScheduleEntry::default(),
        }
    }
}

fn default_timezone() -> String {
    "America/New_York".to_string()
}

fn default_lookback_days() -> u32 {
    365
}

/// Schedule configuration for the weekly digest job.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 5-field cron expression evaluated in `timezone`.
    #[serde(default = "default_digest_cron")]
    pub cron: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

impl Default for ScheduleEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            cron: default_digest_cron(),
            timezone: default_timezone(),
        }
    }
}

fn default_true() -> bool {
    true
}

//// Monday 9am: the digest covers the week that just ended.
fn default_digest_cron() -> String {
    "0 9 * * 1".to_string()
}

/// A user-defined routine item.
///
/// Items are never hard-deleted; retiring one sets `active = false` so past
/// day classifications stay reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutineItem {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub emoji: String,
    #[serde(default)]
    pub section: String,
    /// Non-negotiable. Only core items affect the day color.
    pub is_core: bool,
    /// ISO weekdays (1=Mon..7=Sun) the item applies to; `None` = every day.
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub sort_order: i64,
}

/// One check row per item per date it was evaluated. Absence of a row means
/// "not yet evaluated", which is distinct from `done = false`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyCheck {
    pub date: NaiveDate,
    pub routine_item_id: String,
    pub done: bool,
}

/// Per-date override mode. Travel and sick days always count as green.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayMode {
    Normal,
    Travel,
    Sick,
}

impl DayMode {
    /// Parse a stored mode string. Unknown values fall back to `Normal`
    /// rather than erroring; a malformed override must never poison a day.
    pub fn from_str_or_normal(value: &str) -> Self {
        match value {
            "travel" => DayMode::Travel,
            "sick" => DayMode::Sick,
            _ => DayMode::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DayMode::Normal => "normal",
            DayMode::Travel => "travel",
            DayMode::Sick => "sick",
        }
    }
}

/// At most one log row per date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub date: NaiveDate,
    pub day_mode: DayMode,
    #[serde(default)]
    pub slept_well: Option<bool>,
    #[serde(default)]
    pub note: Option<String>,
}

/// User-configured weekdays (ISO 1..7) that are always treated as green.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestDayConfig(pub BTreeSet<u8>);

impl RestDayConfig {
    pub fn contains(&self, iso_weekday: u8) -> bool {
        self.0.contains(&iso_weekday)
    }
}

/// Structured payload attached to an activity log entry.
///
/// Stored as tagged JSON and validated at the DB boundary so the engine
/// never parses untyped blobs. Unknown kinds map to `None` on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActivityNotes {
    Cardio {
        #[serde(default)]
        route: Option<String>,
        /// Perceived effort 1..10.
        #[serde(default)]
        effort: Option<u8>,
    },
    Strength {
        #[serde(default)]
        focus: Option<String>,
    },
    Note { text: String },
}

/// An independent numeric measurement (distance, sessions, pages...).
/// Feeds the period aggregator; unrelated to core/bonus classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLog {
    pub id: String,
    pub date: NaiveDate,
    pub activity_key: String,
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub notes: Option<ActivityNotes>,
}

/// A configured reminder, matched by the minute-tick scheduler against
/// "now" in the reference timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    pub label: String,
    /// Time of day as "HH:MM" in the reference timezone.
    pub time: String,
    /// ISO weekdays the reminder fires on; `None` = every day.
    #[serde(default)]
    pub days_of_week: Option<Vec<u8>>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

/// A subscriber endpoint for push delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub id: String,
    pub endpoint: String,
    pub created_at: String,
}

/// Payload sent to a subscription endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    /// Collapse key: notifications with the same tag replace each other.
    pub tag: String,
    pub url: String,
}

/// Sanitize a stored weekday list: keep ISO 1..7, dedupe, sort.
/// Empty or fully-invalid input maps to `None` (= every day), never an error.
pub fn sanitize_days_of_week(days: Option<Vec<u8>>) -> Option<Vec<u8>> {
    let mut days: Vec<u8> = days?.into_iter().filter(|d| (1..=7).contains(d)).collect();
    if days.is_empty() {
        return None;
    }
    days.sort_unstable();
    days.dedup();
    Some(days)
}
