//! Scheduler for the reminder and weekly-digest jobs.
//!
//! A single poll loop with support for:
//! - Minute-level reminder matching in the fixed reference timezone
//! - Cron-based weekly digest scheduling
//! - Sleep/wake detection via time-jump polling
//! - Missed digest handling (runs if within a 24-hour grace period)

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use cron::Schedule;

use crate::db::HabitDb;
use crate::engine::dates::iso_weekday;
use crate::error::JobError;
use crate::notification::broadcast;
use crate::services::digest::{build_weekly_digest, digest_notification};
use crate::state::AppState;
use crate::types::{NotificationPayload, Reminder, ScheduleEntry};

/// Grace period for a digest missed during sleep (24 hours).
const MISSED_DIGEST_GRACE_PERIOD_SECS: i64 = 86400;

/// Time jump threshold to detect sleep/wake (5 minutes).
const TIME_JUMP_THRESHOLD_SECS: i64 = 300;

/// Poll interval for the scheduler loop (1 minute).
const POLL_INTERVAL_SECS: u64 = 60;

pub struct Scheduler {
    state: Arc<AppState>,
    client: reqwest::Client,
}

impl Scheduler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            client: reqwest::Client::new(),
        }
    }

    /// Start the scheduler loop.
    ///
    /// Runs indefinitely, matching due reminders and the digest schedule
    /// every minute. Also handles sleep/wake detection.
    pub async fn run(&self) {
        let mut last_check = Utc::now();

        loop {
            tokio::time::sleep(Duration::from_secs(POLL_INTERVAL_SECS)).await;

            let now = Utc::now();

            // Detect sleep: time jumped more than 5 minutes
            let time_jump = (now - last_check).num_seconds();
            if time_jump > TIME_JUMP_THRESHOLD_SECS {
                log::info!(
                    "Detected system wake (time jumped {} seconds), checking for missed digest",
                    time_jump
                );
                self.check_missed_digest(now).await;
            }

            self.fire_due_reminders(now).await;
            self.check_digest(now).await;

            last_check = now;
        }
    }

    fn config(&self) -> crate::types::Config {
        match self.state.config.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => crate::types::Config::default(),
        }
    }

    fn with_db<T>(&self, f: impl FnOnce(&HabitDb) -> T) -> Option<T> {
        let guard = self.state.db.lock().ok()?;
        guard.as_ref().map(f)
    }

    /// Match enabled reminders against the current minute in the reference
    /// timezone and deliver to every subscription.
    async fn fire_due_reminders(&self, now: DateTime<Utc>) {
        let config = self.config();
        let tz = crate::state::reference_tz(&config);
        let now_local = now.with_timezone(&tz);
        let minute_key = now_local.format("%Y-%m-%dT%H:%M").to_string();

        let reminders = match self.with_db(|db| db.get_enabled_reminders()) {
            Some(Ok(reminders)) => reminders,
            Some(Err(e)) => {
                log::warn!("Failed to load reminders: {e}");
                return;
            }
            None => return,
        };

        let hhmm = now_local.format("%H:%M").to_string();
        let weekday = iso_weekday(now_local.date_naive());

        for reminder in reminders {
            if !reminder_is_due(&reminder, &hhmm, weekday) {
                continue;
            }
            // Dedupe: the poll loop can tick twice inside one minute.
            if !self.state.mark_reminder_fired(&reminder.id, &minute_key) {
                continue;
            }

            log::info!("Reminder '{}' due at {minute_key}", reminder.label);
            let payload = NotificationPayload {
                title: reminder.label.clone(),
                body: "Time to check in on today's routine.".to_string(),
                tag: format!("reminder-{}", reminder.id),
                url: "/today".to_string(),
            };
            self.deliver(&payload).await;
        }
    }

    /// Check whether the digest should run at the given time.
    async fn check_digest(&self, now: DateTime<Utc>) {
        let config = self.config();
        if !config.digest.enabled {
            return;
        }
        match self.digest_due_now(&config.digest, now) {
            Ok(true) => self.run_digest(now).await,
            Ok(false) => {}
            Err(e) => log::warn!("Digest schedule check failed: {e}"),
        }
    }

    fn digest_due_now(&self, entry: &ScheduleEntry, now: DateTime<Utc>) -> Result<bool, JobError> {
        let schedule = parse_cron(&entry.cron)?;
        let tz: Tz = entry
            .timezone
            .parse()
            .map_err(|_| JobError::Configuration(format!("Invalid timezone: {}", entry.timezone)))?;

        let now_local = now.with_timezone(&tz);
        let last_run = self.state.last_digest_run();

        // Find the most recent scheduled time near now
        let mut scheduled_times = schedule.after(&(now_local - chrono::Duration::minutes(2)));
        if let Some(next_time) = scheduled_times.next() {
            let next_utc = next_time.with_timezone(&Utc);
            let diff = (now - next_utc).num_seconds().abs();

            // Within 2 minutes of scheduled time (wider window for sleep/wake)
            if diff < 120 {
                if let Some(last) = last_run {
                    if (last - next_utc).num_seconds().abs() < 60 {
                        return Ok(false); // Already ran
                    }
                }
                return Ok(true);
            }
        }

        Ok(false)
    }

    /// Check for a digest that was missed during sleep, within the grace
    /// period.
    async fn check_missed_digest(&self, now: DateTime<Utc>) {
        let config = self.config();
        if !config.digest.enabled {
            return;
        }
        match self.find_missed_digest(&config.digest, now) {
            Ok(Some(scheduled)) => {
                log::info!("Found missed digest (scheduled {scheduled}), running now");
                self.run_digest(now).await;
            }
            Ok(None) => {}
            Err(e) => log::warn!("Missed-digest check failed: {e}"),
        }
    }

    fn find_missed_digest(
        &self,
        entry: &ScheduleEntry,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, JobError> {
        let schedule = parse_cron(&entry.cron)?;
        let tz: Tz = entry
            .timezone
            .parse()
            .map_err(|_| JobError::Configuration(format!("Invalid timezone: {}", entry.timezone)))?;

        let now_local = now.with_timezone(&tz);
        let grace_start = now_local - chrono::Duration::seconds(MISSED_DIGEST_GRACE_PERIOD_SECS);
        let last_run = self.state.last_digest_run();

        for scheduled in schedule.after(&grace_start) {
            let scheduled_utc = scheduled.with_timezone(&Utc);
            if scheduled_utc > now {
                break;
            }
            if let Some(last) = last_run {
                if last >= scheduled_utc {
                    continue; // Already ran
                }
            }
            return Ok(Some(scheduled_utc));
        }

        Ok(None)
    }

    /// Build and deliver the weekly digest, then record the run.
    async fn run_digest(&self, now: DateTime<Utc>) {
        let config = self.config();
        let tz = crate::state::reference_tz(&config);

        let report = match self.with_db(|db| build_weekly_digest(db, tz, now)) {
            Some(report) => report,
            None => {
                log::warn!("Digest skipped: store unavailable");
                return;
            }
        };

        log::info!(
            "Weekly digest for {}: {} ({} green)",
            report.week_start,
            report.digest.headline,
            report.digest.green_count
        );
        self.deliver(&digest_notification(&report)).await;
        self.state.set_last_digest_run(now);
    }

    /// Deliver a payload to every subscription, cleaning up gone endpoints.
    /// Per-subscriber failures are counted, never fatal to the batch.
    async fn deliver(&self, payload: &NotificationPayload) {
        let subs = match self.with_db(|db| db.get_subscriptions()) {
            Some(Ok(subs)) => subs,
            Some(Err(e)) => {
                log::warn!("Failed to load subscriptions: {e}");
                return;
            }
            None => return,
        };
        if subs.is_empty() {
            return;
        }

        let outcome = broadcast(&self.client, &subs, payload).await;
        log::info!(
            "Delivered '{}': {} sent, {} failed, {} gone",
            payload.tag,
            outcome.sent,
            outcome.failed,
            outcome.gone.len()
        );

        for id in &outcome.gone {
            let deleted = self.with_db(|db| db.delete_subscription(id));
            if let Some(Err(e)) = deleted {
                log::warn!("Failed to delete gone subscription {id}: {e}");
            }
        }
    }
}

/// True iff the reminder fires at this minute: enabled, time-of-day match,
/// and the weekday is allowed (no list = every day).
pub fn reminder_is_due(reminder: &Reminder, hhmm: &str, iso_weekday: u8) -> bool {
    if !reminder.enabled || reminder.time != hhmm {
        return false;
    }
    match &reminder.days_of_week {
        None => true,
        Some(days) => days.contains(&iso_weekday),
    }
}

/// Parse a 5-field cron expression (the cron crate expects 6, with seconds).
pub fn parse_cron(expr: &str) -> Result<Schedule, JobError> {
    let full_expr = format!("0 {}", expr);
    full_expr
        .parse::<Schedule>()
        .map_err(|e| JobError::Configuration(format!("Invalid cron expression '{}': {}", expr, e)))
}
