//! Today surface: classify the current date, refresh streaks, and run the
//! milestone evaluation.
//!
//! This is invoked after every write (a check toggle or activity insert), so
//! it must be safe to call redundantly: the achieved set is read before and
//! written after each evaluation, and an unchanged set emits zero events.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::db::HabitDb;
use crate::engine::classify::{classify_range, DayStatus};
use crate::engine::dates::{date_key, reference_date};
use crate::engine::milestones::{self, HabitStreak, MilestoneEvent, MilestoneStats};
use crate::engine::streaks::{per_habit_streak, streaks, StreakSummary};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaySnapshot {
    pub date: String,
    pub status: DayStatus,
    pub streaks: StreakSummary,
    /// Newly-earned milestones, ladder order. Already persisted; the caller
    /// queues them and celebrates one at a time.
    pub events: Vec<MilestoneEvent>,
}

/// Recompute today's status and evaluate milestones.
pub fn evaluate_today(
    db: &HabitDb,
    tz: Tz,
    now: DateTime<Utc>,
    lookback_days: u32,
) -> TodaySnapshot {
    let today = reference_date(now, tz);
    let start = today - Duration::days(i64::from(lookback_days));

    let window = super::window_or_empty(db, start, today);
    let statuses = classify_range(&window, start, today);
    let streak_summary = streaks(&statuses, today);

    let green_total = statuses
        .values()
        .filter(|s| **s == DayStatus::Green)
        .count() as u32;

    let mut habit_streaks = BTreeMap::new();
    for item in window.items.iter().filter(|i| i.active) {
        let done: BTreeMap<_, _> = window
            .done
            .iter()
            .filter(|(_, ids)| ids.contains(&item.id))
            .map(|(date, _)| (*date, true))
            .collect();
        habit_streaks.insert(
            item.id.clone(),
            HabitStreak {
                label: item.label.clone(),
                streak: per_habit_streak(item, &done, start, today),
            },
        );
    }

    let stats = MilestoneStats {
        current_streak: streak_summary.current,
        best_streak: streak_summary.best,
        green_total,
        habit_streaks,
    };

    let achieved = match db.load_achieved() {
        Ok(set) => set,
        Err(e) => {
            log::warn!("Failed to load achieved set, skipping milestone crediting: {e}");
            // Evaluating against an empty set would re-fire everything;
            // better to emit nothing this round.
            return TodaySnapshot {
                date: date_key(today),
                status: statuses.get(&today).copied().unwrap_or(DayStatus::Empty),
                streaks: streak_summary,
                events: Vec::new(),
            };
        }
    };

    let (events, updated) = milestones::evaluate(&stats, &achieved);
    if !events.is_empty() {
        let new_ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
        if let Err(e) = db.record_achieved(&new_ids) {
            log::warn!("Failed to persist {} achieved milestone(s): {e}", new_ids.len());
        }
        debug_assert!(updated.len() >= achieved.len());
    }

    TodaySnapshot {
        date: date_key(today),
        status: statuses.get(&today).copied().unwrap_or(DayStatus::Empty),
        streaks: streak_summary,
        events,
    }
}
