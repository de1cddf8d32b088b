//! Period aggregator: week/month/year/all-time rollups.
//!
//! All boundaries are calendar boundaries in the fixed reference timezone
//! (computed by `engine::dates`), and "all-time" is bounded by the fetched
//! lookback window.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::engine::dates::{month_start, week_start, year_start};
use crate::engine::schedule::in_scope;
use crate::engine::EngineWindow;
use crate::types::ActivityLog;

/// Week-to-date / month-to-date / year-to-date / all-time sums for one
/// (activity key, unit) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityTotals {
    pub activity_key: String,
    pub unit: String,
    pub week: f64,
    pub month: f64,
    pub year: f64,
    pub all_time: f64,
}

/// Completion rollup for one routine item over the same four periods.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitCompletion {
    pub routine_item_id: String,
    pub week: u32,
    pub month: u32,
    pub year: u32,
    pub all_time: u32,
    /// Days in the window the item was in scope.
    pub tracked_days: u32,
    /// `round(100 * all_time / tracked_days)`, 0 when nothing was tracked.
    pub completion_pct: u32,
}

/// Sum activity values per (key, unit) pair into the four period buckets.
/// Rows dated after `today` are ignored; periods are `[start, today]`.
pub fn activity_totals(logs: &[ActivityLog], today: NaiveDate) -> Vec<ActivityTotals> {
    let wk = week_start(today);
    let mo = month_start(today);
    let yr = year_start(today);

    let mut totals: BTreeMap<(String, String), ActivityTotals> = BTreeMap::new();
    for log in logs {
        if log.date > today {
            continue;
        }
        let entry = totals
            .entry((log.activity_key.clone(), log.unit.clone()))
            .or_insert_with(|| ActivityTotals {
                activity_key: log.activity_key.clone(),
                unit: log.unit.clone(),
                week: 0.0,
                month: 0.0,
                year: 0.0,
                all_time: 0.0,
            });
        entry.all_time += log.value;
        if log.date >= yr {
            entry.year += log.value;
        }
        if log.date >= mo {
            entry.month += log.value;
        }
        if log.date >= wk {
            entry.week += log.value;
        }
    }
    totals.into_values().collect()
}

/// Per-item completion counts plus tracked-day count and completion
/// percentage, over `[window_start, today]`.
pub fn habit_completions(
    window: &EngineWindow,
    window_start: NaiveDate,
    today: NaiveDate,
) -> Vec<HabitCompletion> {
    let wk = week_start(today);
    let mo = month_start(today);
    let yr = year_start(today);

    let mut out = Vec::with_capacity(window.items.len());
    for item in &window.items {
        let mut completion = HabitCompletion {
            routine_item_id: item.id.clone(),
            week: 0,
            month: 0,
            year: 0,
            all_time: 0,
            tracked_days: 0,
            completion_pct: 0,
        };

        let mut date = window_start;
        while date <= today {
            if in_scope(item, date) {
                completion.tracked_days += 1;
                let done = window
                    .done_on(date)
                    .map(|set| set.contains(&item.id))
                    .unwrap_or(false);
                if done {
                    completion.all_time += 1;
                    if date >= yr {
                        completion.year += 1;
                    }
                    if date >= mo {
                        completion.month += 1;
                    }
                    if date >= wk {
                        completion.week += 1;
                    }
                }
            }
            match date.succ_opt() {
                Some(next) => date = next,
                None => break,
            }
        }

        if completion.tracked_days > 0 {
            let pct = 100.0 * f64::from(completion.all_time) / f64::from(completion.tracked_days);
            completion.completion_pct = pct.round() as u32;
        }
        out.push(completion);
    }
    out
}
