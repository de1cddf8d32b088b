//! Streak calculator.
//!
//! Walks a date-ordered status sequence to produce three counters:
//! - `current`: consecutive green days ending at today. When today is not
//!   (yet) green the walk starts from yesterday instead — today's color can
//!   still change until midnight, so it never breaks the run, it simply
//!   isn't counted yet.
//! - `best`: historical maximum green run across the whole window.
//! - `active`: the run credited through yesterday while today is pending.
//!   Used only for "streak at risk" messaging, never for milestone
//!   crediting. Under the adopted policy it coincides with `current`; it is
//!   kept as a separate field so the messaging contract survives any future
//!   tightening of `current`.
//!
//! Empty-day policy: an empty day *before* any tracked history is skipped
//! (the habit didn't exist yet that far back); an empty day occurring after
//! tracking started breaks the run. The "breaks" choice is deliberate — see
//! DESIGN.md.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::engine::classify::DayStatus;
use crate::engine::schedule::in_scope;
use crate::types::RoutineItem;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreakSummary {
    pub current: u32,
    pub best: u32,
    pub active: u32,
}

/// Compute all three streak counters from a classified window.
///
/// `statuses` must cover the lookback window; dates absent from the map are
/// treated as empty (untracked).
pub fn streaks(statuses: &BTreeMap<NaiveDate, DayStatus>, today: NaiveDate) -> StreakSummary {
    let first_tracked = statuses
        .iter()
        .find(|(_, s)| **s != DayStatus::Empty)
        .map(|(d, _)| *d);

    let yesterday = today - Duration::days(1);
    let run_through_yesterday = run_ending_at(statuses, yesterday, first_tracked);

    // Today never breaks: a yellow/red classification can still turn green
    // before the day ends, so anything but green starts the walk yesterday.
    let current = match statuses.get(&today) {
        Some(DayStatus::Green) => 1 + run_through_yesterday,
        _ => run_through_yesterday,
    };
    let active = current;

    let best = best_streak(statuses).max(current);

    StreakSummary {
        current,
        best,
        active,
    }
}

/// Length of the consecutive green run ending exactly at `anchor`.
///
/// Walking backward: green counts; yellow/red stops; empty stops once the
/// walk is inside tracked history, and ends the walk anyway when it has
/// stepped past the first tracked date.
fn run_ending_at(
    statuses: &BTreeMap<NaiveDate, DayStatus>,
    anchor: NaiveDate,
    first_tracked: Option<NaiveDate>,
) -> u32 {
    let Some(first_tracked) = first_tracked else {
        return 0;
    };
    let mut count = 0;
    let mut date = anchor;
    while date >= first_tracked {
        match statuses.get(&date) {
            Some(DayStatus::Green) => count += 1,
            _ => break,
        }
        match date.pred_opt() {
            Some(prev) => date = prev,
            None => break,
        }
    }
    count
}

/// Best-ever streak: chronological scan, green increments, yellow/red
/// resets, empty leaves the counter unchanged.
fn best_streak(statuses: &BTreeMap<NaiveDate, DayStatus>) -> u32 {
    let mut best = 0;
    let mut run = 0;
    for status in statuses.values() {
        match status {
            DayStatus::Green => {
                run += 1;
                best = best.max(run);
            }
            DayStatus::Yellow | DayStatus::Red => run = 0,
            DayStatus::Empty => {}
        }
    }
    best
}

/// Per-habit streak for the per-habit milestone ladder: consecutive
/// in-scope days ending at today (or yesterday if today's check is still
/// open) on which the item was done. Out-of-scope days are skipped without
/// breaking the run.
pub fn per_habit_streak(
    item: &RoutineItem,
    done: &BTreeMap<NaiveDate, bool>,
    window_start: NaiveDate,
    today: NaiveDate,
) -> u32 {
    let mut count = 0;
    let mut date = today;
    let mut at_anchor = true;
    while date >= window_start {
        if in_scope(item, date) {
            match done.get(&date) {
                Some(true) => count += 1,
                // Today still unchecked doesn't break; any other open or
                // failed in-scope day does.
                _ if at_anchor && date == today => {}
                _ => break,
            }
        }
        at_anchor = false;
        match date.pred_opt() {
            Some(prev) => date = prev,
            None => break,
        }
    }
    count
}
