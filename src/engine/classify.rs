//! Day classifier: the core state machine.
//!
//! Classification for a date is pure and depends only on that date's inputs,
//! so any date can be computed independently and cached. Priority order:
//! travel/sick override, then rest day, then empty core set, then the
//! missed-core count.

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::dates::iso_weekday;
use crate::engine::schedule::effective_core_set;
use crate::engine::EngineWindow;
use crate::types::{DayMode, RestDayConfig, RoutineItem};

/// The four-state day color. `Empty` means the date does not count toward
/// streaks or totals at all — it is not red by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayStatus {
    Green,
    Yellow,
    Red,
    Empty,
}

impl DayStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DayStatus::Green => "green",
            DayStatus::Yellow => "yellow",
            DayStatus::Red => "red",
            DayStatus::Empty => "empty",
        }
    }
}

/// Classify one date.
///
/// `done` is the set of routine item ids with a `done = true` check on this
/// date. Bonus (non-core) items never affect the color.
pub fn classify_day(
    date: NaiveDate,
    items: &[RoutineItem],
    done: Option<&HashSet<String>>,
    day_mode: Option<DayMode>,
    rest_days: &RestDayConfig,
) -> DayStatus {
    // 1. Travel and sick days always count, regardless of checks.
    if matches!(day_mode, Some(DayMode::Travel) | Some(DayMode::Sick)) {
        return DayStatus::Green;
    }

    // 2. Configured rest day.
    if rest_days.contains(iso_weekday(date)) {
        return DayStatus::Green;
    }

    // 3. No core habits apply to this date (or none configured yet).
    let core = effective_core_set(items, date);
    if core.is_empty() {
        return DayStatus::Empty;
    }

    // 4. Missed-core count decides the color.
    let done_count = match done {
        Some(done) => core.iter().filter(|i| done.contains(&i.id)).count(),
        None => 0,
    };
    match core.len() - done_count {
        0 => DayStatus::Green,
        1 => DayStatus::Yellow,
        _ => DayStatus::Red,
    }
}

/// Classify every date in `[start, end]` over a fetched window.
/// The ordered map keeps downstream walks deterministic.
pub fn classify_range(
    window: &EngineWindow,
    start: NaiveDate,
    end: NaiveDate,
) -> BTreeMap<NaiveDate, DayStatus> {
    let mut statuses = BTreeMap::new();
    let mut date = start;
    while date <= end {
        statuses.insert(
            date,
            classify_day(
                date,
                &window.items,
                window.done_on(date),
                window.day_modes.get(&date).copied(),
                &window.rest_days,
            ),
        );
        match date.succ_opt() {
            Some(next) => date = next,
            None => break,
        }
    }
    statuses
}
