//! Consistency scoring and streak engine.
//!
//! Everything under this module is pure, synchronous computation over an
//! already-fetched [`EngineWindow`]: no I/O, no clocks, no error types.
//! Every surface (today view, progress dashboard, trophy case, the weekly
//! digest job) runs the same functions over the same inputs, so the results
//! are byte-identical everywhere.

pub mod classify;
pub mod dates;
pub mod digest;
pub mod milestones;
pub mod periods;
pub mod schedule;
pub mod streaks;

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;

use crate::types::{ActivityLog, DayMode, RestDayConfig, RoutineItem};

/// One user's raw records for a lookback window, fetched by the caller in a
/// single batched range read. A fetch failure degrades to
/// [`EngineWindow::empty`] rather than an error: an empty window classifies
/// every date as empty and sums to zero, which is a valid engine state.
#[derive(Debug, Clone, Default)]
pub struct EngineWindow {
    pub items: Vec<RoutineItem>,
    /// Per date, the set of routine item ids with a `done = true` check.
    pub done: BTreeMap<NaiveDate, HashSet<String>>,
    /// Per date, the recorded day mode (absent = normal).
    pub day_modes: BTreeMap<NaiveDate, DayMode>,
    pub activity: Vec<ActivityLog>,
    pub rest_days: RestDayConfig,
}

impl EngineWindow {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Done-set for one date, or an empty set if nothing was checked.
    pub fn done_on(&self, date: NaiveDate) -> Option<&HashSet<String>> {
        self.done.get(&date)
    }
}
