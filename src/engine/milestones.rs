//! Milestone engine.
//!
//! Evaluates the static threshold ladders against computed stats and the
//! persisted achieved-id set. Evaluation is idempotent: an id already in the
//! set never fires again, so the caller can re-evaluate after every write
//! (rapid check toggles included) without duplicate celebrations, and a
//! process restart never re-fires persisted ids.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;

/// Streak thresholds, shared by the global and per-habit ladders.
pub const STREAK_LADDER: &[u32] = &[3, 7, 14, 21, 30, 50, 75, 100, 150, 200, 365];

/// Lifetime green-day totals.
pub const GREEN_TOTAL_LADDER: &[u32] = &[10, 25, 50, 100, 250, 500, 1000];

/// Persisted, monotonically-growing set of earned milestone ids.
pub type AchievedSet = BTreeSet<String>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneKind {
    Streak,
    GreenTotal,
    Habit,
}

/// A newly-earned milestone, ready for the caller to celebrate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MilestoneEvent {
    pub id: String,
    pub kind: MilestoneKind,
    pub threshold: u32,
    pub title: String,
    pub message: String,
    pub emoji: String,
}

/// Inputs to one evaluation pass, computed by the streak calculator and
/// period aggregator over the same window.
#[derive(Debug, Clone, Default)]
pub struct MilestoneStats {
    pub current_streak: u32,
    pub best_streak: u32,
    /// Lifetime green-day count (bounded by the fetched window).
    pub green_total: u32,
    /// Current per-habit streak, keyed by routine item id. Labels are
    /// carried so event copy can name the habit.
    pub habit_streaks: BTreeMap<String, HabitStreak>,
}

#[derive(Debug, Clone)]
pub struct HabitStreak {
    pub label: String,
    pub streak: u32,
}

pub fn streak_id(threshold: u32) -> String {
    format!("streak-{threshold}")
}

pub fn green_total_id(threshold: u32) -> String {
    format!("green_total-{threshold}")
}

pub fn habit_id(routine_item_id: &str, threshold: u32) -> String {
    format!("habit-{routine_item_id}-{threshold}")
}

/// Evaluate every ladder. Returns the newly-earned events (ladder order) and
/// the updated achieved set; the caller persists the set and queues the
/// events. Re-running with the returned set and unchanged stats emits
/// nothing.
pub fn evaluate(stats: &MilestoneStats, achieved: &AchievedSet) -> (Vec<MilestoneEvent>, AchievedSet) {
    let mut updated = achieved.clone();
    let mut events = Vec::new();

    for &threshold in STREAK_LADDER {
        if stats.current_streak < threshold {
            break;
        }
        let id = streak_id(threshold);
        if updated.insert(id.clone()) {
            events.push(MilestoneEvent {
                id,
                kind: MilestoneKind::Streak,
                threshold,
                title: format!("{threshold}-day streak!"),
                message: format!("{threshold} green days in a row. Keep the chain alive."),
                emoji: "🔥".to_string(),
            });
        }
    }

    for &threshold in GREEN_TOTAL_LADDER {
        if stats.green_total < threshold {
            break;
        }
        let id = green_total_id(threshold);
        if updated.insert(id.clone()) {
            events.push(MilestoneEvent {
                id,
                kind: MilestoneKind::GreenTotal,
                threshold,
                title: format!("{threshold} green days"),
                message: format!("You have banked {threshold} green days all-time."),
                emoji: "🟩".to_string(),
            });
        }
    }

    for (item_id, habit) in &stats.habit_streaks {
        for &threshold in STREAK_LADDER {
            if habit.streak < threshold {
                break;
            }
            let id = habit_id(item_id, threshold);
            if updated.insert(id.clone()) {
                events.push(MilestoneEvent {
                    id,
                    kind: MilestoneKind::Habit,
                    threshold,
                    title: format!("{}: {threshold} days", habit.label),
                    message: format!("{threshold} days straight of {}.", habit.label),
                    emoji: "🏅".to_string(),
                });
            }
        }
    }

    (events, updated)
}

/// FIFO of earned events held by the caller. The UI shows one celebration at
/// a time: dismiss, then fetch the next. No global event bus.
#[derive(Debug, Default)]
pub struct CelebrationQueue {
    events: VecDeque<MilestoneEvent>,
}

impl CelebrationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = MilestoneEvent>) {
        self.events.extend(events);
    }

    /// Pop the next queued event, if any.
    pub fn next_event(&mut self) -> Option<MilestoneEvent> {
        self.events.pop_front()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
