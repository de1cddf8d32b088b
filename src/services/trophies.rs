//! Trophy case surface.
//!
//! Needs only the static ladders and the persisted achieved-id set — no
//! engine recomputation. Locked trophies show the ladder ahead; earned ones
//! carry their achieved timestamp.

use serde::Serialize;

use crate::db::HabitDb;
use crate::engine::milestones::{
    green_total_id, streak_id, MilestoneKind, GREEN_TOTAL_LADDER, STREAK_LADDER,
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trophy {
    pub id: String,
    pub kind: MilestoneKind,
    pub threshold: u32,
    pub earned: bool,
    pub achieved_at: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrophyCase {
    pub streak: Vec<Trophy>,
    pub green_total: Vec<Trophy>,
    /// Earned per-habit milestones. The per-habit ladder is unbounded across
    /// items, so only earned entries are listed.
    pub habit: Vec<Trophy>,
}

pub fn trophy_case(db: &HabitDb) -> TrophyCase {
    let achieved = match db.load_achieved_with_dates() {
        Ok(map) => map,
        Err(e) => {
            log::warn!("Failed to load achieved set for trophy case: {e}");
            Default::default()
        }
    };

    let ladder = |kind: MilestoneKind, thresholds: &[u32], id_of: &dyn Fn(u32) -> String| {
        thresholds
            .iter()
            .map(|&threshold| {
                let id = id_of(threshold);
                let achieved_at = achieved.get(&id).cloned();
                Trophy {
                    earned: achieved_at.is_some(),
                    id,
                    kind,
                    threshold,
                    achieved_at,
                }
            })
            .collect::<Vec<_>>()
    };

    let streak = ladder(MilestoneKind::Streak, STREAK_LADDER, &streak_id);
    let green_total = ladder(MilestoneKind::GreenTotal, GREEN_TOTAL_LADDER, &green_total_id);

    let habit = achieved
        .iter()
        .filter(|(id, _)| id.starts_with("habit-"))
        .map(|(id, at)| Trophy {
            id: id.clone(),
            kind: MilestoneKind::Habit,
            threshold: id.rsplit('-').next().and_then(|t| t.parse().ok()).unwrap_or(0),
            earned: true,
            achieved_at: Some(at.clone()),
        })
        .collect();

    TrophyCase {
        streak,
        green_total,
        habit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (HabitDb, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = HabitDb::open_at(dir.path().join("test.db")).unwrap();
        (db, dir)
    }

    #[test]
    fn earned_flags_follow_the_achieved_set() {
        let (db, _dir) = test_db();
        db.record_achieved(&[
            "streak-3".to_string(),
            "streak-7".to_string(),
            "habit-water-3".to_string(),
        ])
        .unwrap();

        let case = trophy_case(&db);
        assert_eq!(case.streak.len(), STREAK_LADDER.len());
        assert!(case.streak[0].earned); // streak-3
        assert!(case.streak[1].earned); // streak-7
        assert!(!case.streak[2].earned); // streak-14 still locked
        assert!(case.streak[0].achieved_at.is_some());
        assert!(case.green_total.iter().all(|t| !t.earned));

        assert_eq!(case.habit.len(), 1);
        assert_eq!(case.habit[0].id, "habit-water-3");
        assert_eq!(case.habit[0].threshold, 3);
    }

    #[test]
    fn empty_set_shows_full_locked_ladders() {
        let (db, _dir) = test_db();
        let case = trophy_case(&db);
        assert!(case.streak.iter().all(|t| !t.earned));
        assert_eq!(case.green_total.len(), GREEN_TOTAL_LADDER.len());
        assert!(case.habit.is_empty());
    }
}
