//! Weekly digest generator.
//!
//! Pure function over one Monday-Sunday slice of day statuses. Runs inside
//! the scheduled digest job with no session context beyond the fetched week,
//! so it must stay free of storage and network dependencies.

use serde::Serialize;

use crate::engine::classify::DayStatus;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyDigest {
    pub green_count: u32,
    pub yellow_count: u32,
    pub red_count: u32,
    pub headline: String,
    /// One glyph per counted day, Monday-first. Rest/empty days are excluded.
    pub glyph_line: String,
}

/// Summarize one week of statuses (Monday..Sunday order).
pub fn weekly_digest(statuses: &[DayStatus; 7]) -> WeeklyDigest {
    let mut green_count = 0;
    let mut yellow_count = 0;
    let mut red_count = 0;
    let mut glyph_line = String::new();

    for status in statuses {
        match status {
            DayStatus::Green => {
                green_count += 1;
                glyph_line.push('🟩');
            }
            DayStatus::Yellow => {
                yellow_count += 1;
                glyph_line.push('🟨');
            }
            DayStatus::Red => {
                red_count += 1;
                glyph_line.push('🟥');
            }
            DayStatus::Empty => {}
        }
    }

    let headline = if green_count == 7 {
        "Perfect week"
    } else if green_count >= 5 {
        "Strong week"
    } else if green_count >= 3 {
        "Building momentum"
    } else {
        "Room to grow"
    };

    WeeklyDigest {
        green_count,
        yellow_count,
        red_count,
        headline: headline.to_string(),
        glyph_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DayStatus::{Empty, Green, Red, Yellow};

    #[test]
    fn strong_week_with_empty_day_excluded() {
        let digest = weekly_digest(&[Green, Green, Green, Yellow, Green, Empty, Green]);
        assert_eq!(digest.green_count, 5);
        assert_eq!(digest.yellow_count, 1);
        assert_eq!(digest.red_count, 0);
        // Six counted days: the empty Saturday contributes no glyph.
        assert_eq!(digest.glyph_line.chars().count(), 6);
        assert_eq!(digest.headline, "Strong week");
    }

    #[test]
    fn perfect_week() {
        let digest = weekly_digest(&[Green; 7]);
        assert_eq!(digest.headline, "Perfect week");
        assert_eq!(digest.glyph_line, "🟩🟩🟩🟩🟩🟩🟩");
    }

    #[test]
    fn building_momentum_at_three_greens() {
        let digest = weekly_digest(&[Green, Green, Green, Red, Red, Red, Red]);
        assert_eq!(digest.headline, "Building momentum");
    }

    #[test]
    fn room_to_grow_below_three() {
        let digest = weekly_digest(&[Green, Red, Red, Yellow, Red, Empty, Empty]);
        assert_eq!(digest.headline, "Room to grow");
        assert_eq!(digest.green_count, 1);
    }

    #[test]
    fn glyphs_keep_monday_first_order() {
        let digest = weekly_digest(&[Red, Green, Yellow, Green, Green, Green, Green]);
        assert_eq!(digest.glyph_line, "🟥🟩🟨🟩🟩🟩🟩");
    }

    #[test]
    fn all_empty_week() {
        let digest = weekly_digest(&[Empty; 7]);
        assert_eq!(digest.headline, "Room to grow");
        assert!(digest.glyph_line.is_empty());
    }
}
