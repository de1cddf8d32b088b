//! Schedule filter: which routine items are in scope on a given date.

use chrono::NaiveDate;

use crate::engine::dates::iso_weekday;
use crate::types::RoutineItem;

/// True iff the item applies to this date: it is active, and either runs
/// every day or lists the date's ISO weekday.
pub fn in_scope(item: &RoutineItem, date: NaiveDate) -> bool {
    if !item.active {
        return false;
    }
    match &item.days_of_week {
        None => true,
        Some(days) => days.contains(&iso_weekday(date)),
    }
}

/// The effective core set for a date: active, in-scope, non-negotiable items.
/// An item out of scope for a date can never penalize that date.
pub fn effective_core_set<'a>(items: &'a [RoutineItem], date: NaiveDate) -> Vec<&'a RoutineItem> {
    items
        .iter()
        .filter(|i| i.is_core && in_scope(i, date))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, is_core: bool, days: Option<Vec<u8>>, active: bool) -> RoutineItem {
        RoutineItem {
            id: id.to_string(),
            label: id.to_string(),
            emoji: String::new(),
            section: String::new(),
            is_core,
            days_of_week: days,
            active,
            sort_order: 0,
        }
    }

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn everyday_item_is_always_in_scope() {
        let i = item("run", true, None, true);
        assert!(in_scope(&i, d("2024-06-10"))); // Monday
        assert!(in_scope(&i, d("2024-06-16"))); // Sunday
    }

    #[test]
    fn inactive_item_is_never_in_scope() {
        let i = item("run", true, None, false);
        assert!(!in_scope(&i, d("2024-06-10")));
    }

    #[test]
    fn weekend_only_item_is_out_of_scope_on_weekdays() {
        let i = item("long-ride", true, Some(vec![6, 7]), true);
        for day in 10..=14 {
            // 2024-06-10..14 is Monday..Friday
            let date = NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
            assert!(!in_scope(&i, date), "should be out of scope on {date}");
        }
        assert!(in_scope(&i, d("2024-06-15")));
        assert!(in_scope(&i, d("2024-06-16")));
    }

    #[test]
    fn effective_core_set_excludes_bonus_and_out_of_scope() {
        let items = vec![
            item("core-daily", true, None, true),
            item("core-weekend", true, Some(vec![6, 7]), true),
            item("bonus", false, None, true),
            item("retired", true, None, false),
        ];
        let core = effective_core_set(&items, d("2024-06-10")); // Monday
        let ids: Vec<&str> = core.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["core-daily"]);
    }
}
