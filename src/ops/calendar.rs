use chrono::{Datelike, NaiveDate};
use indexmap::IndexMap;
use serde::Serialize;

use crate::model::document::Document;

/// Where a scheduled day lives in the tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayLocation {
    pub phase_id: String,
    pub week_id: String,
    pub day_id: String,
}

/// Map each assigned date to its day, in tree order.
///
/// Two days on the same date collapse to one entry: the last one walked
/// wins, the entry keeps the position of the first.
pub fn date_index(doc: &Document) -> IndexMap<String, DayLocation> {
    let mut index = IndexMap::new();
    for phase in &doc.phases {
        for week in &phase.weeks {
            for day in &week.days {
                if let Some(date) = day.assigned_date.as_deref().filter(|d| !d.is_empty()) {
                    index.insert(
                        date.to_string(),
                        DayLocation {
                            phase_id: phase.id.clone(),
                            week_id: week.id.clone(),
                            day_id: day.id.clone(),
                        },
                    );
                }
            }
        }
    }
    index
}

/// One cell of a month grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CalendarCell {
    pub day: u32,
    /// `YYYY-MM-DD`
    pub date: String,
    pub has_day: bool,
    pub is_today: bool,
}

/// A month laid out Sunday-first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthGrid {
    pub year: i32,
    pub month: u32,
    /// Blank cells before the 1st
    pub leading_blanks: u32,
    pub cells: Vec<CalendarCell>,
}

impl MonthGrid {
    pub fn title(&self) -> String {
        const NAMES: [&str; 12] = [
            "January", "February", "March", "April", "May", "June", "July", "August",
            "September", "October", "November", "December",
        ];
        format!("{} {}", NAMES[(self.month - 1) as usize], self.year)
    }
}

/// Build the grid for `year`/`month` (1-based). `None` for an invalid month.
pub fn month_grid(
    year: i32,
    month: u32,
    index: &IndexMap<String, DayLocation>,
    today: NaiveDate,
) -> Option<MonthGrid> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let days_in_month = next_month.signed_duration_since(first).num_days() as u32;

    let cells = (1..=days_in_month)
        .filter_map(|d| NaiveDate::from_ymd_opt(year, month, d))
        .map(|date| {
            let key = date.format("%Y-%m-%d").to_string();
            CalendarCell {
                day: date.day(),
                has_day: index.contains_key(&key),
                is_today: date == today,
                date: key,
            }
        })
        .collect();

    Some(MonthGrid {
        year,
        month,
        leading_blanks: first.weekday().num_days_from_sunday(),
        cells,
    })
}

/// Step a (year, month) pair by `delta` months
pub fn shift_month(year: i32, month: u32, delta: i32) -> (i32, u32) {
    let zero_based = year * 12 + month as i32 - 1 + delta;
    (zero_based.div_euclid(12), zero_based.rem_euclid(12) as u32 + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    use crate::ops::tree_ops::{assign_date, create_day, create_phase, create_week};
    use crate::util::clock::IdGenerator;

    #[test]
    fn index_keeps_last_day_per_date() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let mut doc = Document::default();
        let mut ids = IdGenerator::new();
        let p = create_phase(&mut doc, &mut ids, now, "P").unwrap();
        let w = create_week(&mut doc, &mut ids, now, &p, "W").unwrap();
        let d1 = create_day(&mut doc, &mut ids, now, &p, &w, "D1").unwrap();
        let d2 = create_day(&mut doc, &mut ids, now, &p, &w, "D2").unwrap();
        let d3 = create_day(&mut doc, &mut ids, now, &p, &w, "D3").unwrap();
        assign_date(&mut doc, &p, &w, &d1, "2025-01-06");
        assign_date(&mut doc, &p, &w, &d2, "2025-01-07");
        assign_date(&mut doc, &p, &w, &d3, "2025-01-06");

        let index = date_index(&doc);
        assert_eq!(index.len(), 2);
        assert_eq!(index["2025-01-06"].day_id, d3);
        assert_eq!(index["2025-01-07"].day_id, d2);
        assert_eq!(index.get_index(0).unwrap().0, "2025-01-06");
    }

    #[test]
    fn grid_layout_for_march_2025() {
        let mut index = IndexMap::new();
        index.insert(
            "2025-03-14".to_string(),
            DayLocation {
                phase_id: "p".into(),
                week_id: "w".into(),
                day_id: "d".into(),
            },
        );
        let today = NaiveDate::from_ymd_opt(2025, 3, 2).unwrap();
        let grid = month_grid(2025, 3, &index, today).unwrap();
        // 1 March 2025 is a Saturday.
        assert_eq!(grid.leading_blanks, 6);
        assert_eq!(grid.cells.len(), 31);
        assert!(grid.cells[13].has_day);
        assert!(grid.cells[1].is_today);
        assert_eq!(grid.title(), "March 2025");
    }

    #[test]
    fn grid_handles_leap_february() {
        let grid = month_grid(2024, 2, &IndexMap::new(), NaiveDate::MIN).unwrap();
        assert_eq!(grid.cells.len(), 29);
        assert!(month_grid(2024, 13, &IndexMap::new(), NaiveDate::MIN).is_none());
    }

    #[test]
    fn shift_month_wraps_years() {
        assert_eq!(shift_month(2025, 1, -1), (2024, 12));
        assert_eq!(shift_month(2025, 12, 1), (2026, 1));
        assert_eq!(shift_month(2025, 6, 0), (2025, 6));
    }
}
