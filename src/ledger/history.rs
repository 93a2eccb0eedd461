use chrono::{Days, NaiveDate};
use serde::Serialize;

use super::types::{Habit, HabitId, History};

/// The last `n` calendar days ending at `today`, oldest first.
pub fn recent_dates(today: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (0..n as u64)
        .rev()
        .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
        .collect()
}

/// Recorded value for `(date, habit)`, zero when absent.
pub fn recorded_value(history: &History, date: NaiveDate, habit: &HabitId) -> u32 {
    history
        .get(&date)
        .and_then(|day| day.get(habit))
        .copied()
        .unwrap_or(0)
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatrixColumn {
    pub id: HabitId,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MatrixRow {
    pub date: NaiveDate,
    pub values: Vec<u32>,
}

/// Dates × habits grid. Shared by the table view and the CSV export so the
/// two can never disagree.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct HistoryMatrix {
    pub columns: Vec<MatrixColumn>,
    pub rows: Vec<MatrixRow>,
}

impl HistoryMatrix {
    pub fn build(history: &History, habits: &[Habit], dates: &[NaiveDate]) -> Self {
        let columns = habits
            .iter()
            .map(|h| MatrixColumn {
                id: h.id.clone(),
                name: h.name.clone(),
            })
            .collect();
        let rows = dates
            .iter()
            .map(|&date| MatrixRow {
                date,
                values: habits
                    .iter()
                    .map(|h| recorded_value(history, date, &h.id))
                    .collect(),
            })
            .collect();
        Self { columns, rows }
    }

    pub fn value(&self, date: NaiveDate, habit: &HabitId) -> Option<u32> {
        let col = self.columns.iter().position(|c| &c.id == habit)?;
        let row = self.rows.iter().find(|r| r.date == date)?;
        row.values.get(col).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn recent_dates_are_oldest_first_and_end_today() {
        let dates = recent_dates(date(2024, 3, 2), 3);
        assert_eq!(dates, vec![date(2024, 2, 29), date(2024, 3, 1), date(2024, 3, 2)]);
    }

    #[test]
    fn recent_dates_zero_is_empty() {
        assert!(recent_dates(date(2024, 3, 2), 0).is_empty());
    }

    #[test]
    fn matrix_zero_fills_missing_cells() {
        let h1 = Habit {
            id: HabitId::from("h1"),
            name: "Read".into(),
            streak: 3,
            target: 7,
        };
        let h2 = Habit {
            id: HabitId::from("h2"),
            name: "Run".into(),
            streak: 0,
            target: 7,
        };
        let mut history = History::new();
        history
            .entry(date(2024, 1, 2))
            .or_default()
            .insert(h1.id.clone(), 3);

        let dates = recent_dates(date(2024, 1, 2), 2);
        let matrix = HistoryMatrix::build(&history, &[h1.clone(), h2.clone()], &dates);
        assert_eq!(matrix.columns.len(), 2);
        assert_eq!(matrix.rows[0].values, vec![0, 0]);
        assert_eq!(matrix.rows[1].values, vec![3, 0]);
        assert_eq!(matrix.value(date(2024, 1, 2), &h1.id), Some(3));
        assert_eq!(matrix.value(date(2024, 1, 2), &h2.id), Some(0));
        assert_eq!(matrix.value(date(2023, 1, 2), &h2.id), None);
    }
}
