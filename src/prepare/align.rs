use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};

use super::{normalize::CleanedTable, Outcome};
use crate::reading::{DataType, ObservationRow};

/// A full calendar year of rows for one station.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedTable {
    pub data_type: DataType,
    pub station: u32,
    pub year: i32,
    /// Cleaned rows dated within `year`.
    pub source_rows: usize,
    pub rows: Vec<ObservationRow>,
}

pub fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Reindexes `table` onto every day of `year`. Rows outside the year are
/// dropped and the first row wins when a date repeats.
///
/// Missing values are flagged as estimated and filled with the annual median
/// of the column. The median ignores seasonality, which is wrong for rainfall
/// and other seasonal series; it is kept so stored values stay comparable
/// with earlier loads.
pub fn calendar_align(
    table: &CleanedTable,
    data_type: DataType,
    station: u32,
    year: i32,
) -> AlignedTable {
    let width = data_type.value_columns().len();

    let mut source_rows = 0;
    let mut by_date: BTreeMap<NaiveDate, &[Option<f64>]> = BTreeMap::new();
    for row in table.rows.iter().filter(|row| row.date.year() == year) {
        source_rows += 1;
        by_date.entry(row.date).or_insert(row.values.as_slice());
    }

    let dates: Vec<NaiveDate> = (1..=days_in_year(year))
        .filter_map(|ordinal| NaiveDate::from_yo_opt(year, ordinal))
        .collect();

    let columns: Vec<Vec<Option<f64>>> = (0..width)
        .map(|column| {
            dates
                .iter()
                .map(|date| {
                    by_date
                        .get(date)
                        .and_then(|values| values.get(column).copied().flatten())
                })
                .collect()
        })
        .collect();

    let medians: Vec<Option<f64>> = columns
        .iter()
        .map(|values| median(values.iter().flatten().copied().collect()))
        .collect();

    let rows = dates
        .iter()
        .enumerate()
        .map(|(day, date)| {
            let estimated: Vec<bool> = columns.iter().map(|c| c[day].is_none()).collect();
            let values = columns
                .iter()
                .zip(&medians)
                .map(|(c, median)| c[day].or(*median))
                .collect();
            ObservationRow::new(data_type, station, *date, values, estimated)
        })
        .collect();

    AlignedTable {
        data_type,
        station,
        year,
        source_rows,
        rows,
    }
}

/// Classifies an aligned year: `Empty` when nothing was fetched, otherwise the
/// share of days whose primary value had to be estimated.
pub fn analyse_completeness(table: &AlignedTable) -> Outcome {
    if table.source_rows == 0 || table.rows.is_empty() {
        return Outcome::Empty;
    }

    let estimated = table
        .rows
        .iter()
        .filter(|row| row.estimated.first().copied().unwrap_or(true))
        .count();

    Outcome::Estimated(estimated as f64 / table.rows.len() as f64)
}

/// Middle value, or the mean of the two middle values for an even count.
pub fn median(mut values: Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
