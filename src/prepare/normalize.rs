use chrono::NaiveDate;
use tracing::debug;

use super::PrepareError;
use crate::{
    reading::{DataType, DATE_HEADER, STATION_HEADER},
    table::RawTable,
};

/// One parsed observation line, still keyed by its source date.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedRow {
    pub station: Option<u32>,
    pub date: NaiveDate,
    /// One entry per `DataType::value_columns`.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanedTable {
    pub rows: Vec<CleanedRow>,
}

/// Strips banner and repeated header rows from a raw result table and parses
/// the measured columns of `data_type`.
///
/// A table without a `Station` header row is treated as having no data.
pub fn normalize(raw: &RawTable, data_type: DataType) -> Result<CleanedTable, PrepareError> {
    let Some(header_index) = raw.header_index(STATION_HEADER) else {
        return Ok(CleanedTable::default());
    };
    let header = &raw.rows[header_index];

    let position = |name: &str| header.iter().position(|cell| cell == name);
    let station_column =
        position(STATION_HEADER).ok_or_else(|| PrepareError::MissingColumn(STATION_HEADER.into()))?;
    let date_column =
        position(DATE_HEADER).ok_or_else(|| PrepareError::MissingColumn(DATE_HEADER.into()))?;
    let value_columns = data_type
        .column_map()
        .iter()
        .map(|(source, _)| position(source).ok_or_else(|| PrepareError::MissingColumn(source.to_string())))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows = Vec::new();
    for row in &raw.rows[header_index + 1..] {
        if row.iter().all(|cell| cell.is_empty()) || row.iter().any(|cell| cell == STATION_HEADER) {
            continue;
        }

        // Footer lines ("Total number of rows output", user banners) carry no date.
        let Some(date) = row.get(date_column).and_then(|cell| parse_date(cell)) else {
            debug!(?row, "skipping row without a date");
            continue;
        };

        rows.push(CleanedRow {
            station: row.get(station_column).and_then(|cell| cell.parse().ok()),
            date,
            values: value_columns
                .iter()
                .map(|&column| row.get(column).and_then(|cell| parse_value(cell)))
                .collect(),
        });
    }

    Ok(CleanedTable { rows })
}

/// Parses the `YYYYMMDD:HHMM` form CliFlo uses. Only the date part is kept.
pub fn parse_date(cell: &str) -> Option<NaiveDate> {
    let date = cell.split(':').next()?;
    NaiveDate::parse_from_str(date.trim(), "%Y%m%d").ok()
}

/// `-` and blanks are missing values.
pub fn parse_value(cell: &str) -> Option<f64> {
    match cell.trim() {
        "" | "-" => None,
        value => value.parse().ok(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn raw() -> RawTable {
        RawTable::new(vec![
            row(&["Rain: Daily"]),
            row(&["Station", "Date(NZST)", "Amount(mm)", "Deficit(mm)", "Period(Hrs)"]),
            row(&["5396", "20000101:0900", "1.5", "0.0", "24"]),
            row(&["", "", "", "", ""]),
            row(&["Station", "Date(NZST)", "Amount(mm)", "Deficit(mm)", "Period(Hrs)"]),
            row(&["5396", "20000102:0900", "-", "2.1", "24"]),
            row(&["Total number of rows output = 2"]),
        ])
    }

    #[test]
    fn should_drop_banner_and_repeated_headers() {
        let table = normalize(&raw(), DataType::Rainfall).unwrap();

        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].station, Some(5396));
        assert_eq!(table.rows[0].date, NaiveDate::from_ymd_opt(2000, 1, 1).unwrap());
        assert_eq!(table.rows[0].values, vec![Some(1.5), Some(0.0)]);
        assert_eq!(table.rows[1].values, vec![None, Some(2.1)]);
    }

    #[test]
    fn should_treat_headerless_table_as_empty() {
        let raw = RawTable::new(vec![row(&["No rows? See this help link"])]);
        assert!(normalize(&raw, DataType::Rainfall).unwrap().rows.is_empty());
    }

    #[test]
    fn should_fail_on_missing_value_column() {
        let err = normalize(&raw(), DataType::Temps).unwrap_err();
        assert!(matches!(err, PrepareError::MissingColumn(c) if c == "Tmax(C)"));
    }

    #[test]
    fn should_parse_missing_markers() {
        assert_eq!(parse_value(" - "), None);
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("12.5"), Some(12.5));
        assert_eq!(parse_date("19880229:0900"), NaiveDate::from_ymd_opt(1988, 2, 29));
        assert_eq!(parse_date("Date(NZST)"), None);
    }
}
