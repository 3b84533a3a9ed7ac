use chrono::{Datelike, NaiveDate};

use super::DataType;

/// One calendar day of one station, ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub row_id: String,
    pub station: u32,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// One entry per `DataType::value_columns`, in the same order.
    pub values: Vec<Option<f64>>,
    /// Set where the day was missing at the source and the value was imputed.
    pub estimated: Vec<bool>,
}

impl ObservationRow {
    pub fn new(
        data_type: DataType,
        station: u32,
        date: NaiveDate,
        values: Vec<Option<f64>>,
        estimated: Vec<bool>,
    ) -> Self {
        ObservationRow {
            row_id: compute_row_id(data_type, station, date),
            station,
            year: date.year(),
            month: date.month(),
            day: date.day(),
            values,
            estimated,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }
}

/// Builds the dedup key: data type, station, then the zero padded date.
pub fn compute_row_id(data_type: DataType, station: u32, date: NaiveDate) -> String {
    format!(
        "{}{}{:04}{:02}{:02}",
        data_type.as_str(),
        station,
        date.year(),
        date.month(),
        date.day()
    )
}

// -- Tests ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn should_compute_row_id() {
        let date = NaiveDate::from_ymd_opt(2000, 3, 7).unwrap();
        assert_eq!(
            compute_row_id(DataType::Rainfall, 5396, date),
            "rainfall539620000307"
        );
    }

    #[test]
    fn should_split_date_parts() {
        let date = NaiveDate::from_ymd_opt(1988, 12, 31).unwrap();
        let row = ObservationRow::new(DataType::Evaporation, 12, date, vec![Some(1.2)], vec![false]);

        assert_eq!(row.row_id, "evaporation1219881231");
        assert_eq!((row.year, row.month, row.day), (1988, 12, 31));
        assert_eq!(row.date(), Some(date));
    }
}
