//! CliFlo data types and the column layout of each.

use std::fmt;

use serde::Deserialize;

/// Name of the station column in every CliFlo observation table.
pub const STATION_HEADER: &str = "Station";

/// Name of the date column in every CliFlo observation table. Values look like
/// `19880101:0900`.
pub const DATE_HEADER: &str = "Date(NZST)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
/// Represents the kind of observation being downloaded. See the
/// [CliFlo help](https://cliflo.niwa.co.nz/pls/niwp/wh.do_help?id=ls_data)
/// for the datatype tree.
pub enum DataType {
    Rainfall,
    SunshineHours,
    Temps,
    SoilMoisture,
    Evaporation,
}

impl DataType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Rainfall => "rainfall",
            DataType::SunshineHours => "sunshine_hours",
            DataType::Temps => "temps",
            DataType::SoilMoisture => "soil_moisture",
            DataType::Evaporation => "evaporation",
        }
    }

    /// The two link texts followed under "Daily and Hourly Observations" to
    /// reach this datatype.
    pub fn category_path(&self) -> (&'static str, &'static str) {
        match self {
            DataType::Rainfall => ("Precipitation", "Rain (fixed periods)"),
            DataType::SunshineHours => ("Sunshine & Radiation", "Sunshine"),
            DataType::Temps => ("Temperature and Humidity", "Max_min_temp"),
            DataType::SoilMoisture => ("Evaporation / soil moisture", "Soil-moisture"),
            DataType::Evaporation => ("Evaporation / soil moisture", "Evaporation"),
        }
    }

    /// Source header to stored column name, for the measured columns only.
    pub fn column_map(&self) -> &'static [(&'static str, &'static str)] {
        match self {
            DataType::Rainfall => &[("Amount(mm)", "amount_mm"), ("Deficit(mm)", "deficit_mm")],
            DataType::SunshineHours => &[("Amount(Hrs)", "amount_hrs")],
            DataType::Temps => &[("Tmax(C)", "tmax_c"), ("Tmin(C)", "tmin_c")],
            DataType::SoilMoisture => &[("Percent(%)", "percent")],
            DataType::Evaporation => &[("Amount(mm)", "amount_mm")],
        }
    }

    /// Stored value columns in order. The first one drives completeness.
    pub fn value_columns(&self) -> Vec<&'static str> {
        self.column_map().iter().map(|(_, column)| *column).collect()
    }

    pub fn primary_column(&self) -> &'static str {
        self.column_map()[0].1
    }

    pub fn observations_table(&self) -> String {
        format!("{}_observations", self.as_str())
    }

    pub fn completion_table(&self) -> String {
        format!("{}_completion", self.as_str())
    }

    pub fn stations_table(&self) -> String {
        format!("{}_stations", self.as_str())
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
/// Observation frequency. Only daily observations can be calendar aligned.
pub enum Frequency {
    #[default]
    Daily,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    #[test]
    fn should_match_display_to_value_names() {
        use clap::ValueEnum;

        for dt in DataType::value_variants() {
            let value = dt.to_possible_value().unwrap();
            assert_eq!(value.get_name(), dt.to_string());
        }
    }

    #[test]
    fn should_name_tables_after_data_type() {
        let dt = DataType::SoilMoisture;
        assert_eq!(dt.observations_table(), "soil_moisture_observations");
        assert_eq!(dt.completion_table(), "soil_moisture_completion");
        assert_eq!(dt.stations_table(), "soil_moisture_stations");
    }

    #[test]
    fn should_put_primary_column_first() {
        assert_eq!(DataType::Rainfall.primary_column(), "amount_mm");
        assert_eq!(
            DataType::Rainfall.value_columns(),
            vec!["amount_mm", "deficit_mm"]
        );
    }
}
