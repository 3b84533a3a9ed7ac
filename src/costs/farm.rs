//! Farm shape and herd inputs shared by the cost calculators.

use serde::Deserialize;

use super::CostError;

const M2_PER_HA: f64 = 10_000.0;

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FarmShape {
    pub land_area_ha: f64,
    pub paddock_size_ha: f64,
    /// Farm length divided by width.
    pub farm_length_to_width: f64,
    pub paddock_length_to_width: f64,
    pub milking_cows: u32,
    /// Hours per day the herd spends at the shed.
    pub milking_hours: f64,
    pub lactation_days: u32,
    pub milking_start_month: u32,
    pub milking_start_day: u32,
    /// Litres per cow per day.
    pub washdown_water_per_cow: f64,
    /// Cubic metres per day.
    pub machine_wash_water: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Default for FarmShape {
    fn default() -> Self {
        FarmShape {
            land_area_ha: 100.0,
            paddock_size_ha: 2.5,
            farm_length_to_width: 2.0,
            paddock_length_to_width: 2.0,
            milking_cows: 100,
            milking_hours: 4.0,
            lactation_days: 300,
            milking_start_month: 7,
            milking_start_day: 7,
            washdown_water_per_cow: 35.0,
            machine_wash_water: 4.0,
            latitude: None,
            longitude: None,
        }
    }
}

impl FarmShape {
    pub fn validate(&self) -> Result<(), CostError> {
        positive("land_area_ha", self.land_area_ha)?;
        positive("paddock_size_ha", self.paddock_size_ha)?;
        positive("farm_length_to_width", self.farm_length_to_width)?;
        positive("paddock_length_to_width", self.paddock_length_to_width)?;

        if self.paddock_size_ha > self.land_area_ha {
            return Err(invalid("paddock_size_ha", "larger than the farm"));
        }
        if !(0.0..=24.0).contains(&self.milking_hours) {
            return Err(invalid("milking_hours", "must be within 0 to 24"));
        }
        if self.lactation_days > 366 {
            return Err(invalid("lactation_days", "longer than a year"));
        }
        if chrono::NaiveDate::from_ymd_opt(2001, self.milking_start_month, self.milking_start_day).is_none() {
            return Err(invalid(
                "milking_start_day",
                format!("{}/{} is not a date", self.milking_start_day, self.milking_start_month),
            ));
        }
        if self.latitude.is_some() != self.longitude.is_some() {
            return Err(invalid("latitude", "latitude and longitude go together"));
        }

        Ok(())
    }

    pub fn location(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    pub fn farm_width_m(&self) -> f64 {
        (self.land_area_ha * M2_PER_HA / self.farm_length_to_width).sqrt()
    }

    pub fn farm_length_m(&self) -> f64 {
        self.farm_width_m() * self.farm_length_to_width
    }

    pub fn paddock_width_m(&self) -> f64 {
        (self.paddock_size_ha * M2_PER_HA / self.paddock_length_to_width).sqrt()
    }

    pub fn paddock_length_m(&self) -> f64 {
        self.paddock_width_m() * self.paddock_length_to_width
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), CostError> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, "must be positive"))
    }
}

pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> CostError {
    CostError::Invalid {
        field,
        reason: reason.into(),
    }
}

// -- Tests -------------------------------------------------------------------
