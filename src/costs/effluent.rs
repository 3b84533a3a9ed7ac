//! Effluent application area, sump and irrigation costs, and daily effluent
//! volumes from stored rainfall.

use std::{collections::BTreeSet, fmt};

use chrono::{Datelike, NaiveDate};
use serde::Deserialize;

use super::{
    farm::{invalid, FarmShape},
    fences::priced,
    CostBreakdown, CostError, PricingTable,
};
use crate::reading::ObservationRow;

/// Litres of effluent per cow per day spent at the shed.
pub const EFFLUENT_PER_COW_L: f64 = 70.0;

/// Sump capacities on offer, in cubic metres.
pub const SUMP_SIZES: [u32; 5] = [50, 100, 150, 200, 250];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegionalCouncil {
    #[default]
    EnvironmentWaikato,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffluentKind {
    #[default]
    Standard,
}

/// Nitrogen, phosphorus, potassium and sulphur, in that order.
pub type Nutrients = [Option<f64>; 4];

impl RegionalCouncil {
    /// Loading limits in kg/ha/year. `None` is unlimited.
    pub fn limits(&self) -> Nutrients {
        match self {
            RegionalCouncil::EnvironmentWaikato => [Some(150.0), None, None, None],
        }
    }
}

impl EffluentKind {
    /// Concentrations in g/m3.
    pub fn concentrations(&self) -> Nutrients {
        match self {
            EffluentKind::Standard => [Some(424.0), Some(49.9), Some(399.0), Some(32.0)],
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PipeRun {
    pub size_mm: u32,
    pub length_m: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct IrrigationOptions {
    pub irrigator_type: String,
    /// Paddocks fitted with hydrants. Defaults to the application area over
    /// 90% of a paddock.
    pub pads: Option<f64>,
    pub arterial_size_mm: u32,
    /// Defaults to one paddock width per pad.
    pub arterial_length_m: Option<f64>,
    pub pipe_ends: u32,
    pub two_way_hydrants: u32,
    /// Defaults to one per pad that is not a pipe end.
    pub three_way_hydrants: Option<f64>,
    pub other_pipes: Vec<PipeRun>,
    pub pump_kw: f64,
    pub pump_type: String,
}

impl Default for IrrigationOptions {
    fn default() -> Self {
        IrrigationOptions {
            irrigator_type: "Travelling Rain Gun".to_string(),
            pads: None,
            arterial_size_mm: 90,
            arterial_length_m: None,
            pipe_ends: 2,
            two_way_hydrants: 0,
            three_way_hydrants: None,
            other_pipes: Vec::new(),
            pump_kw: 18.5,
            pump_type: "Close Couple".to_string(),
        }
    }
}

/// Areas draining into the effluent system, in square metres. Diverted areas
/// send stormwater elsewhere outside milking.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Catchments {
    pub yard_m2: f64,
    pub shed_roof_m2: f64,
    pub other_m2: f64,
    pub yard_diverted: bool,
    pub roof_diverted: bool,
}

impl Default for Catchments {
    fn default() -> Self {
        Catchments {
            yard_m2: 100.0,
            shed_roof_m2: 100.0,
            other_m2: 100.0,
            yard_diverted: true,
            roof_diverted: true,
        }
    }
}

impl Catchments {
    /// Area captured on a day. The yard is always captured while milking.
    pub fn captured_m2(&self, milking: bool) -> f64 {
        let yard = if milking || !self.yard_diverted { self.yard_m2 } else { 0.0 };
        let roof = if self.roof_diverted { 0.0 } else { self.shed_roof_m2 };
        yard + roof + self.other_m2
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct EffluentPlan {
    pub council: RegionalCouncil,
    pub effluent_kind: EffluentKind,
    pub current_area_ha: f64,
    pub extra_area_ha: f64,
    pub irrigation: IrrigationOptions,
    pub catchments: Catchments,
}

/// Effluent produced at the shed over a season, in cubic metres.
pub fn annual_effluent_volume_m3(farm: &FarmShape) -> f64 {
    EFFLUENT_PER_COW_L * farm.milking_cows as f64 * (farm.milking_hours / 24.0) * farm.lactation_days as f64 / 1000.0
}

/// Smallest area in hectares that keeps every limited nutrient under the
/// council's loading limit.
pub fn min_application_area_ha(farm: &FarmShape, council: RegionalCouncil, kind: EffluentKind) -> f64 {
    let volume = annual_effluent_volume_m3(farm);

    council
        .limits()
        .iter()
        .zip(kind.concentrations())
        .filter_map(|(limit, conc)| Some(volume * conc? / 1000.0 / (*limit)?))
        .fold(0.0, f64::max)
}

pub fn application_area_ha(farm: &FarmShape, plan: &EffluentPlan) -> f64 {
    min_application_area_ha(farm, plan.council, plan.effluent_kind).max(plan.current_area_ha + plan.extra_area_ha)
}

/// Effluent, machine wash and yard washdown water from one milking, in cubic
/// metres.
pub fn volume_per_milking_m3(farm: &FarmShape) -> f64 {
    let cows = farm.milking_cows as f64;
    EFFLUENT_PER_COW_L * (farm.milking_hours / 24.0) * cows / 1000.0
        + farm.machine_wash_water
        + cows * farm.washdown_water_per_cow / 1000.0
}

/// Smallest sump holding one milking.
pub fn sump_size(volume_m3: f64) -> Option<u32> {
    SUMP_SIZES.into_iter().find(|size| *size as f64 >= volume_m3)
}

pub fn sump_cost(pricing: &PricingTable, farm: &FarmShape) -> Result<CostBreakdown, CostError> {
    let volume = volume_per_milking_m3(farm);
    let size = sump_size(volume).ok_or_else(|| {
        invalid(
            "milking_cows",
            format!("{:.0} m3 per milking is more than the largest sump", volume),
        )
    })?;

    let mut breakdown = CostBreakdown::new("Effluent sump");
    priced(
        &mut breakdown,
        pricing,
        format!("Sump - {}m3", size),
        &format!("Sump - {}m3 storage", size),
        1.0,
    )?;
    priced(&mut breakdown, pricing, "Stirrer", "Stirrer - Sump - Large", 1.0)?;
    priced(&mut breakdown, pricing, "Sump Pump", "Pump - Effluent - 15kw - Sump", 1.0)?;

    Ok(breakdown)
}

/// Pipeline, hydrants, pump and irrigator for the application area.
pub fn irrigation_cost(
    pricing: &PricingTable,
    farm: &FarmShape,
    plan: &EffluentPlan,
) -> Result<CostBreakdown, CostError> {
    let opts = &plan.irrigation;
    let area = application_area_ha(farm, plan);

    let pads = opts
        .pads
        .unwrap_or_else(|| (area / (farm.paddock_size_ha * 0.9)).ceil());
    let arterial_length = opts.arterial_length_m.unwrap_or(pads * farm.paddock_width_m());
    let pipe_ends = opts.pipe_ends as f64;
    let three_way = opts
        .three_way_hydrants
        .unwrap_or((pads - pipe_ends).max(0.0));
    let pipe_length = arterial_length + opts.other_pipes.iter().map(|p| p.length_m).sum::<f64>();

    let mut breakdown = CostBreakdown::new("Effluent irrigation");
    priced(
        &mut breakdown,
        pricing,
        format!("Arterial - {}mm", opts.arterial_size_mm),
        &pipe_item(opts.arterial_size_mm),
        arterial_length,
    )?;
    for pipe in &opts.other_pipes {
        priced(
            &mut breakdown,
            pricing,
            format!("Pipe - {}mm", pipe.size_mm),
            &pipe_item(pipe.size_mm),
            pipe.length_m,
        )?;
    }
    priced(&mut breakdown, pricing, "Trenching", "Effluent Line - Trenching", pipe_length)?;
    priced(&mut breakdown, pricing, "Pipe Install", "Effluent Line - Install", pipe_length)?;

    for (name, item, count) in [
        ("Hydrants - 2 Way", "Hydrant - 2W", opts.two_way_hydrants as f64),
        ("Hydrants - 3 Way", "Hydrant - 3W", three_way),
        ("Hydrants - End of Line", "Hydrant - EOL", pipe_ends),
    ] {
        priced(&mut breakdown, pricing, name, item, count)?;
        priced(
            &mut breakdown,
            pricing,
            format!("{} Install", name),
            &format!("{} - Install", item),
            count,
        )?;
    }

    priced(
        &mut breakdown,
        pricing,
        "Pump",
        &format!("Pump - Effluent - {}kw - {}", opts.pump_kw, opts.pump_type),
        1.0,
    )?;
    for part in ["Install", "Stand", "Hose"] {
        priced(
            &mut breakdown,
            pricing,
            format!("Pump {}", part),
            &format!("Pump - Effluent - {}", part),
            1.0,
        )?;
    }
    priced(
        &mut breakdown,
        pricing,
        "Irrigator",
        &format!("Irrigator - {}", opts.irrigator_type),
        1.0,
    )?;

    Ok(breakdown)
}

fn pipe_item(size_mm: u32) -> String {
    format!("Pipe - {}mm - Alk", size_mm)
}

/// Whether `date` falls within the lactation that starts on the farm's
/// milking start day.
pub fn is_milking(farm: &FarmShape, date: NaiveDate) -> bool {
    let start = |year: i32| NaiveDate::from_ymd_opt(year, farm.milking_start_month, farm.milking_start_day);

    let season_start = match start(date.year()) {
        Some(start) if start <= date => start,
        _ => match start(date.year() - 1) {
            Some(start) => start,
            None => return false,
        },
    };

    (date - season_start).num_days() < farm.lactation_days as i64
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DailyVolume {
    pub date: NaiveDate,
    pub rainfall_m3: f64,
    pub cow_m3: f64,
    pub wash_m3: f64,
}

impl DailyVolume {
    pub fn total(&self) -> f64 {
        self.rainfall_m3 + self.cow_m3 + self.wash_m3
    }
}

/// Effluent entering the system each day given rainfall rows, whose first
/// value column is the daily amount in millimetres.
pub fn daily_volumes(rows: &[ObservationRow], farm: &FarmShape, catchments: &Catchments) -> Vec<DailyVolume> {
    let cows = farm.milking_cows as f64;

    rows.iter()
        .filter_map(|row| {
            let date = row.date()?;
            let milking = is_milking(farm, date);
            let rain_mm = row.values.first().copied().flatten().unwrap_or(0.0);

            let (cow_m3, wash_m3) = if milking {
                (
                    EFFLUENT_PER_COW_L * cows * (farm.milking_hours / 24.0) / 1000.0,
                    farm.machine_wash_water + cows * farm.washdown_water_per_cow / 1000.0,
                )
            } else {
                (0.0, 0.0)
            };

            Some(DailyVolume {
                date,
                rainfall_m3: rain_mm / 1000.0 * catchments.captured_m2(milking),
                cow_m3,
                wash_m3,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeSummary {
    pub station: u32,
    pub days: usize,
    pub years: usize,
    pub mean_daily_m3: f64,
    pub max_daily_m3: f64,
    pub mean_annual_m3: f64,
}

impl VolumeSummary {
    pub fn from_volumes(station: u32, volumes: &[DailyVolume]) -> Option<Self> {
        if volumes.is_empty() {
            return None;
        }

        let years = volumes.iter().map(|v| v.date.year()).collect::<BTreeSet<_>>().len();
        let total: f64 = volumes.iter().map(DailyVolume::total).sum();
        let max = volumes.iter().map(DailyVolume::total).fold(0.0, f64::max);

        Some(VolumeSummary {
            station,
            days: volumes.len(),
            years,
            mean_daily_m3: total / volumes.len() as f64,
            max_daily_m3: max,
            mean_annual_m3: total / years as f64,
        })
    }
}

impl fmt::Display for VolumeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Effluent volume from station {} over {} days ({} years): mean {:.2} m3/day, peak {:.2} m3/day, {:.0} m3/year",
            self.station, self.days, self.years, self.mean_daily_m3, self.max_daily_m3, self.mean_annual_m3
        )
    }
}

// -- Tests -------------------------------------------------------------------
