//! Rough capital cost estimates for farm infrastructure.
//!
//! Every calculator prices items from a [`PricingTable`] and returns a
//! [`CostBreakdown`] with low and high bounds. The formulas are indicative
//! only.

pub mod effluent;
pub mod farm;
pub mod fences;
pub mod land_cover;
pub mod milking_shed;
pub mod pricing;

use std::{fmt, fs, ops::Add, path::Path};

use anyhow::{Context, Result};
use serde::Deserialize;
use thiserror::Error;

pub use farm::FarmShape;
pub use pricing::{PricingError, PricingTable};

#[derive(Error, Debug)]
pub enum CostError {
    #[error(transparent)]
    Pricing(#[from] PricingError),
    #[error("invalid farm input `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CostRange {
    pub low: f64,
    pub high: f64,
}

impl CostRange {
    pub fn new(low: f64, high: f64) -> Self {
        CostRange { low, high }
    }
}

impl Add for CostRange {
    type Output = CostRange;

    fn add(self, other: CostRange) -> CostRange {
        CostRange::new(self.low + other.low, self.high + other.high)
    }
}

/// Named cost items in the order they were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CostBreakdown {
    pub title: String,
    pub items: Vec<(String, CostRange)>,
}

impl CostBreakdown {
    pub fn new(title: impl Into<String>) -> Self {
        CostBreakdown {
            title: title.into(),
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, cost: CostRange) {
        self.items.push((name.into(), cost));
    }

    /// Appends the items of `other`, prefixing each with its title.
    pub fn extend(&mut self, other: CostBreakdown) {
        for (name, cost) in other.items {
            self.items.push((format!("{}: {}", other.title, name), cost));
        }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<CostRange> {
        self.items.iter().find(|(n, _)| n == name).map(|(_, c)| *c)
    }

    pub fn total(&self) -> CostRange {
        self.items.iter().fold(CostRange::default(), |acc, (_, c)| acc + *c)
    }
}

impl fmt::Display for CostBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        for (name, cost) in &self.items {
            writeln!(f, "  {:<45} {:>12.2} {:>12.2}", name, cost.low, cost.high)?;
        }
        let total = self.total();
        write!(f, "  {:<45} {:>12.2} {:>12.2}", "Total", total.low, total.high)
    }
}

/// Farm description read by the `costs` command. Only the sections present
/// are priced.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FarmPlan {
    pub farm: FarmShape,
    pub fences: Option<fences::FencePlan>,
    pub shed: Option<milking_shed::ShedPlan>,
    pub effluent: Option<effluent::EffluentPlan>,
    pub land_cover: Option<land_cover::LandCoverPlan>,
}

impl FarmPlan {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading `{}`", path.display()))?;
        let plan: FarmPlan = toml::from_str(&text).with_context(|| format!("parsing `{}`", path.display()))?;
        plan.farm.validate()?;
        Ok(plan)
    }

    pub fn breakdowns(&self, pricing: &PricingTable) -> Result<Vec<CostBreakdown>, CostError> {
        let mut out = Vec::new();

        if let Some(plan) = &self.fences {
            out.push(fences::farm_fencing_cost(pricing, &self.farm, plan)?);
        }
        if let Some(plan) = &self.shed {
            out.push(plan.shed().machine_cost(pricing, &plan.machine)?);
            out.push(plan.shed().platform_cost(pricing, plan.extra_engineering)?);
            out.push(plan.shed().shed_water_cost(pricing, &plan.water)?);
        }
        if let Some(plan) = &self.effluent {
            out.push(effluent::sump_cost(pricing, &self.farm)?);
            out.push(effluent::irrigation_cost(pricing, &self.farm, plan)?);
        }
        if let Some(plan) = &self.land_cover {
            out.push(plan.cost(pricing, &self.farm)?);
        }

        Ok(out)
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_total_in_insertion_order() {
        let mut breakdown = CostBreakdown::new("Shed");
        breakdown.push("Machine", CostRange::new(100.0, 150.0));
        breakdown.push("Platform", CostRange::new(10.0, 20.0));

        assert_eq!(breakdown.total(), CostRange::new(110.0, 170.0));
        assert_eq!(breakdown.items[0].0, "Machine");
        assert_eq!(breakdown.get("Platform"), Some(CostRange::new(10.0, 20.0)));

        let text = breakdown.to_string();
        assert!(text.starts_with("Shed\n"));
        assert!(text.contains("Total"));
    }

    #[test]
    fn should_prefix_extended_items() {
        let mut inner = CostBreakdown::new("Boundary");
        inner.push("Wire", CostRange::new(1.0, 2.0));

        let mut outer = CostBreakdown::new("Fencing");
        outer.extend(inner);

        assert_eq!(outer.get("Boundary: Wire"), Some(CostRange::new(1.0, 2.0)));
    }

    #[test]
    fn should_parse_farm_plan_sections() {
        let plan: FarmPlan = toml::from_str(
            r#"
            [farm]
            land_area_ha = 100.0
            paddock_size_ha = 2.5
            milking_cows = 300

            [shed]
            kind = "rotary"
            bails = 40

            [land_cover]
            kind = "forestry"
            forest_type = "Pinus Radiata"
            "#,
        )
        .unwrap();

        assert_eq!(plan.farm.milking_cows, 300);
        assert!(plan.fences.is_none());
        assert_eq!(plan.shed.unwrap().bails, 40);
        assert!(plan.land_cover.is_some());
    }
}
