//! Forestry and horticulture planting costs.

use serde::Deserialize;

use super::{
    farm::{invalid, FarmShape},
    fences::priced,
    CostBreakdown, CostError, PricingTable,
};

/// Default planting density in trees per hectare.
pub fn default_trees_per_ha(crop: &str) -> Option<f64> {
    match crop {
        "Avocado" => Some(400.0),
        "Apples - Jazz" => Some(800.0),
        _ => None,
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LandCoverPlan {
    Forestry {
        forest_type: String,
    },
    Horticulture {
        crop: String,
        #[serde(default)]
        trees_per_ha: Option<f64>,
        #[serde(default)]
        trellis: bool,
        #[serde(default)]
        land_preparation: bool,
    },
}

impl LandCoverPlan {
    pub fn cost(&self, pricing: &PricingTable, farm: &FarmShape) -> Result<CostBreakdown, CostError> {
        match self {
            LandCoverPlan::Forestry { forest_type } => forestry_cost(pricing, farm, forest_type),
            LandCoverPlan::Horticulture {
                crop,
                trees_per_ha,
                trellis,
                land_preparation,
            } => horticulture_cost(pricing, farm, crop, *trees_per_ha, *trellis, *land_preparation),
        }
    }
}

/// Seedlings and planting labour over the whole farm.
pub fn forestry_cost(pricing: &PricingTable, farm: &FarmShape, forest_type: &str) -> Result<CostBreakdown, CostError> {
    let mut breakdown = CostBreakdown::new(format!("Forestry - {}", forest_type));
    priced(
        &mut breakdown,
        pricing,
        "Trees",
        &format!("{} - Trees", forest_type),
        farm.land_area_ha,
    )?;
    priced(
        &mut breakdown,
        pricing,
        "Planting",
        &format!("{} - Planting", forest_type),
        farm.land_area_ha,
    )?;
    Ok(breakdown)
}

pub fn horticulture_cost(
    pricing: &PricingTable,
    farm: &FarmShape,
    crop: &str,
    trees_per_ha: Option<f64>,
    trellis: bool,
    land_preparation: bool,
) -> Result<CostBreakdown, CostError> {
    let density = trees_per_ha
        .or_else(|| default_trees_per_ha(crop))
        .ok_or_else(|| invalid("trees_per_ha", format!("no default planting density for `{}`", crop)))?;
    let area = farm.land_area_ha;

    let mut breakdown = CostBreakdown::new(format!("Horticulture - {}", crop));
    priced(&mut breakdown, pricing, "Trees", &format!("{} - Trees", crop), area * density)?;
    priced(
        &mut breakdown,
        pricing,
        "Tree Planting",
        &format!("{} - Tree Planting", crop),
        area,
    )?;
    if trellis {
        priced(&mut breakdown, pricing, "Trellis", &format!("{} - Trellis", crop), area)?;
    }
    if land_preparation {
        priced(&mut breakdown, pricing, "Land Preparation", "Land Preparation", area)?;
    }

    Ok(breakdown)
}

// -- Tests -------------------------------------------------------------------
