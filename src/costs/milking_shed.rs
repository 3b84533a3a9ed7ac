//! Milking machine, rotary platform and shed water costs.

use serde::Deserialize;

use super::{fences::priced, CostBreakdown, CostError, PricingTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShedKind {
    Rotary,
    Herringbone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilkingShed {
    pub kind: ShedKind,
    pub bails: u32,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MachineOptions {
    pub wash_gland: bool,
    pub cup_removers: bool,
    pub teat_spray: bool,
    pub mastitis_detection: bool,
    pub yield_meters: bool,
    pub fat_protein_meters: bool,
    pub machine_auto_wash: bool,
    pub silo_auto_wash: bool,
    pub silos: u32,
}

impl Default for MachineOptions {
    fn default() -> Self {
        MachineOptions {
            wash_gland: false,
            cup_removers: true,
            teat_spray: true,
            mastitis_detection: false,
            yield_meters: false,
            fat_protein_meters: false,
            machine_auto_wash: true,
            silo_auto_wash: false,
            silos: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct WaterOptions {
    pub nose_spray: bool,
    pub farm_pump_bypass: bool,
    pub hot_water_auto_fill: bool,
    /// Extra plastic tank size in litres.
    pub tank_litres: Option<u32>,
    pub calf_milk_pump: bool,
    pub washdown_vsd: bool,
    pub washdown_pump_upgrade: bool,
    pub cooler_pump_upgrade: bool,
}

impl Default for WaterOptions {
    fn default() -> Self {
        WaterOptions {
            nose_spray: false,
            farm_pump_bypass: true,
            hot_water_auto_fill: true,
            tank_litres: None,
            calf_milk_pump: true,
            washdown_vsd: false,
            washdown_pump_upgrade: false,
            cooler_pump_upgrade: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ShedPlan {
    pub kind: ShedKind,
    pub bails: u32,
    #[serde(default)]
    pub machine: MachineOptions,
    #[serde(default)]
    pub extra_engineering: bool,
    #[serde(default)]
    pub water: WaterOptions,
}

impl ShedPlan {
    pub fn shed(&self) -> MilkingShed {
        MilkingShed {
            kind: self.kind,
            bails: self.bails,
        }
    }
}

impl MilkingShed {
    fn base_machine(&self, pricing: &PricingTable, breakdown: &mut CostBreakdown) -> Result<(), CostError> {
        match self.kind {
            ShedKind::Rotary => priced(
                breakdown,
                pricing,
                "Milking Machine",
                &format!("Basic Milking Machine - {}B - Rotary", self.bails),
                1.0,
            ),
            ShedKind::Herringbone => priced(
                breakdown,
                pricing,
                "Milking Machine",
                &format!("Basic Milking Machine - {}AS - HB", self.bails),
                self.bails as f64,
            ),
        }
    }

    pub fn machine_cost(&self, pricing: &PricingTable, options: &MachineOptions) -> Result<CostBreakdown, CostError> {
        let bails = self.bails as f64;
        let mut breakdown = CostBreakdown::new("Milking machine");
        self.base_machine(pricing, &mut breakdown)?;

        let upgrades = [
            (options.wash_gland, "Wash Gland", "3 Port Wash Gland", 1.0),
            (options.cup_removers, "Cup Removers", "Cup Removers", bails),
            (options.teat_spray, "Teat Spray", "In Bail Teat Spray", bails),
            (options.mastitis_detection, "Mastitis Detection", "Mastitis Detection", bails),
            (options.yield_meters, "Milk Yield Meters", "Milk Yield Indicators", bails),
            (
                options.fat_protein_meters,
                "Milk Fat/Protein Meters",
                "Milk Fat / Protein Indicators",
                bails,
            ),
            (options.machine_auto_wash, "Machine Auto Wash", "Wash Automation: Machine", 1.0),
            (
                options.silo_auto_wash,
                "Silo Auto Wash",
                "Wash Automation: Silo",
                options.silos as f64,
            ),
        ];
        for (wanted, name, item, quantity) in upgrades {
            if wanted {
                priced(&mut breakdown, pricing, name, item, quantity)?;
            }
        }

        Ok(breakdown)
    }

    /// Rotary platform; herringbone sheds have none.
    pub fn platform_cost(&self, pricing: &PricingTable, extra_engineering: bool) -> Result<CostBreakdown, CostError> {
        let mut breakdown = CostBreakdown::new("Platform");
        if self.kind == ShedKind::Rotary {
            priced(
                &mut breakdown,
                pricing,
                "Platform",
                &format!("Basic Rotary Platform - {}B - Rotary", self.bails),
                self.bails as f64,
            )?;
        }
        if extra_engineering {
            priced(&mut breakdown, pricing, "Extra Engineering", "Additional Engineering", 1.0)?;
        }

        Ok(breakdown)
    }

    pub fn shed_water_cost(&self, pricing: &PricingTable, options: &WaterOptions) -> Result<CostBreakdown, CostError> {
        let mut breakdown = CostBreakdown::new("Shed water");
        priced(
            &mut breakdown,
            pricing,
            "Shed Water - Base",
            &format!("Shed Water Pumps and Plumbing - {}B", self.bails),
            1.0,
        )?;

        let upgrades = [
            (options.nose_spray, "Nose Spray System", "Nose Spray System"),
            (options.farm_pump_bypass, "Farm Pump Bypass", "Farm Pump Bypass"),
            (
                options.hot_water_auto_fill,
                "Hot Water Cylinders Auto Fill",
                "Hot Water Cylinders - Autofill",
            ),
            (options.calf_milk_pump, "Calf Milk Pump", "Calf Milk - Pumping and Reticulation"),
            (options.washdown_vsd, "Washdown VSD", "VSD - Washdown Pump"),
            (
                options.washdown_pump_upgrade,
                "Washdown Pump Upgrade",
                "Pump - Washdown and VSD Upgrade",
            ),
            (options.cooler_pump_upgrade, "Cooler Pump Upgrade", "Pump - Cooler Upgrade"),
        ];
        for (wanted, name, item) in upgrades {
            if wanted {
                priced(&mut breakdown, pricing, name, item, 1.0)?;
            }
        }
        if let Some(litres) = options.tank_litres {
            priced(
                &mut breakdown,
                pricing,
                format!("Water Tank - {}L", litres),
                &format!("Plastic Water Tank - {}L with plumbing", litres),
                1.0,
            )?;
        }

        Ok(breakdown)
    }
}

// -- Tests -------------------------------------------------------------------
