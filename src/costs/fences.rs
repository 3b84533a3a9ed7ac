//! Fence layout and fence costs.

use serde::Deserialize;

use super::{farm::FarmShape, CostBreakdown, CostError, PricingTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FenceType {
    PostAndBatten2Wire,
    PostAndBatten3Wire,
    ThreeWireQuarterRound,
    FourWireQuarterRound,
}

/// Construction of one fence type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FenceSpec {
    pub wires: u32,
    pub electric_wires: u32,
    /// Metres between battens, `None` for fences without battens.
    pub batten_spacing: Option<f64>,
    pub post_type: &'static str,
    pub post_spacing: f64,
}

impl FenceType {
    /// Name used in the pricing table.
    pub fn label(&self) -> &'static str {
        match self {
            FenceType::PostAndBatten2Wire => "Post & Batton - 2 Wires Electric",
            FenceType::PostAndBatten3Wire => "Post & Batton - 3 Wires Electric",
            FenceType::ThreeWireQuarterRound => "3 Wire - Quarter Round",
            FenceType::FourWireQuarterRound => "4 Wire - Quarter Round",
        }
    }

    pub fn spec(&self) -> FenceSpec {
        let (wires, electric_wires, batten_spacing) = match self {
            FenceType::PostAndBatten2Wire => (5, 2, Some(1.0)),
            FenceType::PostAndBatten3Wire => (7, 3, Some(1.0)),
            FenceType::ThreeWireQuarterRound => (3, 3, None),
            FenceType::FourWireQuarterRound => (4, 3, None),
        };
        FenceSpec {
            wires,
            electric_wires,
            batten_spacing,
            post_type: "Quarter",
            post_spacing: 5.0,
        }
    }
}

/// Fence lengths in metres and fitting counts for a rectangular farm split
/// into rectangular paddocks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FenceLayout {
    pub boundary_length: f64,
    pub gate_line_length: f64,
    pub internal_length: f64,
    pub gates: f64,
    pub corners: f64,
    pub strainers: f64,
    pub gate_posts: f64,
}

impl FenceLayout {
    pub fn from_shape(farm: &FarmShape) -> Self {
        let (width, length) = (farm.farm_width_m(), farm.farm_length_m());
        let (pad_width, pad_length) = (farm.paddock_width_m(), farm.paddock_length_m());

        let gate_line_length = ((width / pad_length - 1.0) * width).max(0.0);
        let internal_length = ((length / pad_width - 1.0) * length).max(0.0);

        // one gate per paddock on the gate line plus half as many internal
        let gates = gate_line_length / pad_width * 1.5;
        let corners = (length / pad_width + 1.0) * (1.0 + width / pad_length);

        FenceLayout {
            boundary_length: 2.0 * length + 2.0 * width,
            gate_line_length,
            internal_length,
            gates,
            corners,
            strainers: corners,
            gate_posts: gates,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FencePlan {
    pub fence_type: FenceType,
    /// Defaults to `fence_type`.
    #[serde(default)]
    pub boundary_fence_type: Option<FenceType>,
    #[serde(default)]
    pub contractor: bool,
    #[serde(default = "default_gate_type")]
    pub gate_type: String,
}

fn default_gate_type() -> String {
    "Gate - 12ft SS".to_string()
}

/// Adds `item` priced at `quantity`, skipping it when nothing is needed.
pub(crate) fn priced(
    breakdown: &mut CostBreakdown,
    pricing: &PricingTable,
    name: impl Into<String>,
    item: &str,
    quantity: f64,
) -> Result<(), CostError> {
    if quantity > 0.0 {
        breakdown.push(name, pricing.cost(item, quantity)?);
    }
    Ok(())
}

/// Materials, and optionally contractor, for `length` metres of one fence.
pub fn fence_cost(
    pricing: &PricingTable,
    fence_type: FenceType,
    length: f64,
    contractor: bool,
) -> Result<CostBreakdown, CostError> {
    let spec = fence_type.spec();
    let posts_per_m = 1.0 / spec.post_spacing;
    let battens_per_m = spec
        .batten_spacing
        .map(|spacing| (1.0 / spacing - posts_per_m).max(0.0))
        .unwrap_or(0.0);
    let electric = spec.electric_wires as f64;
    let plain = spec.wires.saturating_sub(spec.electric_wires) as f64;

    let mut breakdown = CostBreakdown::new(fence_type.label());
    priced(
        &mut breakdown,
        pricing,
        "Staples",
        "Staples",
        length * (posts_per_m + battens_per_m) * plain,
    )?;
    priced(&mut breakdown, pricing, "Wire", "Wire - Standard", length * spec.wires as f64)?;
    priced(
        &mut breakdown,
        pricing,
        "Insulators - Post",
        "Insulators - Post",
        length * posts_per_m * electric,
    )?;
    priced(
        &mut breakdown,
        pricing,
        "Insulators - Batten",
        "Insulators - Batton",
        length * battens_per_m * electric,
    )?;
    priced(
        &mut breakdown,
        pricing,
        format!("Post - {}", spec.post_type),
        &format!("Fence Post - {}", spec.post_type),
        length * posts_per_m,
    )?;
    priced(
        &mut breakdown,
        pricing,
        "Post - Batten",
        "Fence Post - Batton",
        length * battens_per_m,
    )?;
    if contractor {
        priced(
            &mut breakdown,
            pricing,
            "Contractor",
            &format!("Contractor - {}", fence_type.label()),
            length,
        )?;
    }

    Ok(breakdown)
}

/// Boundary, internal and gate-line fences plus gates and the posts that
/// carry them.
pub fn farm_fencing_cost(
    pricing: &PricingTable,
    farm: &FarmShape,
    plan: &FencePlan,
) -> Result<CostBreakdown, CostError> {
    let layout = FenceLayout::from_shape(farm);
    let boundary_type = plan.boundary_fence_type.unwrap_or(plan.fence_type);

    let mut breakdown = CostBreakdown::new("Fencing");
    for (title, fence_type, length) in [
        ("Boundary", boundary_type, layout.boundary_length),
        ("Internal", plan.fence_type, layout.internal_length),
        ("Gate line", plan.fence_type, layout.gate_line_length),
    ] {
        let mut fence = fence_cost(pricing, fence_type, length, plan.contractor)?;
        fence.title = title.to_string();
        breakdown.extend(fence);
    }

    priced(&mut breakdown, pricing, "Gates", &plan.gate_type, layout.gates)?;
    priced(&mut breakdown, pricing, "Post - Corner", "Fence Post - Corner", layout.corners)?;
    priced(
        &mut breakdown,
        pricing,
        "Post - Strainer",
        "Fence Post - Strainer",
        layout.strainers,
    )?;
    priced(
        &mut breakdown,
        pricing,
        "Post - Gate",
        "Fence Post - Gate Post",
        layout.gate_posts,
    )?;

    Ok(breakdown)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::costs::{pricing::test::flat_pricing, CostRange};

    const ITEMS: &[&str] = &[
        "Staples",
        "Wire - Standard",
        "Insulators - Post",
        "Insulators - Batton",
        "Fence Post - Quarter",
        "Fence Post - Batton",
        "Fence Post - Corner",
        "Fence Post - Strainer",
        "Fence Post - Gate Post",
        "Gate - 12ft SS",
        "Contractor - Post & Batton - 2 Wires Electric",
    ];

    fn assert_low(cost: Option<CostRange>, expected: f64) {
        let cost = cost.unwrap();
        assert!((cost.low - expected).abs() < 1e-6, "{} != {}", cost.low, expected);
    }

    fn farm() -> FarmShape {
        FarmShape {
            land_area_ha: 200.0,
            paddock_size_ha: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn should_lay_out_paddocks() {
        let layout = FenceLayout::from_shape(&farm());

        assert!((layout.boundary_length - 6000.0).abs() < 1e-6);
        assert!((layout.gate_line_length - 4000.0).abs() < 1e-6);
        assert!((layout.internal_length - 38000.0).abs() < 1e-6);
        assert!((layout.gates - 60.0).abs() < 1e-6);
        assert!((layout.corners - 126.0).abs() < 1e-6);
    }

    #[test]
    fn should_price_post_and_batten_fence() {
        let pricing = flat_pricing(ITEMS);
        let fence = fence_cost(&pricing, FenceType::PostAndBatten2Wire, 100.0, true).unwrap();

        // 20 posts and 80 battens, three plain wires stapled to each
        assert_low(fence.get("Staples"), 310.0);
        assert_low(fence.get("Wire"), 510.0);
        assert_low(fence.get("Insulators - Post"), 50.0);
        assert_low(fence.get("Insulators - Batten"), 170.0);
        assert_low(fence.get("Post - Quarter"), 30.0);
        assert_low(fence.get("Post - Batten"), 90.0);
        assert_low(fence.get("Contractor"), 110.0);
    }

    #[test]
    fn should_skip_battens_and_staples_on_all_electric_fence() {
        let pricing = flat_pricing(ITEMS);
        let fence = fence_cost(&pricing, FenceType::ThreeWireQuarterRound, 100.0, false).unwrap();

        assert!(fence.get("Staples").is_none());
        assert!(fence.get("Post - Batten").is_none());
        assert!(fence.get("Contractor").is_none());
        assert_low(fence.get("Insulators - Post"), 70.0);
    }

    #[test]
    fn should_fail_on_unpriced_contractor() {
        let pricing = flat_pricing(ITEMS);

        let err = fence_cost(&pricing, FenceType::FourWireQuarterRound, 10.0, true).unwrap_err();
        assert!(err.to_string().contains("Contractor - 4 Wire - Quarter Round"));
    }

    #[test]
    fn should_price_whole_farm() {
        let pricing = flat_pricing(ITEMS);
        let plan = FencePlan {
            fence_type: FenceType::PostAndBatten2Wire,
            boundary_fence_type: None,
            contractor: false,
            gate_type: default_gate_type(),
        };

        let fencing = farm_fencing_cost(&pricing, &farm(), &plan).unwrap();

        assert_low(fencing.get("Boundary: Wire"), 6000.0 * 5.0 + 10.0);
        assert_low(fencing.get("Gates"), 70.0);
        assert_low(fencing.get("Post - Corner"), 136.0);
        assert!(fencing.total().high > fencing.total().low);
    }
}
