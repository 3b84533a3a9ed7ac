use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::{
    config::Config,
    costs::{
        effluent::{daily_volumes, Catchments, VolumeSummary},
        FarmPlan, FarmShape, PricingTable,
    },
    db::Store,
    reading::DataType,
};

use super::stations::nearest_reliable_station;

/// Stations tried when looking for a reliable rainfall record.
const MAX_CANDIDATES: usize = 10;

/// Share of estimated days above which a rainfall record is passed over.
const MAX_ESTIMATED_SHARE: f64 = 0.05;

/// Prices every section of the farm file and, when the farm has a location,
/// summarises effluent volumes from the nearest reliable rainfall record.
pub fn costs(config: &Config, farm_path: &Path) -> Result<String> {
    let pricing = PricingTable::load(&config.costs.pricing)?;
    let plan = FarmPlan::load(farm_path)?;

    let mut report: Vec<String> = plan
        .breakdowns(&pricing)
        .with_context(|| format!("pricing `{}`", farm_path.display()))?
        .iter()
        .map(|b| b.to_string())
        .collect();

    if let Some(effluent) = &plan.effluent {
        if let Some(summary) = effluent_volume(config, &plan.farm, &effluent.catchments)? {
            report.push(summary.to_string());
        }
    }

    Ok(report.join("\n\n"))
}

fn effluent_volume(config: &Config, farm: &FarmShape, catchments: &Catchments) -> Result<Option<VolumeSummary>> {
    let Some((latitude, longitude)) = farm.location() else {
        info!("farm has no location, skipping effluent volumes");
        return Ok(None);
    };
    if !config.store.path.exists() {
        warn!(path = %config.store.path.display(), "no store, skipping effluent volumes");
        return Ok(None);
    }

    let store = Store::open(&config.store.path)?;
    let data_type = DataType::Rainfall;
    let station = nearest_reliable_station(
        &store,
        data_type,
        data_type.primary_column(),
        latitude,
        longitude,
        MAX_CANDIDATES,
        MAX_ESTIMATED_SHARE,
    )?;
    let Some(station) = station else {
        warn!("no nearby station with a reliable rainfall record");
        return Ok(None);
    };

    let rows = store.observations(data_type, Some(station.agent_number))?;
    let volumes = daily_volumes(&rows, farm, catchments);

    Ok(VolumeSummary::from_volumes(station.agent_number, &volumes))
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    use super::*;
    use crate::{cli::command::stations::Station, reading::ObservationRow};

    const PRICING: &str = "item,unit_cost_low,unit_cost_high,base_cost_low,base_cost_high
Basic Milking Machine - 20AS - HB,1000,1500,5000,6000
Shed Water Pumps and Plumbing - 20B,0,0,15000,20000
Farm Pump Bypass,0,0,800,1000
Hot Water Cylinders - Autofill,0,0,600,900
Calf Milk - Pumping and Reticulation,0,0,2000,3000
Sump - 50m3 storage,0,0,8000,12000
Stirrer - Sump - Large,0,0,3000,4000
Pump - Effluent - 15kw - Sump,0,0,4000,5000
Pipe - 90mm - Alk,12,15,0,0
Effluent Line - Trenching,3,5,0,0
Effluent Line - Install,2,3,0,0
Hydrant - 3W,150,200,0,0
Hydrant - 3W - Install,50,80,0,0
Hydrant - EOL,100,120,0,0
Hydrant - EOL - Install,40,60,0,0
Pump - Effluent - 18.5kw - Close Couple,0,0,9000,11000
Pump - Effluent - Install,0,0,1000,1500
Pump - Effluent - Stand,0,0,500,700
Pump - Effluent - Hose,0,0,300,400
Irrigator - Travelling Rain Gun,0,0,7000,9000
";

    fn setup(dir: &TempDir, farm: &str) -> (Config, std::path::PathBuf) {
        let mut config = Config::default();
        config.costs.pricing = dir.path().join("pricing.csv");
        config.store.path = dir.path().join("cliflo.sqlite");
        fs::write(&config.costs.pricing, PRICING).unwrap();

        let farm_path = dir.path().join("farm.toml");
        fs::write(&farm_path, farm).unwrap();
        (config, farm_path)
    }

    #[test]
    fn should_report_each_section() {
        let dir = TempDir::new().unwrap();
        let (config, farm_path) = setup(
            &dir,
            r#"
            [farm]
            land_area_ha = 80.0
            paddock_size_ha = 2.0

            [shed]
            kind = "herringbone"
            bails = 20
            [shed.machine]
            cup_removers = false
            teat_spray = false
            machine_auto_wash = false

            [effluent]
            current_area_ha = 8.0
            "#,
        );

        let report = costs(&config, &farm_path).unwrap();

        assert!(report.contains("Milking machine"));
        assert!(report.contains("Effluent sump"));
        assert!(report.contains("Effluent irrigation"));
        assert!(!report.contains("Effluent volume"));
    }

    #[test]
    fn should_name_unpriced_item() {
        let dir = TempDir::new().unwrap();
        let (config, farm_path) = setup(
            &dir,
            r#"
            [farm]
            land_area_ha = 80.0

            [shed]
            kind = "rotary"
            bails = 40
            "#,
        );

        let err = costs(&config, &farm_path).unwrap_err();

        assert!(format!("{:#}", err).contains("Basic Milking Machine - 40B - Rotary"));
    }

    #[test]
    fn should_summarise_volumes_from_nearest_reliable_station() {
        let dir = TempDir::new().unwrap();
        let (config, _) = setup(&dir, "");
        let data_type = DataType::Rainfall;

        let mut store = Store::open(&config.store.path).unwrap();
        store.ensure_tables(data_type).unwrap();
        let station = |agent_number, latitude| Station {
            agent_number,
            name: format!("Station {}", agent_number),
            latitude: Some(latitude),
            longitude: Some(175.0),
            start_year: Some(1950),
            end_year: None,
            percent_complete: Some(100.0),
        };
        store
            .upsert_stations(data_type, &[station(1, -37.70), station(2, -37.90)])
            .unwrap();

        // station 1 is closest but half estimated
        let rows: Vec<ObservationRow> = (1..=10)
            .flat_map(|day| {
                let date = NaiveDate::from_ymd_opt(2000, 3, day).unwrap();
                [
                    ObservationRow::new(data_type, 1, date, vec![Some(5.0), None], vec![day % 2 == 0, false]),
                    ObservationRow::new(data_type, 2, date, vec![Some(5.0), None], vec![false, false]),
                ]
            })
            .collect();
        store.append(data_type, &rows).unwrap();
        drop(store);

        let farm = FarmShape {
            latitude: Some(-37.71),
            longitude: Some(175.0),
            ..Default::default()
        };

        let summary = effluent_volume(&config, &farm, &Catchments::default())
            .unwrap()
            .unwrap();

        assert_eq!(summary.station, 2);
        assert_eq!(summary.days, 10);
    }
}
