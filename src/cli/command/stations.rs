//! Fetch, filter and persist the CliFlo station list.

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};

use crate::{
    cli::create_spinner,
    config::Config,
    db::Store,
    reading::DataType,
    session::{cliflo::Credentials, CliFloSession, Session, TableKind},
    table::RawTable,
};

const AGENT_HEADER: &str = "AgentNumber";
const NAME_HEADER: &str = "Name";
const LAT_HEADER: &str = "Lat(dec deg)";
const LONG_HEADER: &str = "Long(dec deg)";
const START_HEADER: &str = "Start Date";
const END_HEADER: &str = "End Date";
const PERCENT_HEADER: &str = "PercentComplete";

/// Mean Earth radius used for great circle distances.
const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub agent_number: u32,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub start_year: Option<i32>,
    /// `None` while the station is still open.
    pub end_year: Option<i32>,
    pub percent_complete: Option<f64>,
}

impl Station {
    /// Reads every station row below the `AgentNumber` header. Rows without a
    /// numeric agent number are skipped.
    pub fn from_table(table: &RawTable) -> Result<Vec<Station>> {
        let header_index = table
            .header_index(AGENT_HEADER)
            .ok_or_else(|| anyhow!("station list has no `{}` column", AGENT_HEADER))?;
        let header = &table.rows[header_index];
        let column = |name: &str| {
            header
                .iter()
                .position(|cell| cell == name)
                .ok_or_else(|| anyhow!("station list has no `{}` column", name))
        };

        let agent = column(AGENT_HEADER)?;
        let name = column(NAME_HEADER)?;
        let lat = column(LAT_HEADER)?;
        let long = column(LONG_HEADER)?;
        let start = column(START_HEADER)?;
        let end = column(END_HEADER)?;
        let percent = column(PERCENT_HEADER)?;

        let cell = |row: &Vec<String>, index: usize| row.get(index).map(|c| c.trim()).unwrap_or_default().to_string();

        let stations = table.rows[header_index + 1..]
            .iter()
            .filter_map(|row| {
                let agent_number = cell(row, agent).parse().ok()?;
                Some(Station {
                    agent_number,
                    name: cell(row, name),
                    latitude: cell(row, lat).parse().ok(),
                    longitude: cell(row, long).parse().ok(),
                    start_year: parse_year(&cell(row, start)),
                    end_year: parse_year(&cell(row, end)),
                    percent_complete: cell(row, percent).parse().ok(),
                })
            })
            .collect();

        Ok(stations)
    }

    pub fn to_table(stations: &[Station]) -> RawTable {
        let optional = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
        let mut rows = vec![[
            AGENT_HEADER,
            NAME_HEADER,
            LAT_HEADER,
            LONG_HEADER,
            START_HEADER,
            END_HEADER,
            PERCENT_HEADER,
        ]
        .iter()
        .map(|h| h.to_string())
        .collect::<Vec<_>>()];

        rows.extend(stations.iter().map(|s| {
            vec![
                s.agent_number.to_string(),
                s.name.clone(),
                optional(s.latitude.map(|v| v.to_string())),
                optional(s.longitude.map(|v| v.to_string())),
                optional(s.start_year.map(|v| v.to_string())),
                optional(s.end_year.map(|v| v.to_string())),
                optional(s.percent_complete.map(|v| v.to_string())),
            ]
        }));

        RawTable::new(rows)
    }

    /// Great circle distance to a point, when the station has coordinates.
    pub fn distance_km(&self, latitude: f64, longitude: f64) -> Option<f64> {
        let (lat1, lon1) = (self.latitude?.to_radians(), self.longitude?.to_radians());
        let (lat2, lon2) = (latitude.to_radians(), longitude.to_radians());

        let a = ((lat2 - lat1) / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * ((lon2 - lon1) / 2.0).sin().powi(2);
        Some(2.0 * EARTH_RADIUS_KM * a.sqrt().asin())
    }
}

/// CliFlo dates look like `01-Jan-1988`; the year is the last segment. `-`
/// and blanks mean no date.
fn parse_year(cell: &str) -> Option<i32> {
    cell.rsplit('-').next()?.trim().parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationFilter {
    pub start_year: i32,
    pub end_year: i32,
    pub min_percent_complete: f64,
}

impl StationFilter {
    pub fn from_config(config: &Config) -> Self {
        StationFilter {
            start_year: config.update.start_year,
            end_year: config.update.end_year,
            min_percent_complete: config.stations.min_percent_complete,
        }
    }

    /// Open stations pass the end year test.
    pub fn accepts(&self, station: &Station) -> bool {
        station.start_year.is_some_and(|y| y <= self.start_year)
            && station.end_year.map_or(true, |y| y >= self.end_year)
            && station
                .percent_complete
                .is_some_and(|p| p >= self.min_percent_complete)
    }

    pub fn apply(&self, stations: Vec<Station>) -> Vec<Station> {
        stations.into_iter().filter(|s| self.accepts(s)).collect()
    }
}

pub fn read_station_file(path: &Path) -> Result<Vec<Station>> {
    let file = File::open(path).with_context(|| format!("opening station list `{}`", path.display()))?;
    Station::from_table(&RawTable::from_csv(file)?)
}

pub fn write_station_file(stations: &[Station], path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = File::create(path).with_context(|| format!("creating `{}`", path.display()))?;
    Station::to_table(stations).to_csv(file)
}

/// Where the filtered station list for the configured data type and years is
/// saved.
pub fn station_list_path(config: &Config) -> PathBuf {
    config.cache.folder.join(format!(
        "{} stations ({} - {}).csv",
        config.update.data_type, config.update.start_year, config.update.end_year
    ))
}

/// Nearest station with stored `data_type` rows whose `column` was mostly
/// measured. At most `max_candidates` stations are tried, closest first.
pub fn nearest_reliable_station(
    store: &Store,
    data_type: DataType,
    column: &str,
    latitude: f64,
    longitude: f64,
    max_candidates: usize,
    max_estimated_share: f64,
) -> Result<Option<Station>> {
    let mut candidates: Vec<(f64, Station)> = store
        .stations(data_type)?
        .into_iter()
        .filter_map(|s| s.distance_km(latitude, longitude).map(|d| (d, s)))
        .collect();
    candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

    for (distance, station) in candidates.into_iter().take(max_candidates) {
        match store.estimated_share(data_type, station.agent_number, column)? {
            Some(share) if share < max_estimated_share => {
                info!(station = station.agent_number, distance, share, "nearest reliable station");
                return Ok(Some(station));
            }
            share => {
                info!(station = station.agent_number, distance, ?share, "station too sparse, trying next")
            }
        }
    }

    Ok(None)
}

/// Fetches the station list (or reads the configured file), filters it and
/// saves the result next to the cache and, unless `csv_only`, in the store.
pub async fn stations(config: &Config, credentials: Option<Credentials>) -> Result<String> {
    let data_type = config.update.data_type;

    let table = match &config.stations.file {
        Some(path) => {
            let bar = create_spinner(format!("Reading stations from {}", path.display()));
            let file = File::open(path).with_context(|| format!("opening `{}`", path.display()))?;
            let table = RawTable::from_csv(file)?;
            bar.finish_with_message("Stations read");
            table
        }
        None => {
            let credentials =
                credentials.ok_or_else(|| anyhow!("CLIFLO_USER and CLIFLO_PW are required to fetch stations"))?;
            let bar = create_spinner("Fetching station list from CliFlo...".to_string());
            let table = fetch_station_table(config, &credentials, data_type).await?;
            bar.finish_with_message("Station list fetched");
            table
        }
    };

    let all = Station::from_table(&table)?;
    let total = all.len();
    let stations = StationFilter::from_config(config).apply(all);
    info!(total, kept = stations.len(), "stations filtered");

    let path = station_list_path(config);
    write_station_file(&stations, &path)?;

    if !config.update.csv_only {
        let mut store = Store::open(&config.store.path)
            .with_context(|| format!("opening store `{}`", config.store.path.display()))?;
        store.ensure_tables(data_type)?;
        store.upsert_stations(data_type, &stations)?;
    }

    Ok(format!(
        "{} of {} stations kept, list saved to `{}`",
        stations.len(),
        total,
        path.display()
    ))
}

async fn fetch_station_table(config: &Config, credentials: &Credentials, data_type: DataType) -> Result<RawTable> {
    let mut session = CliFloSession::login(&config.session, credentials).await?;

    let result = async {
        session.select_data_category(data_type).await?;
        session.search_stations(&config.stations.search()).await?;
        session.read_result_table(TableKind::StationList).await
    }
    .await;

    if let Err(e) = session.logout().await {
        warn!(error = %e, "logout failed");
    }

    Ok(result?)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::schema;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn list() -> RawTable {
        let rows = [
            "Select,AgentNumber,Network,Name,Lat(dec deg),Long(dec deg),Start Date,End Date,PercentComplete",
            ",5396,E15082,Kelburn,-41.286,174.767,01-Jan-1927,-,99",
            ",12,A64871,Auckland Aero,-37.008,174.789,01-Jan-1962,31-Dec-2010,100",
            ",3925,E0572,Gisborne,-38.654,177.986,01-Jan-1990,-,100",
            ",,,Footer note,,,,,",
        ];
        RawTable::from_csv(rows.join("\n").as_bytes()).unwrap()
    }

    fn filter() -> StationFilter {
        StationFilter {
            start_year: 1988,
            end_year: 2018,
            min_percent_complete: 95.0,
        }
    }

    #[test]
    fn should_parse_station_list() {
        let stations = Station::from_table(&list()).unwrap();

        assert_eq!(stations.len(), 3);
        assert_eq!(stations[0].agent_number, 5396);
        assert_eq!(stations[0].name, "Kelburn");
        assert_eq!(stations[0].latitude, Some(-41.286));
        assert_eq!(stations[0].start_year, Some(1927));
        assert_eq!(stations[0].end_year, None);
        assert_eq!(stations[1].end_year, Some(2010));
        assert_eq!(stations[1].percent_complete, Some(100.0));
    }

    #[test]
    fn should_filter_stations() {
        let stations = filter().apply(Station::from_table(&list()).unwrap());

        let kept: Vec<u32> = stations.iter().map(|s| s.agent_number).collect();
        assert_eq!(kept, vec![5396]);
    }

    #[test]
    fn should_read_back_station_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stations.csv");
        let stations = Station::from_table(&list()).unwrap();

        write_station_file(&stations, &path).unwrap();

        assert_eq!(read_station_file(&path).unwrap(), stations);
    }

    #[test]
    fn should_measure_distance() {
        let kelburn = &Station::from_table(&list()).unwrap()[0];

        assert_eq!(kelburn.distance_km(-41.286, 174.767), Some(0.0));
        let to_auckland = kelburn.distance_km(-37.008, 174.789).unwrap();
        assert!((470.0..480.0).contains(&to_auckland), "{}", to_auckland);
    }

    #[test]
    fn should_skip_sparse_nearest_station() {
        let mut store = Store::open_in_memory().unwrap();
        store.ensure_tables(DataType::Rainfall).unwrap();
        let stations = Station::from_table(&list()).unwrap();
        store.upsert_stations(DataType::Rainfall, &stations).unwrap();

        let day = |station: u32, day: u32, estimated: bool| {
            crate::reading::ObservationRow::new(
                DataType::Rainfall,
                station,
                NaiveDate::from_ymd_opt(2000, 1, day).unwrap(),
                vec![Some(1.0), Some(0.0)],
                vec![estimated, false],
            )
        };
        store
            .append(
                DataType::Rainfall,
                &[day(5396, 1, true), day(5396, 2, false), day(12, 1, false)],
            )
            .unwrap();
        assert!(store.table_exists(&schema::observations(DataType::Rainfall).name).unwrap());

        let nearest =
            nearest_reliable_station(&store, DataType::Rainfall, "amount_mm", -41.3, 174.8, 10, 0.05)
                .unwrap()
                .unwrap();

        assert_eq!(nearest.agent_number, 12);
    }
}
