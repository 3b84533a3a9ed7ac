//! Scripted session for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use super::{Session, SessionError, StationSearch, Step, TableKind};
use crate::{reading::DataType, table::RawTable};

/// Serves canned observation tables keyed by (station, year) and records every
/// call it receives.
#[derive(Default)]
pub struct MockSession {
    pub tables: HashMap<(u32, i32), RawTable>,
    pub station_list: RawTable,
    /// Years whose read times out.
    pub timeouts: HashSet<(u32, i32)>,
    /// Stations the station search cannot find.
    pub unknown_stations: HashSet<u32>,
    pub expire_after_reads: Option<usize>,
    pub calls: Vec<String>,
    station: Option<u32>,
    year: Option<i32>,
    reads: usize,
    pub logged_out: bool,
}

impl MockSession {
    pub fn with_table(mut self, station: u32, year: i32, table: RawTable) -> Self {
        self.tables.insert((station, year), table);
        self
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls.iter().filter(|c| c.starts_with(prefix)).count()
    }
}

#[async_trait]
impl Session for MockSession {
    async fn select_data_category(&mut self, data_type: DataType) -> Result<(), SessionError> {
        self.calls.push(format!("category {}", data_type));
        Ok(())
    }

    async fn search_stations(&mut self, _search: &StationSearch) -> Result<(), SessionError> {
        self.calls.push("search".to_string());
        Ok(())
    }

    async fn select_station(&mut self, station: u32) -> Result<(), SessionError> {
        self.calls.push(format!("station {}", station));
        if self.unknown_stations.contains(&station) {
            return Err(SessionError::ElementNotFound {
                step: Step::SelectStation,
                what: format!("station {}", station),
            });
        }
        self.station = Some(station);
        Ok(())
    }

    async fn set_date_range(&mut self, start_year: i32, end_year: i32) -> Result<(), SessionError> {
        self.calls.push(format!("range {} {}", start_year, end_year));
        if self.station.is_none() {
            return Err(SessionError::ElementNotFound {
                step: Step::SetDateRange,
                what: "selected station".to_string(),
            });
        }
        self.year = Some(start_year);
        Ok(())
    }

    async fn read_result_table(&mut self, kind: TableKind) -> Result<RawTable, SessionError> {
        if kind == TableKind::StationList {
            self.calls.push("read stations".to_string());
            return Ok(self.station_list.clone());
        }

        self.reads += 1;
        if self.expire_after_reads.is_some_and(|limit| self.reads > limit) {
            return Err(SessionError::NotAuthenticated);
        }

        let (Some(station), Some(year)) = (self.station, self.year) else {
            return Err(SessionError::ElementNotFound {
                step: Step::ReadResultTable,
                what: "query".to_string(),
            });
        };
        self.calls.push(format!("read {} {}", station, year));
        if self.timeouts.contains(&(station, year)) {
            return Err(SessionError::Timeout(Step::ReadResultTable));
        }

        Ok(self.tables.get(&(station, year)).cloned().unwrap_or_default())
    }

    async fn logout(&mut self) -> Result<(), SessionError> {
        self.calls.push("logout".to_string());
        self.logged_out = true;
        Ok(())
    }
}
