//! Driving the CliFlo query forms.

pub mod cliflo;
#[cfg(test)]
pub mod mock;

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

use crate::{reading::DataType, table::RawTable};

pub use cliflo::CliFloSession;

/// Session calls, named in errors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Login,
    SelectDataCategory,
    SearchStations,
    SelectStation,
    SetDateRange,
    ReadResultTable,
    Logout,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Step::Login => "login",
            Step::SelectDataCategory => "select data category",
            Step::SearchStations => "search stations",
            Step::SelectStation => "select station",
            Step::SetDateRange => "set date range",
            Step::ReadResultTable => "read result table",
            Step::Logout => "logout",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("timed out during {0}")]
    Timeout(Step),
    #[error("{what} not found during {step}")]
    ElementNotFound { step: Step, what: String },
    #[error("transport error during {step}: {source}")]
    Transport {
        step: Step,
        #[source]
        source: reqwest::Error,
    },
    #[error("session is not authenticated")]
    NotAuthenticated,
}

impl SessionError {
    /// Whether the run can carry on with the next station year.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, SessionError::NotAuthenticated)
    }

    pub fn step(&self) -> Option<Step> {
        match self {
            SessionError::Timeout(step)
            | SessionError::ElementNotFound { step, .. }
            | SessionError::Transport { step, .. } => Some(*step),
            SessionError::NotAuthenticated => None,
        }
    }
}

/// Which table a result page is expected to hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    StationList,
    Observations,
}

/// Centre and radius of a station search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationSearch {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

impl Default for StationSearch {
    /// All of New Zealand.
    fn default() -> Self {
        StationSearch {
            latitude: -41.0,
            longitude: 174.0,
            radius_km: 1500.0,
        }
    }
}

/// An authenticated CliFlo session. Calls run one at a time and each one is
/// bounded by the session timeout.
#[async_trait]
pub trait Session: Send {
    async fn select_data_category(&mut self, data_type: DataType) -> Result<(), SessionError>;

    async fn search_stations(&mut self, search: &StationSearch) -> Result<(), SessionError>;

    /// Replaces the station selection of the query with `station`.
    async fn select_station(&mut self, station: u32) -> Result<(), SessionError>;

    /// Sets the query to `[start_year-01-01 00, end_year-01-01 00]`.
    async fn set_date_range(&mut self, start_year: i32, end_year: i32) -> Result<(), SessionError>;

    async fn read_result_table(&mut self, kind: TableKind) -> Result<RawTable, SessionError>;

    async fn logout(&mut self) -> Result<(), SessionError>;
}
