//! Incremental fetch loop: for each station, fetch only the years the ledger
//! has not classified yet, through the cache, into the store.

use std::{collections::BTreeSet, fmt};

use indicatif::ProgressBar;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    cache::{Cache, CacheKey},
    db::{dedupe_against_store, Store, StoreError},
    prepare::{self, AlignedTable, CleanedTable, Outcome},
    reading::{DataType, Frequency},
    session::{self, Session, SessionError, TableKind},
    table::RawTable,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UpdateOptions {
    pub data_type: DataType,
    pub frequency: Frequency,
    pub start_year: i32,
    /// Exclusive.
    pub end_year: i32,
    /// Fetch and cache only. The ledger is ignored and the store is never
    /// touched.
    pub csv_only: bool,
    /// Ignore the ledger when choosing years. Stored rows are still never
    /// duplicated.
    pub refresh: bool,
}

/// Where a station year went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Session(session::Step),
    Normalize,
    Store,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Session(step) => step.fmt(f),
            Step::Normalize => f.write_str("normalize"),
            Step::Store => f.write_str("store"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub step: Step,
    pub reason: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.step, self.reason)
    }
}

impl Failure {
    fn store(e: StoreError) -> Self {
        Failure {
            step: Step::Store,
            reason: e.to_string(),
        }
    }
}

/// Result of one station year attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum YearOutcome {
    Fetched { estimated: f64, appended: usize },
    Empty,
    /// The year is left unclassified and retried on the next run.
    RetryableFailure(Failure),
    /// The run cannot continue.
    FatalFailure(Failure),
}

#[derive(Error, Debug, PartialEq)]
#[error("station {station} year {year} failed at {failure}")]
pub struct UpdateError {
    pub station: u32,
    pub year: i32,
    pub failure: Failure,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    pub stations_processed: usize,
    pub stations_skipped: usize,
    pub years_fetched: usize,
    pub cache_hits: usize,
    pub empty_years: usize,
    pub failures: usize,
    pub rows_appended: usize,
}

impl fmt::Display for UpdateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stations processed, {} skipped; {} years fetched ({} from cache), {} empty, {} failed; {} rows appended",
            self.stations_processed,
            self.stations_skipped,
            self.years_fetched,
            self.cache_hits,
            self.empty_years,
            self.failures,
            self.rows_appended
        )
    }
}

pub struct Updater<'a, S: Session + ?Sized> {
    session: &'a mut S,
    store: Option<&'a mut Store>,
    cache: &'a Cache,
    options: UpdateOptions,
    progress: ProgressBar,
    category_selected: bool,
    selected_station: Option<u32>,
    summary: UpdateSummary,
}

impl<'a, S: Session + ?Sized> Updater<'a, S> {
    /// `store` is ignored when `options.csv_only` is set.
    pub fn new(session: &'a mut S, store: Option<&'a mut Store>, cache: &'a Cache, options: UpdateOptions) -> Self {
        let store = if options.csv_only { None } else { store };
        Updater {
            session,
            store,
            cache,
            options,
            progress: ProgressBar::hidden(),
            category_selected: false,
            selected_station: None,
            summary: UpdateSummary::default(),
        }
    }

    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = progress;
        self
    }

    /// Runs every station in order. Stops at the first fatal failure.
    pub async fn run(mut self, stations: &[u32]) -> Result<UpdateSummary, UpdateError> {
        let data_type = self.options.data_type;
        if let Some(store) = self.store.as_deref() {
            store.ensure_tables(data_type).map_err(|e| UpdateError {
                station: stations.first().copied().unwrap_or_default(),
                year: self.options.start_year,
                failure: Failure::store(e),
            })?;
        }

        for &station in stations {
            let needed = self.years_needed(station).map_err(|e| UpdateError {
                station,
                year: self.options.start_year,
                failure: Failure::store(e),
            })?;

            if needed.is_empty() {
                info!(station, "skipped, nothing to fetch");
                self.summary.stations_skipped += 1;
                self.progress.inc(1);
                continue;
            }

            self.summary.stations_processed += 1;
            self.progress.set_message(format!("station {}", station));

            for year in needed {
                match self.process_year(station, year).await {
                    YearOutcome::Fetched { estimated, appended } => {
                        self.summary.years_fetched += 1;
                        self.summary.rows_appended += appended;
                        self.progress.println(format!(
                            "station {} {}: {:.1}% estimated, {} rows added",
                            station,
                            year,
                            estimated * 100.0,
                            appended
                        ));
                    }
                    YearOutcome::Empty => {
                        self.summary.empty_years += 1;
                        self.progress.println(format!("station {} {}: empty", station, year));
                    }
                    YearOutcome::RetryableFailure(failure) => {
                        warn!(station, year, %failure, "fetch failed, will retry next run");
                        self.summary.failures += 1;
                        self.mark_absent(station, year).map_err(|e| UpdateError {
                            station,
                            year,
                            failure: e,
                        })?;

                        if failure.step == Step::Session(session::Step::SelectStation) {
                            warn!(station, "station could not be selected, skipping it");
                            break;
                        }
                    }
                    YearOutcome::FatalFailure(failure) => {
                        return Err(UpdateError { station, year, failure });
                    }
                }
            }

            self.progress.inc(1);
        }

        info!(summary = %self.summary, "update finished");
        Ok(self.summary)
    }

    fn years_needed(&self, station: u32) -> Result<BTreeSet<i32>, StoreError> {
        let UpdateOptions {
            data_type,
            start_year,
            end_year,
            refresh,
            ..
        } = self.options;

        match self.store.as_deref() {
            Some(store) if !refresh => store.years_needed(data_type, station, start_year, end_year),
            _ => Ok((start_year..end_year).collect()),
        }
    }

    fn mark_absent(&mut self, station: u32, year: i32) -> Result<(), Failure> {
        match self.store.as_deref() {
            Some(store) => store
                .mark_absent(self.options.data_type, station, year)
                .map_err(Failure::store),
            None => Ok(()),
        }
    }

    /// Cache, then network, then the pipeline and the ledger.
    pub async fn process_year(&mut self, station: u32, year: i32) -> YearOutcome {
        let data_type = self.options.data_type;
        let key = CacheKey {
            station,
            data_type,
            frequency: self.options.frequency,
            year,
        };

        if let Some(cleaned) = self.load_cached(&key) {
            self.summary.cache_hits += 1;
            return self.store_year(station, year, &cleaned);
        }

        let raw = match self.fetch(station, year).await {
            Ok(raw) => raw,
            Err(e) => return classify(e),
        };
        if let Err(e) = self.cache.save(&key, &raw) {
            warn!(error = %e, "could not cache result table");
        }

        match prepare::normalize(&raw, data_type) {
            Ok(cleaned) => self.store_year(station, year, &cleaned),
            Err(e) => YearOutcome::RetryableFailure(Failure {
                step: Step::Normalize,
                reason: e.to_string(),
            }),
        }
    }

    /// A cached table that does not normalize is dropped and counts as a miss.
    fn load_cached(&self, key: &CacheKey) -> Option<CleanedTable> {
        let raw = self.cache.fetch_or_load(key)?;
        match prepare::normalize(&raw, key.data_type) {
            Ok(cleaned) => Some(cleaned),
            Err(e) => {
                warn!(station = key.station, year = key.year, error = %e, "unusable cache file, fetching again");
                if let Err(e) = self.cache.remove(key) {
                    warn!(error = %e, "could not remove cache file");
                }
                None
            }
        }
    }

    async fn fetch(&mut self, station: u32, year: i32) -> Result<RawTable, SessionError> {
        if !self.category_selected {
            self.session.select_data_category(self.options.data_type).await?;
            self.category_selected = true;
        }
        if self.selected_station != Some(station) {
            self.session.select_station(station).await?;
            self.selected_station = Some(station);
        }
        self.session.set_date_range(year, year + 1).await?;
        self.session.read_result_table(TableKind::Observations).await
    }

    fn store_year(&mut self, station: u32, year: i32, cleaned: &CleanedTable) -> YearOutcome {
        let data_type = self.options.data_type;

        let aligned = prepare::calendar_align(cleaned, data_type, station, year);
        let outcome = prepare::analyse_completeness(&aligned);

        let Some(store) = self.store.as_deref_mut() else {
            return match outcome {
                Outcome::Empty => YearOutcome::Empty,
                Outcome::Estimated(estimated) => YearOutcome::Fetched {
                    estimated,
                    appended: 0,
                },
            };
        };

        write_year(store, data_type, station, year, aligned, outcome)
            .unwrap_or_else(|e| YearOutcome::FatalFailure(Failure::store(e)))
    }
}

/// Appends the rows not stored yet and records the outcome in the ledger.
fn write_year(
    store: &mut Store,
    data_type: DataType,
    station: u32,
    year: i32,
    aligned: AlignedTable,
    outcome: Outcome,
) -> Result<YearOutcome, StoreError> {
    let appended = match outcome {
        Outcome::Empty => 0,
        Outcome::Estimated(_) => {
            let existing = store.existing_row_ids(data_type, station)?;
            let fresh = dedupe_against_store(aligned.rows, &existing);
            store.append(data_type, &fresh)?
        }
    };
    store.record_outcome(data_type, station, year, outcome)?;

    Ok(match outcome {
        Outcome::Empty => YearOutcome::Empty,
        Outcome::Estimated(estimated) => YearOutcome::Fetched { estimated, appended },
    })
}

fn classify(e: SessionError) -> YearOutcome {
    let failure = Failure {
        step: Step::Session(e.step().unwrap_or(session::Step::ReadResultTable)),
        reason: e.to_string(),
    };

    if e.is_retryable() {
        YearOutcome::RetryableFailure(failure)
    } else {
        YearOutcome::FatalFailure(failure)
    }
}

// -- Tests -------------------------------------------------------------------
