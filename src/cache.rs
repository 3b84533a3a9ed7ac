//! Side-file cache of raw CliFlo result tables, one file per station year.

use std::{
    fs::{self, File},
    io,
    path::{Path, PathBuf},
};

use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    reading::{DataType, Frequency, STATION_HEADER},
    table::RawTable,
};

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("could not access cache file `{path}`: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("could not serialise cache file `{path}`: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },
}

/// Identifies one cached result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheKey {
    pub station: u32,
    pub data_type: DataType,
    pub frequency: Frequency,
    pub year: i32,
}

impl CacheKey {
    pub fn file_stem(&self) -> String {
        format!(
            "station {} - {} - {} ({} - {})",
            self.station,
            self.data_type,
            self.frequency,
            self.year,
            self.year + 1
        )
    }
}

#[derive(Debug, Clone)]
pub struct Cache {
    folder: PathBuf,
}

impl Cache {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Cache {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    pub fn csv_path(&self, key: &CacheKey) -> PathBuf {
        self.folder.join(format!("{}.csv", key.file_stem()))
    }

    pub fn html_path(&self, key: &CacheKey) -> PathBuf {
        self.folder.join(format!("{}.html", key.file_stem()))
    }

    /// Looks for the CSV form first, then the HTML form. Files that cannot be
    /// parsed count as a miss.
    pub fn fetch_or_load(&self, key: &CacheKey) -> Option<RawTable> {
        let csv_path = self.csv_path(key);
        if csv_path.exists() {
            match read_csv(&csv_path) {
                Ok(table) => {
                    debug!(path = %csv_path.display(), "cache hit (csv)");
                    return Some(table);
                }
                Err(e) => warn!(path = %csv_path.display(), error = %e, "unreadable cache file"),
            }
        }

        let html_path = self.html_path(key);
        if html_path.exists() {
            match read_html(&html_path) {
                Ok(table) => {
                    debug!(path = %html_path.display(), "cache hit (html)");
                    return Some(table);
                }
                Err(e) => warn!(path = %html_path.display(), error = %e, "unreadable cache file"),
            }
        }

        None
    }

    /// Writes `table` as CSV. Empty tables are not cached, so `None` is
    /// returned for them.
    pub fn save(&self, key: &CacheKey, table: &RawTable) -> Result<Option<PathBuf>, CacheError> {
        if table.is_empty() {
            return Ok(None);
        }

        fs::create_dir_all(&self.folder).map_err(|source| CacheError::Io {
            path: self.folder.clone(),
            source,
        })?;

        let path = self.csv_path(key);
        let file = File::create(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        table.to_csv(file).map_err(|source| CacheError::Csv {
            path: path.clone(),
            source,
        })?;

        Ok(Some(path))
    }

    /// Deletes both cached forms of `key`, if present.
    pub fn remove(&self, key: &CacheKey) -> Result<(), CacheError> {
        for path in [self.csv_path(key), self.html_path(key)] {
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "removed cache file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(source) => return Err(CacheError::Io { path, source }),
            }
        }
        Ok(())
    }
}

fn read_csv(path: &Path) -> anyhow::Result<RawTable> {
    let table = RawTable::from_csv(File::open(path)?)?;
    if table.is_empty() {
        anyhow::bail!("no rows");
    }
    Ok(table)
}

fn read_html(path: &Path) -> anyhow::Result<RawTable> {
    let html = fs::read_to_string(path)?;
    let table = RawTable::from_html(&html, STATION_HEADER)?;
    if table.is_empty() {
        anyhow::bail!("no table with a `{}` column", STATION_HEADER);
    }
    Ok(table)
}

// -- Tests -------------------------------------------------------------------
