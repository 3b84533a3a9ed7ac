//! Per station year completion ledger.

use std::collections::{BTreeMap, BTreeSet};

use rusqlite::params;

use super::{Store, StoreError};
use crate::{prepare::Outcome, reading::DataType};

impl Store {
    /// Years in `[start_year, end_year)` without a ledger entry for `station`.
    ///
    /// Reading never creates the ledger table: when it is missing the whole
    /// range is returned.
    pub fn years_needed(
        &self,
        data_type: DataType,
        station: u32,
        start_year: i32,
        end_year: i32,
    ) -> Result<BTreeSet<i32>, StoreError> {
        let mut needed: BTreeSet<i32> = (start_year..end_year).collect();
        if !self.table_exists(&data_type.completion_table())? {
            return Ok(needed);
        }

        for year in self.ledger(data_type, station)?.keys() {
            needed.remove(year);
        }

        Ok(needed)
    }

    /// Every classified year of `station`.
    pub fn ledger(&self, data_type: DataType, station: u32) -> Result<BTreeMap<i32, Outcome>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT year, outcome FROM \"{}\" WHERE station = ?1",
            data_type.completion_table()
        ))?;
        let cells = stmt
            .query_map([station], |row| Ok((row.get::<_, i32>(0)?, row.get::<_, String>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        cells
            .into_iter()
            .map(|(year, value)| match value.parse::<Outcome>() {
                Ok(outcome) => Ok((year, outcome)),
                Err(_) => Err(StoreError::BadOutcome {
                    station,
                    year,
                    value,
                }),
            })
            .collect()
    }

    /// Writes or overwrites the cell for (`station`, `year`).
    pub fn record_outcome(
        &self,
        data_type: DataType,
        station: u32,
        year: i32,
        outcome: Outcome,
    ) -> Result<(), StoreError> {
        self.require_table(&data_type.completion_table())?;
        self.conn.execute(
            &format!(
                "INSERT INTO \"{}\" (station, year, outcome) VALUES (?1, ?2, ?3)
                 ON CONFLICT (station, year) DO UPDATE SET outcome = excluded.outcome",
                data_type.completion_table()
            ),
            params![station, year, outcome.to_string()],
        )?;

        Ok(())
    }

    /// Clears the cell so the year is fetched again on the next run.
    pub fn mark_absent(&self, data_type: DataType, station: u32, year: i32) -> Result<(), StoreError> {
        if !self.table_exists(&data_type.completion_table())? {
            return Ok(());
        }
        self.conn.execute(
            &format!(
                "DELETE FROM \"{}\" WHERE station = ?1 AND year = ?2",
                data_type.completion_table()
            ),
            params![station, year],
        )?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db::schema;

    fn store() -> Store {
        let store = Store::open_in_memory().unwrap();
        store.migrate(&schema::completion(DataType::Rainfall)).unwrap();
        store
    }

    #[test]
    fn should_return_full_range_without_creating_ledger() {
        let store = Store::open_in_memory().unwrap();

        let needed = store.years_needed(DataType::Rainfall, 5396, 2000, 2003).unwrap();

        assert_eq!(needed, BTreeSet::from([2000, 2001, 2002]));
        assert!(!store.table_exists("rainfall_completion").unwrap());
    }

    #[test]
    fn should_exclude_classified_years() {
        let store = store();
        store.record_outcome(DataType::Rainfall, 5396, 2000, Outcome::Estimated(0.0)).unwrap();
        store.record_outcome(DataType::Rainfall, 5396, 2001, Outcome::Empty).unwrap();
        store.record_outcome(DataType::Rainfall, 7000, 2002, Outcome::Empty).unwrap();

        let needed = store.years_needed(DataType::Rainfall, 5396, 2000, 2003).unwrap();

        assert_eq!(needed, BTreeSet::from([2002]));
    }

    #[test]
    fn should_overwrite_cell() {
        let store = store();
        store.record_outcome(DataType::Rainfall, 5396, 2000, Outcome::Empty).unwrap();
        store.record_outcome(DataType::Rainfall, 5396, 2000, Outcome::Estimated(0.5)).unwrap();

        let ledger = store.ledger(DataType::Rainfall, 5396).unwrap();
        assert_eq!(ledger, BTreeMap::from([(2000, Outcome::Estimated(0.5))]));
    }

    #[test]
    fn should_retry_year_marked_absent() {
        let store = store();
        store.record_outcome(DataType::Rainfall, 5396, 2000, Outcome::Empty).unwrap();
        store.mark_absent(DataType::Rainfall, 5396, 2000).unwrap();

        let needed = store.years_needed(DataType::Rainfall, 5396, 2000, 2001).unwrap();
        assert_eq!(needed, BTreeSet::from([2000]));
    }

    #[test]
    fn should_refuse_write_before_migration() {
        let store = Store::open_in_memory().unwrap();

        let err = store
            .record_outcome(DataType::Rainfall, 5396, 2000, Outcome::Empty)
            .unwrap_err();
        assert!(matches!(err, StoreError::MissingTable(_)));
    }
}
