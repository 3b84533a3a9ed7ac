use rusqlite::params;

use super::{Store, StoreError};
use crate::{cli::command::stations::Station, reading::DataType};

impl Store {
    /// Inserts new stations and refreshes the metadata of known ones.
    pub fn upsert_stations(&mut self, data_type: DataType, stations: &[Station]) -> Result<usize, StoreError> {
        let table = data_type.stations_table();
        self.require_table(&table)?;

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{}\" (station, name, lat, long, start_year, end_year, percent_complete)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (station) DO UPDATE SET
                    name = excluded.name,
                    lat = excluded.lat,
                    long = excluded.long,
                    start_year = excluded.start_year,
                    end_year = excluded.end_year,
                    percent_complete = excluded.percent_complete",
                table
            ))?;
            for s in stations {
                stmt.execute(params![
                    s.agent_number,
                    s.name,
                    s.latitude,
                    s.longitude,
                    s.start_year,
                    s.end_year,
                    s.percent_complete
                ])?;
            }
        }
        tx.commit()?;

        Ok(stations.len())
    }

    pub fn stations(&self, data_type: DataType) -> Result<Vec<Station>, StoreError> {
        let table = data_type.stations_table();
        if !self.table_exists(&table)? {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT station, name, lat, long, start_year, end_year, percent_complete
             FROM \"{}\" ORDER BY station",
            table
        ))?;
        let stations = stmt
            .query_map([], |row| {
                Ok(Station {
                    agent_number: row.get(0)?,
                    name: row.get(1)?,
                    latitude: row.get(2)?,
                    longitude: row.get(3)?,
                    start_year: row.get(4)?,
                    end_year: row.get(5)?,
                    percent_complete: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(stations)
    }
}
