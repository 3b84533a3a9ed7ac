//! Append-only observation tables.

use std::collections::{HashMap, HashSet};

use rusqlite::{params_from_iter, types::Value, Row};

use super::{Store, StoreError};
use crate::reading::{DataType, ObservationRow};

/// Rows whose id is not already stored. Repeated ids inside `rows` collapse to
/// the last occurrence, keeping the position of the first.
pub fn dedupe_against_store(
    rows: Vec<ObservationRow>,
    existing: &HashSet<String>,
) -> Vec<ObservationRow> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut fresh: Vec<ObservationRow> = Vec::new();

    for row in rows {
        if existing.contains(&row.row_id) {
            continue;
        }
        match slots.get(&row.row_id) {
            Some(&slot) => fresh[slot] = row,
            None => {
                slots.insert(row.row_id.clone(), fresh.len());
                fresh.push(row);
            }
        }
    }

    fresh
}

impl Store {
    /// Stored row ids for `station`. Empty when the table does not exist yet.
    pub fn existing_row_ids(
        &self,
        data_type: DataType,
        station: u32,
    ) -> Result<HashSet<String>, StoreError> {
        if !self.table_exists(&data_type.observations_table())? {
            return Ok(HashSet::new());
        }

        let mut stmt = self.conn.prepare(&format!(
            "SELECT row_id FROM \"{}\" WHERE station = ?1",
            data_type.observations_table()
        ))?;
        let ids = stmt
            .query_map([station], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(ids)
    }

    /// Inserts `rows` in one transaction and returns how many were written.
    pub fn append(&mut self, data_type: DataType, rows: &[ObservationRow]) -> Result<usize, StoreError> {
        let table = data_type.observations_table();
        self.require_table(&table)?;

        let values = data_type.value_columns();
        let mut columns: Vec<String> = ["row_id", "day", "year", "month", "station"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        columns.extend(values.iter().map(|v| v.to_string()));
        columns.extend(values.iter().map(|v| format!("{}_estimated", v)));

        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO \"{}\" ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in rows {
                let mut bound: Vec<Value> = vec![
                    Value::Text(row.row_id.clone()),
                    Value::Integer(row.day.into()),
                    Value::Integer(row.year.into()),
                    Value::Integer(row.month.into()),
                    Value::Integer(row.station.into()),
                ];
                bound.extend(
                    (0..values.len()).map(|i| row.values.get(i).copied().flatten().map_or(Value::Null, Value::Real)),
                );
                bound.extend(
                    (0..values.len()).map(|i| Value::Integer(row.estimated.get(i).copied().unwrap_or(false).into())),
                );
                stmt.execute(params_from_iter(bound))?;
            }
        }
        tx.commit()?;

        Ok(rows.len())
    }

    /// Stored rows, optionally for one station, in date order.
    pub fn observations(
        &self,
        data_type: DataType,
        station: Option<u32>,
    ) -> Result<Vec<ObservationRow>, StoreError> {
        let table = data_type.observations_table();
        if !self.table_exists(&table)? {
            return Ok(Vec::new());
        }

        let values = data_type.value_columns();
        let estimated: Vec<String> = values.iter().map(|v| format!("{}_estimated", v)).collect();
        let filter = if station.is_some() { "WHERE station = ?1" } else { "" };
        let sql = format!(
            "SELECT row_id, station, year, month, day, {}, {} FROM \"{}\" {} ORDER BY station, year, month, day",
            values.join(", "),
            estimated.join(", "),
            table,
            filter
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let width = values.len();
        let rows = match station {
            Some(station) => stmt
                .query_map([station], |row| read_row(row, width))?
                .collect::<Result<Vec<_>, _>>()?,
            None => stmt
                .query_map([], |row| read_row(row, width))?
                .collect::<Result<Vec<_>, _>>()?,
        };

        Ok(rows)
    }

    /// Share of stored days whose `column` was estimated, or `None` when the
    /// station has no rows.
    pub fn estimated_share(
        &self,
        data_type: DataType,
        station: u32,
        column: &str,
    ) -> Result<Option<f64>, StoreError> {
        let table = data_type.observations_table();
        if !self.table_exists(&table)? {
            return Ok(None);
        }

        let (total, estimated): (i64, Option<i64>) = self.conn.query_row(
            &format!(
                "SELECT COUNT(*), SUM(\"{}_estimated\") FROM \"{}\" WHERE station = ?1",
                column, table
            ),
            [station],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        if total == 0 {
            return Ok(None);
        }
        Ok(Some(estimated.unwrap_or(0) as f64 / total as f64))
    }
}

fn read_row(row: &Row, width: usize) -> rusqlite::Result<ObservationRow> {
    let base = 5;
    Ok(ObservationRow {
        row_id: row.get(0)?,
        station: row.get(1)?,
        year: row.get(2)?,
        month: row.get(3)?,
        day: row.get(4)?,
        values: (0..width)
            .map(|i| row.get::<_, Option<f64>>(base + i))
            .collect::<rusqlite::Result<_>>()?,
        estimated: (0..width)
            .map(|i| row.get::<_, i64>(base + width + i).map(|flag| flag != 0))
            .collect::<rusqlite::Result<_>>()?,
    })
}
