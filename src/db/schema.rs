//! Declared layout of every table the store writes, with creation and
//! validation against what is already on disk.

use super::{Store, StoreError};
use crate::reading::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Text,
    Integer,
    Real,
}

impl SqlType {
    fn as_str(&self) -> &'static str {
        match self {
            SqlType::Text => "TEXT",
            SqlType::Integer => "INTEGER",
            SqlType::Real => "REAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub sql_type: SqlType,
    pub not_null: bool,
}

impl Column {
    fn new(name: impl Into<String>, sql_type: SqlType, not_null: bool) -> Self {
        Column {
            name: name.into(),
            sql_type,
            not_null,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<Column>,
    pub primary_key: Vec<&'static str>,
    /// Non-unique indexes as (index name, column).
    pub indexes: Vec<(String, &'static str)>,
}

impl TableSchema {
    pub fn create_sql(&self) -> String {
        let mut parts: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                let null = if c.not_null { " NOT NULL" } else { "" };
                format!("\"{}\" {}{}", c.name, c.sql_type.as_str(), null)
            })
            .collect();
        if !self.primary_key.is_empty() {
            parts.push(format!("PRIMARY KEY ({})", self.primary_key.join(", ")));
        }

        format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" ({})",
            self.name,
            parts.join(", ")
        )
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Daily observations. `row_id` is indexed but not unique; duplicates are
/// kept out by filtering before each append.
pub fn observations(data_type: DataType) -> TableSchema {
    let mut columns = vec![
        Column::new("row_id", SqlType::Text, true),
        Column::new("day", SqlType::Integer, true),
        Column::new("year", SqlType::Integer, true),
        Column::new("month", SqlType::Integer, true),
        Column::new("station", SqlType::Integer, true),
    ];
    let values = data_type.value_columns();
    columns.extend(values.iter().map(|v| Column::new(*v, SqlType::Real, false)));
    columns.extend(
        values
            .iter()
            .map(|v| Column::new(format!("{}_estimated", v), SqlType::Integer, true)),
    );

    let name = data_type.observations_table();
    TableSchema {
        indexes: vec![
            (format!("{}_row_id", name), "row_id"),
            (format!("{}_station", name), "station"),
        ],
        name,
        columns,
        primary_key: vec![],
    }
}

/// The completion ledger: one `outcome` cell per station year.
pub fn completion(data_type: DataType) -> TableSchema {
    TableSchema {
        name: data_type.completion_table(),
        columns: vec![
            Column::new("station", SqlType::Integer, true),
            Column::new("year", SqlType::Integer, true),
            Column::new("outcome", SqlType::Text, true),
        ],
        primary_key: vec!["station", "year"],
        indexes: vec![],
    }
}

pub fn stations(data_type: DataType) -> TableSchema {
    TableSchema {
        name: data_type.stations_table(),
        columns: vec![
            Column::new("station", SqlType::Integer, true),
            Column::new("name", SqlType::Text, true),
            Column::new("lat", SqlType::Real, false),
            Column::new("long", SqlType::Real, false),
            Column::new("start_year", SqlType::Integer, false),
            Column::new("end_year", SqlType::Integer, false),
            Column::new("percent_complete", SqlType::Real, false),
        ],
        primary_key: vec!["station"],
        indexes: vec![],
    }
}

impl Store {
    /// Creates `schema` if it is missing, then checks the table on disk has
    /// the declared columns.
    pub fn migrate(&self, schema: &TableSchema) -> Result<(), StoreError> {
        self.conn.execute(&schema.create_sql(), [])?;
        for (index, column) in &schema.indexes {
            self.conn.execute(
                &format!(
                    "CREATE INDEX IF NOT EXISTS \"{}\" ON \"{}\" (\"{}\")",
                    index, schema.name, column
                ),
                [],
            )?;
        }

        self.validate(schema)
    }

    pub fn validate(&self, schema: &TableSchema) -> Result<(), StoreError> {
        self.require_table(&schema.name)?;

        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info(\"{}\")", schema.name))?;
        let found = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>("name")?, row.get::<_, String>("type")?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        for column in &schema.columns {
            match found.iter().find(|(name, _)| *name == column.name) {
                None => {
                    return Err(StoreError::SchemaMismatch {
                        table: schema.name.clone(),
                        reason: format!(
                            "missing column `{}`, expected {}",
                            column.name,
                            schema.column_names().join(", ")
                        ),
                    })
                }
                Some((_, sql_type)) if !sql_type.eq_ignore_ascii_case(column.sql_type.as_str()) => {
                    return Err(StoreError::SchemaMismatch {
                        table: schema.name.clone(),
                        reason: format!(
                            "column `{}` is {} instead of {}",
                            column.name,
                            sql_type,
                            column.sql_type.as_str()
                        ),
                    })
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// Migrates the observation, ledger and station tables of `data_type`.
    pub fn ensure_tables(&self, data_type: DataType) -> Result<(), StoreError> {
        self.migrate(&observations(data_type))?;
        self.migrate(&completion(data_type))?;
        self.migrate(&stations(data_type))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_declare_estimated_flags() {
        let schema = observations(DataType::Temps);

        assert_eq!(
            schema.column_names(),
            vec![
                "row_id",
                "day",
                "year",
                "month",
                "station",
                "tmax_c",
                "tmin_c",
                "tmax_c_estimated",
                "tmin_c_estimated"
            ]
        );
    }

    #[test]
    fn should_create_and_validate_tables() {
        let store = Store::open_in_memory().unwrap();
        store.ensure_tables(DataType::Rainfall).unwrap();

        assert!(store.table_exists("rainfall_observations").unwrap());
        assert!(store.table_exists("rainfall_completion").unwrap());
        assert!(store.table_exists("rainfall_stations").unwrap());

        // Running again is a no-op.
        store.ensure_tables(DataType::Rainfall).unwrap();
    }

    #[test]
    fn should_reject_table_with_wrong_columns() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn
            .execute("CREATE TABLE rainfall_completion (station TEXT, year TEXT)", [])
            .unwrap();

        let err = store.migrate(&completion(DataType::Rainfall)).unwrap_err();
        assert!(matches!(err, StoreError::SchemaMismatch { .. }));
    }
}
