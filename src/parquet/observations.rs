//! Save stored observations to a parquet file.

use std::{collections::HashMap, fs::File, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, BooleanBuilder, Date32Builder, Float64Builder, StringBuilder, UInt32Builder},
    datatypes::{DataType as ArrowType, Field, Schema},
    record_batch::RecordBatch,
};
use chrono::{Datelike, NaiveDate};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::{
    cli::{command::stations::Station, create_progress_bar},
    reading::{DataType, ObservationRow},
};

const CHUNK_SIZE: usize = 100_000;

struct Builders {
    row_id: StringBuilder,
    station: UInt32Builder,
    date: Date32Builder,
    values: Vec<Float64Builder>,
    estimated: Vec<BooleanBuilder>,
    lat: Float64Builder,
    lon: Float64Builder,
}

impl Builders {
    fn new(width: usize) -> Self {
        Builders {
            row_id: StringBuilder::with_capacity(CHUNK_SIZE, CHUNK_SIZE * 24),
            station: UInt32Builder::with_capacity(CHUNK_SIZE),
            date: Date32Builder::with_capacity(CHUNK_SIZE),
            values: (0..width).map(|_| Float64Builder::with_capacity(CHUNK_SIZE)).collect(),
            estimated: (0..width).map(|_| BooleanBuilder::with_capacity(CHUNK_SIZE)).collect(),
            lat: Float64Builder::with_capacity(CHUNK_SIZE),
            lon: Float64Builder::with_capacity(CHUNK_SIZE),
        }
    }

    fn finish(&mut self, schema: &Arc<Schema>) -> Result<RecordBatch> {
        let mut columns: Vec<ArrayRef> = vec![
            Arc::new(self.row_id.finish()),
            Arc::new(self.station.finish()),
            Arc::new(self.date.finish()),
        ];
        columns.extend(self.values.iter_mut().map(|b| Arc::new(b.finish()) as ArrayRef));
        columns.extend(self.estimated.iter_mut().map(|b| Arc::new(b.finish()) as ArrayRef));
        columns.push(Arc::new(self.lat.finish()));
        columns.push(Arc::new(self.lon.finish()));

        Ok(RecordBatch::try_new(schema.clone(), columns)?)
    }
}

pub fn observations_schema(data_type: DataType) -> Schema {
    let values = data_type.value_columns();
    let mut fields = vec![
        Field::new("row_id", ArrowType::Utf8, false),
        Field::new("station", ArrowType::UInt32, false),
        Field::new("date", ArrowType::Date32, false),
    ];
    fields.extend(values.iter().map(|v| Field::new(*v, ArrowType::Float64, true)));
    fields.extend(
        values
            .iter()
            .map(|v| Field::new(format!("{}_estimated", v), ArrowType::Boolean, false)),
    );
    fields.push(Field::new("lat", ArrowType::Float64, true));
    fields.push(Field::new("lon", ArrowType::Float64, true));

    Schema::new(fields)
}

/// Writes `rows` with the coordinates of their station. Returns the number of
/// rows written.
pub fn save_observations(
    data_type: DataType,
    rows: &[ObservationRow],
    stations: &[Station],
    file_path: &Path,
) -> Result<usize> {
    let schema = Arc::new(observations_schema(data_type));
    let width = data_type.value_columns().len();

    let coords: HashMap<u32, (Option<f64>, Option<f64>)> = stations
        .iter()
        .map(|s| (s.agent_number, (s.latitude, s.longitude)))
        .collect();

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::ZSTD(parquet::basic::ZstdLevel::default()))
        .set_dictionary_enabled(true)
        .build();

    let file = File::create(file_path)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;
    let pb = create_progress_bar(rows.len() as u64, "Writing parquet file".to_string());

    let epoch_offset = NaiveDate::from_ymd_opt(1970, 1, 1)
        .map(|d| d.num_days_from_ce())
        .unwrap_or(719_163);

    let mut builders = Builders::new(width);
    let mut batch_rows = 0;
    let mut written = 0;

    for row in rows {
        let Some(date) = row.date() else {
            continue;
        };
        let (lat, lon) = coords.get(&row.station).copied().unwrap_or((None, None));

        builders.row_id.append_value(&row.row_id);
        builders.station.append_value(row.station);
        builders.date.append_value(date.num_days_from_ce() - epoch_offset);
        for i in 0..width {
            builders.values[i].append_option(row.values.get(i).copied().flatten());
            builders.estimated[i].append_value(row.estimated.get(i).copied().unwrap_or(false));
        }
        builders.lat.append_option(lat);
        builders.lon.append_option(lon);

        batch_rows += 1;
        written += 1;
        if written % 10_000 == 0 {
            pb.set_position(written as u64);
        }

        if batch_rows >= CHUNK_SIZE {
            writer.write(&builders.finish(&schema)?)?;
            batch_rows = 0;
        }
    }

    if batch_rows > 0 {
        writer.write(&builders.finish(&schema)?)?;
    }

    pb.finish_with_message("Finished writing Parquet file");
    writer.close()?;

    Ok(written)
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use arrow::array::{Array, BooleanArray, Float64Array};
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::NamedTempFile;

    use super::*;

    fn row(day: u32, amount: Option<f64>) -> ObservationRow {
        ObservationRow::new(
            DataType::Rainfall,
            5396,
            NaiveDate::from_ymd_opt(2000, 1, day).unwrap(),
            vec![amount, Some(0.0)],
            vec![amount.is_none(), false],
        )
    }

    #[test]
    fn should_write_observations_with_coords() {
        let temp_file = NamedTempFile::new().unwrap();
        let stations = vec![Station {
            agent_number: 5396,
            name: "Kelburn".to_string(),
            latitude: Some(-41.286),
            longitude: Some(174.767),
            start_year: Some(1927),
            end_year: None,
            percent_complete: Some(99.0),
        }];

        let written = save_observations(
            DataType::Rainfall,
            &[row(1, Some(1.5)), row(2, None)],
            &stations,
            temp_file.path(),
        )
        .unwrap();
        assert_eq!(written, 2);

        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(temp_file.path()).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<RecordBatch> = reader.map(|b| b.unwrap()).collect();
        assert_eq!(batches.len(), 1);

        let batch = &batches[0];
        let schema = batch.schema();
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(
            names,
            vec![
                "row_id",
                "station",
                "date",
                "amount_mm",
                "deficit_mm",
                "amount_mm_estimated",
                "deficit_mm_estimated",
                "lat",
                "lon"
            ]
        );

        let amounts = batch.column(3).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(amounts.value(0), 1.5);
        assert!(amounts.is_null(1));

        let flags = batch.column(5).as_any().downcast_ref::<BooleanArray>().unwrap();
        assert!(!flags.value(0));
        assert!(flags.value(1));

        let lats = batch.column(7).as_any().downcast_ref::<Float64Array>().unwrap();
        assert_eq!(lats.value(1), -41.286);
    }
}
