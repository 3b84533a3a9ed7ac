//! Save the station catalogue to a parquet file.

use std::{fs::File, path::Path, sync::Arc};

use anyhow::Result;
use arrow::{
    array::{ArrayRef, Float64Array, Int32Array, StringArray, UInt32Array},
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use parquet::{arrow::ArrowWriter, file::properties::WriterProperties};

use crate::cli::command::stations::Station;

pub fn save_stations(stations: &[Station], file_path: &Path) -> Result<()> {
    let file = File::create(file_path)?;

    let schema = Arc::new(Schema::new(vec![
        Field::new("station", DataType::UInt32, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("lat", DataType::Float64, true),
        Field::new("lon", DataType::Float64, true),
        Field::new("start_year", DataType::Int32, true),
        Field::new("end_year", DataType::Int32, true),
        Field::new("percent_complete", DataType::Float64, true),
    ]));

    let props = WriterProperties::builder()
        .set_compression(parquet::basic::Compression::SNAPPY)
        .build();

    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

    let columns: Vec<ArrayRef> = vec![
        Arc::new(UInt32Array::from_iter_values(stations.iter().map(|s| s.agent_number))),
        Arc::new(StringArray::from_iter_values(stations.iter().map(|s| s.name.as_str()))),
        Arc::new(Float64Array::from_iter(stations.iter().map(|s| s.latitude))),
        Arc::new(Float64Array::from_iter(stations.iter().map(|s| s.longitude))),
        Arc::new(Int32Array::from_iter(stations.iter().map(|s| s.start_year))),
        Arc::new(Int32Array::from_iter(stations.iter().map(|s| s.end_year))),
        Arc::new(Float64Array::from_iter(stations.iter().map(|s| s.percent_complete))),
    ];

    let batch = RecordBatch::try_new(schema, columns)?;

    writer.write(&batch)?;
    writer.close()?;

    Ok(())
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use arrow::array::Array;
    use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use tempfile::NamedTempFile;

    use super::*;

    #[test]
    fn should_keep_open_stations_null() {
        let temp_file = NamedTempFile::new().unwrap();
        let stations = vec![
            Station {
                agent_number: 5396,
                name: "Kelburn".to_string(),
                latitude: Some(-41.286),
                longitude: Some(174.767),
                start_year: Some(1927),
                end_year: None,
                percent_complete: Some(99.0),
            },
            Station {
                agent_number: 12,
                name: "Auckland Aero".to_string(),
                latitude: None,
                longitude: None,
                start_year: Some(1962),
                end_year: Some(2010),
                percent_complete: None,
            },
        ];

        save_stations(&stations, temp_file.path()).unwrap();

        let mut reader = ParquetRecordBatchReaderBuilder::try_new(File::open(temp_file.path()).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batch = reader.next().unwrap().unwrap();

        assert_eq!(batch.num_rows(), 2);
        let end_years = batch.column(5).as_any().downcast_ref::<Int32Array>().unwrap();
        assert!(end_years.is_null(0));
        assert_eq!(end_years.value(1), 2010);
    }
}
