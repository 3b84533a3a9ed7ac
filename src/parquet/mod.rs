//! Handles serialising and saving data to disk in the _parquet_ file format.

pub mod observations;
pub mod stations;

pub use observations::save_observations;
pub use stations::save_stations;
