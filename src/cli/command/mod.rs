pub mod costs;
pub mod export;
pub mod stations;
pub mod update;

use std::path::{Path, PathBuf};

use chrono::{Datelike, Local};
pub use costs::costs;
pub use export::export;
pub use stations::stations;
pub use update::update;

use crate::reading::DataType;

/// `<folder>/<data type>-<what>-YYYY-MM-DD.parquet`, dated today.
pub fn make_parquet_file_name(folder: &Path, data_type: DataType, what: &str) -> PathBuf {
    let today = Local::now();
    let file_name = format!(
        "{}-{}-{}-{:02}-{:02}.parquet",
        data_type,
        what,
        today.year(),
        today.month(),
        today.day()
    );

    folder.join(file_name)
}
