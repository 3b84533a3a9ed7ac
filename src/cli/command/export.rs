use anyhow::{bail, Context, Result};

use crate::{
    cli::create_spinner,
    config::Config,
    db::Store,
    parquet,
};

use super::make_parquet_file_name;

/// Writes the stored observations and stations of the configured data type to
/// dated parquet files in the export folder.
pub fn export(config: &Config) -> Result<String> {
    let data_type = config.update.data_type;
    let store_path = &config.store.path;
    if !store_path.exists() {
        bail!("no store at `{}`, run `cliflo update` first", store_path.display());
    }
    let store = Store::open(store_path).with_context(|| format!("opening store `{}`", store_path.display()))?;

    let bar = create_spinner(format!("Reading {} observations...", data_type));
    let rows = store.observations(data_type, None)?;
    let stations = store.stations(data_type)?;
    bar.finish_with_message(format!("{} observations read", rows.len()));

    if rows.is_empty() {
        bail!("no {} observations stored in `{}`", data_type, store_path.display());
    }

    std::fs::create_dir_all(&config.export.folder)
        .with_context(|| format!("creating `{}`", config.export.folder.display()))?;

    let observations_path = make_parquet_file_name(&config.export.folder, data_type, "observations");
    parquet::save_observations(data_type, &rows, &stations, &observations_path)?;

    let stations_path = make_parquet_file_name(&config.export.folder, data_type, "stations");
    parquet::save_stations(&stations, &stations_path)?;

    Ok(format!(
        "Files saved to `{}` and `{}`",
        observations_path.display(),
        stations_path.display()
    ))
}

// -- Tests -------------------------------------------------------------------
