//! Fetch missing station years into the cache and the store.

use anyhow::{anyhow, bail, Context, Result};
use tracing::{info, warn};

use crate::{
    cache::Cache,
    cli::{create_progress_bar, create_spinner},
    config::Config,
    db::Store,
    session::{cliflo::Credentials, CliFloSession, Session},
    updater::{UpdateOptions, Updater},
};

use super::stations::{read_station_file, station_list_path, StationFilter};

pub fn update_options(config: &Config) -> UpdateOptions {
    UpdateOptions {
        data_type: config.update.data_type,
        frequency: config.update.frequency,
        start_year: config.update.start_year,
        end_year: config.update.end_year,
        csv_only: config.update.csv_only,
        refresh: config.update.refresh,
    }
}

pub async fn update(config: &Config, credentials: Option<Credentials>, only: &[u32]) -> Result<String> {
    let options = update_options(config);
    let mut store = if options.csv_only {
        None
    } else {
        Some(
            Store::open(&config.store.path)
                .with_context(|| format!("opening store `{}`", config.store.path.display()))?,
        )
    };

    let stations = station_ids(config, store.as_ref(), only)?;
    if stations.is_empty() {
        bail!("no stations to update, run `cliflo stations` first");
    }
    info!(stations = stations.len(), "stations to update");

    let credentials =
        credentials.ok_or_else(|| anyhow!("CLIFLO_USER and CLIFLO_PW are required to update"))?;
    let cache = Cache::new(&config.cache.folder);
    info!(folder = %cache.folder().display(), "using cache");

    let bar = create_spinner("Logging in to CliFlo...".to_string());
    let mut session = CliFloSession::login(&config.session, &credentials).await?;
    bar.finish_with_message("Logged in");

    let progress = create_progress_bar(stations.len() as u64, "Updating stations".to_string());
    let result = Updater::new(&mut session, store.as_mut(), &cache, options)
        .with_progress(progress.clone())
        .run(&stations)
        .await;
    progress.finish_with_message("Update finished");

    if let Err(e) = session.logout().await {
        warn!(error = %e, "logout failed");
    }

    Ok(result?.to_string())
}

/// Stations given on the command line, else the configured station file,
/// else the stations saved in the store, else the list saved by the
/// `stations` command.
fn station_ids(config: &Config, store: Option<&Store>, only: &[u32]) -> Result<Vec<u32>> {
    if !only.is_empty() {
        return Ok(only.to_vec());
    }

    let filter = StationFilter::from_config(config);
    if let Some(path) = &config.stations.file {
        let stations = filter.apply(read_station_file(path)?);
        return Ok(stations.iter().map(|s| s.agent_number).collect());
    }

    if let Some(store) = store {
        let stored = store.stations(config.update.data_type)?;
        if !stored.is_empty() {
            return Ok(filter.apply(stored).iter().map(|s| s.agent_number).collect());
        }
    }

    let path = station_list_path(config);
    if path.exists() {
        let stations = filter.apply(read_station_file(&path)?);
        return Ok(stations.iter().map(|s| s.agent_number).collect());
    }

    Ok(Vec::new())
}

// -- Tests -------------------------------------------------------------------
