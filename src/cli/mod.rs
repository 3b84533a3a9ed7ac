//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    config::Config,
    reading::DataType,
    session::cliflo::Credentials,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    /// Configuration file. Defaults to `~/.cliflo.toml` when present.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// CliFlo user name
    #[arg(long, global = true, env = "CLIFLO_USER")]
    pub user: Option<String>,

    /// CliFlo password
    #[arg(long, global = true, env = "CLIFLO_PW", hide_env_values = true)]
    pub password: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get, filter and save the station list
    Stations {
        #[command(flatten)]
        run: RunArgs,

        /// Read the station list from this CSV instead of CliFlo
        #[arg(long)]
        file: Option<PathBuf>,

        /// Lowest completeness percentage kept
        #[arg(long)]
        min_percent_complete: Option<f64>,
    },
    /// Fetch the years each station is missing
    Update {
        #[command(flatten)]
        run: RunArgs,

        /// Ignore the ledger and fetch every year again
        #[arg(long)]
        refresh: bool,

        /// Only update these stations
        #[arg(long = "station")]
        stations: Vec<u32>,
    },
    /// Save stored observations and stations as parquet files
    Export {
        #[arg(long, value_enum)]
        data_type: Option<DataType>,

        /// Folder the files are written to
        #[arg(long)]
        folder: Option<PathBuf>,
    },
    /// Estimate infrastructure costs for a farm
    Costs {
        /// Farm description (TOML)
        farm: PathBuf,

        /// Pricing table (CSV)
        #[arg(long)]
        pricing: Option<PathBuf>,
    },
}

/// Overrides shared by the commands that talk to CliFlo.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    #[arg(long, value_enum)]
    pub data_type: Option<DataType>,

    /// First year fetched
    #[arg(long)]
    pub start_year: Option<i32>,

    /// First year not fetched
    #[arg(long)]
    pub end_year: Option<i32>,

    /// Fetch into the cache folder only and leave the store alone
    #[arg(long)]
    pub csv_only: bool,
}

impl RunArgs {
    pub fn apply(&self, config: &mut Config) {
        if let Some(data_type) = self.data_type {
            config.update.data_type = data_type;
        }
        if let Some(year) = self.start_year {
            config.update.start_year = year;
        }
        if let Some(year) = self.end_year {
            config.update.end_year = year;
        }
        if self.csv_only {
            config.update.csv_only = true;
        }
    }
}

impl Cli {
    pub fn credentials(&self) -> Option<Credentials> {
        match (&self.user, &self.password) {
            (Some(username), Some(password)) => Some(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => None,
        }
    }

    /// Applies the command's flags on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        match &self.command {
            Commands::Stations {
                run,
                file,
                min_percent_complete,
            } => {
                run.apply(config);
                if file.is_some() {
                    config.stations.file.clone_from(file);
                }
                if let Some(percent) = min_percent_complete {
                    config.stations.min_percent_complete = *percent;
                }
            }
            Commands::Update { run, refresh, .. } => {
                run.apply(config);
                if *refresh {
                    config.update.refresh = true;
                }
            }
            Commands::Export { data_type, folder } => {
                if let Some(data_type) = data_type {
                    config.update.data_type = *data_type;
                }
                if let Some(folder) = folder {
                    config.export.folder.clone_from(folder);
                }
            }
            Commands::Costs { pricing, .. } => {
                if let Some(pricing) = pricing {
                    config.costs.pricing.clone_from(pricing);
                }
            }
        }
    }
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

/// Creates a progress bar.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

    ProgressBar::new(size).with_message(message).with_style(style)
}

// -- Tests -------------------------------------------------------------------
