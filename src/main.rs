mod cache;
mod cli;
mod config;
mod costs;
mod db;
mod parquet;
mod prepare;
mod reading;
mod session;
mod table;
mod updater;

use anyhow::{Error, Result};
use clap::Parser;
use cli::{command, Cli, Commands};
use config::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Error> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    let result = match &cli.command {
        Commands::Stations { .. } => command::stations(&config, cli.credentials()).await,
        Commands::Update { stations, .. } => command::update(&config, cli.credentials(), stations).await,
        Commands::Export { .. } => command::export(&config),
        Commands::Costs { farm, .. } => command::costs(&config, farm),
    };

    match result {
        Ok(message) => println!("{}", message),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }

    Ok(())
}
