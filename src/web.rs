#![cfg(not(tarpaulin_include))]

use clap::Parser;
use pvd_search::app;
use pvd_search::config::{AppConfig, CliArgs};

/// Main entry point for the web application
///
/// Reads the configuration (YAML file, `PVD_*` environment variables, then
/// flags), loads the workbook and serves the search pages.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CliArgs::parse();
    let config = AppConfig::from_args(&args)?;

    app::run(config).await
}
