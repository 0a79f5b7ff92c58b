#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the building survey ingest server.

use std::path::PathBuf;

use building_survey_server::config::ServerConfig;
use clap::Parser;

#[derive(Parser)]
#[command(
    name = "building_survey_server",
    about = "Building survey annotation ingest server"
)]
struct Cli {
    /// Address to bind (overrides `BIND_ADDR`)
    #[arg(long)]
    bind_addr: Option<String>,
    /// Port to bind (overrides `PORT`)
    #[arg(long)]
    port: Option<u16>,
    /// Directory served at `/` (overrides `STATIC_DIR`)
    #[arg(long)]
    static_dir: Option<PathBuf>,
    /// Bucket to store submissions in (overrides `SURVEY_BUCKET`)
    #[arg(long)]
    bucket: Option<String>,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    pretty_env_logger::init_custom_env("RUST_LOG");

    let cli = Cli::parse();

    let mut config = ServerConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {e}");
        std::io::Error::other(e)
    })?;

    if let Some(bind_addr) = cli.bind_addr {
        config.bind_addr = bind_addr;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(static_dir) = cli.static_dir {
        config.static_dir = static_dir;
    }
    if let Some(bucket) = cli.bucket {
        config.storage = config.storage.with_bucket(bucket);
    }

    building_survey_server::run_server(config).await
}
