//! # Shutterbase Binary
//!
//! Assembles the storage plugins into a `GalleryService` and runs one
//! maintenance command against the catalog.

use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use sb_db_json::JsonMetadataStore;
use sb_services::GalleryService;
use sb_storage_local::LocalBlobStore;

mod cli;
mod commands;

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let catalog = Arc::new(JsonMetadataStore::new(env_or(
        "SHUTTERBASE_DB",
        "./data/db.json",
    )));
    let blobs = Arc::new(LocalBlobStore::new(
        env_or("SHUTTERBASE_STORAGE_ROOT", "./data/images").into(),
        env_or("SHUTTERBASE_URL_PREFIX", "/static/images"),
    ));

    let service = GalleryService::new(catalog, blobs);
    commands::run_command(&service, cli.command).await
}
