//! colswap - re-provision a document collection with new collection properties.
//!
//! Reads `appsettings.json` (or the file given with `--settings`), applies
//! command-line overrides and runs the requested command against the local
//! store.

mod args;
mod commands;
mod error;
mod output;
mod settings;

use clap::Parser;
use colswap_core::SledStore;
use tracing::info;

use crate::args::{Args, Command};
use crate::error::{Error, Result};
use crate::settings::Settings;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "colswap=info,colswap_core=info".into()),
        )
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let mut settings = Settings::load(args.settings.as_deref())?;
    if let Some(path) = &args.data_path {
        settings.data_path = Some(path.clone());
    }

    match args.command {
        Command::Plan(flags) => {
            flags.apply(&mut settings);
            let plan = commands::plan(&settings.descriptor()?, &settings.migration_config())?;
            print!("{}", output::render_plan(&plan));
            Ok(())
        }
        Command::Migrate(flags) => {
            flags.apply(&mut settings);
            let descriptor = settings.descriptor()?;
            let config = settings.migration_config();
            let store = open_store(&settings)?;

            let outcome = commands::migrate(&store, &descriptor, &config).await;
            let (text, result) = commands::conclude_migration(outcome, store.flush());
            print!("{}", text);
            result
        }
        Command::Collections { database } => {
            let database = database
                .or_else(|| settings.collection_properties.database_name.clone())
                .ok_or_else(|| Error::Input("database name is not set".to_string()))?;
            let store = open_store(&settings)?;

            let summaries = commands::collections(&store, &database).await?;
            print!("{}", output::render_collections(&database, &summaries));
            Ok(())
        }
        Command::Import { file, target } => {
            target.apply(&mut settings);
            let descriptor = settings.descriptor()?;
            let json = std::fs::read_to_string(&file)?;
            let store = open_store(&settings)?;

            let count = commands::import(
                &store,
                descriptor.database_name(),
                descriptor.collection_name(),
                &json,
            )
            .await?;
            store.flush()?;
            println!("Imported {} documents into {}", count, descriptor.qualified_name());
            Ok(())
        }
    }
}

fn open_store(settings: &Settings) -> Result<SledStore> {
    let config = settings.store_config();
    info!(
        path = %config.path.display(),
        cache_capacity = config.cache_capacity,
        compression = config.compression,
        "opening store"
    );
    Ok(SledStore::open(config)?)
}
