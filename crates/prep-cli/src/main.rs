mod cli;
mod config;
mod history;
mod items;
mod storage;

use crate::cli::{ConfigCommand, HistoryCommand};
use clap::Parser;
use color_eyre::Result;
use prep_core::storage::LocalStorage;
use prep_storage::EncryptedStore;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const HEALTH_PROBE_KEY: &str = "prep.health-probe";

/// Entry point wiring the CLI to the encrypted local store.
fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let loaded = config::load()?;
    let mut config = loaded.clone();
    config.legacy_key_seed =
        resolve_legacy_key_seed(&loaded, std::env::var("PREP_LEGACY_KEY_SEED").ok());
    match cli
        .command
        .unwrap_or(cli::Command::History(HistoryCommand::List))
    {
        cli::Command::Version => print_version(),
        cli::Command::Health => run_health_check(&config)?,
        cli::Command::Config(ConfigCommand::Init) => init_config(&loaded)?,
        cli::Command::History(cmd) => history::handle(cmd, &config)?,
        cli::Command::Audit => history::show_audit(&config)?,
        cli::Command::Item(cmd) => items::handle(cmd, &config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters, default to info. Logs go to stderr.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Config value wins over the environment; `None` falls back to the built-in seed.
fn resolve_legacy_key_seed(config: &config::Config, env_seed: Option<String>) -> Option<String> {
    config
        .legacy_key_seed
        .clone()
        .or(env_seed)
        .filter(|seed| !seed.is_empty())
}

fn print_version() {
    println!("prep {}", env!("CARGO_PKG_VERSION"));
}

/// Runs a quick health check of the encrypted storage path.
fn run_health_check(config: &config::Config) -> Result<()> {
    let store = storage::store_from_config(config)?;
    let fingerprint = run_store_health(&*store)?;
    println!("Storage: ok (client key {fingerprint})");
    Ok(())
}

/// Round-trips a probe through the store and returns the client key fingerprint.
fn run_store_health<S: LocalStorage + Clone>(store: &EncryptedStore<S>) -> Result<String> {
    let payload = serde_json::json!({ "status": "ok" });
    store.set_item(HEALTH_PROBE_KEY, &payload)?;
    let round_trip = store.get_item::<serde_json::Value>(HEALTH_PROBE_KEY);
    store.remove_item(HEALTH_PROBE_KEY)?;

    if round_trip.as_ref() != Some(&payload) {
        color_eyre::eyre::bail!("storage round-trip failed");
    }
    let key = store.key_manager().storage_key()?;
    info!(fingerprint = %key.fingerprint(), "storage health check passed");
    Ok(key.fingerprint())
}

fn init_config(config: &config::Config) -> Result<()> {
    let path = config::write_default_if_missing(config)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
