use std::io::Write;

use color_eyre::{eyre::WrapErr, Result};
use prep_core::{history::AuditLog, storage::LocalStorage};
use prep_history::LocalAuditLog;
use prep_storage::{EncryptedStore, Migration};
use serde_json::Value;

use crate::{cli::ItemCommand, config, storage};

/// Execute an item subcommand against the encrypted store.
pub fn handle(cmd: ItemCommand, config: &config::Config) -> Result<()> {
    let store = storage::store_from_config(config)?;
    let audit = LocalAuditLog::with_limit(store.clone(), config.audit_limit());
    run(cmd, &*store, &audit, &mut std::io::stdout())
}

fn run<S: LocalStorage + Clone>(
    cmd: ItemCommand,
    store: &EncryptedStore<S>,
    audit: &impl AuditLog,
    out: &mut impl Write,
) -> Result<()> {
    match cmd {
        ItemCommand::Get { name } => match store.get_item::<Value>(&name) {
            Some(value) => writeln!(out, "{}", serde_json::to_string_pretty(&value)?)?,
            None => writeln!(out, "No value stored under {name}.")?,
        },
        ItemCommand::Set { name, json } => {
            let value: Value = serde_json::from_str(&json).wrap_err("value must be valid JSON")?;
            store.set_item(&name, &value)?;
            writeln!(out, "Stored {name}.")?;
        }
        ItemCommand::Rm { name } => {
            store.remove_item(&name)?;
            writeln!(out, "Removed {name}.")?;
        }
        ItemCommand::Migrate { name } => {
            let outcome = store.migrate_item(&name)?;
            if let Migration::Upgraded(tier) = outcome {
                audit
                    .append("item.migrated", Some(format!("{name} from {tier:?}")))
                    .map_err(|e| color_eyre::eyre::eyre!(e.to_string()))?;
            }
            let message = match outcome {
                Migration::Missing => format!("No value stored under {name}."),
                Migration::Current => format!("{name} already uses the client key."),
                Migration::Upgraded(tier) => {
                    format!("Re-encrypted {name} under the client key (was {tier:?}).")
                }
                Migration::Unreadable => format!("{name} could not be read; left unchanged."),
            };
            writeln!(out, "{message}")?;
        }
    }
    Ok(())
}
