use clap::{Args, Parser, Subcommand};

/// CLI surface definition.
#[derive(Parser, Debug)]
#[command(
    name = "prep",
    about = "Encrypted local history for interview practice sessions",
    version,
    propagate_version = true
)]
pub struct Cli {
    /// Optional subcommand; defaults to listing session history when absent.
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print version and exit.
    Version,
    /// Round-trip a probe value through the encrypted store.
    Health,
    /// Manage CLI configuration.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Inspect or change local session history.
    #[command(subcommand)]
    History(HistoryCommand),
    /// Show the audit log.
    Audit,
    /// Work with raw entries of the encrypted store.
    #[command(subcommand)]
    Item(ItemCommand),
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigCommand {
    /// Create a default config file if one does not exist.
    Init,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum HistoryCommand {
    /// List sessions, newest first.
    List,
    /// Record a completed session.
    Add(AddSession),
    /// Delete all local history.
    Clear,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct AddSession {
    /// Role practiced for.
    #[arg(required = true, num_args = 1..)]
    pub role: Vec<String>,
    #[arg(long)]
    pub company: Option<String>,
    /// Overall score (0-100).
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=100))]
    pub score: Option<u8>,
    #[arg(long)]
    pub summary: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ItemCommand {
    /// Print the decrypted JSON stored under a name.
    Get { name: String },
    /// Encrypt and store a JSON value under a name.
    Set { name: String, json: String },
    /// Remove an entry.
    Rm { name: String },
    /// Re-encrypt a legacy or plaintext entry under the client key.
    Migrate { name: String },
}
