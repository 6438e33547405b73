use anyhow::Context;
use clap::{Parser, Subcommand};
use slotd_db::storage::sqlite::{SqliteLedger, SqliteOptions};

use crate::commands::CreateLicenseParams;

mod commands;

/// Operator tooling for a slotd database.
#[derive(Parser)]
#[command(name = "slotctl", version)]
pub struct Args {
    #[clap(subcommand)]
    command: Command,

    #[clap(
        short = 'D',
        long,
        env = "SLOTD_DATABASE_PATH",
        default_value = "./data/slotd.db"
    )]
    database_path: String,
}

#[derive(Clone, Subcommand)]
pub enum Command {
    /// Manage license records.
    #[command(subcommand)]
    License(LicenseCommand),

    /// Show slot usage of the active license.
    Status,

    /// List admitted devices.
    Devices,
}

#[derive(Clone, Subcommand)]
pub enum LicenseCommand {
    /// Provision a new license record.
    Create(CreateLicenseParams),

    /// List every license record, newest first.
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let stg = SqliteLedger::open(&args.database_path, SqliteOptions::default())
        .await
        .with_context(|| format!("failed to open database at {}", args.database_path))?;

    let mut out = std::io::stdout().lock();

    match args.command {
        Command::License(LicenseCommand::Create(params)) => {
            commands::create_license(&stg, params, &mut out).await
        }
        Command::License(LicenseCommand::List) => commands::list_licenses(&stg, &mut out).await,
        Command::Status => commands::show_status(&stg, &mut out).await,
        Command::Devices => commands::list_devices(&stg, &mut out).await,
    }
}
