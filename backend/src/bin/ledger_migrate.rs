//! Apply pending ledger migrations to the configured PostgreSQL database.
//!
//! # Examples
//! ```sh
//! LEDGER_DATABASE_URL=postgres://localhost/ledger \
//!     cargo run --manifest-path backend/Cargo.toml --bin ledger-migrate
//! ```
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::ffi::OsString;

use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use marketplace::config::LedgerSettings;
use marketplace::outbound::persistence::run_pending_migrations;
use marketplace::telemetry::init_tracing;
use ortho_config::OrthoConfig;
use tokio::runtime::Builder;
use tracing::info;

/// `ledger-migrate` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "ledger-migrate",
    about = "Apply pending marketplace ledger migrations",
    version
)]
struct CliArgs {
    /// Database connection URL. Falls back to `LEDGER_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url")]
    database_url: Option<String>,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();
    let args = CliArgs::parse();

    let database_url = match args.database_url {
        Some(url) => url,
        None => {
            let settings = LedgerSettings::load_from_iter([OsString::from("ledger-migrate")])
                .map_err(|err| eyre!("failed to load ledger settings: {err}"))?;
            settings
                .database_url()
                .map(str::to_owned)
                .ok_or_else(|| eyre!("no database URL: pass --database-url or set LEDGER_DATABASE_URL"))?
        }
    };

    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to create Tokio runtime")?;
    let applied = runtime
        .block_on(tokio::task::spawn_blocking(move || {
            run_pending_migrations(&database_url)
        }))
        .wrap_err("migration task panicked")??;

    info!(count = applied.len(), "ledger schema is up to date");
    Ok(())
}
