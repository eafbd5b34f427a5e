//! Access to an externally provisioned PostgreSQL database.
//!
//! Suites needing a real database read its URL from
//! `LEDGER_TEST_DATABASE_URL`. When unset, tests print a skip marker and
//! return early unless `SKIP_TEST_CLUSTER` is falsy, in which case the
//! missing database fails the run so CI breakage is not masked.

use std::sync::OnceLock;

use marketplace::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};

const DATABASE_URL_VAR: &str = "LEDGER_TEST_DATABASE_URL";

static MIGRATED: OnceLock<Result<(), String>> = OnceLock::new();

/// Returns false only when `SKIP_TEST_CLUSTER` is explicitly "0", "false"
/// or "no" (case-insensitive).
fn skip_allowed() -> bool {
    std::env::var("SKIP_TEST_CLUSTER")
        .map(|value| !matches!(value.to_lowercase().as_str(), "0" | "false" | "no"))
        .unwrap_or(true)
}

/// Database URL for the current run, or `None` when the suite should skip.
pub fn database_url() -> Option<String> {
    match std::env::var(DATABASE_URL_VAR) {
        Ok(url) if !url.trim().is_empty() => Some(url),
        _ if skip_allowed() => {
            eprintln!("SKIP-TEST-CLUSTER: {DATABASE_URL_VAR} is not set");
            None
        }
        _ => panic!("{DATABASE_URL_VAR} is not set. Set SKIP_TEST_CLUSTER=1 to skip."),
    }
}

/// Migrate the database once per test binary and open a pool on it.
pub async fn migrated_pool(url: &str) -> DbPool {
    let migrated = MIGRATED.get_or_init(|| {
        run_pending_migrations(url)
            .map(|_| ())
            .map_err(|err| err.to_string())
    });
    if let Err(message) = migrated {
        panic!("migrations failed: {message}");
    }
    DbPool::new(PoolConfig::new(url).with_max_size(16))
        .await
        .expect("pool builds")
}

/// Email unique to this run, so suites can share one database.
pub fn unique_email(label: &str) -> String {
    format!("{label}-{}@x.com", uuid::Uuid::new_v4().simple())
}
