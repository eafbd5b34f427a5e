//! Composition root wiring the domain services to a ledger store.
//!
//! [`MarketplaceServices`] exposes only driving ports, so transports and
//! tests depend on use-cases rather than adapters.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::info;

use crate::config::LedgerSettings;
use crate::domain::ports::{
    CartCommand, CartQuery, CartRepository, CatalogCommand, CatalogQuery, ClassRepository,
    DashboardQuery, LedgerQueryRepository, SettlementCommand, SettlementLedger, UserRepository,
};
use crate::domain::{
    CartService, CatalogService, DashboardService, ServiceTimeouts, SettlementService,
};
use crate::outbound::memory::InMemoryLedgerStore;
use crate::outbound::persistence::{
    DbPool, DieselCartRepository, DieselClassRepository, DieselLedgerQueryRepository,
    DieselSettlementLedger, DieselUserRepository, MigrationError, PoolConfig, PoolError,
    run_pending_migrations,
};

/// Errors raised while assembling the services from settings.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
    #[error("migration task failed: {message}")]
    MigrationTask { message: String },
}

/// Driven adapters backing one set of services.
pub struct LedgerPorts<C, U, K, L, Q> {
    pub classes: Arc<C>,
    pub users: Arc<U>,
    pub carts: Arc<K>,
    pub ledger: Arc<L>,
    pub ledger_query: Arc<Q>,
}

/// Every driving port of the marketplace.
#[derive(Clone)]
pub struct MarketplaceServices {
    pub settlement: Arc<dyn SettlementCommand>,
    pub catalog: Arc<dyn CatalogCommand>,
    pub catalog_query: Arc<dyn CatalogQuery>,
    pub cart: Arc<dyn CartCommand>,
    pub cart_query: Arc<dyn CartQuery>,
    pub dashboard: Arc<dyn DashboardQuery>,
}

impl MarketplaceServices {
    /// Wire the services over arbitrary adapters.
    pub fn from_ports<C, U, K, L, Q>(
        ports: LedgerPorts<C, U, K, L, Q>,
        clock: Arc<dyn Clock>,
        timeouts: ServiceTimeouts,
    ) -> Self
    where
        C: ClassRepository + 'static,
        U: UserRepository + 'static,
        K: CartRepository + 'static,
        L: SettlementLedger + 'static,
        Q: LedgerQueryRepository + 'static,
    {
        let LedgerPorts {
            classes,
            users,
            carts,
            ledger,
            ledger_query,
        } = ports;
        let catalog = Arc::new(CatalogService::new(
            Arc::clone(&classes),
            Arc::clone(&clock),
            timeouts,
        ));
        let cart = Arc::new(CartService::new(
            Arc::clone(&classes),
            carts,
            Arc::clone(&clock),
            timeouts,
        ));
        Self {
            settlement: Arc::new(SettlementService::new(
                Arc::clone(&classes),
                ledger,
                clock,
                timeouts,
            )),
            catalog: catalog.clone(),
            catalog_query: catalog,
            cart: cart.clone(),
            cart_query: cart,
            dashboard: Arc::new(DashboardService::new(
                classes,
                users,
                ledger_query,
                timeouts,
            )),
        }
    }

    /// Wire the services over one in-process store.
    pub fn in_memory(
        store: Arc<InMemoryLedgerStore>,
        clock: Arc<dyn Clock>,
        timeouts: ServiceTimeouts,
    ) -> Self {
        Self::from_ports(
            LedgerPorts {
                classes: Arc::clone(&store),
                users: Arc::clone(&store),
                carts: Arc::clone(&store),
                ledger: Arc::clone(&store),
                ledger_query: store,
            },
            clock,
            timeouts,
        )
    }

    /// Wire the services over the Diesel adapters sharing `pool`.
    pub fn postgres(pool: &DbPool, clock: Arc<dyn Clock>, timeouts: ServiceTimeouts) -> Self {
        Self::from_ports(
            LedgerPorts {
                classes: Arc::new(DieselClassRepository::new(pool.clone())),
                users: Arc::new(DieselUserRepository::new(pool.clone())),
                carts: Arc::new(DieselCartRepository::new(pool.clone())),
                ledger: Arc::new(DieselSettlementLedger::new(pool.clone())),
                ledger_query: Arc::new(DieselLedgerQueryRepository::new(pool.clone())),
            },
            clock,
            timeouts,
        )
    }

    /// Build the services described by `settings`.
    ///
    /// Uses PostgreSQL when a database URL is configured, applying pending
    /// migrations first if requested, and the in-process store otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`StartupError`] when the pool cannot be built or a migration
    /// fails.
    pub async fn from_settings(settings: &LedgerSettings) -> Result<Self, StartupError> {
        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let timeouts = ServiceTimeouts::new(settings.storage_timeout());

        let Some(database_url) = settings.database_url() else {
            info!("no database configured; using the in-memory ledger store");
            return Ok(Self::in_memory(
                Arc::new(InMemoryLedgerStore::new()),
                clock,
                timeouts,
            ));
        };

        if settings.run_migrations {
            let url = database_url.to_owned();
            tokio::task::spawn_blocking(move || run_pending_migrations(&url))
                .await
                .map_err(|err| StartupError::MigrationTask {
                    message: err.to_string(),
                })??;
        }

        let pool = DbPool::new(PoolConfig::from_settings(settings)?).await?;
        info!(
            storage_timeout = ?timeouts.storage(),
            "postgres ledger store ready"
        );
        Ok(Self::postgres(&pool, clock, timeouts))
    }
}
