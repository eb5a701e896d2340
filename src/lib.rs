#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::todo)]
#![warn(clippy::panic)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::print_stdout)]
#![warn(clippy::print_stderr)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(unreachable_pub)]
#![warn(missing_debug_implementations)]
#![warn(unused_qualifications)]
#![deny(unused_must_use)]

pub mod adapters;
pub mod api;
pub mod config;
pub mod domain;
pub mod error;
pub mod services;
pub mod telemetry;

use crate::adapters::database::{self, PgMessageStore};
use crate::adapters::storage::{MemoryMessageStore, MessageStore};
use crate::api::ServiceContainer;
use crate::config::Config;
use crate::services::delivery_service::DeliverySimulator;
use crate::services::health_service::HealthService;
use crate::services::message_service::MessageService;
use std::sync::Arc;
use tokio::sync::watch;

/// Fully wired application components.
#[derive(Debug)]
pub struct App {
    pub services: ServiceContainer,
    pub health_service: HealthService,
    pub simulator: DeliverySimulator,
}

#[derive(Debug)]
pub struct AppBuilder {
    config: Config,
    store: Option<Arc<dyn MessageStore>>,
}

impl AppBuilder {
    #[must_use]
    pub const fn new(config: Config) -> Self {
        Self { config, store: None }
    }

    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn MessageStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Wires services around the configured store, falling back to an in-memory store.
    #[must_use]
    pub fn build(self) -> App {
        let store = self.store.unwrap_or_else(|| Arc::new(MemoryMessageStore::new()));

        let simulator = DeliverySimulator::new(Arc::clone(&store), &self.config.simulation);
        let message_service = MessageService::new(Arc::clone(&store), simulator.clone());
        let health_service = HealthService::new(store, self.config.health);

        App { services: ServiceContainer { message_service }, health_service, simulator }
    }
}

/// Connects to Postgres and applies migrations when a database URL is configured,
/// otherwise returns an in-memory store.
///
/// # Errors
/// Returns an error if the database is unreachable or a migration fails.
pub async fn init_store(config: &Config) -> anyhow::Result<Arc<dyn MessageStore>> {
    match &config.database.url {
        Some(url) => {
            let pool = database::init_pool(url, &config.database).await?;
            database::run_migrations(&pool).await?;
            tracing::info!("Using Postgres message store");
            Ok(Arc::new(PgMessageStore::new(pool)))
        }
        None => {
            tracing::warn!("No database URL configured, messages are kept in memory");
            Ok(Arc::new(MemoryMessageStore::new()))
        }
    }
}

/// Flips the shutdown channel on SIGINT or SIGTERM.
pub fn spawn_signal_handler(shutdown_tx: watch::Sender<bool>) {
    tokio::spawn(async move {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut signal) => {
                    signal.recv().await;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            () = ctrl_c => {},
            () = terminate => {},
        }

        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(true);
    });
}

/// Routes panics through `tracing` so they reach the configured log sink.
pub fn setup_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info.location().map(ToString::to_string).unwrap_or_default();
        tracing::error!(panic = %info, location = %location, "Panic occurred");
    }));
}
