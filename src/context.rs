//! # Punishments Context
//!
//! Explicitly constructed container for the entity stores, handed to command
//! handlers by the host instead of process-wide singletons.
//!
//! Bootstrapping opens the configured backend, preloads every punishment reason
//! and optionally starts a background task flushing both stores on a fixed
//! interval. [`PunishmentsContext::shutdown`] stops that task and performs a
//! final flush.

use crate::cache::{EntityStore, PlayerStore, ReasonStore};
use crate::config::{ConfigManager, StoreBackend};
use crate::database::DatabaseConnection;
use crate::error::Result;
use crate::logging::log_error;
use crate::models::{PunishmentPlayer, PunishmentReason};
use crate::store::{InMemoryCollection, PgDocumentCollection, SharedCollection};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared stores and configuration for one running plugin instance
pub struct PunishmentsContext {
    /// Instance ID, for correlating logs
    pub context_id: Uuid,

    config_manager: Arc<ConfigManager>,

    /// Present for the postgres backend only
    database: Option<DatabaseConnection>,

    players: Arc<PlayerStore>,

    reasons: Arc<ReasonStore>,

    shutdown_tx: broadcast::Sender<()>,

    flush_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for PunishmentsContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PunishmentsContext")
            .field("context_id", &self.context_id)
            .field("environment", &self.config_manager.environment())
            .field("database", &self.database)
            .field("players", &self.players.name())
            .field("reasons", &self.reasons.name())
            .field("flush_task", &self.flush_task.lock().is_some())
            .finish()
    }
}

impl PunishmentsContext {
    /// Create a context with environment-aware configuration loading
    pub async fn new() -> Result<Self> {
        let config_manager = ConfigManager::load()?;
        Self::bootstrap(config_manager).await
    }

    /// Open the configured backend and build the stores on top of it
    pub async fn bootstrap(config_manager: Arc<ConfigManager>) -> Result<Self> {
        let config = config_manager.config();
        info!(
            environment = %config_manager.environment(),
            backend = %config.store.backend,
            "🔧 Initializing PunishmentsContext"
        );

        match config.store.backend()? {
            StoreBackend::Postgres => {
                let database = DatabaseConnection::connect(&config.database).await?;
                let pool = database.pool().clone();

                let players = PgDocumentCollection::<PunishmentPlayer>::new(
                    pool.clone(),
                    &config.store.players_collection,
                )?;
                let reasons = PgDocumentCollection::<PunishmentReason>::new(
                    pool,
                    &config.store.reasons_collection,
                )?;

                if config.database.ensure_schema {
                    players.ensure_schema().await?;
                    reasons.ensure_schema().await?;
                    reasons
                        .ensure_collation(&config.store.reason_collation)
                        .await?;
                    info!("✅ Document tables and collation ensured");
                }

                Self::from_collections(
                    config_manager.clone(),
                    Arc::new(players),
                    Arc::new(reasons),
                    Some(database),
                )
                .await
            }
            StoreBackend::Memory => {
                warn!("Using the in-memory store backend; punishments will not survive a restart");
                let players = InMemoryCollection::<PunishmentPlayer>::new(
                    config.store.players_collection.clone(),
                );
                let reasons = InMemoryCollection::<PunishmentReason>::new(
                    config.store.reasons_collection.clone(),
                );
                Self::from_collections(
                    config_manager.clone(),
                    Arc::new(players),
                    Arc::new(reasons),
                    None,
                )
                .await
            }
        }
    }

    /// Build the stores over existing collections
    ///
    /// Runs the startup preload and starts the flush task as configured.
    pub async fn from_collections(
        config_manager: Arc<ConfigManager>,
        players: SharedCollection<PunishmentPlayer>,
        reasons: SharedCollection<PunishmentReason>,
        database: Option<DatabaseConnection>,
    ) -> Result<Self> {
        let config = config_manager.config();

        let players = Arc::new(PlayerStore::new(players));
        let reasons = Arc::new(ReasonStore::new(
            reasons,
            config.store.reason_collation.clone(),
        ));

        if config.cache.preload_reasons {
            reasons.load_all_into_cache().await?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);
        let flush_task = config.cache.flush_interval().map(|interval| {
            Self::spawn_flush_task(
                players.clone(),
                reasons.clone(),
                interval,
                shutdown_tx.subscribe(),
            )
        });

        let context = Self {
            context_id: Uuid::new_v4(),
            config_manager,
            database,
            players,
            reasons,
            shutdown_tx,
            flush_task: parking_lot::Mutex::new(flush_task),
        };

        info!(context_id = %context.context_id, "✅ PunishmentsContext ready");
        Ok(context)
    }

    fn spawn_flush_task(
        players: Arc<PlayerStore>,
        reasons: Arc<ReasonStore>,
        interval: Duration,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> JoinHandle<()> {
        info!(interval_seconds = interval.as_secs(), "Starting cache flush task");

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = flush_stores(&players, &reasons).await {
                            log_error("flush_task", "flush", &e.to_string(), None);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Cache flush task shutting down");
                        break;
                    }
                }
            }
        })
    }

    pub fn config_manager(&self) -> &Arc<ConfigManager> {
        &self.config_manager
    }

    pub fn players(&self) -> Arc<PlayerStore> {
        self.players.clone()
    }

    pub fn reasons(&self) -> Arc<ReasonStore> {
        self.reasons.clone()
    }

    pub fn database(&self) -> Option<&DatabaseConnection> {
        self.database.as_ref()
    }

    pub fn has_flush_task(&self) -> bool {
        self.flush_task.lock().is_some()
    }

    /// Flush both stores now
    pub async fn flush_all(&self) -> Result<()> {
        flush_stores(&self.players, &self.reasons).await
    }

    /// Stop the flush task, flush once more if configured and close the pool
    pub async fn shutdown(self) -> Result<()> {
        info!(context_id = %self.context_id, "Shutting down PunishmentsContext");

        let task = self.flush_task.lock().take();
        if let Some(task) = task {
            // the receiver may already be gone if the task panicked
            let _ = self.shutdown_tx.send(());
            if let Err(e) = task.await {
                warn!(error = %e, "Cache flush task ended abnormally");
            }
        }

        let result = if self.config_manager.config().cache.flush_on_shutdown {
            self.flush_all().await
        } else {
            Ok(())
        };

        if let Some(database) = self.database {
            database.close().await;
        }
        result
    }
}

/// Flush both stores; a failure in one does not skip the other
async fn flush_stores(players: &PlayerStore, reasons: &ReasonStore) -> Result<()> {
    let players_result = players.flush().await;
    let reasons_result = reasons.flush().await;

    match (players_result, reasons_result) {
        (Ok(()), Ok(())) => Ok(()),
        (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
        (Err(players_err), Err(reasons_err)) => {
            log_error("context", "flush", &reasons_err.to_string(), Some("reasons"));
            Err(players_err)
        }
    }
}
