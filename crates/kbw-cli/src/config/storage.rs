//! Storage backend selection.

use anyhow::bail;
use clap::Args;
use kbw_postgres::PgConfig;
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Chooses between PostgreSQL and in-process storage.
///
/// PostgreSQL settings come from `kbw-postgres` and are only parsed when one
/// of them is given.
#[derive(Debug, Clone, Default, Args, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Keep all data in process memory. Data is lost on restart.
    #[arg(long, env = "MEMORY_STORE")]
    #[serde(default)]
    pub memory_store: bool,

    /// PostgreSQL connection and pool settings.
    #[clap(flatten)]
    pub postgres: Option<PgConfig>,
}

impl StorageConfig {
    /// Fails when no backend is configured.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.memory_store && self.postgres.is_none() {
            bail!("either --postgres-url or --memory-store is required");
        }

        if let (false, Some(postgres)) = (self.memory_store, &self.postgres) {
            postgres.validate()?;
        }

        Ok(())
    }

    /// Logs storage configuration at info level.
    pub fn log(&self) {
        match (&self.postgres, self.memory_store) {
            (_, true) => {
                tracing::info!(target: TRACING_TARGET_CONFIG, backend = "memory", "Storage configuration");
            }
            (Some(postgres), false) => {
                tracing::info!(
                    target: TRACING_TARGET_CONFIG,
                    backend = "postgres",
                    max_connections = postgres.postgres_max_connections,
                    connection_timeout_secs = ?postgres.postgres_connection_timeout_secs,
                    idle_timeout_secs = ?postgres.postgres_idle_timeout_secs,
                    "Storage configuration"
                );
            }
            (None, false) => {}
        }
    }
}
