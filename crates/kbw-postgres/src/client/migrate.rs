//! Embedded migration runner.

use std::time::{Duration, Instant};

use diesel_async::async_connection_wrapper::AsyncConnectionWrapper;
use diesel_migrations::MigrationHarness;
use tokio::task::spawn_blocking;

use crate::{MIGRATIONS, PgClient, PgError, PgResult, TRACING_TARGET_MIGRATION};

/// Outcome of a migration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationResult {
    /// Time spent applying migrations.
    pub duration: Duration,
    /// Versions applied during this run, in order.
    pub applied_versions: Vec<String>,
}

/// Extension trait providing migration functionality for [`PgClient`].
pub trait PgClientExt {
    /// Applies every pending embedded migration. Safe to call repeatedly.
    fn run_pending_migrations(&self) -> impl Future<Output = PgResult<MigrationResult>> + Send;
}

impl PgClientExt for PgClient {
    #[tracing::instrument(skip(self), target = TRACING_TARGET_MIGRATION)]
    async fn run_pending_migrations(&self) -> PgResult<MigrationResult> {
        tracing::info!(target: TRACING_TARGET_MIGRATION, "Starting database migration process");

        let start_time = Instant::now();
        let conn = self.get_connection().await?;
        let mut conn: AsyncConnectionWrapper<_> = conn.into();

        let versions = spawn_blocking(move || {
            conn.run_pending_migrations(MIGRATIONS)
                .map(|versions| versions.into_iter().map(|v| v.to_string()).collect::<Vec<_>>())
        })
        .await
        .map_err(|err| {
            tracing::error!(target: TRACING_TARGET_MIGRATION, error = %err, "Migration task panicked");
            PgError::Migration(err.into())
        })?
        .map_err(|err| {
            tracing::error!(target: TRACING_TARGET_MIGRATION, error = %err, "Database migration process failed");
            PgError::Migration(err)
        })?;

        let duration = start_time.elapsed();
        tracing::info!(
            target: TRACING_TARGET_MIGRATION,
            duration = ?duration,
            migrations_count = versions.len(),
            "Database migration process completed"
        );

        Ok(MigrationResult {
            duration,
            applied_versions: versions,
        })
    }
}
