//! Service provider construction.

use anyhow::Context;
use kbw_core::store::Storage;
use kbw_moderation::{ModerationService, OpenAiClassifier};
use kbw_postgres::PgClientExt;

use super::{Cli, StorageConfig};
use crate::TRACING_TARGET_SERVER_STARTUP;

/// Creates the storage backend and applies pending migrations.
///
/// # Errors
///
/// Returns an error if the database is unreachable or migrations fail.
pub async fn create_storage(config: &StorageConfig) -> anyhow::Result<Storage> {
    if config.memory_store {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Using in-memory storage, all data is lost on shutdown"
        );
        return Ok(Storage::memory());
    }

    let postgres = config
        .postgres
        .clone()
        .context("either --postgres-url or --memory-store is required")?;

    let client = postgres.build().context("failed to create database client")?;
    client.ping().await.context("database is unreachable")?;

    let migrations = client
        .run_pending_migrations()
        .await
        .context("failed to apply database migrations")?;

    tracing::info!(
        target: TRACING_TARGET_SERVER_STARTUP,
        applied = migrations.applied_versions.len(),
        duration = ?migrations.duration,
        "Database ready"
    );

    Ok(Storage::from_backend(client))
}

/// Creates the comment moderation service.
///
/// # Errors
///
/// Returns an error if the classifier client cannot be initialized.
pub fn create_moderation_service(cli: &Cli) -> anyhow::Result<ModerationService> {
    #[cfg(feature = "mock")]
    if cli.mock_classifier {
        tracing::warn!(
            target: TRACING_TARGET_SERVER_STARTUP,
            "Using the mock classifier, every comment is approved"
        );
        let classifier = kbw_moderation::MockClassifier::approving();
        return Ok(ModerationService::from_provider(classifier));
    }

    let classifier = OpenAiClassifier::new(cli.classifier.clone())
        .context("failed to create classifier client")?;
    Ok(ModerationService::from_provider(classifier))
}

#[cfg(test)]
mod tests {
    use kbw_core::store::PostStore;

    use super::*;

    #[tokio::test]
    async fn memory_store_starts_empty() -> anyhow::Result<()> {
        let config = StorageConfig {
            memory_store: true,
            postgres: None,
        };

        let storage = create_storage(&config).await?;
        let posts = storage.posts.list_published_posts().await?;
        assert!(posts.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn missing_backend_fails() {
        assert!(create_storage(&StorageConfig::default()).await.is_err());
    }
}
