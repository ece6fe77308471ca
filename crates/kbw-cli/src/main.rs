#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod server;

use std::process;

use anyhow::Context;
use axum::Router;
use kbw_server::handler::routes;
use kbw_server::middleware::{RouterObservabilityExt, RouterRecoveryExt, RouterSecurityExt};
use kbw_server::service::ServiceState;

use crate::config::{Cli, MiddlewareConfig, create_moderation_service, create_storage};

// Tracing target constants
pub const TRACING_TARGET_SERVER_STARTUP: &str = "kbw_cli::server::startup";
pub const TRACING_TARGET_SERVER_SHUTDOWN: &str = "kbw_cli::server::shutdown";
pub const TRACING_TARGET_CONFIG: &str = "kbw_cli::config";

#[tokio::main]
async fn main() {
    let Err(error) = run().await else {
        tracing::info!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            "Application terminated successfully"
        );
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_SERVER_SHUTDOWN,
            error = format!("{error:#}"),
            "Application terminated with error"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
async fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    Cli::init_tracing();
    cli.log();
    cli.validate()?;

    let storage = create_storage(&cli.storage)
        .await
        .context("failed to create storage")?;
    let moderation = create_moderation_service(&cli).context("failed to create classifier")?;

    let service_config = cli
        .service
        .to_server_config()
        .context("invalid service configuration")?;
    let state = ServiceState::from_config(&service_config, storage, moderation)
        .context("failed to create service state")?;

    let router = create_router(state, &cli.middleware);
    server::serve(router, cli.server).await?;

    Ok(())
}

/// Creates the router with all middleware layers applied.
///
/// Middleware is applied in reverse order (last added = outermost):
/// 1. Recovery (outermost): panics and request timeouts
/// 2. Observability: request ids and tracing spans
/// 3. Security: CORS and body limits
/// 4. Routes (innermost)
fn create_router(state: ServiceState, middleware: &MiddlewareConfig) -> Router {
    routes()
        .with_state(state)
        .with_security(&middleware.cors)
        .with_observability()
        .with_recovery(&middleware.recovery)
}
