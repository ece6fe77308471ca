//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── server: ServerConfig           # Host, port, shutdown
//! ├── middleware: MiddlewareConfig   # CORS, request timeouts
//! ├── service: ServiceConfig         # Session secret, email domain, rate limit
//! ├── storage: StorageConfig         # PostgreSQL or in-process storage
//! └── classifier: ClassifierConfig   # OpenAI-compatible comment classifier
//! ```
//!
//! All configuration can be provided via CLI arguments or environment variables.
//! Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! # Configure database and server
//! kbw --postgres-url "postgresql://..." --port 8080
//!
//! # Or via environment variables
//! POSTGRES_URL="postgresql://..." PORT=8080 kbw
//! ```

mod middleware;
mod provider;
mod server;
mod service;
mod storage;

use std::process;

use anyhow::Context;
use clap::Parser;
use kbw_moderation::ClassifierConfig;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use self::middleware::MiddlewareConfig;
pub use self::provider::{create_moderation_service, create_storage};
pub use self::server::ServerConfig;
pub use self::service::ServiceConfig;
pub use self::storage::StorageConfig;
use crate::{TRACING_TARGET_CONFIG, TRACING_TARGET_SERVER_STARTUP};

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "kbw")]
#[command(about = "kbw blog API server with moderated comments")]
#[command(version)]
pub struct Cli {
    /// Server network and lifecycle configuration.
    #[clap(flatten)]
    pub server: ServerConfig,

    /// HTTP middleware configuration (CORS, timeouts).
    #[clap(flatten)]
    pub middleware: MiddlewareConfig,

    /// Sessions, email domain policy and comment rate limiting.
    #[clap(flatten)]
    pub service: ServiceConfig,

    /// Storage backend selection.
    #[clap(flatten)]
    pub storage: StorageConfig,

    /// Comment classifier client configuration.
    #[clap(flatten)]
    pub classifier: ClassifierConfig,

    /// Approve every comment without calling the classifier.
    #[cfg(feature = "mock")]
    #[arg(long, env = "MOCK_CLASSIFIER")]
    #[serde(default)]
    pub mock_classifier: bool,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so clap's `env` fallbacks can see its values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Initializes tracing with environment-based filtering.
    pub fn init_tracing() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    /// Validates all configuration values.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.server
            .validate()
            .context("invalid server configuration")?;
        self.storage
            .validate()
            .context("invalid storage configuration")?;

        if !self.uses_mock_classifier() {
            self.classifier
                .validate()
                .context("invalid classifier configuration")?;
        }

        Ok(())
    }

    /// Returns whether comments bypass the real classifier.
    pub fn uses_mock_classifier(&self) -> bool {
        #[cfg(feature = "mock")]
        {
            self.mock_classifier
        }

        #[cfg(not(feature = "mock"))]
        {
            false
        }
    }

    /// Logs configuration (no sensitive information).
    pub fn log(&self) {
        Self::log_build_info();
        self.server.log();
        self.middleware.log();
        self.service.log();
        self.storage.log();

        tracing::info!(
            target: TRACING_TARGET_CONFIG,
            base_url = %self.classifier.classifier_base_url,
            model = %self.classifier.classifier_model,
            timeout_secs = self.classifier.classifier_timeout_secs,
            api_key_set = self.classifier.classifier_api_key.is_some(),
            mock = self.uses_mock_classifier(),
            "Classifier configuration"
        );
    }

    /// Logs build information at debug level.
    fn log_build_info() {
        tracing::info!(
            target: TRACING_TARGET_SERVER_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            "Starting kbw server"
        );

        tracing::debug!(
            target: TRACING_TARGET_SERVER_STARTUP,
            pid = process::id(),
            arch = std::env::consts::ARCH,
            os = std::env::consts::OS,
            features = ?Self::enabled_features(),
            "Build information"
        );
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [
            cfg!(feature = "dotenv").then_some("dotenv"),
            cfg!(feature = "mock").then_some("mock"),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}
