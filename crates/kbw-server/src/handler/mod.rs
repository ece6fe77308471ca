//! All `axum::`[`Router`]s with related `axum::`[`Handler`]s.
//!
//! # Usage Example
//!
//! ```rust,ignore
//! use kbw_core::store::Storage;
//! use kbw_moderation::{ClassifierConfig, ModerationService, OpenAiClassifier};
//! use kbw_server::handler::routes;
//! use kbw_server::service::{ServiceConfig, ServiceState};
//!
//! # fn example() -> anyhow::Result<()> {
//! let config = ServiceConfig::builder()
//!     .with_auth_jwt_secret("a-shared-secret-of-at-least-32-bytes")
//!     .build()?;
//! let classifier = OpenAiClassifier::new(ClassifierConfig::default())?;
//! let moderation = ModerationService::from_provider(classifier);
//! let state = ServiceState::from_config(&config, Storage::memory(), moderation)?;
//!
//! let app = routes().with_state(state);
//! # Ok(())
//! # }
//! ```
//!
//! [`Router`]: axum::routing::Router
//! [`Handler`]: axum::handler::Handler

mod comments;
mod engagement;
mod error;
mod monitors;
mod posts;
pub mod request;
pub mod response;
mod utils;

use axum::Router;
use axum::response::{IntoResponse, Response};

pub use crate::handler::error::{Error, ErrorKind, Result};
pub(crate) use crate::handler::response::ErrorResponse;
pub(crate) use crate::handler::utils::{find_owned_post, find_visible_post};
use crate::service::ServiceState;

#[inline]
async fn handler() -> Response {
    ErrorKind::NotFound.into_response()
}

/// Returns a [`Router`] with all routes.
///
/// Authentication is enforced per handler by the [`AuthState`] extractor, so
/// public and private routes share one router.
///
/// [`AuthState`]: crate::extract::AuthState
pub fn routes() -> Router<ServiceState> {
    Router::new()
        .merge(comments::routes())
        .merge(posts::routes())
        .merge(engagement::routes())
        .merge(monitors::routes())
        .fallback(handler)
}

#[cfg(test)]
mod test {
    use axum::Router;
    use axum_test::TestServer;
    use jiff::SignedDuration;
    use kbw_core::store::{MemoryStore, PostStore, Storage};
    use kbw_core::types::{Post, PostChanges, PostStatus};
    use kbw_moderation::{MockClassifier, ModerationService};
    use uuid::Uuid;

    use crate::extract::AuthClaims;
    use crate::handler::routes;
    use crate::service::{ServiceConfig, ServiceState};

    pub const TEST_SECRET: &str = "test-secret-that-is-long-enough-for-hs256";

    /// In-memory state shared by handler tests.
    pub struct TestContext {
        pub state: ServiceState,
        pub store: MemoryStore,
    }

    impl TestContext {
        /// Creates a state backed by an empty [`MemoryStore`] and `classifier`.
        pub async fn new(classifier: MockClassifier) -> anyhow::Result<Self> {
            let config = ServiceConfig::builder()
                .with_auth_jwt_secret(TEST_SECRET)
                .build()?;
            let store = MemoryStore::new();
            let state = ServiceState::from_config(
                &config,
                Storage::from_backend(store.clone()),
                ModerationService::from_provider(classifier),
            )?;
            Ok(Self { state, store })
        }

        /// Returns a new [`TestServer`] with the given router.
        pub fn server(&self, router: Router<ServiceState>) -> anyhow::Result<TestServer> {
            create_test_server_with_state(router, self.state.clone())
        }

        /// Signs a session token for `user_id`.
        pub fn token(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
            let claims = AuthClaims::new(user_id, email, SignedDuration::from_hours(1));
            Ok(claims.encode(self.state.session_keys.encoding_key())?)
        }

        /// Stores a published post owned by a fresh author.
        pub async fn published_post(&self) -> anyhow::Result<Post> {
            let author = Uuid::new_v4();
            let draft = self.store.create_draft_post(author).await?;
            let changes = PostChanges {
                title: Some("Hello".to_owned()),
                content: Some("World".to_owned()),
                ..PostChanges::default()
            };
            self.store.update_post(draft.id, author, changes).await?;
            self.store
                .set_post_status(draft.id, author, PostStatus::Published)
                .await?
                .ok_or_else(|| anyhow::anyhow!("post vanished"))
        }
    }

    /// Returns a new [`TestServer`] with the given router and state.
    pub fn create_test_server_with_state(
        router: Router<ServiceState>,
        state: ServiceState,
    ) -> anyhow::Result<TestServer> {
        let app = router.with_state(state);
        let server = TestServer::new(app)?;
        Ok(server)
    }

    #[tokio::test]
    async fn handlers() -> anyhow::Result<()> {
        let ctx = TestContext::new(MockClassifier::approving()).await?;
        let server = ctx.server(routes())?;
        assert!(server.is_running());

        server
            .get("/does-not-exist")
            .await
            .assert_status(axum::http::StatusCode::NOT_FOUND);
        Ok(())
    }
}
