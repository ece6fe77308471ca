//! Like and bookmark handlers.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use kbw_core::store::Storage;
use kbw_core::types::{EngagementKind, EngagementState, EngagementSummary};

use crate::extract::auth::viewer_id;
use crate::extract::{AuthState, Json, Path};
use crate::handler::request::PostPathParams;
use crate::handler::{Result, find_visible_post};
use crate::service::ServiceState;

/// Tracing target for engagement operations.
const TRACING_TARGET: &str = "kbw_server::handler::engagement";

async fn toggle(
    storage: &Storage,
    kind: EngagementKind,
    auth_state: &AuthState,
    path_params: &PostPathParams,
) -> Result<EngagementState> {
    let user_id = auth_state.user_id();
    find_visible_post(storage, path_params.post_id, Some(user_id)).await?;

    let state = storage
        .engagement
        .toggle_engagement(kind, path_params.post_id, user_id)
        .await?;

    tracing::debug!(
        target: TRACING_TARGET,
        kind = %kind,
        active = state.active,
        count = state.count,
        "Engagement toggled",
    );

    Ok(state)
}

/// Toggles the caller's like on a post.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %auth_state.user_id(),
        post_id = %path_params.post_id,
    )
)]
async fn toggle_like(
    State(storage): State<Storage>,
    auth_state: AuthState,
    Path(path_params): Path<PostPathParams>,
) -> Result<(StatusCode, Json<EngagementState>)> {
    let state = toggle(&storage, EngagementKind::Like, &auth_state, &path_params).await?;
    Ok((StatusCode::OK, Json(state)))
}

/// Toggles the caller's bookmark on a post.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %auth_state.user_id(),
        post_id = %path_params.post_id,
    )
)]
async fn toggle_bookmark(
    State(storage): State<Storage>,
    auth_state: AuthState,
    Path(path_params): Path<PostPathParams>,
) -> Result<(StatusCode, Json<EngagementState>)> {
    let state = toggle(&storage, EngagementKind::Bookmark, &auth_state, &path_params).await?;
    Ok((StatusCode::OK, Json(state)))
}

/// Returns like and bookmark counts with the caller's own state.
#[tracing::instrument(skip_all, fields(post_id = %path_params.post_id))]
async fn get_engagement(
    State(storage): State<Storage>,
    auth_state: Option<AuthState>,
    Path(path_params): Path<PostPathParams>,
) -> Result<(StatusCode, Json<EngagementSummary>)> {
    let viewer = viewer_id(&auth_state);
    find_visible_post(&storage, path_params.post_id, viewer).await?;

    let summary = storage
        .engagement
        .engagement_summary(path_params.post_id, viewer)
        .await?;

    Ok((StatusCode::OK, Json(summary)))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    use axum::routing::*;

    Router::new()
        .route("/posts/{postId}/likes", post(toggle_like))
        .route("/posts/{postId}/bookmarks", post(toggle_bookmark))
        .route("/posts/{postId}/engagement", get(get_engagement))
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;
    use kbw_core::types::{EngagementState, EngagementSummary};
    use kbw_moderation::MockClassifier;
    use uuid::Uuid;

    use crate::handler::engagement::routes;
    use crate::handler::test::TestContext;

    #[tokio::test]
    async fn like_toggles_and_summarizes() -> anyhow::Result<()> {
        let ctx = TestContext::new(MockClassifier::approving()).await?;
        let server = ctx.server(routes())?;
        let post = ctx.published_post().await?;
        let token = ctx.token(Uuid::new_v4(), "ana@kbw.vc")?;

        let liked = server
            .post(&format!("/posts/{}/likes", post.id))
            .authorization_bearer(&token)
            .await
            .json::<EngagementState>();
        assert_eq!(
            liked,
            EngagementState {
                active: true,
                count: 1
            }
        );

        server
            .post(&format!("/posts/{}/bookmarks", post.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::OK);

        let mine = server
            .get(&format!("/posts/{}/engagement", post.id))
            .authorization_bearer(&token)
            .await
            .json::<EngagementSummary>();
        assert!(mine.liked && mine.bookmarked);
        assert_eq!(mine.like_count, 1);

        let anonymous = server
            .get(&format!("/posts/{}/engagement", post.id))
            .await
            .json::<EngagementSummary>();
        assert!(!anonymous.liked);
        assert_eq!(anonymous.like_count, 1);

        let unliked = server
            .post(&format!("/posts/{}/likes", post.id))
            .authorization_bearer(&token)
            .await
            .json::<EngagementState>();
        assert_eq!(
            unliked,
            EngagementState {
                active: false,
                count: 0
            }
        );
        Ok(())
    }

    #[tokio::test]
    async fn like_requires_token() -> anyhow::Result<()> {
        let ctx = TestContext::new(MockClassifier::approving()).await?;
        let server = ctx.server(routes())?;
        let post = ctx.published_post().await?;

        server
            .post(&format!("/posts/{}/likes", post.id))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn unknown_post_is_not_found() -> anyhow::Result<()> {
        let ctx = TestContext::new(MockClassifier::approving()).await?;
        let server = ctx.server(routes())?;
        let token = ctx.token(Uuid::new_v4(), "ana@kbw.vc")?;

        server
            .post(&format!("/posts/{}/bookmarks", Uuid::new_v4()))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);
        Ok(())
    }
}
