//! Post authoring handlers.
//!
//! Every mutation filters on the caller as owner; a post owned by someone
//! else is indistinguishable from a missing one.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use kbw_core::store::Storage;
use kbw_core::types::{Post, PostStatus};

use crate::extract::auth::viewer_id;
use crate::extract::{AuthState, Json, Path, ValidateJson};
use crate::handler::request::{PostPathParams, UpdatePostRequest};
use crate::handler::{ErrorKind, Result, find_owned_post, find_visible_post};
use crate::service::ServiceState;

/// Tracing target for post operations.
const TRACING_TARGET: &str = "kbw_server::handler::posts";

/// Lists published posts, newest first.
#[tracing::instrument(skip_all)]
async fn list_posts(State(storage): State<Storage>) -> Result<(StatusCode, Json<Vec<Post>>)> {
    let posts = storage.posts.list_published_posts().await?;

    tracing::debug!(
        target: TRACING_TARGET,
        post_count = posts.len(),
        "Posts listed",
    );

    Ok((StatusCode::OK, Json(posts)))
}

/// Creates an empty draft.
#[tracing::instrument(skip_all, fields(user_id = %auth_state.user_id()))]
async fn create_post(
    State(storage): State<Storage>,
    auth_state: AuthState,
) -> Result<(StatusCode, Json<Post>)> {
    let post = storage.posts.create_draft_post(auth_state.user_id()).await?;

    tracing::info!(target: TRACING_TARGET, post_id = %post.id, "Draft created");

    Ok((StatusCode::CREATED, Json(post)))
}

/// Returns a post that is published or owned by the caller.
#[tracing::instrument(skip_all, fields(post_id = %path_params.post_id))]
async fn get_post(
    State(storage): State<Storage>,
    auth_state: Option<AuthState>,
    Path(path_params): Path<PostPathParams>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = find_visible_post(&storage, path_params.post_id, viewer_id(&auth_state)).await?;
    Ok((StatusCode::OK, Json(post)))
}

/// Applies a partial update to a post owned by the caller.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %auth_state.user_id(),
        post_id = %path_params.post_id,
    )
)]
async fn update_post(
    State(storage): State<Storage>,
    auth_state: AuthState,
    Path(path_params): Path<PostPathParams>,
    ValidateJson(request): ValidateJson<UpdatePostRequest>,
) -> Result<(StatusCode, Json<Post>)> {
    tracing::debug!(target: TRACING_TARGET, "Updating post");

    let post = storage
        .posts
        .update_post(
            path_params.post_id,
            auth_state.user_id(),
            request.into_changes(),
        )
        .await?
        .ok_or_else(|| ErrorKind::NotFound.with_resource("post"))?;

    Ok((StatusCode::OK, Json(post)))
}

/// Publishes a post owned by the caller once it has a title and a body.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %auth_state.user_id(),
        post_id = %path_params.post_id,
    )
)]
async fn publish_post(
    State(storage): State<Storage>,
    auth_state: AuthState,
    Path(path_params): Path<PostPathParams>,
) -> Result<(StatusCode, Json<Post>)> {
    let user_id = auth_state.user_id();
    let existing = find_owned_post(&storage, path_params.post_id, user_id).await?;
    existing.fields().validate_for_publish()?;

    let post = storage
        .posts
        .set_post_status(path_params.post_id, user_id, PostStatus::Published)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.with_resource("post"))?;

    tracing::info!(target: TRACING_TARGET, "Post published");

    Ok((StatusCode::OK, Json(post)))
}

/// Returns a post owned by the caller to draft.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %auth_state.user_id(),
        post_id = %path_params.post_id,
    )
)]
async fn unpublish_post(
    State(storage): State<Storage>,
    auth_state: AuthState,
    Path(path_params): Path<PostPathParams>,
) -> Result<(StatusCode, Json<Post>)> {
    let post = storage
        .posts
        .set_post_status(path_params.post_id, auth_state.user_id(), PostStatus::Draft)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.with_resource("post"))?;

    tracing::info!(target: TRACING_TARGET, "Post unpublished");

    Ok((StatusCode::OK, Json(post)))
}

/// Deletes a post owned by the caller.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %auth_state.user_id(),
        post_id = %path_params.post_id,
    )
)]
async fn delete_post(
    State(storage): State<Storage>,
    auth_state: AuthState,
    Path(path_params): Path<PostPathParams>,
) -> Result<StatusCode> {
    let deleted = storage
        .posts
        .delete_post(path_params.post_id, auth_state.user_id())
        .await?;

    if !deleted {
        return Err(ErrorKind::NotFound.with_resource("post"));
    }

    tracing::info!(target: TRACING_TARGET, "Post deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    use axum::routing::*;

    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{postId}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/posts/{postId}/publish", post(publish_post))
        .route("/posts/{postId}/unpublish", post(unpublish_post))
}

#[cfg(test)]
mod test {
    use axum::http::StatusCode;
    use kbw_core::types::{Post, PostStatus};
    use kbw_moderation::MockClassifier;
    use serde_json::json;
    use uuid::Uuid;

    use crate::handler::posts::routes;
    use crate::handler::test::TestContext;

    #[tokio::test]
    async fn draft_lifecycle() -> anyhow::Result<()> {
        let ctx = TestContext::new(MockClassifier::approving()).await?;
        let server = ctx.server(routes())?;
        let token = ctx.token(Uuid::new_v4(), "ana@kbw.vc")?;

        let response = server.post("/posts").authorization_bearer(&token).await;
        response.assert_status(StatusCode::CREATED);
        let draft = response.json::<Post>();
        assert_eq!(draft.status, PostStatus::Draft);

        // Anonymous readers cannot see drafts.
        server
            .get(&format!("/posts/{}", draft.id))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .post(&format!("/posts/{}/publish", draft.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::BAD_REQUEST);

        let response = server
            .patch(&format!("/posts/{}", draft.id))
            .authorization_bearer(&token)
            .json(&json!({ "title": "Hello", "content": "World", "tags": ["rust"] }))
            .await;
        response.assert_status(StatusCode::OK);
        assert_eq!(response.json::<Post>().title, "Hello");

        let response = server
            .post(&format!("/posts/{}/publish", draft.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        let published = response.json::<Post>();
        assert_eq!(published.status, PostStatus::Published);
        assert!(published.published_at.is_some());

        let listed = server.get("/posts").await.json::<Vec<Post>>();
        assert_eq!(listed.len(), 1);

        let response = server
            .post(&format!("/posts/{}/unpublish", draft.id))
            .authorization_bearer(&token)
            .await;
        response.assert_status(StatusCode::OK);
        assert!(response.json::<Post>().published_at.is_none());
        assert!(server.get("/posts").await.json::<Vec<Post>>().is_empty());

        server
            .delete(&format!("/posts/{}", draft.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NO_CONTENT);
        Ok(())
    }

    #[tokio::test]
    async fn non_owner_sees_not_found() -> anyhow::Result<()> {
        let ctx = TestContext::new(MockClassifier::approving()).await?;
        let server = ctx.server(routes())?;
        let post = ctx.published_post().await?;
        let token = ctx.token(Uuid::new_v4(), "bo@kbw.vc")?;

        server
            .patch(&format!("/posts/{}", post.id))
            .authorization_bearer(&token)
            .json(&json!({ "title": "Hijacked" }))
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .post(&format!("/posts/{}/unpublish", post.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .delete(&format!("/posts/{}", post.id))
            .authorization_bearer(&token)
            .await
            .assert_status(StatusCode::NOT_FOUND);

        server
            .get(&format!("/posts/{}", post.id))
            .await
            .assert_status(StatusCode::OK);
        Ok(())
    }

    #[tokio::test]
    async fn invalid_update_is_bad_request() -> anyhow::Result<()> {
        let ctx = TestContext::new(MockClassifier::approving()).await?;
        let server = ctx.server(routes())?;
        let token = ctx.token(Uuid::new_v4(), "ana@kbw.vc")?;
        let draft = server
            .post("/posts")
            .authorization_bearer(&token)
            .await
            .json::<Post>();

        server
            .patch(&format!("/posts/{}", draft.id))
            .authorization_bearer(&token)
            .json(&json!({ "coverImageUrl": "not a url" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
        Ok(())
    }
}
