//! Comment submission, listing, deletion and reaction handlers.
//!
//! Submissions go through the [`ModerationGateway`]; no other route writes
//! comment content.

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use kbw_core::store::Storage;
use kbw_core::types::{Comment, ModerationVerdict, ReactionState, SubmitComment};
use uuid::Uuid;

use crate::extract::auth::viewer_id;
use crate::extract::{AuthState, ClientIdentity, Json, Path};
use crate::handler::request::{CommentPathParams, PostPathParams};
use crate::handler::{ErrorKind, Result, find_visible_post};
use crate::service::{ModerationGateway, ServiceState};

/// Tracing target for comment operations.
const TRACING_TARGET: &str = "kbw_server::handler::comments";

/// Classifies a comment and stores it when approved.
#[tracing::instrument(
    skip_all,
    fields(
        client = %identity,
        post_id = %request.post_id,
        authenticated = auth_state.is_some(),
    )
)]
async fn moderate_comment(
    State(gateway): State<ModerationGateway>,
    identity: ClientIdentity,
    auth_state: Option<AuthState>,
    Json(request): Json<SubmitComment>,
) -> Result<(StatusCode, Json<ModerationVerdict>)> {
    tracing::debug!(target: TRACING_TARGET, "Moderating comment");

    let verdict = gateway
        .submit(&identity, request, viewer_id(&auth_state))
        .await?;

    Ok((StatusCode::OK, Json(verdict)))
}

/// Lists the comments of a post that the caller may see.
#[tracing::instrument(skip_all, fields(post_id = %path_params.post_id))]
async fn list_post_comments(
    State(storage): State<Storage>,
    auth_state: Option<AuthState>,
    Path(path_params): Path<PostPathParams>,
) -> Result<(StatusCode, Json<Vec<Comment>>)> {
    let viewer = viewer_id(&auth_state);
    find_visible_post(&storage, path_params.post_id, viewer).await?;

    let comments: Vec<Comment> = storage
        .comments
        .list_post_comments(path_params.post_id, viewer)
        .await?
        .into_iter()
        .filter(|comment| comment.is_visible_to(viewer))
        .collect();

    tracing::debug!(
        target: TRACING_TARGET,
        comment_count = comments.len(),
        "Comments listed",
    );

    Ok((StatusCode::OK, Json(comments)))
}

/// Returns a single visible comment.
#[tracing::instrument(skip_all, fields(comment_id = %path_params.comment_id))]
async fn get_comment(
    State(storage): State<Storage>,
    auth_state: Option<AuthState>,
    Path(path_params): Path<CommentPathParams>,
) -> Result<(StatusCode, Json<Comment>)> {
    let viewer = viewer_id(&auth_state);
    let comment = find_visible_comment(&storage, path_params.comment_id, viewer).await?;
    Ok((StatusCode::OK, Json(comment)))
}

/// Soft-deletes a comment owned by the caller.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %auth_state.user_id(),
        comment_id = %path_params.comment_id,
    )
)]
async fn delete_comment(
    State(storage): State<Storage>,
    auth_state: AuthState,
    Path(path_params): Path<CommentPathParams>,
) -> Result<StatusCode> {
    tracing::debug!(target: TRACING_TARGET, "Deleting comment");

    let deleted = storage
        .comments
        .tombstone_comment(path_params.comment_id, auth_state.user_id())
        .await?;

    if !deleted {
        return Err(ErrorKind::NotFound.with_resource("comment"));
    }

    tracing::info!(target: TRACING_TARGET, "Comment deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Toggles the caller's reaction to a comment.
#[tracing::instrument(
    skip_all,
    fields(
        user_id = %auth_state.user_id(),
        comment_id = %path_params.comment_id,
    )
)]
async fn toggle_reaction(
    State(storage): State<Storage>,
    auth_state: AuthState,
    Path(path_params): Path<CommentPathParams>,
) -> Result<(StatusCode, Json<ReactionState>)> {
    let user_id = auth_state.user_id();
    find_visible_comment(&storage, path_params.comment_id, Some(user_id)).await?;

    let state = storage
        .comments
        .toggle_comment_reaction(path_params.comment_id, user_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.with_resource("comment"))?;

    tracing::debug!(
        target: TRACING_TARGET,
        reacted = state.reacted,
        reaction_count = state.reaction_count,
        "Reaction toggled",
    );

    Ok((StatusCode::OK, Json(state)))
}

async fn find_visible_comment(
    storage: &Storage,
    comment_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Comment> {
    storage
        .comments
        .find_comment(comment_id, viewer)
        .await?
        .filter(|comment| comment.is_visible_to(viewer))
        .ok_or_else(|| ErrorKind::NotFound.with_resource("comment"))
}

/// Returns a [`Router`] with all related routes.
pub fn routes() -> Router<ServiceState> {
    use axum::routing::*;

    Router::new()
        .route("/comments/moderate", post(moderate_comment))
        .route("/posts/{postId}/comments", get(list_post_comments))
        .route(
            "/comments/{commentId}",
            get(get_comment).delete(delete_comment),
        )
        .route("/comments/{commentId}/reactions", post(toggle_reaction))
}
