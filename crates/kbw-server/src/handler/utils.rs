//! Lookups shared by several handlers.

use kbw_core::store::Storage;
use kbw_core::types::Post;
use uuid::Uuid;

use crate::handler::{ErrorKind, Result};

/// Returns a post that is published or owned by `viewer`.
///
/// Drafts of other authors are reported as missing.
pub(crate) async fn find_visible_post(
    storage: &Storage,
    post_id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Post> {
    storage
        .posts
        .find_post(post_id)
        .await?
        .filter(|post| post.is_visible_to(viewer))
        .ok_or_else(|| ErrorKind::NotFound.with_resource("post"))
}

/// Returns a post owned by `owner_id`.
pub(crate) async fn find_owned_post(
    storage: &Storage,
    post_id: Uuid,
    owner_id: Uuid,
) -> Result<Post> {
    storage
        .posts
        .find_post(post_id)
        .await?
        .filter(|post| post.author_id == owner_id)
        .ok_or_else(|| ErrorKind::NotFound.with_resource("post"))
}
