//! Posts repository.
//!
//! Every mutation of an existing post is a single statement filtered on both
//! the post id and the owner, so ownership is enforced by the affected row
//! count rather than by a read followed by a write.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use crate::model::{NewPost, Post, UpdatePost};
use crate::types::PostStatus;
use crate::{PgClient, PgError, PgResult, TRACING_TARGET_QUERY, schema};

/// Repository for post database operations.
pub trait PostRepository {
    /// Inserts a new post.
    fn insert_post(&self, new_post: NewPost) -> impl Future<Output = PgResult<Post>> + Send;

    /// Finds a post by id.
    fn find_post_by_id(&self, post_id: Uuid)
    -> impl Future<Output = PgResult<Option<Post>>> + Send;

    /// Lists published posts, most recently published first.
    fn list_published_posts(&self) -> impl Future<Output = PgResult<Vec<Post>>> + Send;

    /// Applies `changes` to a post owned by `owner_id`.
    ///
    /// Returns `None` when no owned post matched.
    fn update_owned_post(
        &self,
        post_id: Uuid,
        owner_id: Uuid,
        changes: UpdatePost,
    ) -> impl Future<Output = PgResult<Option<Post>>> + Send;

    /// Deletes a post owned by `owner_id`. Comments and engagement cascade.
    fn delete_owned_post(
        &self,
        post_id: Uuid,
        owner_id: Uuid,
    ) -> impl Future<Output = PgResult<bool>> + Send;
}

impl PostRepository for PgClient {
    async fn insert_post(&self, new_post: NewPost) -> PgResult<Post> {
        let mut conn = self.get_connection().await?;

        use schema::posts;

        let post = diesel::insert_into(posts::table)
            .values(&new_post)
            .returning(Post::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            post_id = %post.id,
            author_id = %post.author_id,
            "Draft post inserted"
        );

        Ok(post)
    }

    async fn find_post_by_id(&self, post_id: Uuid) -> PgResult<Option<Post>> {
        let mut conn = self.get_connection().await?;

        use schema::posts::{self, dsl};

        let post = posts::table
            .filter(dsl::id.eq(post_id))
            .select(Post::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(post)
    }

    async fn list_published_posts(&self) -> PgResult<Vec<Post>> {
        let mut conn = self.get_connection().await?;

        use schema::posts::{self, dsl};

        let posts = posts::table
            .filter(dsl::status.eq(PostStatus::Published))
            .order((dsl::published_at.desc(), dsl::id.desc()))
            .select(Post::as_select())
            .load(&mut conn)
            .await
            .map_err(PgError::from)?;

        Ok(posts)
    }

    async fn update_owned_post(
        &self,
        post_id: Uuid,
        owner_id: Uuid,
        changes: UpdatePost,
    ) -> PgResult<Option<Post>> {
        let mut conn = self.get_connection().await?;

        use schema::posts::{self, dsl};

        let post = diesel::update(
            posts::table
                .filter(dsl::id.eq(post_id))
                .filter(dsl::author_id.eq(owner_id)),
        )
        .set(&changes)
        .returning(Post::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            post_id = %post_id,
            matched = post.is_some(),
            "Conditional post update executed"
        );

        Ok(post)
    }

    async fn delete_owned_post(&self, post_id: Uuid, owner_id: Uuid) -> PgResult<bool> {
        let mut conn = self.get_connection().await?;

        use schema::posts::{self, dsl};

        let affected = diesel::delete(
            posts::table
                .filter(dsl::id.eq(post_id))
                .filter(dsl::author_id.eq(owner_id)),
        )
        .execute(&mut conn)
        .await
        .map_err(PgError::from)?;

        Ok(affected == 1)
    }
}
