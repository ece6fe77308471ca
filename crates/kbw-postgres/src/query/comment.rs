//! Comments repository: moderated inserts, tombstones and reaction edges.

use std::collections::HashSet;
use std::future::Future;

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use jiff::Timestamp;
use kbw_core::types::TOMBSTONE_CONTENT;
use uuid::Uuid;

use crate::model::{Comment, CommentReaction, NewComment};
use crate::{PgClient, PgError, PgResult, TRACING_TARGET_QUERY, schema};

/// Repository for comment database operations.
pub trait CommentRepository {
    /// Inserts a comment.
    fn insert_comment(
        &self,
        new_comment: NewComment,
    ) -> impl Future<Output = PgResult<Comment>> + Send;

    /// Finds a comment by id, including tombstoned ones.
    fn find_comment_by_id(
        &self,
        comment_id: Uuid,
    ) -> impl Future<Output = PgResult<Option<Comment>>> + Send;

    /// Lists all comments of a post, oldest first.
    fn list_comments_by_post(
        &self,
        post_id: Uuid,
    ) -> impl Future<Output = PgResult<Vec<Comment>>> + Send;

    /// Tombstones a live comment owned by `owner_id` in a single conditional update.
    ///
    /// Returns whether a row matched.
    fn tombstone_owned_comment(
        &self,
        comment_id: Uuid,
        owner_id: Uuid,
    ) -> impl Future<Output = PgResult<bool>> + Send;

    /// Returns the ids of the post's comments `user_id` has reacted to.
    fn find_reacted_comment_ids(
        &self,
        post_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = PgResult<HashSet<Uuid>>> + Send;

    /// Returns whether `user_id` has reacted to the comment.
    fn has_reacted(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = PgResult<bool>> + Send;

    /// Flips the reaction edge and returns `(reacted, reaction_count)`.
    ///
    /// Returns `None` when the comment does not exist.
    fn toggle_reaction(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = PgResult<Option<(bool, i64)>>> + Send;
}

impl CommentRepository for PgClient {
    async fn insert_comment(&self, new_comment: NewComment) -> PgResult<Comment> {
        let mut conn = self.get_connection().await?;

        use schema::comments;

        let comment = diesel::insert_into(comments::table)
            .values(&new_comment)
            .returning(Comment::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            comment_id = %comment.id,
            post_id = %comment.post_id,
            "Comment inserted"
        );

        Ok(comment)
    }

    async fn find_comment_by_id(&self, comment_id: Uuid) -> PgResult<Option<Comment>> {
        let mut conn = self.get_connection().await?;

        use schema::comments::{self, dsl};

        let comment = comments::table
            .filter(dsl::id.eq(comment_id))
            .select(Comment::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(PgError::from)?;

        Ok(comment)
    }

    async fn list_comments_by_post(&self, post_id: Uuid) -> PgResult<Vec<Comment>> {
        let mut conn = self.get_connection().await?;

        use schema::comments::{self, dsl};

        let comments = comments::table
            .filter(dsl::post_id.eq(post_id))
            .order((dsl::created_at.asc(), dsl::id.asc()))
            .select(Comment::as_select())
            .load(&mut conn)
            .await
            .map_err(PgError::from)?;

        Ok(comments)
    }

    async fn tombstone_owned_comment(&self, comment_id: Uuid, owner_id: Uuid) -> PgResult<bool> {
        let mut conn = self.get_connection().await?;

        use schema::comments::{self, dsl};

        let affected = diesel::update(
            comments::table
                .filter(dsl::id.eq(comment_id))
                .filter(dsl::author_id.eq(owner_id))
                .filter(dsl::deleted_at.is_null()),
        )
        .set((
            dsl::content.eq(TOMBSTONE_CONTENT),
            dsl::deleted_at.eq(Some(jiff_diesel::Timestamp::from(Timestamp::now()))),
        ))
        .execute(&mut conn)
        .await
        .map_err(PgError::from)?;

        tracing::debug!(
            target: TRACING_TARGET_QUERY,
            comment_id = %comment_id,
            affected,
            "Conditional tombstone executed"
        );

        Ok(affected == 1)
    }

    async fn find_reacted_comment_ids(
        &self,
        post_id: Uuid,
        user_id: Uuid,
    ) -> PgResult<HashSet<Uuid>> {
        let mut conn = self.get_connection().await?;

        use schema::{comment_reactions, comments};

        let ids: Vec<Uuid> = comment_reactions::table
            .inner_join(comments::table)
            .filter(comments::post_id.eq(post_id))
            .filter(comment_reactions::user_id.eq(user_id))
            .select(comment_reactions::comment_id)
            .load(&mut conn)
            .await
            .map_err(PgError::from)?;

        Ok(ids.into_iter().collect())
    }

    async fn has_reacted(&self, comment_id: Uuid, user_id: Uuid) -> PgResult<bool> {
        let mut conn = self.get_connection().await?;

        use schema::comment_reactions::{self, dsl};

        let reacted: bool = diesel::select(diesel::dsl::exists(
            comment_reactions::table
                .filter(dsl::comment_id.eq(comment_id))
                .filter(dsl::user_id.eq(user_id)),
        ))
        .get_result(&mut conn)
        .await
        .map_err(PgError::from)?;

        Ok(reacted)
    }

    async fn toggle_reaction(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> PgResult<Option<(bool, i64)>> {
        let mut conn = self.get_connection().await?;

        use schema::{comment_reactions, comments};

        conn.transaction::<_, PgError, _>(|conn| {
            async move {
                // Row lock serializes concurrent toggles on the same comment.
                let exists = comments::table
                    .filter(comments::id.eq(comment_id))
                    .select(comments::id)
                    .for_update()
                    .first::<Uuid>(conn)
                    .await
                    .optional()?;
                if exists.is_none() {
                    return Ok(None);
                }

                let removed = diesel::delete(
                    comment_reactions::table
                        .filter(comment_reactions::comment_id.eq(comment_id))
                        .filter(comment_reactions::user_id.eq(user_id)),
                )
                .execute(conn)
                .await?;

                let reacted = removed == 0;
                if reacted {
                    diesel::insert_into(comment_reactions::table)
                        .values(&CommentReaction {
                            comment_id,
                            user_id,
                        })
                        .on_conflict_do_nothing()
                        .execute(conn)
                        .await?;
                }

                let count: i64 = comment_reactions::table
                    .filter(comment_reactions::comment_id.eq(comment_id))
                    .count()
                    .get_result(conn)
                    .await?;

                diesel::update(comments::table.filter(comments::id.eq(comment_id)))
                    .set(comments::reaction_count.eq(count))
                    .execute(conn)
                    .await?;

                Ok(Some((reacted, count)))
            }
            .scope_boxed()
        })
        .await
    }
}
