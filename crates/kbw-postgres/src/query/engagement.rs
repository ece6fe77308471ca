//! Likes and bookmarks repository.

use std::future::Future;

use diesel::prelude::*;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};
use kbw_core::types::EngagementKind;
use uuid::Uuid;

use crate::model::{NewPostBookmark, NewPostLike};
use crate::{PgClient, PgConnection, PgError, PgResult, schema};

/// Repository for like and bookmark edges.
pub trait EngagementRepository {
    /// Flips the viewer's edge of `kind` and returns `(active, count)`.
    fn toggle_engagement(
        &self,
        kind: EngagementKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> impl Future<Output = PgResult<(bool, i64)>> + Send;

    /// Returns `(active, count)` for the viewer's edge of `kind`.
    fn engagement_state(
        &self,
        kind: EngagementKind,
        post_id: Uuid,
        user_id: Option<Uuid>,
    ) -> impl Future<Output = PgResult<(bool, i64)>> + Send;
}

impl EngagementRepository for PgClient {
    async fn toggle_engagement(
        &self,
        kind: EngagementKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> PgResult<(bool, i64)> {
        let mut conn = self.get_connection().await?;

        conn.transaction::<_, PgError, _>(|conn| {
            async move {
                let removed = delete_edge(conn, kind, post_id, user_id).await?;
                let active = removed == 0;
                if active {
                    insert_edge(conn, kind, post_id, user_id).await?;
                }

                let count = count_edges(conn, kind, post_id).await?;
                Ok((active, count))
            }
            .scope_boxed()
        })
        .await
    }

    async fn engagement_state(
        &self,
        kind: EngagementKind,
        post_id: Uuid,
        user_id: Option<Uuid>,
    ) -> PgResult<(bool, i64)> {
        let mut conn = self.get_connection().await?;

        let count = count_edges(&mut conn, kind, post_id).await?;
        let active = match user_id {
            Some(user_id) => has_edge(&mut conn, kind, post_id, user_id).await?,
            None => false,
        };

        Ok((active, count))
    }
}

async fn delete_edge(
    conn: &mut PgConnection,
    kind: EngagementKind,
    post_id: Uuid,
    user_id: Uuid,
) -> PgResult<usize> {
    use schema::{post_bookmarks, post_likes};

    let removed = match kind {
        EngagementKind::Like => {
            diesel::delete(
                post_likes::table
                    .filter(post_likes::post_id.eq(post_id))
                    .filter(post_likes::user_id.eq(user_id)),
            )
            .execute(conn)
            .await?
        }
        EngagementKind::Bookmark => {
            diesel::delete(
                post_bookmarks::table
                    .filter(post_bookmarks::post_id.eq(post_id))
                    .filter(post_bookmarks::user_id.eq(user_id)),
            )
            .execute(conn)
            .await?
        }
    };

    Ok(removed)
}

async fn insert_edge(
    conn: &mut PgConnection,
    kind: EngagementKind,
    post_id: Uuid,
    user_id: Uuid,
) -> PgResult<()> {
    use schema::{post_bookmarks, post_likes};

    match kind {
        EngagementKind::Like => {
            diesel::insert_into(post_likes::table)
                .values(&NewPostLike { post_id, user_id })
                .on_conflict_do_nothing()
                .execute(conn)
                .await?;
        }
        EngagementKind::Bookmark => {
            diesel::insert_into(post_bookmarks::table)
                .values(&NewPostBookmark { post_id, user_id })
                .on_conflict_do_nothing()
                .execute(conn)
                .await?;
        }
    }

    Ok(())
}

async fn count_edges(
    conn: &mut PgConnection,
    kind: EngagementKind,
    post_id: Uuid,
) -> PgResult<i64> {
    use schema::{post_bookmarks, post_likes};

    let count = match kind {
        EngagementKind::Like => {
            post_likes::table
                .filter(post_likes::post_id.eq(post_id))
                .count()
                .get_result(conn)
                .await?
        }
        EngagementKind::Bookmark => {
            post_bookmarks::table
                .filter(post_bookmarks::post_id.eq(post_id))
                .count()
                .get_result(conn)
                .await?
        }
    };

    Ok(count)
}

async fn has_edge(
    conn: &mut PgConnection,
    kind: EngagementKind,
    post_id: Uuid,
    user_id: Uuid,
) -> PgResult<bool> {
    use schema::{post_bookmarks, post_likes};

    let active = match kind {
        EngagementKind::Like => {
            diesel::select(diesel::dsl::exists(
                post_likes::table
                    .filter(post_likes::post_id.eq(post_id))
                    .filter(post_likes::user_id.eq(user_id)),
            ))
            .get_result(conn)
            .await?
        }
        EngagementKind::Bookmark => {
            diesel::select(diesel::dsl::exists(
                post_bookmarks::table
                    .filter(post_bookmarks::post_id.eq(post_id))
                    .filter(post_bookmarks::user_id.eq(user_id)),
            ))
            .get_result(conn)
            .await?
        }
    };

    Ok(active)
}
