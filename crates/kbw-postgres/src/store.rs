//! Storage port implementations backed by [`PgClient`].

use kbw_core::store::{CommentStore, EngagementStore, PostStore};
use kbw_core::types::{
    Comment, EngagementKind, EngagementState, EngagementSummary, NewComment, Post, PostChanges,
    PostStatus, ReactionState,
};
use kbw_core::{Error, Result};
use uuid::Uuid;

use crate::PgClient;
use crate::model::{self, UpdatePost};
use crate::query::{CommentRepository, EngagementRepository, PostRepository};

#[async_trait::async_trait]
impl CommentStore for PgClient {
    async fn insert_approved_comment(&self, new_comment: NewComment) -> Result<Comment> {
        let row = self
            .insert_comment(model::NewComment::approved(new_comment))
            .await?;
        Ok(row.into_domain(false))
    }

    async fn find_comment(
        &self,
        comment_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<Comment>> {
        let Some(row) = self.find_comment_by_id(comment_id).await? else {
            return Ok(None);
        };

        let reacted = match viewer {
            Some(viewer) => self.has_reacted(comment_id, viewer).await?,
            None => false,
        };
        Ok(Some(row.into_domain(reacted)))
    }

    async fn list_post_comments(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Comment>> {
        let rows = self.list_comments_by_post(post_id).await?;
        let reacted = match viewer {
            Some(viewer) => self.find_reacted_comment_ids(post_id, viewer).await?,
            None => Default::default(),
        };

        Ok(rows
            .into_iter()
            .map(|row| {
                let has_reacted = reacted.contains(&row.id);
                row.into_domain(has_reacted)
            })
            .collect())
    }

    async fn tombstone_comment(&self, comment_id: Uuid, owner_id: Uuid) -> Result<bool> {
        Ok(self.tombstone_owned_comment(comment_id, owner_id).await?)
    }

    async fn toggle_comment_reaction(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReactionState>> {
        let toggled = self.toggle_reaction(comment_id, user_id).await?;
        Ok(toggled.map(|(reacted, reaction_count)| ReactionState {
            reacted,
            reaction_count,
        }))
    }
}

#[async_trait::async_trait]
impl PostStore for PgClient {
    async fn create_draft_post(&self, author_id: Uuid) -> Result<Post> {
        let row = self.insert_post(model::NewPost::draft(author_id)).await?;
        Ok(row.into())
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.find_post_by_id(post_id).await?.map(Into::into))
    }

    async fn list_published_posts(&self) -> Result<Vec<Post>> {
        let rows = PostRepository::list_published_posts(self).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        owner_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>> {
        if changes.is_empty() {
            let post = self.find_post_by_id(post_id).await?;
            return Ok(post
                .filter(|p| p.author_id == owner_id)
                .map(Into::into));
        }

        let row = self
            .update_owned_post(post_id, owner_id, UpdatePost::from_changes(changes))
            .await?;
        Ok(row.map(Into::into))
    }

    async fn set_post_status(
        &self,
        post_id: Uuid,
        owner_id: Uuid,
        status: PostStatus,
    ) -> Result<Option<Post>> {
        let row = self
            .update_owned_post(post_id, owner_id, UpdatePost::transition(status.into()))
            .await?;
        Ok(row.map(Into::into))
    }

    async fn delete_post(&self, post_id: Uuid, owner_id: Uuid) -> Result<bool> {
        Ok(self.delete_owned_post(post_id, owner_id).await?)
    }
}

#[async_trait::async_trait]
impl EngagementStore for PgClient {
    async fn toggle_engagement(
        &self,
        kind: EngagementKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<EngagementState> {
        let (active, count) = EngagementRepository::toggle_engagement(self, kind, post_id, user_id)
            .await
            .map_err(Error::from)?;
        Ok(EngagementState { active, count })
    }

    async fn engagement_summary(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<EngagementSummary> {
        let (liked, like_count) = self
            .engagement_state(EngagementKind::Like, post_id, viewer)
            .await?;
        let (bookmarked, bookmark_count) = self
            .engagement_state(EngagementKind::Bookmark, post_id, viewer)
            .await?;

        Ok(EngagementSummary {
            liked,
            bookmarked,
            like_count,
            bookmark_count,
        })
    }
}
