//! In-process implementation of every storage port.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use jiff::Timestamp;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CommentStore, EngagementStore, PostStore};
use crate::types::{
    Comment, EngagementKind, EngagementState, EngagementSummary, NewComment, Post, PostChanges,
    PostStatus, ReactionState,
};
use crate::{Result, TRACING_TARGET_STORE};

#[derive(Debug, Default)]
struct MemoryState {
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
    /// (comment_id, user_id)
    reactions: HashSet<(Uuid, Uuid)>,
    /// (post_id, user_id)
    likes: HashSet<(Uuid, Uuid)>,
    bookmarks: HashSet<(Uuid, Uuid)>,
}

impl MemoryState {
    fn edges(&mut self, kind: EngagementKind) -> &mut HashSet<(Uuid, Uuid)> {
        match kind {
            EngagementKind::Like => &mut self.likes,
            EngagementKind::Bookmark => &mut self.bookmarks,
        }
    }

    fn with_viewer(&self, comment: &Comment, viewer: Option<Uuid>) -> Comment {
        let mut comment = comment.clone();
        comment.reacted = viewer.is_some_and(|v| self.reactions.contains(&(comment.id, v)));
        comment
    }
}

/// Storage held entirely in process memory.
///
/// Every conditional mutation runs under one write lock, which makes the
/// ownership check and the mutation a single atomic step. Cloning shares state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a post as-is, replacing any post with the same id.
    pub async fn put_post(&self, post: Post) {
        self.state.write().await.posts.insert(post.id, post);
    }

    /// Stores a comment as-is, replacing any comment with the same id.
    pub async fn put_comment(&self, comment: Comment) {
        self.state.write().await.comments.insert(comment.id, comment);
    }

    /// Returns the number of stored comments.
    pub async fn comment_count(&self) -> usize {
        self.state.read().await.comments.len()
    }
}

#[async_trait::async_trait]
impl CommentStore for MemoryStore {
    async fn insert_approved_comment(&self, new_comment: NewComment) -> Result<Comment> {
        let comment = Comment {
            id: Uuid::now_v7(),
            post_id: new_comment.post_id,
            parent_id: new_comment.parent_id,
            author_id: new_comment.author_id,
            content: new_comment.content,
            created_at: Timestamp::now(),
            is_moderated: true,
            reaction_count: 0,
            reacted: false,
            deleted_at: None,
        };

        self.state
            .write()
            .await
            .comments
            .insert(comment.id, comment.clone());

        tracing::debug!(
            target: TRACING_TARGET_STORE,
            comment_id = %comment.id,
            post_id = %comment.post_id,
            "Approved comment stored"
        );
        Ok(comment)
    }

    async fn find_comment(
        &self,
        comment_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Option<Comment>> {
        let state = self.state.read().await;
        Ok(state
            .comments
            .get(&comment_id)
            .map(|c| state.with_viewer(c, viewer)))
    }

    async fn list_post_comments(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<Vec<Comment>> {
        let state = self.state.read().await;
        let mut comments: Vec<Comment> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| state.with_viewer(c, viewer))
            .collect();
        comments.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(comments)
    }

    async fn tombstone_comment(&self, comment_id: Uuid, owner_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let Some(comment) = state
            .comments
            .get_mut(&comment_id)
            .filter(|c| c.is_authored_by(owner_id) && !c.is_deleted())
        else {
            return Ok(false);
        };

        comment.tombstone(Timestamp::now());
        Ok(true)
    }

    async fn toggle_comment_reaction(
        &self,
        comment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<ReactionState>> {
        let mut state = self.state.write().await;
        if !state.comments.contains_key(&comment_id) {
            return Ok(None);
        }

        let key = (comment_id, user_id);
        let reacted = if state.reactions.remove(&key) {
            false
        } else {
            state.reactions.insert(key);
            true
        };
        let reaction_count = state
            .reactions
            .iter()
            .filter(|(id, _)| *id == comment_id)
            .count() as i64;

        if let Some(comment) = state.comments.get_mut(&comment_id) {
            comment.reaction_count = reaction_count;
        }

        Ok(Some(ReactionState {
            reacted,
            reaction_count,
        }))
    }
}

#[async_trait::async_trait]
impl PostStore for MemoryStore {
    async fn create_draft_post(&self, author_id: Uuid) -> Result<Post> {
        let now = Timestamp::now();
        let post = Post {
            id: Uuid::now_v7(),
            author_id,
            title: String::new(),
            excerpt: String::new(),
            content: String::new(),
            tags: Vec::new(),
            status: PostStatus::Draft,
            cover_image_url: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        };

        self.state.write().await.posts.insert(post.id, post.clone());
        Ok(post)
    }

    async fn find_post(&self, post_id: Uuid) -> Result<Option<Post>> {
        Ok(self.state.read().await.posts.get(&post_id).cloned())
    }

    async fn list_published_posts(&self) -> Result<Vec<Post>> {
        let state = self.state.read().await;
        let mut posts: Vec<Post> = state
            .posts
            .values()
            .filter(|p| p.status == PostStatus::Published)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(posts)
    }

    async fn update_post(
        &self,
        post_id: Uuid,
        owner_id: Uuid,
        changes: PostChanges,
    ) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        let Some(post) = state
            .posts
            .get_mut(&post_id)
            .filter(|p| p.author_id == owner_id)
        else {
            return Ok(None);
        };

        post.apply(&changes);
        post.updated_at = Timestamp::now();
        Ok(Some(post.clone()))
    }

    async fn set_post_status(
        &self,
        post_id: Uuid,
        owner_id: Uuid,
        status: PostStatus,
    ) -> Result<Option<Post>> {
        let mut state = self.state.write().await;
        let Some(post) = state
            .posts
            .get_mut(&post_id)
            .filter(|p| p.author_id == owner_id)
        else {
            return Ok(None);
        };

        post.transition(status, Timestamp::now());
        Ok(Some(post.clone()))
    }

    async fn delete_post(&self, post_id: Uuid, owner_id: Uuid) -> Result<bool> {
        let mut state = self.state.write().await;
        let owned = state
            .posts
            .get(&post_id)
            .is_some_and(|p| p.author_id == owner_id);
        if !owned {
            return Ok(false);
        }

        state.posts.remove(&post_id);
        let removed: HashSet<Uuid> = state
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .map(|c| c.id)
            .collect();
        state.comments.retain(|id, _| !removed.contains(id));
        state.reactions.retain(|(id, _)| !removed.contains(id));
        state.likes.retain(|(id, _)| *id != post_id);
        state.bookmarks.retain(|(id, _)| *id != post_id);
        Ok(true)
    }
}

#[async_trait::async_trait]
impl EngagementStore for MemoryStore {
    async fn toggle_engagement(
        &self,
        kind: EngagementKind,
        post_id: Uuid,
        user_id: Uuid,
    ) -> Result<EngagementState> {
        let mut state = self.state.write().await;
        let edges = state.edges(kind);
        let key = (post_id, user_id);
        let active = if edges.remove(&key) {
            false
        } else {
            edges.insert(key);
            true
        };
        let count = edges.iter().filter(|(id, _)| *id == post_id).count() as i64;

        Ok(EngagementState { active, count })
    }

    async fn engagement_summary(
        &self,
        post_id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<EngagementSummary> {
        let state = self.state.read().await;
        let count = |edges: &HashSet<(Uuid, Uuid)>| {
            edges.iter().filter(|(id, _)| *id == post_id).count() as i64
        };
        let has = |edges: &HashSet<(Uuid, Uuid)>| {
            viewer.is_some_and(|v| edges.contains(&(post_id, v)))
        };

        Ok(EngagementSummary {
            liked: has(&state.likes),
            bookmarked: has(&state.bookmarks),
            like_count: count(&state.likes),
            bookmark_count: count(&state.bookmarks),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TOMBSTONE_CONTENT;

    fn new_comment(post_id: Uuid, author_id: Option<Uuid>) -> NewComment {
        NewComment {
            post_id,
            parent_id: None,
            author_id,
            content: "Great writeup, thanks!".to_owned(),
        }
    }

    #[tokio::test]
    async fn approved_comments_are_moderated_and_ordered() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let post_id = Uuid::now_v7();
        let first = store.insert_approved_comment(new_comment(post_id, None)).await?;
        let second = store.insert_approved_comment(new_comment(post_id, None)).await?;

        let listed = store.list_post_comments(post_id, None).await?;
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
        assert!(listed.iter().all(|c| c.is_moderated));
        Ok(())
    }

    #[tokio::test]
    async fn concurrent_owner_deletes_tombstone_once() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let comment = store
            .insert_approved_comment(new_comment(Uuid::now_v7(), Some(owner)))
            .await?;

        let (a, b) = tokio::join!(
            store.tombstone_comment(comment.id, owner),
            store.tombstone_comment(comment.id, owner),
        );
        let successes = [a?, b?].into_iter().filter(|ok| *ok).count();
        assert_eq!(successes, 1);

        let stored = store.find_comment(comment.id, None).await?;
        assert_eq!(stored.map(|c| c.content).as_deref(), Some(TOMBSTONE_CONTENT));
        Ok(())
    }

    #[tokio::test]
    async fn non_owner_cannot_tombstone() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let comment = store
            .insert_approved_comment(new_comment(Uuid::now_v7(), Some(Uuid::new_v4())))
            .await?;
        assert!(!store.tombstone_comment(comment.id, Uuid::new_v4()).await?);
        assert!(!store.tombstone_comment(Uuid::now_v7(), Uuid::new_v4()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn reaction_toggle_is_existence_based() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let comment = store
            .insert_approved_comment(new_comment(Uuid::now_v7(), None))
            .await?;

        let on = store.toggle_comment_reaction(comment.id, user).await?;
        assert_eq!(
            on,
            Some(ReactionState {
                reacted: true,
                reaction_count: 1
            })
        );
        let seen = store.find_comment(comment.id, Some(user)).await?;
        assert!(seen.is_some_and(|c| c.reacted && c.reaction_count == 1));

        let off = store.toggle_comment_reaction(comment.id, user).await?;
        assert_eq!(off, Some(ReactionState::default()));

        assert!(store
            .toggle_comment_reaction(Uuid::now_v7(), user)
            .await?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn post_mutations_require_ownership() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let owner = Uuid::new_v4();
        let stranger = Uuid::new_v4();
        let post = store.create_draft_post(owner).await?;

        let changes = PostChanges {
            title: Some("Hello".to_owned()),
            ..Default::default()
        };
        assert!(store.update_post(post.id, stranger, changes.clone()).await?.is_none());
        let updated = store.update_post(post.id, owner, changes).await?;
        assert_eq!(updated.map(|p| p.title).as_deref(), Some("Hello"));

        assert!(store
            .set_post_status(post.id, stranger, PostStatus::Published)
            .await?
            .is_none());
        let published = store
            .set_post_status(post.id, owner, PostStatus::Published)
            .await?;
        assert!(published.is_some_and(|p| p.published_at.is_some()));
        assert_eq!(store.list_published_posts().await?.len(), 1);

        assert!(!store.delete_post(post.id, stranger).await?);
        assert!(store.delete_post(post.id, owner).await?);
        assert!(store.find_post(post.id).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn engagement_toggle_returns_resulting_state() -> anyhow::Result<()> {
        let store = MemoryStore::new();
        let post_id = Uuid::now_v7();
        let user = Uuid::new_v4();

        let liked = store
            .toggle_engagement(EngagementKind::Like, post_id, user)
            .await?;
        assert_eq!(liked, EngagementState { active: true, count: 1 });

        let summary = store.engagement_summary(post_id, Some(user)).await?;
        assert!(summary.liked);
        assert!(!summary.bookmarked);
        assert_eq!(summary.like_count, 1);

        let unliked = store
            .toggle_engagement(EngagementKind::Like, post_id, user)
            .await?;
        assert_eq!(unliked, EngagementState { active: false, count: 0 });
        Ok(())
    }
}
