//! Arena holding one post's comments and the parent index that links them.

use std::collections::{HashMap, HashSet};

use jiff::Timestamp;
use kbw_core::types::{Comment, ReactionState};
use kbw_core::{Error, Result};
use serde::Serialize;
use uuid::Uuid;

/// A visible comment with its visible replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

/// Siblings and roots are kept ascending by this key.
fn creation_order(comment: &Comment) -> (Timestamp, Uuid) {
    (comment.created_at, comment.id)
}

/// Returns whether following `parent` upwards leads back to `id`.
fn closes_cycle(parents: &HashMap<Uuid, Option<Uuid>>, id: Uuid, parent: Uuid) -> bool {
    let mut seen = HashSet::new();
    let mut cursor = Some(parent);
    while let Some(current) = cursor {
        if current == id {
            return true;
        }
        if !seen.insert(current) {
            return false;
        }
        cursor = parents.get(&current).copied().flatten();
    }
    false
}

/// Flat map of comments plus a parent-to-children index.
///
/// Every comment is reachable from exactly one root. Children and roots are
/// ordered by creation time, ties broken by id.
#[derive(Debug, Clone, Default)]
pub struct CommentForest {
    nodes: HashMap<Uuid, Comment>,
    children: HashMap<Uuid, Vec<Uuid>>,
    roots: Vec<Uuid>,
}

impl CommentForest {
    /// Creates an empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a forest from a flat list of rows in any order.
    ///
    /// A row whose parent is not in the batch, or whose parent chain leads
    /// back to itself, becomes a root. Repeated ids keep the first row.
    pub fn from_rows(rows: impl IntoIterator<Item = Comment>) -> Self {
        let mut rows: Vec<Comment> = rows.into_iter().collect();
        rows.sort_by_key(creation_order);

        let parents: HashMap<Uuid, Option<Uuid>> =
            rows.iter().map(|row| (row.id, row.parent_id)).collect();

        let mut forest = Self::new();
        for row in rows {
            if forest.nodes.contains_key(&row.id) {
                continue;
            }

            let parent = row.parent_id.filter(|&parent| {
                parents.contains_key(&parent) && !closes_cycle(&parents, row.id, parent)
            });
            match parent {
                Some(parent) => forest.children.entry(parent).or_default().push(row.id),
                None => forest.roots.push(row.id),
            }
            forest.nodes.insert(row.id, row);
        }

        forest
    }

    /// Returns the number of comments, deleted ones included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns whether the forest holds no comments.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Returns whether the forest holds `id`.
    pub fn contains(&self, id: Uuid) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Returns a comment by id.
    pub fn get(&self, id: Uuid) -> Option<&Comment> {
        self.nodes.get(&id)
    }

    /// Returns the ids of a comment's direct replies in creation order.
    pub fn replies(&self, id: Uuid) -> &[Uuid] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the root ids in creation order.
    pub fn roots(&self) -> &[Uuid] {
        &self.roots
    }

    /// Places `node` under `parent_id`, wherever that parent sits.
    ///
    /// Inserting an id that is already present does nothing.
    ///
    /// # Errors
    ///
    /// Returns a not-found error when `parent_id` is not in the forest.
    pub fn insert_reply(&mut self, parent_id: Uuid, mut node: Comment) -> Result<()> {
        if self.nodes.contains_key(&node.id) {
            return Ok(());
        }
        if !self.nodes.contains_key(&parent_id) {
            return Err(Error::not_found("comment"));
        }

        node.parent_id = Some(parent_id);
        let siblings = self.children.entry(parent_id).or_default();
        Self::insert_ordered(siblings, &self.nodes, &node);
        self.nodes.insert(node.id, node);
        Ok(())
    }

    /// Adds `node` as a root. Inserting an id that is already present does nothing.
    pub fn insert_root(&mut self, node: Comment) {
        if self.nodes.contains_key(&node.id) {
            return;
        }

        Self::insert_ordered(&mut self.roots, &self.nodes, &node);
        self.nodes.insert(node.id, node);
    }

    fn insert_ordered(ids: &mut Vec<Uuid>, nodes: &HashMap<Uuid, Comment>, node: &Comment) {
        let key = creation_order(node);
        let at = ids.partition_point(|id| nodes.get(id).is_some_and(|c| creation_order(c) <= key));
        ids.insert(at, node.id);
    }

    /// Replaces a comment's content with the tombstone. Replies stay in place.
    ///
    /// Returns `false` when `id` is not in the forest.
    pub fn soft_delete(&mut self, id: Uuid) -> bool {
        match self.nodes.get_mut(&id) {
            Some(comment) => {
                comment.tombstone(Timestamp::now());
                true
            }
            None => false,
        }
    }

    /// Overwrites a comment's reaction flag and count.
    pub fn set_reaction(&mut self, id: Uuid, state: ReactionState) -> bool {
        match self.nodes.get_mut(&id) {
            Some(comment) => {
                comment.reacted = state.reacted;
                comment.reaction_count = state.reaction_count;
                true
            }
            None => false,
        }
    }

    /// Returns the reaction flag and count of a comment.
    pub fn reaction(&self, id: Uuid) -> Option<ReactionState> {
        self.nodes.get(&id).map(|comment| ReactionState {
            reacted: comment.reacted,
            reaction_count: comment.reaction_count,
        })
    }

    /// Visits every comment depth-first, parents before replies.
    pub fn preorder(&self) -> Vec<&Comment> {
        let mut visited = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<Uuid> = self.roots.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            if let Some(comment) = self.nodes.get(&id) {
                visited.push(comment);
            }
            stack.extend(self.replies(id).iter().rev().copied());
        }
        visited
    }

    /// Returns the nested tree `viewer` may see.
    ///
    /// Visibility is decided per comment. Visible replies of a hidden comment
    /// surface as roots.
    pub fn view(&self, viewer: Option<Uuid>) -> Vec<CommentNode> {
        let mut promoted = Vec::new();
        let mut roots: Vec<CommentNode> = self
            .roots
            .iter()
            .filter_map(|&id| self.visible_subtree(id, viewer, &mut promoted))
            .collect();

        if !promoted.is_empty() {
            roots.append(&mut promoted);
            roots.sort_by_key(|node| creation_order(&node.comment));
        }
        roots
    }

    fn visible_subtree(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
        promoted: &mut Vec<CommentNode>,
    ) -> Option<CommentNode> {
        let comment = self.nodes.get(&id)?;
        let replies: Vec<CommentNode> = self
            .replies(id)
            .iter()
            .filter_map(|&child| self.visible_subtree(child, viewer, promoted))
            .collect();

        if comment.is_visible_to(viewer) {
            Some(CommentNode {
                comment: comment.clone(),
                replies,
            })
        } else {
            promoted.extend(replies);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use kbw_core::ErrorKind;
    use kbw_core::types::TOMBSTONE_CONTENT;

    use super::*;

    fn post_id() -> Uuid {
        Uuid::from_u128(0xb10c)
    }

    fn comment(id: u128, parent: Option<u128>, second: i64) -> Comment {
        Comment {
            id: Uuid::from_u128(id),
            post_id: post_id(),
            parent_id: parent.map(Uuid::from_u128),
            author_id: Some(Uuid::from_u128(100)),
            content: format!("comment {id}"),
            created_at: Timestamp::from_second(second).unwrap(),
            is_moderated: true,
            reaction_count: 0,
            reacted: false,
            deleted_at: None,
        }
    }

    fn ids(comments: &[&Comment]) -> Vec<u128> {
        comments.iter().map(|c| c.id.as_u128()).collect()
    }

    fn thread() -> CommentForest {
        // 1 ── 3 ── 5
        //  └── 4
        // 2
        CommentForest::from_rows([
            comment(5, Some(3), 50),
            comment(2, None, 20),
            comment(4, Some(1), 40),
            comment(1, None, 10),
            comment(3, Some(1), 30),
        ])
    }

    #[test]
    fn from_rows_visits_every_row_once_in_creation_order() {
        let forest = thread();
        assert_eq!(forest.len(), 5);
        assert_eq!(ids(&forest.preorder()), vec![1, 3, 5, 4, 2]);
    }

    #[test]
    fn creation_ties_break_by_id() {
        let forest = CommentForest::from_rows([
            comment(9, None, 10),
            comment(7, None, 10),
            comment(8, None, 10),
        ]);
        assert_eq!(ids(&forest.preorder()), vec![7, 8, 9]);
    }

    #[test]
    fn unresolved_parent_becomes_root() {
        let forest = CommentForest::from_rows([comment(1, None, 10), comment(2, Some(42), 20)]);
        assert_eq!(forest.roots(), &[Uuid::from_u128(1), Uuid::from_u128(2)]);
    }

    #[test]
    fn cycles_are_broken_at_roots() {
        let forest = CommentForest::from_rows([
            comment(1, Some(2), 10),
            comment(2, Some(1), 20),
            comment(3, Some(1), 30),
            comment(4, Some(4), 40),
        ]);

        assert_eq!(forest.len(), 4);
        assert_eq!(forest.preorder().len(), 4);
        assert_eq!(forest.roots().len(), 3);
        assert_eq!(forest.replies(Uuid::from_u128(1)), &[Uuid::from_u128(3)]);
    }

    #[test]
    fn insert_reply_at_depth_places_node_once() -> anyhow::Result<()> {
        let mut forest = thread();
        let before: Vec<Comment> = forest.preorder().into_iter().cloned().collect();

        forest.insert_reply(Uuid::from_u128(5), comment(6, None, 60))?;
        forest.insert_reply(Uuid::from_u128(5), comment(6, None, 60))?;

        assert_eq!(ids(&forest.preorder()), vec![1, 3, 5, 6, 4, 2]);
        assert_eq!(forest.replies(Uuid::from_u128(5)), &[Uuid::from_u128(6)]);
        assert_eq!(
            forest.get(Uuid::from_u128(6)).and_then(|c| c.parent_id),
            Some(Uuid::from_u128(5))
        );
        for comment in &before {
            assert_eq!(forest.get(comment.id), Some(comment));
        }
        Ok(())
    }

    #[test]
    fn insert_reply_keeps_sibling_order() -> anyhow::Result<()> {
        let mut forest = thread();
        forest.insert_reply(Uuid::from_u128(1), comment(7, None, 35))?;
        assert_eq!(
            forest.replies(Uuid::from_u128(1)),
            &[Uuid::from_u128(3), Uuid::from_u128(7), Uuid::from_u128(4)]
        );
        Ok(())
    }

    #[test]
    fn insert_reply_under_missing_parent_fails() {
        let mut forest = thread();
        let error = forest
            .insert_reply(Uuid::from_u128(42), comment(6, None, 60))
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFoundOrForbidden);
        assert!(!forest.contains(Uuid::from_u128(6)));
    }

    #[test]
    fn insert_root_is_ordered() {
        let mut forest = thread();
        forest.insert_root(comment(6, None, 15));
        assert_eq!(
            forest.roots(),
            &[Uuid::from_u128(1), Uuid::from_u128(6), Uuid::from_u128(2)]
        );
    }

    #[test]
    fn soft_delete_is_idempotent_and_keeps_replies() {
        let mut forest = thread();
        let target = Uuid::from_u128(3);

        assert!(forest.soft_delete(target));
        let deleted_at = forest.get(target).and_then(|c| c.deleted_at);
        assert!(forest.soft_delete(target));

        let comment = forest.get(target).unwrap();
        assert_eq!(comment.content, TOMBSTONE_CONTENT);
        assert_eq!(comment.deleted_at, deleted_at);
        assert_eq!(forest.replies(target), &[Uuid::from_u128(5)]);
        assert!(!forest.soft_delete(Uuid::from_u128(42)));
    }

    #[test]
    fn pending_reply_is_visible_only_to_its_author() -> anyhow::Result<()> {
        let author = Uuid::from_u128(200);
        let mut pending = comment(6, None, 60);
        pending.is_moderated = false;
        pending.author_id = Some(author);

        let mut forest = thread();
        forest.insert_reply(Uuid::from_u128(3), pending)?;

        let own = forest.view(Some(author));
        assert_eq!(own[0].replies[0].replies.len(), 2);

        let other = forest.view(Some(Uuid::from_u128(300)));
        assert_eq!(other[0].replies[0].replies.len(), 1);
        assert_eq!(forest.view(None), other);
        Ok(())
    }

    #[test]
    fn visible_reply_of_hidden_comment_becomes_root() {
        let mut hidden = comment(3, Some(1), 30);
        hidden.is_moderated = false;
        let forest = CommentForest::from_rows([
            comment(1, None, 10),
            hidden,
            comment(5, Some(3), 50),
            comment(2, None, 20),
        ]);

        let view = forest.view(None);
        let roots: Vec<u128> = view.iter().map(|node| node.comment.id.as_u128()).collect();
        assert_eq!(roots, vec![1, 2, 5]);
        assert!(view[0].replies.is_empty());
    }

    #[test]
    fn node_serializes_flat_with_replies() -> anyhow::Result<()> {
        let forest = thread();
        let json = serde_json::to_value(forest.view(None))?;
        assert_eq!(json[0]["id"], Uuid::from_u128(1).to_string());
        assert_eq!(json[0]["replies"][0]["parentId"], Uuid::from_u128(1).to_string());
        Ok(())
    }
}
