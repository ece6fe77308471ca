use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Post-level engagement edges. The edge's existence is the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EngagementKind {
    Like,
    Bookmark,
}

/// Resulting state of a like or bookmark toggle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementState {
    pub active: bool,
    pub count: i64,
}

impl EngagementState {
    /// Returns the state after flipping locally, before the server answers.
    pub fn flipped(self) -> Self {
        let active = !self.active;
        let count = if active { self.count + 1 } else { (self.count - 1).max(0) };
        Self { active, count }
    }
}

/// Likes and bookmarks of a post as seen by one viewer.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSummary {
    pub liked: bool,
    pub bookmarked: bool,
    pub like_count: i64,
    pub bookmark_count: i64,
}

impl EngagementSummary {
    /// Returns the state of one engagement kind.
    pub fn state(&self, kind: EngagementKind) -> EngagementState {
        match kind {
            EngagementKind::Like => EngagementState {
                active: self.liked,
                count: self.like_count,
            },
            EngagementKind::Bookmark => EngagementState {
                active: self.bookmarked,
                count: self.bookmark_count,
            },
        }
    }
}

/// Resulting state of a comment reaction toggle. Authoritative when sent by the server.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionState {
    pub reacted: bool,
    pub reaction_count: i64,
}

impl ReactionState {
    /// Returns the state after flipping locally, before the server answers.
    pub fn flipped(self) -> Self {
        let reacted = !self.reacted;
        let reaction_count = if reacted {
            self.reaction_count + 1
        } else {
            (self.reaction_count - 1).max(0)
        };
        Self {
            reacted,
            reaction_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_adjusts_count() {
        let state = ReactionState {
            reacted: false,
            reaction_count: 3,
        };
        assert_eq!(
            state.flipped(),
            ReactionState {
                reacted: true,
                reaction_count: 4
            }
        );
        assert_eq!(state.flipped().flipped(), state);
    }

    #[test]
    fn flip_never_goes_negative() {
        let state = EngagementState {
            active: true,
            count: 0,
        };
        assert_eq!(state.flipped().count, 0);
    }
}
