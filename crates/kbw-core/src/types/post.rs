//! Blog posts and their draft/published lifecycle.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Error, Result};

/// Publication state of a post.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PostStatus {
    #[default]
    Draft,
    Published,
}

/// A blog post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub tags: Vec<String>,
    pub status: PostStatus,
    pub cover_image_url: Option<String>,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Post {
    /// Returns the editable fields of the post.
    pub fn fields(&self) -> PostFields {
        PostFields {
            title: self.title.clone(),
            excerpt: self.excerpt.clone(),
            content: self.content.clone(),
            tags: self.tags.clone(),
            cover_image_url: self.cover_image_url.clone(),
        }
    }

    /// Returns whether `viewer` may read the post.
    pub fn is_visible_to(&self, viewer: Option<Uuid>) -> bool {
        self.status == PostStatus::Published || viewer == Some(self.author_id)
    }

    /// Applies a partial update in place.
    pub fn apply(&mut self, changes: &PostChanges) {
        if let Some(title) = &changes.title {
            self.title.clone_from(title);
        }
        if let Some(excerpt) = &changes.excerpt {
            self.excerpt.clone_from(excerpt);
        }
        if let Some(content) = &changes.content {
            self.content.clone_from(content);
        }
        if let Some(tags) = &changes.tags {
            self.tags.clone_from(tags);
        }
        if let Some(cover) = &changes.cover_image_url {
            self.cover_image_url.clone_from(cover);
        }
    }

    /// Moves the post to `status`, stamping or clearing `published_at`.
    pub fn transition(&mut self, status: PostStatus, at: Timestamp) {
        self.published_at = match status {
            PostStatus::Published => Some(at),
            PostStatus::Draft => None,
        };
        self.status = status;
        self.updated_at = at;
    }
}

/// Editable fields of a post, compared by value to detect unsaved changes.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostFields {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub tags: Vec<String>,
    pub cover_image_url: Option<String>,
}

impl PostFields {
    /// Checks the fields required before publishing.
    pub fn validate_for_publish(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::validation("title is required to publish"));
        }
        if self.content.trim().is_empty() {
            return Err(Error::validation("content is required to publish"));
        }
        Ok(())
    }

    /// Returns a partial update that overwrites every field.
    pub fn to_changes(&self) -> PostChanges {
        PostChanges {
            title: Some(self.title.clone()),
            excerpt: Some(self.excerpt.clone()),
            content: Some(self.content.clone()),
            tags: Some(self.tags.clone()),
            cover_image_url: Some(self.cover_image_url.clone()),
        }
    }
}

/// Field-level partial update. `None` leaves a field untouched.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// `Some(None)` clears the cover image.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "double_option"
    )]
    pub cover_image_url: Option<Option<String>>,
}

impl PostChanges {
    /// Returns whether the update changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.excerpt.is_none()
            && self.content.is_none()
            && self.tags.is_none()
            && self.cover_image_url.is_none()
    }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(value: &Option<Option<String>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}
