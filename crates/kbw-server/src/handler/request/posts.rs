//! Post request types.

use kbw_core::types::PostChanges;
use serde::{Deserialize, Deserializer};
use validator::Validate;

/// Request payload for a partial post update.
///
/// Absent fields are left untouched. `coverImageUrl: null` clears the cover.
#[must_use]
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePostRequest {
    /// Post title.
    #[validate(length(max = 200))]
    #[serde(default)]
    pub title: Option<String>,
    /// Short summary shown in listings.
    #[validate(length(max = 500))]
    #[serde(default)]
    pub excerpt: Option<String>,
    /// Post body.
    #[validate(length(max = 100000))]
    #[serde(default)]
    pub content: Option<String>,
    /// Post tags.
    #[validate(length(max = 20))]
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    /// Cover image location.
    #[validate(url)]
    #[serde(default, deserialize_with = "present")]
    pub cover_image_url: Option<Option<String>>,
}

impl UpdatePostRequest {
    /// Converts to a storage-level partial update.
    pub fn into_changes(self) -> PostChanges {
        PostChanges {
            title: self.title,
            excerpt: self.excerpt,
            content: self.content,
            tags: self.tags,
            cover_image_url: self.cover_image_url,
        }
    }
}

/// Marks a field as present, keeping an explicit `null` as `Some(None)`.
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinguishes_null_from_absent() -> anyhow::Result<()> {
        let absent: UpdatePostRequest = serde_json::from_str(r#"{"title": "Hi"}"#)?;
        assert_eq!(absent.cover_image_url, None);

        let cleared: UpdatePostRequest = serde_json::from_str(r#"{"coverImageUrl": null}"#)?;
        assert_eq!(cleared.cover_image_url, Some(None));

        let changes = cleared.into_changes();
        assert_eq!(changes.cover_image_url, Some(None));
        assert!(changes.title.is_none());
        Ok(())
    }

    #[test]
    fn rejects_invalid_cover_url() -> anyhow::Result<()> {
        let request: UpdatePostRequest =
            serde_json::from_str(r#"{"coverImageUrl": "not a url"}"#)?;
        assert!(request.validate().is_err());

        let request: UpdatePostRequest =
            serde_json::from_str(r#"{"coverImageUrl": "https://cdn.kbw.vc/cover.png"}"#)?;
        assert!(request.validate().is_ok());
        Ok(())
    }

    #[test]
    fn rejects_long_title() -> anyhow::Result<()> {
        let request = UpdatePostRequest {
            title: Some("t".repeat(201)),
            ..UpdatePostRequest::default()
        };
        assert!(request.validate().is_err());
        Ok(())
    }
}
