//! Post status enumeration for the draft/published lifecycle.

use diesel_derive_enum::DbEnum;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Publication state of a post.
///
/// This enumeration corresponds to the `POST_STATUS` PostgreSQL enum.
#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
#[derive(Serialize, Deserialize, DbEnum, Display, EnumIter, EnumString)]
#[ExistingTypePath = "crate::schema::sql_types::PostStatus"]
pub enum PostStatus {
    /// Post is being written and is visible to its author only
    #[db_rename = "draft"]
    #[serde(rename = "draft")]
    #[default]
    Draft,

    /// Post is publicly readable
    #[db_rename = "published"]
    #[serde(rename = "published")]
    Published,
}

impl From<kbw_core::types::PostStatus> for PostStatus {
    fn from(status: kbw_core::types::PostStatus) -> Self {
        match status {
            kbw_core::types::PostStatus::Draft => Self::Draft,
            kbw_core::types::PostStatus::Published => Self::Published,
        }
    }
}

impl From<PostStatus> for kbw_core::types::PostStatus {
    fn from(status: PostStatus) -> Self {
        match status {
            PostStatus::Draft => Self::Draft,
            PostStatus::Published => Self::Published,
        }
    }
}
