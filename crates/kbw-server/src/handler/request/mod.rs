//! Request types for HTTP handlers.

mod paths;
mod posts;

pub use paths::{CommentPathParams, PostPathParams};
pub use posts::UpdatePostRequest;
