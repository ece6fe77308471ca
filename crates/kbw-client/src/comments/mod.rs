//! Threaded comments: the forest, the per-post store and the composer.

mod composer;
mod forest;
mod store;

pub use composer::{CommentComposer, Feedback, RATE_LIMIT_MESSAGE};
pub use forest::{CommentForest, CommentNode};
pub use store::CommentTreeStore;
