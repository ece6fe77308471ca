//! Database models mapping rows to Rust types.

mod comment;
mod engagement;
mod post;

pub use comment::{Comment, CommentReaction, NewComment};
pub use engagement::{NewPostBookmark, NewPostLike};
pub use post::{NewPost, Post, UpdatePost};
