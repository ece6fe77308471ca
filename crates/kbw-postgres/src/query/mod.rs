//! Repository traits implemented for [`PgClient`](crate::PgClient).

mod comment;
mod engagement;
mod post;

pub use comment::CommentRepository;
pub use engagement::EngagementRepository;
pub use post::PostRepository;
