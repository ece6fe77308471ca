//! PostgreSQL-specific enumerations.

mod post_status;

pub use post_status::PostStatus;
