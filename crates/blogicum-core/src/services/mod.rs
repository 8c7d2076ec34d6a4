//! Application services - use cases composed from ports.

mod blog;

pub use blog::{AuthorRef, BlogService, CommentView, PostDetail, PostSummary};
