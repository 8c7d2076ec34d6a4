//! Visibility and authorization rules.
//!
//! Every listing and the detail view decide what a viewer may see through
//! [`is_visible`]; every mutation goes through [`authorize`].

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Comment, Post};
use crate::error::DomainError;

/// Entities owned by the user who wrote them.
pub trait Authored {
    fn author_id(&self) -> Uuid;
}

impl Authored for Post {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

impl Authored for Comment {
    fn author_id(&self) -> Uuid {
        self.author_id
    }
}

/// Whether anyone may see the post.
///
/// `category_published` is false when the post has no category.
pub fn is_publicly_visible(post: &Post, category_published: bool, now: DateTime<Utc>) -> bool {
    post.is_published && category_published && post.pub_date <= now
}

/// Whether `viewer` may see the post: it is public, or the viewer wrote it.
pub fn is_visible(
    post: &Post,
    category_published: bool,
    viewer: Option<Uuid>,
    now: DateTime<Utc>,
) -> bool {
    is_publicly_visible(post, category_published, now) || viewer == Some(post.author_id)
}

/// Whether `actor` may edit or delete the entity.
pub fn can_mutate<E: Authored + ?Sized>(entity: &E, actor: Option<Uuid>) -> bool {
    actor.is_some_and(|id| id == entity.author_id())
}

/// Checks [`can_mutate`], distinguishing anonymous actors from non-owners.
pub fn authorize<E: Authored + ?Sized>(entity: &E, actor: Option<Uuid>) -> Result<Uuid, DomainError> {
    match actor {
        None => Err(DomainError::Unauthorized),
        Some(id) if can_mutate(entity, Some(id)) => Ok(id),
        Some(_) => Err(DomainError::Forbidden),
    }
}

/// Which posts a listing draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostScope {
    All,
    Category(Uuid),
    Author(Uuid),
}

/// A listing query: a scope narrowed by the visibility rule for one viewer.
///
/// Repositories evaluate this as a single predicate per post, so a viewer's
/// own public posts are never returned twice.
#[derive(Debug, Clone, Copy)]
pub struct PostFilter {
    pub scope: PostScope,
    pub viewer: Option<Uuid>,
    pub now: DateTime<Utc>,
}

impl PostFilter {
    pub fn new(scope: PostScope, viewer: Option<Uuid>) -> Self {
        Self {
            scope,
            viewer,
            now: Utc::now(),
        }
    }

    pub fn in_scope(&self, post: &Post) -> bool {
        match self.scope {
            PostScope::All => true,
            PostScope::Category(id) => post.category_id == Some(id),
            PostScope::Author(id) => post.author_id == id,
        }
    }

    pub fn admits(&self, post: &Post, category_published: bool) -> bool {
        self.in_scope(post) && is_visible(post, category_published, self.viewer, self.now)
    }
}
