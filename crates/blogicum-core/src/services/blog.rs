//! Blog use cases: listings, post detail, and post/comment mutations.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{Category, Comment, Location, Post, PostDraft, User};
use crate::error::DomainError;
use crate::pagination::{Page, PageRequest};
use crate::policy::{self, Authored, PostFilter, PostScope};
use crate::ports::{
    CategoryRepository, CommentRepository, LocationRepository, PostRepository, UserRepository,
};

/// The public identity of an author.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
}

impl From<&User> for AuthorRef {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

/// A post as it appears in listings.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub post: Post,
    pub author: AuthorRef,
    pub category: Option<Category>,
    /// Only set when the location is published.
    pub location: Option<Location>,
    pub comment_count: u64,
}

#[derive(Debug, Clone)]
pub struct CommentView {
    pub comment: Comment,
    pub author: AuthorRef,
}

/// A post with its comments, oldest first.
#[derive(Debug, Clone)]
pub struct PostDetail {
    pub summary: PostSummary,
    pub comments: Vec<CommentView>,
}

/// Per-call memo of referenced rows, so a page of posts by the same author
/// resolves that author once.
#[derive(Default)]
struct Lookups {
    authors: HashMap<Uuid, AuthorRef>,
    categories: HashMap<Uuid, Option<Category>>,
    locations: HashMap<Uuid, Option<Location>>,
}

/// Blog service - listings, detail view and author-only mutations.
#[derive(Clone)]
pub struct BlogService {
    users: Arc<dyn UserRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl BlogService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        categories: Arc<dyn CategoryRepository>,
        locations: Arc<dyn LocationRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
    ) -> Self {
        Self {
            users,
            categories,
            locations,
            posts,
            comments,
        }
    }

    /// Home listing: every post the viewer may see.
    pub async fn home(
        &self,
        viewer: Option<Uuid>,
        page: PageRequest,
    ) -> Result<Page<PostSummary>, DomainError> {
        self.assemble(PostFilter::new(PostScope::All, viewer), page)
            .await
    }

    /// Category listing. The category itself must be published.
    pub async fn category_posts(
        &self,
        slug: &str,
        viewer: Option<Uuid>,
        page: PageRequest,
    ) -> Result<(Category, Page<PostSummary>), DomainError> {
        let category = self
            .categories
            .find_by_slug(slug)
            .await?
            .filter(|c| c.is_published)
            .ok_or_else(|| DomainError::not_found("category", slug))?;

        let page = self
            .assemble(PostFilter::new(PostScope::Category(category.id), viewer), page)
            .await?;

        Ok((category, page))
    }

    /// Profile listing: posts written by `username` that the viewer may see.
    pub async fn profile_posts(
        &self,
        username: &str,
        viewer: Option<Uuid>,
        page: PageRequest,
    ) -> Result<(User, Page<PostSummary>), DomainError> {
        let user = self
            .users
            .find_by_username(username)
            .await?
            .ok_or_else(|| DomainError::not_found("user", username))?;

        let page = self
            .assemble(PostFilter::new(PostScope::Author(user.id), viewer), page)
            .await?;

        Ok((user, page))
    }

    /// A single post with its comments. Posts hidden from the viewer are
    /// reported as missing.
    pub async fn post_detail(
        &self,
        id: Uuid,
        viewer: Option<Uuid>,
    ) -> Result<PostDetail, DomainError> {
        let post = self.visible_post(id, viewer).await?;
        let comments = self.comments.find_by_post(post.id).await?;

        let mut lookups = Lookups::default();
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            let author = self.author(&mut lookups, comment.author_id).await?;
            views.push(CommentView { comment, author });
        }

        let count = views.len() as u64;
        let summary = self.summarize(&mut lookups, post, count).await?;

        Ok(PostDetail {
            summary,
            comments: views,
        })
    }

    pub async fn create_post(
        &self,
        actor: Option<Uuid>,
        draft: PostDraft,
    ) -> Result<Post, DomainError> {
        let author_id = actor.ok_or(DomainError::Unauthorized)?;
        self.check_references(&draft).await?;

        let post = self.posts.create(Post::new(author_id, draft)).await?;
        tracing::info!(post_id = %post.id, author_id = %author_id, "Post created");

        Ok(post)
    }

    pub async fn update_post(
        &self,
        id: Uuid,
        actor: Option<Uuid>,
        draft: PostDraft,
    ) -> Result<Post, DomainError> {
        let actor = actor.ok_or(DomainError::Unauthorized)?;
        let mut post = self.find_post(id).await?;
        authorize(&post, actor, "post", id)?;
        self.check_references(&draft).await?;

        post.apply(draft);
        let post = self.posts.update(post).await?;
        tracing::info!(post_id = %id, "Post updated");

        Ok(post)
    }

    /// Deletes a post together with its comments.
    pub async fn delete_post(&self, id: Uuid, actor: Option<Uuid>) -> Result<(), DomainError> {
        let actor = actor.ok_or(DomainError::Unauthorized)?;
        let post = self.find_post(id).await?;
        authorize(&post, actor, "post", id)?;

        self.posts.delete(id).await?;
        tracing::info!(post_id = %id, "Post deleted");

        Ok(())
    }

    /// Adds a comment to a post the actor can see.
    pub async fn add_comment(
        &self,
        post_id: Uuid,
        actor: Option<Uuid>,
        text: String,
    ) -> Result<CommentView, DomainError> {
        let author_id = actor.ok_or(DomainError::Unauthorized)?;
        let post = self.visible_post(post_id, actor).await?;

        let comment = self
            .comments
            .create(Comment::new(post.id, author_id, text))
            .await?;
        tracing::info!(comment_id = %comment.id, post_id = %post_id, "Comment added");

        self.comment_view(comment).await
    }

    pub async fn update_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        actor: Option<Uuid>,
        text: String,
    ) -> Result<CommentView, DomainError> {
        let actor = actor.ok_or(DomainError::Unauthorized)?;
        let mut comment = self.find_comment(post_id, comment_id).await?;
        authorize(&comment, actor, "comment", comment_id)?;

        comment.text = text;
        let comment = self.comments.update(comment).await?;
        tracing::info!(comment_id = %comment_id, "Comment updated");

        self.comment_view(comment).await
    }

    pub async fn delete_comment(
        &self,
        post_id: Uuid,
        comment_id: Uuid,
        actor: Option<Uuid>,
    ) -> Result<(), DomainError> {
        let actor = actor.ok_or(DomainError::Unauthorized)?;
        let comment = self.find_comment(post_id, comment_id).await?;
        authorize(&comment, actor, "comment", comment_id)?;

        self.comments.delete(comment_id).await?;
        tracing::info!(comment_id = %comment_id, "Comment deleted");

        Ok(())
    }

    async fn assemble(
        &self,
        filter: PostFilter,
        page: PageRequest,
    ) -> Result<Page<PostSummary>, DomainError> {
        let total = self.posts.count_matching(&filter).await?;
        let window = page.resolve(total);

        let posts = self
            .posts
            .find_matching(&filter, window.offset, window.limit)
            .await?;

        let ids: Vec<Uuid> = posts.iter().map(|p| p.id).collect();
        let counts = self.comments.count_by_posts(&ids).await?;

        let mut lookups = Lookups::default();
        let mut items = Vec::with_capacity(posts.len());
        for post in posts {
            let count = counts.get(&post.id).copied().unwrap_or(0);
            items.push(self.summarize(&mut lookups, post, count).await?);
        }

        Ok(Page::new(items, window))
    }

    async fn summarize(
        &self,
        lookups: &mut Lookups,
        post: Post,
        comment_count: u64,
    ) -> Result<PostSummary, DomainError> {
        let author = self.author(lookups, post.author_id).await?;
        let category = match post.category_id {
            Some(id) => self.category(lookups, id).await?,
            None => None,
        };
        let location = match post.location_id {
            Some(id) => self.location(lookups, id).await?.filter(|l| l.is_published),
            None => None,
        };

        Ok(PostSummary {
            post,
            author,
            category,
            location,
            comment_count,
        })
    }

    /// Resolves the comment's author from the stored user.
    async fn comment_view(&self, comment: Comment) -> Result<CommentView, DomainError> {
        let author = self
            .author(&mut Lookups::default(), comment.author_id)
            .await?;

        Ok(CommentView { comment, author })
    }

    async fn author(&self, lookups: &mut Lookups, id: Uuid) -> Result<AuthorRef, DomainError> {
        if let Some(author) = lookups.authors.get(&id) {
            return Ok(author.clone());
        }

        let user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id))?;
        let author = AuthorRef::from(&user);
        lookups.authors.insert(id, author.clone());

        Ok(author)
    }

    async fn category(
        &self,
        lookups: &mut Lookups,
        id: Uuid,
    ) -> Result<Option<Category>, DomainError> {
        if let Some(category) = lookups.categories.get(&id) {
            return Ok(category.clone());
        }

        let category = self.categories.find_by_id(id).await?;
        lookups.categories.insert(id, category.clone());

        Ok(category)
    }

    async fn location(
        &self,
        lookups: &mut Lookups,
        id: Uuid,
    ) -> Result<Option<Location>, DomainError> {
        if let Some(location) = lookups.locations.get(&id) {
            return Ok(location.clone());
        }

        let location = self.locations.find_by_id(id).await?;
        lookups.locations.insert(id, location.clone());

        Ok(location)
    }

    async fn find_post(&self, id: Uuid) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("post", id))
    }

    async fn visible_post(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Post, DomainError> {
        let post = self.find_post(id).await?;

        let category_published = match post.category_id {
            Some(category_id) => self
                .categories
                .find_by_id(category_id)
                .await?
                .is_some_and(|c| c.is_published),
            None => false,
        };

        if !policy::is_visible(&post, category_published, viewer, Utc::now()) {
            return Err(DomainError::not_found("post", id));
        }

        Ok(post)
    }

    /// Looks up a comment through the post it is addressed under.
    async fn find_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<Comment, DomainError> {
        self.comments
            .find_by_id(comment_id)
            .await?
            .filter(|c| c.post_id == post_id)
            .ok_or_else(|| DomainError::not_found("comment", comment_id))
    }

    async fn check_references(&self, draft: &PostDraft) -> Result<(), DomainError> {
        if let Some(id) = draft.category_id {
            if self.categories.find_by_id(id).await?.is_none() {
                return Err(DomainError::invalid("category_id", "unknown category"));
            }
        }

        if let Some(id) = draft.location_id {
            if self.locations.find_by_id(id).await?.is_none() {
                return Err(DomainError::invalid("location_id", "unknown location"));
            }
        }

        Ok(())
    }
}

fn authorize<E: Authored>(
    entity: &E,
    actor: Uuid,
    entity_type: &'static str,
    id: Uuid,
) -> Result<(), DomainError> {
    policy::authorize(entity, Some(actor)).map(|_| ()).inspect_err(|_| {
        tracing::warn!(
            entity_type,
            entity_id = %id,
            actor_id = %actor,
            "Mutation denied: actor is not the author"
        );
    })
}
