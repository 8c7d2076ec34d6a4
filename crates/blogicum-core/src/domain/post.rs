use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Post entity - a blog entry owned by its author.
///
/// A post with a `pub_date` in the future is a scheduled publication: only
/// its author sees it until that moment passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub text: String,
    pub pub_date: DateTime<Utc>,
    /// Opaque reference to an uploaded image.
    pub image: Option<String>,
    pub author_id: Uuid,
    pub location_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub is_published: bool,
    pub created_at: DateTime<Utc>,
}

/// The author-editable part of a post.
#[derive(Debug, Clone)]
pub struct PostDraft {
    pub title: String,
    pub text: String,
    pub pub_date: Option<DateTime<Utc>>,
    pub image: Option<String>,
    pub location_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub is_published: bool,
}

impl Post {
    /// Create a new post authored by `author_id`.
    pub fn new(author_id: Uuid, draft: PostDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title: draft.title,
            text: draft.text,
            pub_date: draft.pub_date.unwrap_or(now),
            image: draft.image,
            author_id,
            location_id: draft.location_id,
            category_id: draft.category_id,
            is_published: draft.is_published,
            created_at: now,
        }
    }

    /// Replace the editable fields, keeping identity, author and creation time.
    pub fn apply(&mut self, draft: PostDraft) {
        self.title = draft.title;
        self.text = draft.text;
        if let Some(pub_date) = draft.pub_date {
            self.pub_date = pub_date;
        }
        self.image = draft.image;
        self.location_id = draft.location_id;
        self.category_id = draft.category_id;
        self.is_published = draft.is_published;
    }
}
