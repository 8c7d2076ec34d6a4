//! In-memory store - used when no database is configured, and in tests.
//!
//! All tables sit behind a single lock so cascading deletes are atomic.
//! Note: Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use blogicum_core::domain::{Category, Comment, Location, Post, User};
use blogicum_core::error::RepoError;
use blogicum_core::policy::PostFilter;
use blogicum_core::ports::{
    BaseRepository, CategoryRepository, CommentRepository, LocationRepository, PostRepository,
    UserRepository,
};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    categories: HashMap<Uuid, Category>,
    locations: HashMap<Uuid, Location>,
    posts: HashMap<Uuid, Post>,
    comments: HashMap<Uuid, Comment>,
}

impl Tables {
    fn category_published(&self, post: &Post) -> bool {
        post.category_id
            .and_then(|id| self.categories.get(&id))
            .is_some_and(|c| c.is_published)
    }

    fn matching<'a>(&'a self, filter: &'a PostFilter) -> impl Iterator<Item = &'a Post> + 'a {
        self.posts
            .values()
            .filter(move |post| filter.admits(post, self.category_published(post)))
    }

    fn remove_post(&mut self, id: Uuid) {
        self.posts.remove(&id);
        self.comments.retain(|_, c| c.post_id != id);
    }
}

/// Row access for one table of the store.
trait Stored: Clone + Send + Sync {
    fn id(&self) -> Uuid;

    fn table(tables: &Tables) -> &HashMap<Uuid, Self>;

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self>;

    /// Unique constraints other than the primary key.
    fn check_unique(_tables: &Tables, _row: &Self) -> Result<(), RepoError> {
        Ok(())
    }

    /// Remove the row and apply the foreign key actions that point at it.
    fn remove(tables: &mut Tables, id: Uuid);
}

impl Stored for User {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.users
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.users
    }

    fn check_unique(tables: &Tables, row: &Self) -> Result<(), RepoError> {
        for other in tables.users.values().filter(|u| u.id != row.id) {
            if other.username == row.username {
                return Err(RepoError::Constraint("username already taken".to_string()));
            }
            if other.email == row.email {
                return Err(RepoError::Constraint("email already registered".to_string()));
            }
        }
        Ok(())
    }

    fn remove(tables: &mut Tables, id: Uuid) {
        tables.users.remove(&id);

        let authored: Vec<Uuid> = tables
            .posts
            .values()
            .filter(|p| p.author_id == id)
            .map(|p| p.id)
            .collect();
        for post_id in authored {
            tables.remove_post(post_id);
        }

        tables.comments.retain(|_, c| c.author_id != id);
    }
}

impl Stored for Category {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.categories
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.categories
    }

    fn check_unique(tables: &Tables, row: &Self) -> Result<(), RepoError> {
        if tables
            .categories
            .values()
            .any(|c| c.id != row.id && c.slug == row.slug)
        {
            return Err(RepoError::Constraint("slug already in use".to_string()));
        }
        Ok(())
    }

    fn remove(tables: &mut Tables, id: Uuid) {
        tables.categories.remove(&id);
        for post in tables.posts.values_mut() {
            if post.category_id == Some(id) {
                post.category_id = None;
            }
        }
    }
}

impl Stored for Location {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.locations
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.locations
    }

    fn remove(tables: &mut Tables, id: Uuid) {
        tables.locations.remove(&id);
        for post in tables.posts.values_mut() {
            if post.location_id == Some(id) {
                post.location_id = None;
            }
        }
    }
}

impl Stored for Post {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.posts
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.posts
    }

    fn remove(tables: &mut Tables, id: Uuid) {
        tables.remove_post(id);
    }
}

impl Stored for Comment {
    fn id(&self) -> Uuid {
        self.id
    }

    fn table(tables: &Tables) -> &HashMap<Uuid, Self> {
        &tables.comments
    }

    fn table_mut(tables: &mut Tables) -> &mut HashMap<Uuid, Self> {
        &mut tables.comments
    }

    fn remove(tables: &mut Tables, id: Uuid) {
        tables.comments.remove(&id);
    }
}

/// In-memory implementation of every repository port.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
        }
    }

    async fn get<T: Stored>(&self, id: Uuid) -> Result<Option<T>, RepoError> {
        let tables = self.tables.read().await;
        Ok(T::table(&tables).get(&id).cloned())
    }

    async fn insert<T: Stored>(&self, row: T) -> Result<T, RepoError> {
        let mut tables = self.tables.write().await;
        if T::table(&tables).contains_key(&row.id()) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        T::check_unique(&tables, &row)?;

        T::table_mut(&mut tables).insert(row.id(), row.clone());
        Ok(row)
    }

    async fn replace<T: Stored>(&self, row: T) -> Result<T, RepoError> {
        let mut tables = self.tables.write().await;
        if !T::table(&tables).contains_key(&row.id()) {
            return Err(RepoError::NotFound);
        }
        T::check_unique(&tables, &row)?;

        T::table_mut(&mut tables).insert(row.id(), row.clone());
        Ok(row)
    }

    async fn remove<T: Stored>(&self, id: Uuid) -> Result<(), RepoError> {
        let mut tables = self.tables.write().await;
        if !T::table(&tables).contains_key(&id) {
            return Err(RepoError::NotFound);
        }

        T::remove(&mut tables, id);
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseRepository<User, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepoError> {
        self.get(id).await
    }

    async fn create(&self, entity: User) -> Result<User, RepoError> {
        self.insert(entity).await
    }

    async fn update(&self, entity: User) -> Result<User, RepoError> {
        self.replace(entity).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.remove::<User>(id).await
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl BaseRepository<Category, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Category>, RepoError> {
        self.get(id).await
    }

    async fn create(&self, entity: Category) -> Result<Category, RepoError> {
        self.insert(entity).await
    }

    async fn update(&self, entity: Category) -> Result<Category, RepoError> {
        self.replace(entity).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.remove::<Category>(id).await
    }
}

#[async_trait]
impl CategoryRepository for InMemoryStore {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<Category>, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.categories.values().find(|c| c.slug == slug).cloned())
    }

    async fn find_published(&self) -> Result<Vec<Category>, RepoError> {
        let tables = self.tables.read().await;
        let mut categories: Vec<Category> = tables
            .categories
            .values()
            .filter(|c| c.is_published)
            .cloned()
            .collect();
        categories.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(categories)
    }
}

#[async_trait]
impl BaseRepository<Location, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Location>, RepoError> {
        self.get(id).await
    }

    async fn create(&self, entity: Location) -> Result<Location, RepoError> {
        self.insert(entity).await
    }

    async fn update(&self, entity: Location) -> Result<Location, RepoError> {
        self.replace(entity).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.remove::<Location>(id).await
    }
}

#[async_trait]
impl LocationRepository for InMemoryStore {
    async fn find_published(&self) -> Result<Vec<Location>, RepoError> {
        let tables = self.tables.read().await;
        let mut locations: Vec<Location> = tables
            .locations
            .values()
            .filter(|l| l.is_published)
            .cloned()
            .collect();
        locations.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(locations)
    }
}

#[async_trait]
impl BaseRepository<Post, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Post>, RepoError> {
        self.get(id).await
    }

    async fn create(&self, entity: Post) -> Result<Post, RepoError> {
        self.insert(entity).await
    }

    async fn update(&self, entity: Post) -> Result<Post, RepoError> {
        self.replace(entity).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.remove::<Post>(id).await
    }
}

#[async_trait]
impl PostRepository for InMemoryStore {
    async fn count_matching(&self, filter: &PostFilter) -> Result<u64, RepoError> {
        let tables = self.tables.read().await;
        Ok(tables.matching(filter).count() as u64)
    }

    async fn find_matching(
        &self,
        filter: &PostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<Post>, RepoError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<&Post> = tables.matching(filter).collect();
        posts.sort_by(|a, b| {
            b.pub_date
                .cmp(&a.pub_date)
                .then_with(|| a.title.cmp(&b.title))
                .then(a.id.cmp(&b.id))
        });

        Ok(posts
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl BaseRepository<Comment, Uuid> for InMemoryStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, RepoError> {
        self.get(id).await
    }

    async fn create(&self, entity: Comment) -> Result<Comment, RepoError> {
        self.insert(entity).await
    }

    async fn update(&self, entity: Comment) -> Result<Comment, RepoError> {
        self.replace(entity).await
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.remove::<Comment>(id).await
    }
}

#[async_trait]
impl CommentRepository for InMemoryStore {
    async fn find_by_post(&self, post_id: Uuid) -> Result<Vec<Comment>, RepoError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .values()
            .filter(|c| c.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(comments)
    }

    async fn count_by_posts(&self, post_ids: &[Uuid]) -> Result<HashMap<Uuid, u64>, RepoError> {
        let tables = self.tables.read().await;
        let mut counts = HashMap::new();
        for comment in tables.comments.values() {
            if post_ids.contains(&comment.post_id) {
                *counts.entry(comment.post_id).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeDelta, Utc};

    use blogicum_core::domain::PostDraft;
    use blogicum_core::policy::PostScope;

    use super::*;

    fn draft(title: &str, category_id: Option<Uuid>) -> PostDraft {
        PostDraft {
            title: title.to_string(),
            text: "Text".to_string(),
            pub_date: Some(Utc::now() - TimeDelta::hours(1)),
            image: None,
            location_id: None,
            category_id,
            is_published: true,
        }
    }

    async fn seed_user(store: &InMemoryStore, username: &str) -> User {
        let users: &dyn UserRepository = store;
        users
            .create(User::new(
                username.to_string(),
                format!("{username}@example.com"),
                "hash".to_string(),
            ))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_is_rejected() {
        let store = InMemoryStore::new();
        seed_user(&store, "alice").await;

        let users: &dyn UserRepository = &store;
        let result = users
            .create(User::new(
                "alice".to_string(),
                "other@example.com".to_string(),
                "hash".to_string(),
            ))
            .await;

        assert!(matches!(result, Err(RepoError::Constraint(_))));
    }

    #[tokio::test]
    async fn test_deleting_post_removes_comments_but_not_the_reverse() {
        let store = Arc::new(InMemoryStore::new());
        let posts: Arc<dyn PostRepository> = store.clone();
        let comments: Arc<dyn CommentRepository> = store.clone();
        let author = seed_user(&store, "alice").await;

        let post = posts.create(Post::new(author.id, draft("A", None))).await.unwrap();
        let first = comments
            .create(Comment::new(post.id, author.id, "one".to_string()))
            .await
            .unwrap();
        comments
            .create(Comment::new(post.id, author.id, "two".to_string()))
            .await
            .unwrap();

        comments.delete(first.id).await.unwrap();
        assert!(posts.find_by_id(post.id).await.unwrap().is_some());
        assert_eq!(comments.find_by_post(post.id).await.unwrap().len(), 1);

        posts.delete(post.id).await.unwrap();
        assert!(comments.find_by_post(post.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_category_detaches_posts() {
        let store = Arc::new(InMemoryStore::new());
        let posts: Arc<dyn PostRepository> = store.clone();
        let categories: Arc<dyn CategoryRepository> = store.clone();
        let author = seed_user(&store, "alice").await;

        let category = categories
            .create(Category::new("News".into(), "".into(), "news".into()))
            .await
            .unwrap();
        let post = posts
            .create(Post::new(author.id, draft("A", Some(category.id))))
            .await
            .unwrap();

        categories.delete(category.id).await.unwrap();

        let post = posts.find_by_id(post.id).await.unwrap().unwrap();
        assert_eq!(post.category_id, None);
    }

    #[tokio::test]
    async fn test_deleting_user_removes_their_posts_and_comments() {
        let store = Arc::new(InMemoryStore::new());
        let users: Arc<dyn UserRepository> = store.clone();
        let posts: Arc<dyn PostRepository> = store.clone();
        let comments: Arc<dyn CommentRepository> = store.clone();
        let alice = seed_user(&store, "alice").await;
        let bob = seed_user(&store, "bob").await;

        let alices = posts.create(Post::new(alice.id, draft("A", None))).await.unwrap();
        let bobs = posts.create(Post::new(bob.id, draft("B", None))).await.unwrap();
        comments
            .create(Comment::new(bobs.id, alice.id, "hi".to_string()))
            .await
            .unwrap();
        comments
            .create(Comment::new(alices.id, bob.id, "hey".to_string()))
            .await
            .unwrap();

        users.delete(alice.id).await.unwrap();

        assert!(posts.find_by_id(alices.id).await.unwrap().is_none());
        assert!(posts.find_by_id(bobs.id).await.unwrap().is_some());
        assert!(comments.find_by_post(bobs.id).await.unwrap().is_empty());
        assert!(comments.find_by_post(alices.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_matching_orders_by_date_then_title() {
        let store = Arc::new(InMemoryStore::new());
        let posts: Arc<dyn PostRepository> = store.clone();
        let categories: Arc<dyn CategoryRepository> = store.clone();
        let author = seed_user(&store, "alice").await;
        let category = categories
            .create(Category::new("News".into(), "".into(), "news".into()))
            .await
            .unwrap();

        let same_day = Utc::now() - TimeDelta::days(1);
        for title in ["b", "a"] {
            let mut d = draft(title, Some(category.id));
            d.pub_date = Some(same_day);
            posts.create(Post::new(author.id, d)).await.unwrap();
        }
        let mut newest = draft("z", Some(category.id));
        newest.pub_date = Some(Utc::now() - TimeDelta::minutes(1));
        posts.create(Post::new(author.id, newest)).await.unwrap();

        let filter = PostFilter::new(PostScope::All, None);
        let titles: Vec<String> = posts
            .find_matching(&filter, 0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.title)
            .collect();

        assert_eq!(titles, vec!["z", "a", "b"]);
        assert_eq!(posts.count_matching(&filter).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_identical_posts_page_without_overlap() {
        let store = Arc::new(InMemoryStore::new());
        let posts: Arc<dyn PostRepository> = store.clone();
        let categories: Arc<dyn CategoryRepository> = store.clone();
        let author = seed_user(&store, "alice").await;
        let category = categories
            .create(Category::new("News".into(), "".into(), "news".into()))
            .await
            .unwrap();

        let same_time = Utc::now() - TimeDelta::hours(1);
        let mut ids = Vec::new();
        for _ in 0..5 {
            let mut d = draft("same", Some(category.id));
            d.pub_date = Some(same_time);
            ids.push(posts.create(Post::new(author.id, d)).await.unwrap().id);
        }
        ids.sort();

        let filter = PostFilter::new(PostScope::All, None);
        let mut paged = Vec::new();
        for offset in [0, 2, 4] {
            let page = posts.find_matching(&filter, offset, 2).await.unwrap();
            paged.extend(page.into_iter().map(|p| p.id));
        }

        assert_eq!(paged, ids);
    }
}
