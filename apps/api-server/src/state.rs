//! Application state - shared across all handlers.

use std::collections::HashSet;
use std::sync::Arc;

use blogicum_core::BlogService;
use blogicum_core::ports::{
    CategoryRepository, CommentRepository, LocationRepository, PostRepository, UserRepository,
};
use blogicum_infra::InMemoryStore;

#[cfg(feature = "postgres")]
use blogicum_infra::database::{
    DatabaseConnections, PostgresCategoryRepository, PostgresCommentRepository,
    PostgresLocationRepository, PostgresPostRepository, PostgresUserRepository,
};

use crate::config::AppConfig;

/// One implementation of every repository port.
struct Repositories {
    backend: &'static str,
    users: Arc<dyn UserRepository>,
    categories: Arc<dyn CategoryRepository>,
    locations: Arc<dyn LocationRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
}

impl Repositories {
    fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            backend: "memory",
            users: store.clone(),
            categories: store.clone(),
            locations: store.clone(),
            posts: store.clone(),
            comments: store,
        }
    }

    #[cfg(feature = "postgres")]
    fn postgres(connections: &DatabaseConnections) -> Self {
        let db = &connections.main;
        Self {
            backend: "postgres",
            users: Arc::new(PostgresUserRepository::new(db.clone())),
            categories: Arc::new(PostgresCategoryRepository::new(db.clone())),
            locations: Arc::new(PostgresLocationRepository::new(db.clone())),
            posts: Arc::new(PostgresPostRepository::new(db.clone())),
            comments: Arc::new(PostgresCommentRepository::new(db.clone())),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub blog: BlogService,
    pub users: Arc<dyn UserRepository>,
    pub categories: Arc<dyn CategoryRepository>,
    pub locations: Arc<dyn LocationRepository>,
    pub staff_usernames: Arc<HashSet<String>>,
    /// Storage backend name, reported by the health check.
    pub backend: &'static str,
}

impl AppState {
    /// Build the application state with appropriate implementations.
    pub async fn new(config: &AppConfig) -> Self {
        #[cfg(feature = "postgres")]
        let repos = match &config.database {
            Some(db_config) => match DatabaseConnections::init(db_config).await {
                Ok(connections) => Repositories::postgres(&connections),
                Err(e) => {
                    tracing::error!(
                        "Failed to connect to database: {}. Using in-memory fallback.",
                        e
                    );
                    Repositories::in_memory()
                }
            },
            None => {
                tracing::warn!("DATABASE_URL not set. Running without database (in-memory mode).");
                Repositories::in_memory()
            }
        };

        #[cfg(not(feature = "postgres"))]
        let repos = {
            if config.database.is_some() {
                tracing::warn!("DATABASE_URL ignored: built without the postgres feature");
            }
            Repositories::in_memory()
        };

        tracing::info!(backend = repos.backend, "Application state initialized");

        Self::from_repositories(repos, config.staff_usernames.clone())
    }

    /// State over a fresh in-memory store.
    #[cfg(test)]
    pub fn in_memory(staff_usernames: HashSet<String>) -> Self {
        Self::from_repositories(Repositories::in_memory(), staff_usernames)
    }

    fn from_repositories(repos: Repositories, staff_usernames: HashSet<String>) -> Self {
        let blog = BlogService::new(
            repos.users.clone(),
            repos.categories.clone(),
            repos.locations.clone(),
            repos.posts,
            repos.comments,
        );

        Self {
            blog,
            users: repos.users,
            categories: repos.categories,
            locations: repos.locations,
            staff_usernames: Arc::new(staff_usernames),
            backend: repos.backend,
        }
    }

    pub fn is_staff_username(&self, username: &str) -> bool {
        self.staff_usernames.contains(username)
    }
}
