//! Application configuration loaded from environment variables.

use std::collections::HashSet;
use std::env;

use blogicum_infra::{DatabaseConfig, JwtConfig};
#[cfg(feature = "rate-limit")]
use blogicum_infra::RateLimitConfig;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// `None` runs the server on the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub jwt: JwtConfig,
    #[cfg(feature = "rate-limit")]
    pub rate_limit: RateLimitConfig,
    /// Usernames that are granted staff rights when they register.
    pub staff_usernames: HashSet<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let database = env::var("DATABASE_URL").ok().map(|url| DatabaseConfig {
            url,
            max_connections: env::var("DB_MAX_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(100),
            min_connections: env::var("DB_MIN_CONNECTIONS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
        });

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            database,
            jwt: JwtConfig::from_env(),
            #[cfg(feature = "rate-limit")]
            rate_limit: RateLimitConfig::from_env(),
            staff_usernames: parse_usernames(&env::var("STAFF_USERNAMES").unwrap_or_default()),
        }
    }
}

/// Comma-separated list, blanks ignored.
fn parse_usernames(raw: &str) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_usernames() {
        let names = parse_usernames(" admin, editor ,,");

        assert_eq!(names.len(), 2);
        assert!(names.contains("admin"));
        assert!(names.contains("editor"));
        assert!(parse_usernames("").is_empty());
    }
}
