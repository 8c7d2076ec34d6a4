use std::collections::HashSet;
use std::sync::Arc;

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use serde_json::{Value, json};

use blogicum_core::domain::Category;
use blogicum_core::ports::{BaseRepository, PasswordService, TokenService};
use blogicum_infra::{Argon2PasswordService, JwtConfig, JwtTokenService};
use blogicum_shared::dto::AuthResponse;

use super::configure_routes;
use crate::state::AppState;

fn token_service() -> Arc<dyn TokenService> {
    Arc::new(JwtTokenService::new(JwtConfig {
        secret: "handler-tests".to_string(),
        ..JwtConfig::default()
    }))
}

fn password_service() -> Arc<dyn PasswordService> {
    Arc::new(Argon2PasswordService::new())
}

fn state() -> AppState {
    AppState::in_memory(HashSet::from(["admin".to_string()]))
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($state.clone()))
                .app_data(web::Data::new(token_service()))
                .app_data(web::Data::new(password_service()))
                .configure(configure_routes),
        )
        .await
    };
}

/// Registers `$username` and evaluates to its bearer token.
macro_rules! register {
    ($app:expr, $username:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "username": $username,
                "email": format!("{}@example.com", $username),
                "password": "password123",
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: AuthResponse = test::read_body_json(resp).await;
        body.access_token
    }};
}

fn bearer(token: &str) -> (&'static str, String) {
    ("Authorization", format!("Bearer {token}"))
}

async fn published_category(state: &AppState, slug: &str) -> Category {
    state
        .categories
        .create(Category::new(slug.to_uppercase(), String::new(), slug.to_string()))
        .await
        .unwrap()
}

fn post_body(title: &str, category: &Category) -> Value {
    json!({
        "title": title,
        "text": format!("{title} text"),
        "category_id": category.id,
    })
}

#[actix_rt::test]
async fn test_health_check() {
    let app = app!(state());

    let req = test::TestRequest::get().uri("/api/health").to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;

    assert_eq!(body["status"], "ok");
    assert_eq!(body["storage"], "memory");
}

#[actix_rt::test]
async fn test_register_me_and_login() {
    let app = app!(state());
    let token = register!(app, "leo");

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&token))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["username"], "leo");
    assert_eq!(me["email"], "leo@example.com");
    assert_eq!(me["is_staff"], false);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"username": "leo", "password": "password123"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({"username": "leo", "password": "wrong-password"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_register_rejects_duplicates_and_short_passwords() {
    let app = app!(state());
    register!(app, "leo");

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "leo",
            "email": "other@example.com",
            "password": "password123",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "mia",
            "email": "mia@example.com",
            "password": "short",
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "password");
}

#[actix_rt::test]
async fn test_malformed_json_is_bad_request() {
    let app = app!(state());

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .insert_header(("Content-Type", "application/json"))
        .set_payload("{not json")
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[actix_rt::test]
async fn test_create_post_requires_token_and_known_category() {
    let app = app!(state());
    let token = register!(app, "leo");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .set_json(json!({"title": "Hello", "text": "World"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&token))
        .set_json(json!({
            "title": "Hello",
            "text": "World",
            "category_id": uuid::Uuid::new_v4(),
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["errors"][0]["field"], "category_id");
}

#[actix_rt::test]
async fn test_unpublished_post_is_visible_to_its_author_only() {
    let state = state();
    let app = app!(state);
    let news = published_category(&state, "news").await;
    let author = register!(app, "author");
    let reader = register!(app, "reader");

    let mut body = post_body("Draft", &news);
    body["is_published"] = json!(false);
    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&author))
        .set_json(body)
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/api/posts/{}", created["id"].as_str().unwrap());

    let req = test::TestRequest::get().uri(&uri).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&reader))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );

    let req = test::TestRequest::get()
        .uri(&uri)
        .insert_header(bearer(&author))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let home: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(home["total_items"], 0);

    let req = test::TestRequest::get()
        .uri("/api/profile/author")
        .insert_header(bearer(&author))
        .to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["posts"]["total_items"], 1);
    assert_eq!(profile["user"]["email"], "author@example.com");

    let req = test::TestRequest::get()
        .uri("/api/profile/author")
        .to_request();
    let profile: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(profile["posts"]["total_items"], 0);
    assert!(profile["user"].get("email").is_none());
}

#[actix_rt::test]
async fn test_non_author_cannot_change_post() {
    let state = state();
    let app = app!(state);
    let news = published_category(&state, "news").await;
    let author = register!(app, "author");
    let stranger = register!(app, "stranger");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&author))
        .set_json(post_body("Original", &news))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let uri = format!("/api/posts/{}", created["id"].as_str().unwrap());

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&stranger))
        .set_json(post_body("Hijacked", &news))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete()
        .uri(&uri)
        .insert_header(bearer(&stranger))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::delete().uri(&uri).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::get().uri(&uri).to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(post["title"], "Original");

    let req = test::TestRequest::put()
        .uri(&uri)
        .insert_header(bearer(&author))
        .set_json(post_body("Edited", &news))
        .to_request();
    let post: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(post["title"], "Edited");
    assert_eq!(post["author"]["username"], "author");
}

#[actix_rt::test]
async fn test_comment_lifecycle() {
    let state = state();
    let app = app!(state);
    let news = published_category(&state, "news").await;
    let author = register!(app, "author");
    let reader = register!(app, "reader");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&author))
        .set_json(post_body("Post", &news))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let post_uri = format!("/api/posts/{}", created["id"].as_str().unwrap());

    let req = test::TestRequest::post()
        .uri(&format!("{post_uri}/comments"))
        .insert_header(bearer(&reader))
        .set_json(json!({"text": "Nice post"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let comment: Value = test::read_body_json(resp).await;
    assert_eq!(comment["author"]["username"], "reader");
    let comment_uri = format!("{post_uri}/comments/{}", comment["id"].as_str().unwrap());

    let req = test::TestRequest::get().uri("/api/posts").to_request();
    let home: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(home["items"][0]["comment_count"], 1);

    let req = test::TestRequest::put()
        .uri(&comment_uri)
        .insert_header(bearer(&author))
        .set_json(json!({"text": "Edited by someone else"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::put()
        .uri(&comment_uri)
        .insert_header(bearer(&reader))
        .set_json(json!({"text": ""}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNPROCESSABLE_ENTITY
    );

    let req = test::TestRequest::put()
        .uri(&comment_uri)
        .insert_header(bearer(&reader))
        .set_json(json!({"text": "Really nice post"}))
        .to_request();
    let edited: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(edited["text"], "Really nice post");

    let req = test::TestRequest::delete()
        .uri(&comment_uri)
        .insert_header(bearer(&reader))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    let req = test::TestRequest::get().uri(&post_uri).to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["comments"].as_array().map(Vec::len), Some(0));

    let req = test::TestRequest::delete()
        .uri(&post_uri)
        .insert_header(bearer(&author))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NO_CONTENT
    );

    let req = test::TestRequest::get().uri(&post_uri).to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_rt::test]
async fn test_listing_page_parameter() {
    let state = state();
    let app = app!(state);
    let news = published_category(&state, "news").await;
    let author = register!(app, "author");

    for i in 0..12 {
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&author))
            .set_json(post_body(&format!("Post {i:02}"), &news))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CREATED
        );
    }

    let req = test::TestRequest::get()
        .uri("/api/posts?page=abc")
        .to_request();
    let first: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(first["page"], 1);
    assert_eq!(first["items"].as_array().map(Vec::len), Some(10));
    assert_eq!(first["has_next"], true);

    let req = test::TestRequest::get()
        .uri("/api/posts?page=99")
        .to_request();
    let last: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(last["page"], 2);
    assert_eq!(last["items"].as_array().map(Vec::len), Some(2));
    assert_eq!(last["has_previous"], true);

    let req = test::TestRequest::get()
        .uri("/api/categories/news?page=2")
        .to_request();
    let listing: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(listing["category"]["slug"], "news");
    assert_eq!(listing["posts"]["items"].as_array().map(Vec::len), Some(2));
}

#[actix_rt::test]
async fn test_category_management_is_staff_only() {
    let state = state();
    let app = app!(state);
    let admin = register!(app, "admin");
    let user = register!(app, "user");
    let body = json!({"title": "Travel", "slug": "travel"});

    let req = test::TestRequest::post()
        .uri("/api/categories")
        .set_json(body.clone())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );

    let req = test::TestRequest::post()
        .uri("/api/categories")
        .insert_header(bearer(&user))
        .set_json(body.clone())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::FORBIDDEN
    );

    let req = test::TestRequest::post()
        .uri("/api/categories")
        .insert_header(bearer(&admin))
        .set_json(body.clone())
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CREATED
    );

    let req = test::TestRequest::post()
        .uri("/api/categories")
        .insert_header(bearer(&admin))
        .set_json(body)
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );

    let req = test::TestRequest::get().uri("/api/categories").to_request();
    let categories: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(categories[0]["slug"], "travel");

    let req = test::TestRequest::get()
        .uri("/api/categories/missing")
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::NOT_FOUND
    );
}

#[actix_rt::test]
async fn test_location_is_hidden_until_published() {
    let state = state();
    let app = app!(state);
    let admin = register!(app, "admin");

    let req = test::TestRequest::post()
        .uri("/api/locations")
        .insert_header(bearer(&admin))
        .set_json(json!({"title": "Secret base", "is_published": false}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CREATED
    );

    let req = test::TestRequest::get().uri("/api/locations").to_request();
    let locations: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(locations.as_array().map(Vec::len), Some(0));
}

#[actix_rt::test]
async fn test_profile_update_checks_uniqueness() {
    let app = app!(state());
    let leo = register!(app, "leo");
    register!(app, "mia");

    let req = test::TestRequest::put()
        .uri("/api/profile")
        .insert_header(bearer(&leo))
        .set_json(json!({"username": "mia", "email": "leo@example.com"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::CONFLICT
    );

    let req = test::TestRequest::put()
        .uri("/api/profile")
        .insert_header(bearer(&leo))
        .set_json(json!({
            "username": "leo",
            "email": "leo@example.com",
            "first_name": "Leo",
            "bio": "Writes about trains",
        }))
        .to_request();
    let user: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(user["first_name"], "Leo");
    assert_eq!(user["bio"], "Writes about trains");
}

/// Builds the app with a limiter allowing two requests per minute per key.
#[cfg(feature = "rate-limit")]
macro_rules! limited_app {
    () => {{
        use std::time::Duration;

        use blogicum_core::ports::RateLimiter;
        use blogicum_infra::{InMemoryRateLimiter, RateLimitConfig};

        let limiter: Arc<dyn RateLimiter> =
            Arc::new(InMemoryRateLimiter::new(RateLimitConfig {
                max_requests: 2,
                window: Duration::from_secs(60),
            }));
        test::init_service(
            App::new()
                .app_data(web::Data::new(state()))
                .app_data(web::Data::new(token_service()))
                .app_data(web::Data::new(password_service()))
                .app_data(web::Data::new(limiter))
                .configure(configure_routes),
        )
        .await
    }};
}

#[cfg(feature = "rate-limit")]
#[actix_rt::test]
async fn test_login_is_rate_limited() {
    let app = limited_app!();

    let login = || {
        test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(json!({"username": "nobody", "password": "password123"}))
            .to_request()
    };

    for _ in 0..2 {
        let resp = test::call_service(&app, login()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    let resp = test::call_service(&app, login()).await;
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("Retry-After"));

    // Other routes are not limited.
    let req = test::TestRequest::get().uri("/api/health").to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
}

#[cfg(feature = "rate-limit")]
#[actix_rt::test]
async fn test_rate_limit_ignores_forwarded_headers() {
    let app = limited_app!();
    let peer: std::net::SocketAddr = "10.0.0.9:40000".parse().unwrap();

    let mut limited = 0;
    for i in 0..10 {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .peer_addr(peer)
            .insert_header(("X-Forwarded-For", format!("203.0.113.{i}")))
            .insert_header(("Forwarded", format!("for=198.51.100.{i}")))
            .set_json(json!({"username": "nobody", "password": "password123"}))
            .to_request();
        if test::call_service(&app, req).await.status() == StatusCode::TOO_MANY_REQUESTS {
            limited += 1;
        }
    }
    assert_eq!(limited, 8);

    // A different peer has its own budget.
    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .peer_addr("10.0.0.10:40000".parse().unwrap())
        .set_json(json!({"username": "nobody", "password": "password123"}))
        .to_request();
    assert_eq!(
        test::call_service(&app, req).await.status(),
        StatusCode::UNAUTHORIZED
    );
}

#[actix_rt::test]
async fn test_comment_author_reflects_profile_rename() {
    let state = state();
    let app = app!(state);
    let news = published_category(&state, "news").await;
    let token = register!(app, "leo");

    let req = test::TestRequest::post()
        .uri("/api/posts")
        .insert_header(bearer(&token))
        .set_json(post_body("Post", &news))
        .to_request();
    let created: Value = test::call_and_read_body_json(&app, req).await;
    let post_uri = format!("/api/posts/{}", created["id"].as_str().unwrap());

    let req = test::TestRequest::put()
        .uri("/api/profile")
        .insert_header(bearer(&token))
        .set_json(json!({"username": "leonard", "email": "leo@example.com"}))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

    // The token still carries the old username.
    let req = test::TestRequest::post()
        .uri(&format!("{post_uri}/comments"))
        .insert_header(bearer(&token))
        .set_json(json!({"text": "First!"}))
        .to_request();
    let comment: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(comment["author"]["username"], "leonard");

    let comment_uri = format!("{post_uri}/comments/{}", comment["id"].as_str().unwrap());
    let req = test::TestRequest::put()
        .uri(&comment_uri)
        .insert_header(bearer(&token))
        .set_json(json!({"text": "Edited"}))
        .to_request();
    let edited: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(edited["author"]["username"], "leonard");

    let req = test::TestRequest::get().uri(&post_uri).to_request();
    let detail: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(detail["comments"][0]["author"]["username"], "leonard");
}

#[actix_rt::test]
async fn test_category_listing_counts_only_visible_posts() {
    let state = state();
    let app = app!(state);
    let news = published_category(&state, "news").await;
    let token = register!(app, "author");

    for (title, published) in [("One", true), ("Two", true), ("Draft", false)] {
        let mut body = post_body(title, &news);
        body["is_published"] = json!(published);
        body["pub_date"] = json!(chrono::Utc::now() - chrono::Duration::hours(1));
        let req = test::TestRequest::post()
            .uri("/api/posts")
            .insert_header(bearer(&token))
            .set_json(body)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);
    }

    let req = test::TestRequest::get().uri("/api/categories/news").to_request();
    let anonymous: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(anonymous["posts"]["total_items"], 2);

    let req = test::TestRequest::get()
        .uri("/api/categories/news")
        .insert_header(bearer(&token))
        .to_request();
    let own: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(own["posts"]["total_items"], 3);
}
