//! Profile handlers.

use actix_web::{HttpResponse, web};
use validator::Validate;

use blogicum_core::PageRequest;
use blogicum_core::domain::ProfileChanges;
use blogicum_core::ports::{BaseRepository, UserRepository};
use blogicum_shared::dto::{PageQuery, ProfileResponse, UpdateProfileRequest};

use super::present;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/profile/{username}?page=N
pub async fn show(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let viewer = identity.user_id();
    let page = PageRequest::parse(query.page.as_deref());
    let (user, posts) = state.blog.profile_posts(&path, viewer, page).await?;

    Ok(HttpResponse::Ok().json(ProfileResponse {
        user: present::user(&user, viewer == Some(user.id)),
        posts: present::page(posts),
    }))
}

/// PUT /api/profile
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<UpdateProfileRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()?;

    let mut user = state
        .users
        .find_by_id(identity.user_id)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if let Some(other) = state.users.find_by_username(&req.username).await? {
        if other.id != user.id {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
    }
    if let Some(other) = state.users.find_by_email(&req.email).await? {
        if other.id != user.id {
            return Err(AppError::Conflict("Email already registered".to_string()));
        }
    }

    user.apply(ProfileChanges {
        username: req.username,
        email: req.email,
        first_name: req.first_name,
        last_name: req.last_name,
        bio: req.bio,
    });

    let user = state.users.update(user).await?;
    tracing::info!(user_id = %user.id, "Profile updated");

    Ok(HttpResponse::Ok().json(present::user(&user, true)))
}
