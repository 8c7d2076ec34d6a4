//! Comment handlers. Every route here requires a bearer token.

use actix_web::{HttpResponse, web};
use uuid::Uuid;
use validator::Validate;

use blogicum_shared::dto::CommentRequest;

use super::present;
use crate::middleware::auth::Identity;
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// POST /api/posts/{id}/comments
pub async fn add(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();
    req.validate()?;

    let comment = state
        .blog
        .add_comment(path.into_inner(), Some(identity.user_id), req.text)
        .await?;

    Ok(HttpResponse::Created().json(present::comment(comment)))
}

/// PUT /api/posts/{post_id}/comments/{comment_id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<CommentRequest>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();
    let req = body.into_inner();
    req.validate()?;

    let comment = state
        .blog
        .update_comment(post_id, comment_id, Some(identity.user_id), req.text)
        .await?;

    Ok(HttpResponse::Ok().json(present::comment(comment)))
}

/// DELETE /api/posts/{post_id}/comments/{comment_id}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<(Uuid, Uuid)>,
) -> AppResult<HttpResponse> {
    let (post_id, comment_id) = path.into_inner();

    state
        .blog
        .delete_comment(post_id, comment_id, Some(identity.user_id))
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
