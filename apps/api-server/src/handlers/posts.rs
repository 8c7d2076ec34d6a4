//! Post handlers: home listing, detail and author-only mutations.

use actix_web::{HttpResponse, web};
use uuid::Uuid;
use validator::Validate;

use blogicum_core::PageRequest;
use blogicum_shared::dto::{PageQuery, PostRequest};

use super::present;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::AppResult;
use crate::state::AppState;

/// GET /api/posts?page=N
pub async fn list(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = PageRequest::parse(query.page.as_deref());
    let posts = state.blog.home(identity.user_id(), page).await?;

    Ok(HttpResponse::Ok().json(present::page(posts)))
}

/// GET /api/posts/{id}
pub async fn detail(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    let detail = state
        .blog
        .post_detail(path.into_inner(), identity.user_id())
        .await?;

    Ok(HttpResponse::Ok().json(present::post_detail(detail)))
}

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let actor = Some(identity.user_id);
    let req = body.into_inner();
    req.validate()?;

    let post = state.blog.create_post(actor, present::draft(req)).await?;
    let detail = state.blog.post_detail(post.id, actor).await?;

    Ok(HttpResponse::Created().json(present::post_detail(detail)))
}

/// PUT /api/posts/{id}
pub async fn update(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
    body: web::Json<PostRequest>,
) -> AppResult<HttpResponse> {
    let actor = Some(identity.user_id);
    let req = body.into_inner();
    req.validate()?;

    let post = state
        .blog
        .update_post(path.into_inner(), actor, present::draft(req))
        .await?;
    let detail = state.blog.post_detail(post.id, actor).await?;

    Ok(HttpResponse::Ok().json(present::post_detail(detail)))
}

/// DELETE /api/posts/{id}
pub async fn delete(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<Uuid>,
) -> AppResult<HttpResponse> {
    state
        .blog
        .delete_post(path.into_inner(), Some(identity.user_id))
        .await?;

    Ok(HttpResponse::NoContent().finish())
}
