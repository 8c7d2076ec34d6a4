//! Category handlers: the published list, staff creation and the
//! per-category post listing.

use actix_web::{HttpResponse, web};
use validator::Validate;

use blogicum_core::PageRequest;
use blogicum_core::domain::Category;
use blogicum_core::ports::{BaseRepository, CategoryRepository};
use blogicum_shared::dto::{CategoryPostsResponse, CategoryRequest, PageQuery};

use super::present;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/categories
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let categories = state.categories.find_published().await?;

    Ok(HttpResponse::Ok().json(
        categories
            .into_iter()
            .map(present::category)
            .collect::<Vec<_>>(),
    ))
}

/// POST /api/categories - staff only
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CategoryRequest>,
) -> AppResult<HttpResponse> {
    if !identity.has_role("staff") {
        return Err(AppError::Forbidden);
    }

    let req = body.into_inner();
    req.validate()?;

    if state.categories.find_by_slug(&req.slug).await?.is_some() {
        return Err(AppError::Conflict(format!("Slug '{}' is taken", req.slug)));
    }

    let mut category = Category::new(req.title, req.description, req.slug);
    category.is_published = req.is_published;

    let category = state.categories.create(category).await?;
    tracing::info!(category_id = %category.id, slug = %category.slug, "Category created");

    Ok(HttpResponse::Created().json(present::category(category)))
}

/// GET /api/categories/{slug}?page=N
pub async fn posts(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> AppResult<HttpResponse> {
    let page = PageRequest::parse(query.page.as_deref());
    let (category, posts) = state
        .blog
        .category_posts(&path, identity.user_id(), page)
        .await?;

    Ok(HttpResponse::Ok().json(CategoryPostsResponse {
        category: present::category(category),
        posts: present::page(posts),
    }))
}
