//! Location handlers.

use actix_web::{HttpResponse, web};
use validator::Validate;

use blogicum_core::domain::Location;
use blogicum_core::ports::{BaseRepository, LocationRepository};
use blogicum_shared::dto::LocationRequest;

use super::present;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

/// GET /api/locations
pub async fn list(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let locations = state.locations.find_published().await?;

    Ok(HttpResponse::Ok().json(
        locations
            .into_iter()
            .map(present::location)
            .collect::<Vec<_>>(),
    ))
}

/// POST /api/locations - staff only
pub async fn create(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<LocationRequest>,
) -> AppResult<HttpResponse> {
    if !identity.has_role("staff") {
        return Err(AppError::Forbidden);
    }

    let req = body.into_inner();
    req.validate()?;

    let mut location = Location::new(req.title);
    location.is_published = req.is_published;

    let location = state.locations.create(location).await?;
    tracing::info!(location_id = %location.id, "Location created");

    Ok(HttpResponse::Created().json(present::location(location)))
}
