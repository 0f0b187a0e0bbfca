use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::ApiError;
use crate::models::{
    AcademicProfile, FindMatchesRequest, HealthResponse, RankRequest, RankResponse,
    UniversityFilter, UniversityRecord,
};
use crate::routes::AppState;
use crate::services::{CacheKey, CatalogError};

/// Configure all match-related routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/matches/rank", web::post().to(rank_matches))
        .route("/matches/find", web::post().to(find_matches));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> HttpResponse {
    let ledger_healthy = match state.quota.health_check().await {
        Ok(healthy) => healthy,
        Err(e) => {
            tracing::warn!("Ledger store health check failed: {}", e);
            false
        }
    };

    let status = if ledger_healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        ledger_store: ledger_healthy,
        cache: state.cache.as_ref().map(|cache| cache.stats()),
    })
}

/// Rank a caller-supplied candidate set
///
/// POST /api/v1/matches/rank
///
/// Request body:
/// ```json
/// {
///   "profile": { "cgpa": 3.8, "ieltsScore": 7.0, "budgetMax": 40000 },
///   "candidates": [ { "id": "...", "name": "...", "country": "...", "type": "public" } ],
///   "limit": 20
/// }
/// ```
async fn rank_matches(
    state: web::Data<AppState>,
    req: web::Json<RankRequest>,
) -> Result<HttpResponse, ApiError> {
    let RankRequest {
        profile,
        candidates,
        limit,
    } = req.into_inner();

    let result = state.matcher.rank(profile.as_ref(), candidates, limit)?;

    tracing::info!(
        "Ranked {} of {} candidates ({} rejected)",
        result.matches.len(),
        result.total_candidates,
        result.rejected
    );

    Ok(HttpResponse::Ok().json(RankResponse {
        matches: result.matches,
        total_candidates: result.total_candidates,
        rejected: result.rejected,
    }))
}

/// Rank the catalog for a stored profile
///
/// POST /api/v1/matches/find
///
/// Request body:
/// ```json
/// {
///   "userId": "string",
///   "filter": { "countries": ["Canada"], "limit": 100 },
///   "limit": 50
/// }
/// ```
async fn find_matches(
    state: web::Data<AppState>,
    req: web::Json<FindMatchesRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let user_id = &req.user_id;
    tracing::info!("Finding matches for user: {}, limit: {}", user_id, req.limit);

    let profile = match load_profile(&state, user_id).await {
        Ok(profile) => profile,
        Err(CatalogError::NotFound(_)) => {
            return Err(ApiError::InvalidInput(format!(
                "No academic profile for user {}",
                user_id
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let candidates = load_universities(&state, &req.filter).await?;
    tracing::debug!("Loaded {} candidate universities for {}", candidates.len(), user_id);

    let result = state
        .matcher
        .rank(Some(&profile), candidates, Some(req.limit))?;

    tracing::info!(
        "Returning {} matches for user {} (from {} candidates)",
        result.matches.len(),
        user_id,
        result.total_candidates
    );

    Ok(HttpResponse::Ok().json(RankResponse {
        matches: result.matches,
        total_candidates: result.total_candidates,
        rejected: result.rejected,
    }))
}

/// Profiles are read on every request so edits show up immediately
async fn load_profile(state: &AppState, user_id: &str) -> Result<AcademicProfile, CatalogError> {
    state.catalog.get_profile(user_id).await
}

async fn load_universities(
    state: &AppState,
    filter: &UniversityFilter,
) -> Result<Vec<UniversityRecord>, CatalogError> {
    let key = CacheKey::universities(filter);

    if let Some(cache) = &state.cache {
        match cache.get::<Vec<UniversityRecord>>(&key).await {
            Ok(universities) => return Ok(universities),
            Err(e) => tracing::trace!("Catalog cache lookup failed: {}", e),
        }
    }

    let universities = state.catalog.list_universities(filter).await?;

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.set(&key, &universities).await {
            tracing::warn!("Failed to cache catalog listing: {}", e);
        }
    }

    Ok(universities)
}
