use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::ApiError;
use crate::models::{QuotaRequest, RecordUsageResponse, TiersResponse};
use crate::routes::AppState;

/// Configure tier and quota routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/tiers", web::get().to(list_tiers))
        .route("/quota/check", web::post().to(check_quota))
        .route("/quota/record", web::post().to(record_usage))
        .route("/quota/consume", web::post().to(consume));
}

/// GET /api/v1/tiers
async fn list_tiers(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(TiersResponse {
        tiers: state.quota.registry().list().cloned().collect(),
    })
}

/// Check without consuming
///
/// POST /api/v1/quota/check
///
/// Request body:
/// ```json
/// { "userId": "string", "feature": "pathwaysPerMonth" }
/// ```
async fn check_quota(
    state: web::Data<AppState>,
    req: web::Json<QuotaRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let decision = state.quota.check_quota(&req.user_id, req.feature).await?;

    tracing::debug!(
        "Quota check for {} on {}: allowed={}",
        req.user_id,
        req.feature,
        decision.allowed
    );

    Ok(HttpResponse::Ok().json(decision))
}

/// Record one unit after the caller performed the action
///
/// POST /api/v1/quota/record
async fn record_usage(
    state: web::Data<AppState>,
    req: web::Json<QuotaRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    state.quota.record_usage(&req.user_id, req.feature).await?;

    Ok(HttpResponse::Ok().json(RecordUsageResponse {
        success: true,
        user_id: req.user_id.clone(),
        feature: req.feature,
    }))
}

/// Check and record in one step; a denied request consumes nothing
///
/// POST /api/v1/quota/consume
async fn consume(
    state: web::Data<AppState>,
    req: web::Json<QuotaRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let decision = state.quota.consume(&req.user_id, req.feature).await?;

    Ok(HttpResponse::Ok().json(decision))
}
