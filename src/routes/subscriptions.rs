use actix_web::{web, HttpResponse};
use validator::Validate;

use crate::error::ApiError;
use crate::models::{CancelRequest, UpgradeRequest};
use crate::routes::AppState;

/// Configure subscription lifecycle routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/subscriptions/upgrade", web::post().to(upgrade))
        .route("/subscriptions/cancel", web::post().to(cancel))
        .route("/subscriptions/{user_id}", web::get().to(get_subscription));
}

/// GET /api/v1/subscriptions/{userId}
async fn get_subscription(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let user_id = path.into_inner();
    if user_id.trim().is_empty() {
        return Err(ApiError::Validation("userId must not be empty".to_string()));
    }

    let view = state.quota.status(&user_id).await?;

    Ok(HttpResponse::Ok().json(view))
}

/// Activate a paid tier
///
/// POST /api/v1/subscriptions/upgrade
///
/// Request body:
/// ```json
/// { "userId": "string", "planId": "premium", "paymentRef": "string" }
/// ```
///
/// The payment reference must already be verified by the payment gateway.
async fn upgrade(
    state: web::Data<AppState>,
    req: web::Json<UpgradeRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let ledger = state
        .quota
        .upgrade(&req.user_id, &req.plan_id, &req.payment_ref)
        .await?;

    Ok(HttpResponse::Ok().json(ledger))
}

/// POST /api/v1/subscriptions/cancel
async fn cancel(
    state: web::Data<AppState>,
    req: web::Json<CancelRequest>,
) -> Result<HttpResponse, ApiError> {
    req.validate()?;

    let ledger = state.quota.cancel(&req.user_id).await?;

    Ok(HttpResponse::Ok().json(ledger))
}
