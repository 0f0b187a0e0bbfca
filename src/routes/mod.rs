// Route exports
pub mod matches;
pub mod quota;
pub mod subscriptions;

use actix_web::web;
use std::sync::Arc;

use crate::core::Matcher;
use crate::quota::QuotaService;
use crate::services::{CacheManager, CatalogClient};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<CatalogClient>,
    pub cache: Option<Arc<CacheManager>>,
    pub quota: QuotaService,
    pub matcher: Matcher,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(matches::configure)
            .configure(quota::configure)
            .configure(subscriptions::configure),
    );
}
