use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use uni_match::config::{LedgerBackend, Settings};
use uni_match::core::Matcher;
use uni_match::error::{handle_json_payload_error, handle_path_error, handle_query_payload_error};
use uni_match::quota::{QuotaService, TierRegistry};
use uni_match::routes::{self, AppState};
use uni_match::services::{
    CacheManager, CatalogClient, CatalogCollections, InMemoryLedgerStore, LedgerStore,
    PostgresLedgerStore,
};

fn startup_error(what: &str, err: impl std::fmt::Display) -> std::io::Error {
    error!("{}: {}", what, err);
    std::io::Error::other(format!("{}: {}", what, err))
}

fn init_logging(settings: &Settings) {
    let level = std::env::var("LOG_LEVEL").unwrap_or_else(|_| settings.logging.level.clone());
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| settings.logging.format.clone());

    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.init();
    }
}

async fn build_cache(settings: &Settings) -> Option<Arc<CacheManager>> {
    if !settings.cache.enabled {
        info!("Catalog cache disabled");
        return None;
    }

    let ttl = settings.cache.ttl_secs.unwrap_or(300);
    let l1_size = settings.cache.l1_cache_size.unwrap_or(1000);

    let Some(redis_url) = &settings.cache.redis_url else {
        info!("Catalog cache running in-process only (L1: {} entries, TTL: {}s)", l1_size, ttl);
        return Some(Arc::new(CacheManager::l1_only(l1_size, ttl)));
    };

    match CacheManager::new(redis_url, l1_size, ttl).await {
        Ok(cache) => {
            info!("Cache manager initialized (L1: {} entries, TTL: {}s)", l1_size, ttl);
            Some(Arc::new(cache))
        }
        Err(e) => {
            // Catalog reads still work uncached
            warn!("Failed to connect to Redis ({}), falling back to in-process cache", e);
            Some(Arc::new(CacheManager::l1_only(l1_size, ttl)))
        }
    }
}

async fn build_ledger_store(settings: &Settings) -> std::io::Result<Arc<dyn LedgerStore>> {
    match settings.ledger.backend {
        LedgerBackend::Memory => {
            warn!("Using in-memory ledger store; usage will not survive a restart");
            Ok(Arc::new(InMemoryLedgerStore::new()))
        }
        LedgerBackend::Postgres => {
            let store = PostgresLedgerStore::from_settings(
                &settings.database.url,
                settings.database.max_connections,
                settings.database.min_connections,
                settings.database.acquire_timeout_secs,
                settings.database.idle_timeout_secs,
            )
            .await
            .map_err(|e| startup_error("Failed to connect to PostgreSQL", e))?;

            info!(
                "PostgreSQL ledger store initialized (max: {} connections)",
                settings.database.max_connections.unwrap_or(10)
            );
            Ok(Arc::new(store))
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = match std::env::var("UNIMATCH_CONFIG") {
        Ok(path) => Settings::load_from(path),
        Err(_) => Settings::load(),
    }
    .map_err(|e| {
        eprintln!("Configuration error: {}", e);
        std::io::Error::other(e.to_string())
    })?;

    init_logging(&settings);

    info!("Starting uni-match service...");

    let catalog = CatalogClient::new(
        settings.catalog.endpoint.clone(),
        settings.catalog.api_key.clone(),
        settings.catalog.project_id.clone(),
        settings.catalog.database_id.clone(),
        CatalogCollections {
            academic_profiles: settings.collection.academic_profiles.clone(),
            universities: settings.collection.universities.clone(),
        },
        Duration::from_secs(settings.catalog.timeout_secs.unwrap_or(10)),
    )
    .map_err(|e| startup_error("Failed to build catalog client", e))?;

    info!("Catalog client initialized");

    let cache = build_cache(&settings).await;

    let registry = TierRegistry::with_overrides(&settings.tiers)
        .map_err(|e| startup_error("Invalid tier configuration", e))?;

    info!(
        "Tier registry loaded: {:?}",
        registry.list().map(|tier| tier.id.as_str()).collect::<Vec<_>>()
    );

    let store = build_ledger_store(&settings).await?;

    let quota = QuotaService::new(Arc::new(registry), store)
        .with_max_write_retries(settings.quota.max_write_retries);

    let weights = settings.scoring_weights();
    let matcher = Matcher::new(weights);

    info!("Matcher initialized with weights: {:?}", weights);

    let app_state = AppState {
        catalog: Arc::new(catalog),
        cache,
        quota,
        matcher,
    };

    let host = settings.server.host.clone();
    let port = settings.server.port;
    let workers = settings.server.workers.unwrap_or(4);

    info!("Starting HTTP server on {}:{}", host, port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(web::JsonConfig::default().error_handler(handle_json_payload_error))
            .app_data(web::QueryConfig::default().error_handler(handle_query_payload_error))
            .app_data(web::PathConfig::default().error_handler(handle_path_error))
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    })
    .workers(workers)
    .bind((host, port))?
    .run()
    .await
}
