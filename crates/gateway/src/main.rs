//! Sabzi Saathi API Gateway
//!
//! HTTP entry point for the marketplace AI search.
//! Handles:
//! - The ai-search endpoint and its CORS preflight
//! - Rate limiting
//! - Observability (logging, metrics, request ids)

mod handlers;
mod middleware;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use saathi_common::{
    config::{AppConfig, ObservabilityConfig},
    db::DbPool,
    generation::create_generator,
    metrics::{register_metrics, ANSWER_BUCKETS},
    retrieval::{MemoryStore, PgFullTextRetriever, PgSubstringRetriever},
    AiSearchService, ContentStoreAccessor, VERSION,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    set_header::SetResponseHeaderLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Headers browsers may send to the ai-search endpoint
pub const ALLOWED_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

/// Content store behind the search service, kept for readiness checks
#[derive(Clone)]
pub enum StoreHandle {
    Postgres(DbPool),
    Memory,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub search: Arc<AiSearchService>,
    pub store: StoreHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load()?;

    init_tracing(&config.observability);

    info!("Starting Sabzi Saathi API Gateway v{}", VERSION);

    // Initialize metrics
    if config.observability.metrics_port != 0 {
        let metrics_addr = SocketAddr::from(([0, 0, 0, 0], config.observability.metrics_port));
        PrometheusBuilder::new()
            .with_http_listener(metrics_addr)
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                ANSWER_BUCKETS,
            )?
            .install()?;
        info!("Metrics exporter listening on {}", metrics_addr);
    }
    register_metrics();

    let state = build_state(config).await?;
    let addr: SocketAddr = format!("{}:{}", state.config.server.host, state.config.server.port)
        .parse()?;

    // Build the router
    let app = create_router(state);

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if config.json_logging {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Wire the content store, generator and pipeline from configuration
async fn build_state(config: AppConfig) -> anyhow::Result<AppState> {
    let generator = create_generator(&config.generation)?;
    if let Err(e) = generator.check_credentials() {
        warn!(error = %e, "Generation provider is not usable; ai-search requests will fail");
    }

    let (accessor, store) = if config.uses_memory_store() {
        let store = match config.memory_seed_path() {
            Some(path) => MemoryStore::from_json_file(path)?,
            None => MemoryStore::default(),
        };
        info!(records = store.len(), "Using in-memory content store");

        let accessor = ContentStoreAccessor::with_config(
            Arc::new(store.full_text()),
            Arc::new(store.substring()),
            &config.retrieval,
        );
        (accessor, StoreHandle::Memory)
    } else {
        let db = DbPool::new(&config.database).await?;

        let accessor = ContentStoreAccessor::with_config(
            Arc::new(PgFullTextRetriever::new(db.clone())),
            Arc::new(PgSubstringRetriever::new(db.clone())),
            &config.retrieval,
        );
        (accessor, StoreHandle::Postgres(db))
    };

    let search = AiSearchService::new(accessor, generator, &config);

    Ok(AppState {
        config: Arc::new(config),
        search: Arc::new(search),
        store,
    })
}

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let mut ai_routes = Router::new().route(
        "/ai-search",
        post(handlers::ai_search::ai_search).options(handlers::ai_search::preflight),
    );

    if state.config.rate_limit.enabled {
        let limiter = middleware::rate_limit::create_rate_limiter(&state.config.rate_limit);
        ai_routes = ai_routes.route_layer(axum::middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit::rate_limit_middleware,
        ));
    }

    let api_routes = Router::new()
        // Health endpoints
        .route("/health", get(handlers::health::health))
        .route("/ready", get(handlers::health::ready))
        // Same path the marketplace UI invokes
        .nest("/functions/v1", ai_routes);

    api_routes
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TraceLayer::new_for_http())
                // CORS headers on every response, errors included
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_ORIGIN,
                    HeaderValue::from_static("*"),
                ))
                .layer(SetResponseHeaderLayer::overriding(
                    header::ACCESS_CONTROL_ALLOW_HEADERS,
                    HeaderValue::from_static(ALLOWED_HEADERS),
                )),
        )
        .with_state(state)
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting shutdown..."),
    }
}
