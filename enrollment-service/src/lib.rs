use std::sync::Arc;

use axum::{
    extract::State,
    http::{
        header::{ACCEPT, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use common_http_errors::{http_error_metrics_layer, ApiError, ApiResult};
use common_observability::ServiceMetrics;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::error;

pub mod config;
pub mod gateway;
pub mod orders;
pub mod payment_handlers;
pub mod records;
pub mod repo;
pub mod submission_handlers;
pub mod webhook;

use crate::config::AppConfig;
use crate::gateway::PaymentGateway;
use crate::repo::RecordStore;

pub const SERVICE_NAME: &str = "enrollment-service";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub metrics: ServiceMetrics,
}

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_allowed_origins);
    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/metrics", get(render_metrics))
        .route("/register", post(submission_handlers::register))
        .route("/payafterplacement", post(submission_handlers::pay_after_placement))
        .route("/order", post(payment_handlers::create_order))
        .route("/create-order", post(payment_handlers::create_order))
        .route("/status", post(payment_handlers::check_status))
        .route("/payment/callback", post(webhook::gateway_callback))
        .layer(middleware::from_fn(http_error_metrics_layer(SERVICE_NAME)))
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        AllowOrigin::list(
            origins
                .iter()
                .filter_map(|origin| origin.parse::<HeaderValue>().ok())
                .collect::<Vec<_>>(),
        )
    };
    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([ACCEPT, CONTENT_TYPE, HeaderName::from_static("x-verify")])
}

async fn render_metrics(State(state): State<AppState>) -> ApiResult<String> {
    state.metrics.render().map_err(|err| {
        error!(error = %err, "Failed to render metrics");
        ApiError::internal("Failed to render metrics")
    })
}
