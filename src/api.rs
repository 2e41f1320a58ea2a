pub(crate) mod health;
pub(crate) mod metrics;
pub(crate) mod navigation;
pub(crate) mod topics;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::app::AppState;

pub(crate) fn router(state: AppState) -> Router {
    Router::new()
        .route("/health/ready", get(health::ready))
        .route("/health/live", get(health::live))
        .route("/metrics", get(metrics::exporter))
        .route("/v1/topics", get(topics::list_topics))
        .route("/v1/topics/rotation", get(topics::rotation))
        .route(
            "/v1/navigation/{consumer_id}/enter",
            post(navigation::enter),
        )
        .route("/v1/navigation/{consumer_id}/exit", post(navigation::exit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
