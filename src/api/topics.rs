use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::app::AppState;
use crate::pipeline::orchestrator::DiscoveryRequest;
use crate::pipeline::rotation::rotating_subset;
use crate::pipeline::types::{GeoFilter, GeographicScope, Topic};

#[derive(Debug, Deserialize)]
pub(crate) struct TopicsQuery {
    scope: Option<String>,
    state: Option<String>,
    city: Option<String>,
    lat: Option<f64>,
    lng: Option<f64>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TopicsResponse {
    topics: Vec<Topic>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn parse_scope(raw: Option<&str>) -> Result<GeographicScope, String> {
    match raw.unwrap_or("national") {
        "national" => Ok(GeographicScope::National),
        "state" => Ok(GeographicScope::State),
        "local" => Ok(GeographicScope::Local),
        other => Err(format!("unknown scope: {other}")),
    }
}

fn discovery_request(query: &TopicsQuery) -> Result<DiscoveryRequest, String> {
    let scope = parse_scope(query.scope.as_deref())?;
    let coordinates = match (query.lat, query.lng) {
        (Some(lat), Some(lng)) => Some((lat, lng)),
        (None, None) => None,
        _ => return Err("lat and lng must be provided together".to_string()),
    };
    Ok(DiscoveryRequest {
        scope,
        geo: GeoFilter {
            state: query.state.clone(),
            city: query.city.clone(),
        },
        coordinates,
    })
}

/// GET /v1/topics
pub(crate) async fn list_topics(
    State(state): State<AppState>,
    Query(query): Query<TopicsQuery>,
) -> impl IntoResponse {
    let request = match discovery_request(&query) {
        Ok(request) => request,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
                .into_response();
        }
    };

    match state.orchestrator().discover_topics(&request).await {
        Ok(topics) => (StatusCode::OK, Json(TopicsResponse { topics })).into_response(),
        Err(error) => {
            error!(error = %format!("{error:#}"), "topic discovery failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "topic discovery failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}

/// GET /v1/topics/rotation - time-bucketed window for compact surfaces.
pub(crate) async fn rotation(
    State(state): State<AppState>,
    Query(query): Query<TopicsQuery>,
) -> impl IntoResponse {
    let request = match discovery_request(&query) {
        Ok(request) => request,
        Err(message) => {
            return (StatusCode::BAD_REQUEST, Json(ErrorResponse { error: message }))
                .into_response();
        }
    };

    match state.orchestrator().discover_topics(&request).await {
        Ok(topics) => {
            let window =
                rotating_subset(&topics, &state.rotation_settings(), Utc::now()).to_vec();
            (StatusCode::OK, Json(TopicsResponse { topics: window })).into_response()
        }
        Err(error) => {
            error!(error = %format!("{error:#}"), "topic rotation failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "topic discovery failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}
