use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::error;
use uuid::Uuid;

use crate::app::AppState;
use crate::pipeline::navigation::NavigationView;
use crate::pipeline::orchestrator::DiscoveryRequest;
use crate::pipeline::types::{ContentItem, GeoFilter, GeographicScope};

#[derive(Debug, Deserialize)]
pub(crate) struct EnterRequest {
    topic_id: Uuid,
    #[serde(default)]
    scope: Option<GeographicScope>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    city: Option<String>,
    /// The consumer's current feed, snapshotted for exact restoration.
    current_feed: Vec<ContentItem>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExitRequest {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    city: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub(crate) enum NavigationResponse {
    Filtered {
        active_topic_id: Uuid,
        item_ids: Vec<Uuid>,
    },
    Feed {
        items: Vec<ContentItem>,
    },
}

impl From<NavigationView> for NavigationResponse {
    fn from(view: NavigationView) -> Self {
        match view {
            NavigationView::Filtered {
                active_topic_id,
                item_ids,
            } => Self::Filtered {
                active_topic_id,
                item_ids,
            },
            NavigationView::Feed(items) => Self::Feed { items },
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// POST /v1/navigation/{consumer_id}/enter
pub(crate) async fn enter(
    State(state): State<AppState>,
    Path(consumer_id): Path<Uuid>,
    Json(request): Json<EnterRequest>,
) -> impl IntoResponse {
    let discovery = DiscoveryRequest {
        scope: request.scope.unwrap_or(GeographicScope::National),
        geo: GeoFilter {
            state: request.state,
            city: request.city,
        },
        coordinates: None,
    };

    let topics = match state.orchestrator().discover_topics(&discovery).await {
        Ok(topics) => topics,
        Err(error) => {
            error!(error = %format!("{error:#}"), "topic lookup for navigation failed");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "topic lookup failed".to_string(),
                }),
            )
                .into_response();
        }
    };

    let Some(topic) = topics.iter().find(|topic| topic.id == request.topic_id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("unknown topic: {}", request.topic_id),
            }),
        )
            .into_response();
    };

    let view = state
        .navigation()
        .enter(consumer_id, topic, request.current_feed)
        .await;
    (StatusCode::OK, Json(NavigationResponse::from(view))).into_response()
}

/// POST /v1/navigation/{consumer_id}/exit
pub(crate) async fn exit(
    State(state): State<AppState>,
    Path(consumer_id): Path<Uuid>,
    Json(request): Json<ExitRequest>,
) -> impl IntoResponse {
    let geo = GeoFilter {
        state: request.state,
        city: request.city,
    };

    match state.navigation().exit(consumer_id, &geo).await {
        Ok(view) => (StatusCode::OK, Json(NavigationResponse::from(view))).into_response(),
        Err(error) => {
            error!(error = %format!("{error:#}"), "navigation exit failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: "navigation exit failed".to_string(),
                }),
            )
                .into_response()
        }
    }
}
