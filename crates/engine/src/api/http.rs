//! HTTP routes.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;

use chibibot_domain::{OperatorState, RuntimeConfig, RuntimeConfigPatch};
use chibibot_shared::{AssignOperatorRequest, InjectChatRequest, MetricsSnapshot, RoomSummary};

use crate::app::App;
use crate::infrastructure::ports::{ChatError, ChatMessage};
use crate::rooms::RoomError;

/// Create all HTTP routes.
pub fn routes() -> Router<Arc<App>> {
    Router::new()
        .route("/", get(health))
        .route("/api/health", get(health))
        .route("/room", post(create_room))
        .route("/room/", post(create_room))
        .route("/api/rooms", get(list_rooms))
        .route("/api/rooms/{channel}", delete(remove_room))
        .route("/api/rooms/{channel}/config", put(update_config))
        .route("/api/rooms/{channel}/chat", post(inject_chat))
        .route("/api/rooms/{channel}/operators", post(assign_operator))
        .route("/api/metrics", get(metrics))
}

/// `?channelName=` as sent by the render client and the bot's web UI.
#[derive(Debug, Deserialize)]
pub struct ChannelQuery {
    #[serde(rename = "channelName")]
    pub channel_name: String,
}

async fn health() -> &'static str {
    "OK"
}

async fn create_room(
    State(app): State<Arc<App>>,
    Query(query): Query<ChannelQuery>,
) -> Result<Json<RoomSummary>, ApiError> {
    if query.channel_name.trim().is_empty() {
        return Err(ApiError::BadRequest("channelName is required".into()));
    }
    let room = app.rooms.create_room_or_noop(&query.channel_name).await?;
    Ok(Json(room.summary().await))
}

async fn list_rooms(State(app): State<Arc<App>>) -> Json<Vec<RoomSummary>> {
    Json(app.rooms.list_rooms().await)
}

async fn remove_room(
    State(app): State<Arc<App>>,
    Path(channel): Path<String>,
) -> Result<StatusCode, ApiError> {
    app.rooms.remove_room(&channel).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_config(
    State(app): State<Arc<App>>,
    Path(channel): Path<String>,
    Json(patch): Json<RuntimeConfigPatch>,
) -> Result<Json<RuntimeConfig>, ApiError> {
    let config = app.rooms.update_config(&channel, &patch).await?;
    Ok(Json(config))
}

async fn inject_chat(
    State(app): State<Arc<App>>,
    Path(channel): Path<String>,
    Json(request): Json<InjectChatRequest>,
) -> Result<StatusCode, ApiError> {
    let room = app.rooms.room(&channel).await.ok_or(ApiError::NotFound)?;
    let display_name = request
        .display_name
        .unwrap_or_else(|| request.username.clone());
    let message = ChatMessage::new(request.username, display_name, request.message);

    app.chat
        .inject(room.channel_name(), message)
        .map_err(|e| match e {
            ChatError::NotConnected(_) | ChatError::Closed => ApiError::NotFound,
            other => ApiError::Internal(other.to_string()),
        })?;
    Ok(StatusCode::ACCEPTED)
}

async fn assign_operator(
    State(app): State<Arc<App>>,
    Path(channel): Path<String>,
    Json(request): Json<AssignOperatorRequest>,
) -> Result<Json<OperatorState>, ApiError> {
    let state = app.rooms.assign_operator(&channel, request).await?;
    Ok(Json(state))
}

async fn metrics(State(app): State<Arc<App>>) -> Json<MetricsSnapshot> {
    Json(app.metrics.snapshot())
}

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound,
    BadRequest(String),
    Internal(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::NotFound => (StatusCode::NOT_FOUND, "Not found").into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg).into_response(),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
            }
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(e: RoomError) -> Self {
        match e {
            RoomError::ChannelNotFound(_) | RoomError::RoomNotFound(_) => ApiError::NotFound,
            RoomError::Operator(_) | RoomError::Config(_) => ApiError::BadRequest(e.to_string()),
            RoomError::Dependency(_) | RoomError::Bridge(_) => ApiError::Internal(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::testing::test_app;
    use crate::test_fixtures::SLUG;
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::json;
    use tower::ServiceExt;

    async fn call(
        app: &Arc<App>,
        method: Method,
        uri: &str,
        body: Option<serde_json::Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = routes()
            .with_state(app.clone())
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    #[tokio::test]
    async fn health_says_ok() {
        let (app, _h) = test_app();
        let (status, body) = call(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, b"OK");
    }

    #[tokio::test]
    async fn create_room_then_list() {
        let (app, _h) = test_app();

        let (status, _) = call(&app, Method::POST, "/room?channelName=stym", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::POST, "/room?channelName=stym", None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = call(&app, Method::GET, "/api/rooms", None).await;
        assert_eq!(status, StatusCode::OK);
        let rooms: Vec<RoomSummary> = serde_json::from_slice(&body).unwrap();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].channel_name, "stym");
        assert_eq!(rooms[0].num_chatters, 1);
    }

    #[tokio::test]
    async fn malformed_channel_is_not_found() {
        let (app, _h) = test_app();
        let (status, _) = call(&app, Method::POST, "/room?channelName=no%21", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn config_update_rejects_invalid_bounds() {
        let (app, _h) = test_app();
        call(&app, Method::POST, "/room?channelName=stym", None).await;

        let (status, body) = call(
            &app,
            Method::PUT,
            "/api/rooms/stym/config",
            Some(json!({"max_animation_speed": 3.0})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let config: RuntimeConfig = serde_json::from_slice(&body).unwrap();
        assert_eq!(config.max_animation_speed, 3.0);

        let (status, _) = call(
            &app,
            Method::PUT,
            "/api/rooms/stym/config",
            Some(json!({"min_animation_speed": 4.0})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn injected_chat_reaches_the_room() {
        let (app, _h) = test_app();
        call(&app, Method::POST, "/room?channelName=stym", None).await;

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/rooms/stym/chat",
            Some(json!({"username": "alice", "message": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);

        let room = app.rooms.room("stym").await.unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), async {
            while room.num_chatters().await < 2 {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let (status, _) = call(
            &app,
            Method::POST,
            "/api/rooms/nobody_here/chat",
            Some(json!({"username": "alice", "message": "hello"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_assignment_and_metrics() {
        let (app, _h) = test_app();
        call(&app, Method::POST, "/room?channelName=stym", None).await;

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/rooms/stym/operators",
            Some(json!({"username": "carol", "operator_id": SLUG, "faction": "enemy"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let state: OperatorState = serde_json::from_slice(&body).unwrap();
        assert_eq!(state.operator_id, SLUG);

        let (status, body) = call(&app, Method::GET, "/api/metrics", None).await;
        assert_eq!(status, StatusCode::OK);
        let snapshot: MetricsSnapshot = serde_json::from_slice(&body).unwrap();
        assert_eq!(snapshot.rooms_created, 1);
        assert_eq!(snapshot.chatters_added, 1);
    }

    #[tokio::test]
    async fn delete_room_is_idempotent() {
        let (app, _h) = test_app();
        call(&app, Method::POST, "/room?channelName=stym", None).await;

        let (status, _) = call(&app, Method::DELETE, "/api/rooms/stym", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, Method::DELETE, "/api/rooms/stym", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(app.rooms.list_rooms().await.is_empty());
    }
}
