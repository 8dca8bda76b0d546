use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use validator::Validate;

use application::{DeleteMessageRequest, EditMessageRequest, JoinRoomRequest, PostMessageRequest};
use domain::Message;

use crate::{
    auth::{credentials, token_cookie, token_from_headers},
    error::ApiError,
    state::AppState,
    ws_connection::WebSocketConnection,
};

#[derive(Debug, Deserialize)]
struct RoomQuery {
    #[serde(rename = "roomId")]
    room_id: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct PostMessagePayload {
    #[validate(length(max = 100))]
    sender: String,
    #[validate(length(max = 1000))]
    text: String,
}

#[derive(Debug, Deserialize, Validate)]
struct EditMessagePayload {
    #[validate(length(max = 1000))]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreatedRoom {
    room_id: String,
}

#[derive(Debug, Serialize)]
struct JoinedRoom {
    token: String,
}

#[derive(Debug, Serialize)]
struct TtlResponse {
    ttl: u64,
}

#[derive(Debug, Serialize)]
struct MessagesResponse {
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct SuccessResponse {
    success: bool,
}

const SUCCESS: SuccessResponse = SuccessResponse { success: true };

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/room/create", post(create_room))
        .route("/room/join", post(join_room))
        .route("/room/ttl", get(get_ttl))
        .route("/room", axum::routing::delete(destroy_room))
        .route("/messages", post(post_message).get(list_messages))
        .route(
            "/messages/{message_id}",
            patch(edit_message).delete(delete_message),
        )
        .route("/realtime", get(realtime_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_room(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<CreatedRoom>), ApiError> {
    let room_id = state.room_service.create_room().await?;
    Ok((
        StatusCode::CREATED,
        Json(CreatedRoom {
            room_id: room_id.to_string(),
        }),
    ))
}

async fn join_room(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = state
        .room_service
        .join_room(JoinRoomRequest {
            room_id: query.room_id,
            token: token_from_headers(&headers),
        })
        .await?;

    let cookie = token_cookie(&token)?;
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(JoinedRoom {
            token: token.to_string(),
        }),
    )
        .into_response())
}

async fn get_ttl(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
) -> Result<Json<TtlResponse>, ApiError> {
    let ttl = state
        .room_service
        .get_ttl(&credentials(&headers, query.room_id))
        .await?;
    Ok(Json(TtlResponse { ttl }))
}

async fn destroy_room(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .room_service
        .destroy_room(&credentials(&headers, query.room_id))
        .await?;
    Ok(Json(SUCCESS))
}

async fn post_message(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
    Json(payload): Json<PostMessagePayload>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    payload
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    let message = state
        .room_service
        .post_message(PostMessageRequest {
            credentials: credentials(&headers, query.room_id),
            sender: payload.sender,
            text: payload.text,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state
        .room_service
        .list_messages(&credentials(&headers, query.room_id))
        .await?;
    Ok(Json(MessagesResponse { messages }))
}

async fn edit_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
    Json(payload): Json<EditMessagePayload>,
) -> Result<Json<SuccessResponse>, ApiError> {
    payload
        .validate()
        .map_err(|err| ApiError::bad_request(err.to_string()))?;

    state
        .room_service
        .edit_message(EditMessageRequest {
            credentials: credentials(&headers, query.room_id),
            message_id,
            text: payload.text,
        })
        .await?;
    Ok(Json(SUCCESS))
}

async fn delete_message(
    State(state): State<AppState>,
    Path(message_id): Path<String>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
) -> Result<Json<SuccessResponse>, ApiError> {
    state
        .room_service
        .delete_message(DeleteMessageRequest {
            credentials: credentials(&headers, query.room_id),
            message_id,
        })
        .await?;
    Ok(Json(SUCCESS))
}

/// 升级前完成授权与订阅，失败时直接返回 HTTP 错误
async fn realtime_upgrade(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    let access = state
        .room_service
        .authorize(&credentials(&headers, query.room_id))
        .await?;

    let events = state
        .subscriber
        .subscribe(&access.room_id)
        .await
        .map_err(|err| {
            tracing::error!(room_id = %access.room_id, error = %err, "订阅房间频道失败");
            ApiError::internal_server_error("Failed to establish connection")
        })?;

    Ok(ws.on_upgrade(move |socket| async move {
        WebSocketConnection::new(socket, access, events).run().await;
    }))
}
