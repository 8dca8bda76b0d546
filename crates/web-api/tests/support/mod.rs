use std::sync::Arc;

use application::{
    LocalEventPublisher, MemoryStore, RoomService, RoomServiceDependencies, SystemClock,
};
use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use config::{RateLimitConfig, RoomConfig};
use serde_json::Value;
use web_api::{router, AppState};

/// 使用内存存储与进程内广播构建完整路由
pub fn build_router() -> Router {
    let broadcaster = Arc::new(LocalEventPublisher::default());
    let room_service = RoomService::new(RoomServiceDependencies {
        store: Arc::new(MemoryStore::new()),
        publisher: broadcaster.clone(),
        clock: Arc::new(SystemClock),
        room_config: RoomConfig::default(),
        rate_limit_config: RateLimitConfig::default(),
    });

    router(AppState::new(Arc::new(room_service), broadcaster))
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("x-auth-token={}", token));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    serde_json::from_slice(&bytes).expect("json")
}
