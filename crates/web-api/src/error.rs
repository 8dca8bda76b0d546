use application::ApplicationError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.body.code
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn internal_server_error(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", message)
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        use application::ApplicationError as AppErr;
        use domain::DomainError;

        match error {
            AppErr::Domain(DomainError::InvalidArgument { field, reason }) => ApiError::new(
                StatusCode::BAD_REQUEST,
                "INVALID_ARGUMENT",
                format!("{}: {}", field, reason),
            ),
            AppErr::Domain(DomainError::MissingCredentials) => ApiError::new(
                StatusCode::UNAUTHORIZED,
                "MISSING_CREDENTIALS",
                "missing room id or token",
            ),
            AppErr::Domain(DomainError::RoomNotFound) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "ROOM_NOT_FOUND", "room not found")
            }
            AppErr::Domain(DomainError::RoomFull) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "ROOM_FULL", "room is full")
            }
            AppErr::Domain(DomainError::InvalidToken) => {
                ApiError::new(StatusCode::UNAUTHORIZED, "INVALID_TOKEN", "invalid token")
            }
            AppErr::Domain(DomainError::RoomGone) => ApiError::new(
                StatusCode::GONE,
                "ROOM_GONE",
                "room has expired or been destroyed",
            ),
            AppErr::Domain(DomainError::RateLimitExceeded { current, max }) => ApiError::new(
                StatusCode::TOO_MANY_REQUESTS,
                "RATE_LIMITED",
                format!("too many messages: {}/{}", current, max),
            ),
            AppErr::Domain(DomainError::MessageNotFound) => ApiError::new(
                StatusCode::NOT_FOUND,
                "MESSAGE_NOT_FOUND",
                "message not found",
            ),
            AppErr::Domain(DomainError::NotAuthorized) => ApiError::new(
                StatusCode::FORBIDDEN,
                "NOT_AUTHORIZED",
                "only the author can modify this message",
            ),
            AppErr::Domain(DomainError::MessageDeleted) => ApiError::new(
                StatusCode::CONFLICT,
                "MESSAGE_DELETED",
                "message has been deleted",
            ),
            AppErr::Store(err) => {
                tracing::error!(error = %err, "存储操作失败");
                ApiError::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "storage unavailable",
                )
            }
            AppErr::Broadcast(err) => ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "BROADCAST_ERROR",
                format!("broadcast error: {}", err),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use application::StoreError;
    use domain::DomainError;

    fn status_of(err: DomainError) -> StatusCode {
        ApiError::from(ApplicationError::from(err)).status()
    }

    #[test]
    fn test_unauthorized_family_maps_to_401() {
        for err in [
            DomainError::MissingCredentials,
            DomainError::RoomNotFound,
            DomainError::RoomFull,
            DomainError::InvalidToken,
        ] {
            assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(DomainError::RoomGone), StatusCode::GONE);
        assert_eq!(
            status_of(DomainError::RateLimitExceeded { current: 21, max: 20 }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(status_of(DomainError::MessageNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(DomainError::NotAuthorized), StatusCode::FORBIDDEN);
        assert_eq!(status_of(DomainError::MessageDeleted), StatusCode::CONFLICT);
        assert_eq!(
            status_of(DomainError::invalid_argument("text", "too long")),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_store_fault_is_opaque_500() {
        let err = ApiError::from(ApplicationError::from(StoreError::Connection(
            "redis://secret@host".into(),
        )));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.code(), "STORE_ERROR");
        assert!(!err.body.message.contains("secret"));
    }
}
