use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use protelab_infra::{ErrorKind, ServiceError};

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    let status = match err.kind() {
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::InvalidArgument => StatusCode::BAD_REQUEST,
        ErrorKind::Forbidden => StatusCode::FORBIDDEN,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "request failed");
    }

    match err {
        ServiceError::Conflict {
            message,
            current,
            attempted,
        } => (
            status,
            axum::Json(json!({
                "error": "conflict",
                "message": message,
                "current": current,
                "attempted": attempted,
            })),
        )
            .into_response(),
        other => json_error(status, other.code(), other.message()),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
