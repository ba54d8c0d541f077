use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use gatekeeper_auth::{AuthError, GateError};

pub fn auth_error_to_response(err: AuthError) -> Response {
    match err {
        AuthError::MalformedInput(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AuthError::NotFound => json_error(StatusCode::UNAUTHORIZED, "refresh_token_not_found", err.to_string()),
        AuthError::InvalidOrExpired => {
            json_error(StatusCode::UNAUTHORIZED, "refresh_token_invalid", err.to_string())
        }
        AuthError::IdentityMismatch => {
            json_error(StatusCode::UNAUTHORIZED, "refresh_token_mismatch", err.to_string())
        }
        AuthError::InvalidSignature | AuthError::MalformedToken(_) => {
            json_error(StatusCode::UNAUTHORIZED, "token_invalid", err.to_string())
        }
        AuthError::Expired => json_error(StatusCode::UNAUTHORIZED, "token_expired", err.to_string()),
        AuthError::Unauthorized(msg) => json_error(StatusCode::UNAUTHORIZED, "unauthorized", msg),
        AuthError::Forbidden(e) => json_error(StatusCode::FORBIDDEN, "forbidden", e.to_string()),
        AuthError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        AuthError::StoreFailure(msg) => {
            error!(error = %msg, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", "storage unavailable")
        }
        AuthError::Crypto(msg) => {
            error!(error = %msg, "crypto failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn gate_error_to_response(err: GateError) -> Response {
    let code = match err {
        GateError::MissingHeader => "missing_token",
        GateError::MalformedHeader => "malformed_authorization_header",
        GateError::InvalidSignature | GateError::Malformed(_) => "token_invalid",
        GateError::Expired => "token_expired",
    };
    json_error(StatusCode::UNAUTHORIZED, code, err.to_string())
}

/// Unwrap a JSON body, mapping extractor rejections to `validation_error`.
pub fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| json_error(StatusCode::BAD_REQUEST, "validation_error", rejection.body_text()))
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
