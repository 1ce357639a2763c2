use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Confirmation body returned by deletes.
#[derive(Debug, Serialize)]
pub struct Confirmation {
    pub message: String,
    pub status: &'static str,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

#[derive(Serialize)]
struct ErrorsBody {
    errors: Vec<String>,
}

pub fn ok<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::OK, Json(data)).into_response()
}

pub fn created<T>(data: T) -> Response
where
    T: Serialize,
{
    (StatusCode::CREATED, Json(data)).into_response()
}

pub fn confirmation(message: impl Into<String>) -> Response {
    let body = Confirmation {
        message: message.into(),
        status: "success",
    };
    (StatusCode::OK, Json(body)).into_response()
}

/// `{"error": message}`
pub fn error(message: impl Into<String>, status: StatusCode) -> Response {
    let body = ErrorBody {
        error: message.into(),
    };
    (status, Json(body)).into_response()
}

/// `{"errors": [...]}`, used for itemized validation failures.
pub fn errors(messages: Vec<String>, status: StatusCode) -> Response {
    (status, Json(ErrorsBody { errors: messages })).into_response()
}
