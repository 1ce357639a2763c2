//! Resource handlers.
//!
//! Every write runs the same sequence: the auth extractor rejects anonymous
//! callers, the body is read and validated, the existing row is loaded for
//! updates and deletes, the payload is merged (relocating staged files), the
//! row is written, and files the write made obsolete are cleaned up.

pub mod auth;
pub mod communities;
pub mod events;
pub mod extractors;
pub mod users;

use std::future::Future;

use axum::extract::State;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::repos::{DbError, UserRepo};
use crate::state::AppState;
use crate::uploads::UploadManager;
use crate::utils::error::AppError;
use crate::utils::response::{error as error_response, ok};

pub use extractors::ResourceId;

#[derive(Serialize)]
struct HealthPayload {
    status: &'static str,
    service: &'static str,
}

pub async fn health_check() -> Response {
    ok(HealthPayload {
        status: "ok",
        service: "hub-api",
    })
}

pub async fn ping() -> &'static str {
    "pong"
}

#[derive(Serialize)]
struct Greeting {
    message: String,
}

pub async fn hello(State(state): State<AppState>, user: AuthUser) -> Result<Response, AppError> {
    let name = UserRepo::new(state.pool())
        .find_by_id(user.id)
        .await?
        .map(|u| u.name)
        .unwrap_or_else(|| "friend".to_string());

    Ok(ok(Greeting {
        message: format!("Hello, {name}!"),
    }))
}

pub async fn not_found() -> Response {
    error_response("Not found", axum::http::StatusCode::NOT_FOUND).into_response()
}

/// Awaits a row write. If it fails, files relocated for it are removed so
/// no file outlives the write that was meant to reference it.
async fn write_or_discard<T, F>(
    uploads: &UploadManager,
    relocated: &[String],
    write: F,
) -> Result<T, AppError>
where
    F: Future<Output = Result<T, DbError>>,
{
    match write.await {
        Ok(row) => Ok(row),
        Err(e) => {
            uploads.discard(relocated).await;
            Err(e.into())
        }
    }
}

/// Advisory cleanup of files a row owned or no longer references.
async fn remove_files<'a>(uploads: &UploadManager, references: impl IntoIterator<Item = &'a str>) {
    for reference in references {
        uploads.remove_best_effort(reference).await;
    }
}
