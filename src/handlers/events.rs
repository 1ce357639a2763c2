use axum::extract::State;
use axum::response::Response;

use super::{remove_files, write_or_discard, ResourceId};
use crate::auth::AuthUser;
use crate::payload::{self, Merged};
use crate::repos::EventRepo;
use crate::state::AppState;
use crate::uploads::{FormBody, UploadRules};
use crate::utils::error::AppError;
use crate::utils::response::{confirmation, created, ok};
use crate::validation::{validate_event, validate_event_update};

const UPLOADS: UploadRules = UploadRules {
    file_fields: &["event_image"],
};

fn not_found() -> AppError {
    AppError::NotFound("Event not found".to_string())
}

/// GET /events (public)
pub async fn list(State(state): State<AppState>) -> Result<Response, AppError> {
    let rows = EventRepo::new(state.pool()).find_all().await?;
    Ok(ok(rows))
}

/// GET /events/:id
pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    ResourceId(id): ResourceId,
) -> Result<Response, AppError> {
    let row = EventRepo::new(state.pool())
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ok(row))
}

/// POST /events
pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    body: FormBody,
) -> Result<Response, AppError> {
    let form = body.read(state.uploads(), UPLOADS).await?;
    validate_event(&form.fields).map_err(AppError::Validation)?;

    let Merged {
        payload, relocated, ..
    } = payload::new_event(form, state.uploads()).await?;

    let row = write_or_discard(
        state.uploads(),
        &relocated,
        EventRepo::new(state.pool()).create(payload),
    )
    .await?;

    tracing::info!(event_id = %row.id, "Event created");
    Ok(created(row))
}

/// PUT/PATCH /events/:id
pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    ResourceId(id): ResourceId,
    body: FormBody,
) -> Result<Response, AppError> {
    let form = body.read(state.uploads(), UPLOADS).await?;
    validate_event_update(&form.fields).map_err(AppError::Validation)?;

    let repo = EventRepo::new(state.pool());
    let existing = repo.find_by_id(id).await?.ok_or_else(not_found)?;

    let Merged {
        payload,
        relocated,
        superseded,
    } = payload::event_changes(form, &existing, state.uploads()).await?;

    let Some(row) = write_or_discard(state.uploads(), &relocated, repo.update(id, payload)).await?
    else {
        state.uploads().discard(&relocated).await;
        return Err(not_found());
    };

    remove_files(state.uploads(), superseded.iter().map(String::as_str)).await;
    tracing::info!(event_id = %row.id, "Event updated");
    Ok(ok(row))
}

/// DELETE /events/:id
pub async fn remove(
    State(state): State<AppState>,
    _user: AuthUser,
    ResourceId(id): ResourceId,
) -> Result<Response, AppError> {
    let repo = EventRepo::new(state.pool());
    let existing = repo.find_by_id(id).await?.ok_or_else(not_found)?;

    if let Some(image) = existing.event_image.as_deref() {
        remove_files(state.uploads(), [image]).await;
    }

    if repo.remove(id).await? == 0 {
        return Err(not_found());
    }

    tracing::info!(event_id = %id, "Event deleted");
    Ok(confirmation("Event deleted"))
}
