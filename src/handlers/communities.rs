use axum::extract::State;
use axum::response::Response;

use super::{remove_files, write_or_discard, ResourceId};
use crate::auth::AuthUser;
use crate::payload::{self, Merged};
use crate::repos::CommunityRepo;
use crate::state::AppState;
use crate::uploads::{FormBody, UploadRules};
use crate::utils::error::AppError;
use crate::utils::response::{confirmation, created, ok};
use crate::validation::{validate_community, validate_community_update};

const UPLOADS: UploadRules = UploadRules {
    file_fields: &["logo", "image"],
};

fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}

/// GET /community
pub async fn list(State(state): State<AppState>, _user: AuthUser) -> Result<Response, AppError> {
    let rows = CommunityRepo::new(state.pool()).find_all().await?;
    Ok(ok(rows))
}

/// GET /community/:id
pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    ResourceId(id): ResourceId,
) -> Result<Response, AppError> {
    let row = CommunityRepo::new(state.pool())
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ok(row))
}

/// POST /community
pub async fn create(
    State(state): State<AppState>,
    _user: AuthUser,
    body: FormBody,
) -> Result<Response, AppError> {
    let form = body.read(state.uploads(), UPLOADS).await?;
    validate_community(&form.fields).map_err(AppError::Validation)?;

    let Merged {
        payload, relocated, ..
    } = payload::new_community(form, state.uploads()).await?;

    let row = write_or_discard(
        state.uploads(),
        &relocated,
        CommunityRepo::new(state.pool()).create(payload),
    )
    .await?;

    tracing::info!(community_id = %row.id, "Community created");
    Ok(created(row))
}

/// PUT/PATCH /community/:id
pub async fn update(
    State(state): State<AppState>,
    _user: AuthUser,
    ResourceId(id): ResourceId,
    body: FormBody,
) -> Result<Response, AppError> {
    let form = body.read(state.uploads(), UPLOADS).await?;
    validate_community_update(&form.fields).map_err(AppError::Validation)?;

    let repo = CommunityRepo::new(state.pool());
    let existing = repo.find_by_id(id).await?.ok_or_else(not_found)?;

    let Merged {
        payload,
        relocated,
        superseded,
    } = payload::community_changes(form, &existing, state.uploads()).await?;

    let Some(row) = write_or_discard(state.uploads(), &relocated, repo.update(id, payload)).await?
    else {
        state.uploads().discard(&relocated).await;
        return Err(not_found());
    };

    remove_files(state.uploads(), superseded.iter().map(String::as_str)).await;
    tracing::info!(community_id = %row.id, "Community updated");
    Ok(ok(row))
}

/// DELETE /community/:id
pub async fn remove(
    State(state): State<AppState>,
    _user: AuthUser,
    ResourceId(id): ResourceId,
) -> Result<Response, AppError> {
    let repo = CommunityRepo::new(state.pool());
    let existing = repo.find_by_id(id).await?.ok_or_else(not_found)?;

    remove_files(
        state.uploads(),
        [existing.logo.as_deref(), existing.image.as_deref()]
            .into_iter()
            .flatten(),
    )
    .await;

    if repo.remove(id).await? == 0 {
        return Err(not_found());
    }

    tracing::info!(community_id = %id, "Community deleted");
    Ok(confirmation("The record is deleted"))
}
