use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;

use super::{remove_files, write_or_discard, ResourceId};
use crate::auth::{self, AuthUser};
use crate::payload::{self, Merged};
use crate::repos::UserRepo;
use crate::state::AppState;
use crate::uploads::{FormBody, UploadRules};
use crate::utils::error::AppError;
use crate::utils::response::{confirmation, created, ok};
use crate::validation::{validate_user_registration, validate_user_update};

const UPLOADS: UploadRules = UploadRules {
    file_fields: &["image"],
};

fn not_found() -> AppError {
    AppError::NotFound("User not found".to_string())
}

fn email_taken() -> AppError {
    AppError::Conflict("Email already exists".to_string())
}

/// POST /users/register (public)
pub async fn register(State(state): State<AppState>, body: FormBody) -> Result<Response, AppError> {
    let form = body.read(state.uploads(), UPLOADS).await?;
    validate_user_registration(&form.fields).map_err(AppError::Validation)?;

    let repo = UserRepo::new(state.pool());
    let email = form.fields.text("email").unwrap_or_default();
    if repo.find_by_email(email.trim()).await?.is_some() {
        return Err(email_taken());
    }

    let password = form.fields.text("password").unwrap_or_default();
    let password_hash = auth::hash_password(password).await?;

    let Merged {
        payload, relocated, ..
    } = payload::new_user(form, password_hash, state.uploads()).await?;

    // A concurrent registration can still win the race; the unique
    // constraint turns that into a conflict as well.
    let user = write_or_discard(state.uploads(), &relocated, repo.create(payload)).await?;

    tracing::info!(user_id = %user.id, "User registered");
    Ok(created(user))
}

/// GET /users
pub async fn list(State(state): State<AppState>, _user: AuthUser) -> Result<Response, AppError> {
    let users = UserRepo::new(state.pool()).find_all().await?;
    Ok(ok(users))
}

/// GET /users/:id
pub async fn get(
    State(state): State<AppState>,
    _user: AuthUser,
    ResourceId(id): ResourceId,
) -> Result<Response, AppError> {
    let user = UserRepo::new(state.pool())
        .find_by_id(id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ok(user))
}

/// GET /users/profile
pub async fn profile(State(state): State<AppState>, user: AuthUser) -> Result<Response, AppError> {
    let user = UserRepo::new(state.pool())
        .find_by_id(user.id)
        .await?
        .ok_or_else(not_found)?;
    Ok(ok(user))
}

/// PATCH /users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthUser,
    body: FormBody,
) -> Result<Response, AppError> {
    let form = body.read(state.uploads(), UPLOADS).await?;
    validate_user_update(&form.fields).map_err(AppError::Validation)?;

    let repo = UserRepo::new(state.pool());
    let existing = repo.find_by_id(user.id).await?.ok_or_else(not_found)?;

    let password_hash = match form.fields.text("password") {
        Some(password) => Some(auth::hash_password(password).await?),
        None => None,
    };

    let Merged {
        payload,
        relocated,
        superseded,
    } = payload::user_changes(form, password_hash, &existing, state.uploads()).await?;

    let Some(updated) =
        write_or_discard(state.uploads(), &relocated, repo.update(user.id, payload)).await?
    else {
        state.uploads().discard(&relocated).await;
        return Err(not_found());
    };

    remove_files(state.uploads(), superseded.iter().map(String::as_str)).await;
    tracing::info!(user_id = %updated.id, "Profile updated");
    Ok(ok(updated))
}

/// DELETE /users/profile
pub async fn delete_profile(
    State(state): State<AppState>,
    user: AuthUser,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let repo = UserRepo::new(state.pool());
    let existing = repo.find_by_id(user.id).await?.ok_or_else(not_found)?;

    if let Some(image) = existing.image.as_deref() {
        remove_files(state.uploads(), [image]).await;
    }

    if repo.remove(user.id).await? == 0 {
        return Err(not_found());
    }

    tracing::info!(user_id = %user.id, "User deleted");
    let jar = jar.remove(auth::removal_cookie());
    Ok((jar, confirmation("User deleted successfully")).into_response())
}
