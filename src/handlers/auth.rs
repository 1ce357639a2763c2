use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use uuid::Uuid;

use crate::auth;
use crate::repos::UserRepo;
use crate::state::AppState;
use crate::uploads::{FormBody, UploadRules};
use crate::utils::error::AppError;
use crate::utils::response::{confirmation, ok};

const NO_FILES: UploadRules = UploadRules { file_fields: &[] };

#[derive(Serialize)]
struct LoginResponse {
    id: Uuid,
    name: String,
    email: String,
    token: String,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}

/// POST /auth/login
///
/// Sets the `token` cookie and also returns the token for clients that send
/// it as a bearer header.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    body: FormBody,
) -> Result<Response, AppError> {
    let form = body.read(state.uploads(), NO_FILES).await?;

    let mut errors = Vec::new();
    let email = form.fields.text("email").map(|e| e.trim().to_string());
    let password = form.fields.text("password");
    if email.as_deref().map_or(true, str::is_empty) {
        errors.push("Email is required".to_string());
    }
    if password.as_deref().map_or(true, str::is_empty) {
        errors.push("Password is required".to_string());
    }
    let (Some(email), Some(password)) = (email, password) else {
        return Err(AppError::Validation(errors));
    };
    if !errors.is_empty() {
        return Err(AppError::Validation(errors));
    }

    let credentials = UserRepo::new(state.pool())
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !auth::verify_password(password, credentials.password).await? {
        tracing::info!(user_id = %credentials.id, "Login rejected: wrong password");
        return Err(invalid_credentials());
    }

    let token = state.jwt().issue(credentials.id)?;
    let jar = jar.add(auth::session_cookie(token.clone(), state.secure_cookies()));

    tracing::info!(user_id = %credentials.id, "User logged in");
    Ok((
        jar,
        ok(LoginResponse {
            id: credentials.id,
            name: credentials.name,
            email: credentials.email,
            token,
        }),
    )
        .into_response())
}

/// POST /auth/logout
pub async fn logout(jar: CookieJar) -> Response {
    let jar = jar.remove(auth::removal_cookie());
    (jar, confirmation("Logged out")).into_response()
}
