//! Custom Axum extractors

use axum::async_trait;
use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use uuid::Uuid;

use crate::utils::error::AppError;

/// Row id taken from the `:id` path segment.
#[derive(Debug, Clone, Copy)]
pub struct ResourceId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id): Path<String> = Path::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::validation("Missing id"))?;

        let uuid = Uuid::parse_str(&id).map_err(|_| AppError::validation("Invalid id"))?;
        Ok(Self(uuid))
    }
}
