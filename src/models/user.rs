use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Public view of a user row. The password hash is never selected into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub interest: Option<Vec<String>>,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User row including the stored hash, used for login and duplicate checks.
#[derive(Debug, Clone, FromRow)]
pub struct UserCredentials {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Already hashed.
    pub password: String,
    pub phone: Option<String>,
    pub interest: Option<Vec<String>>,
    pub image: Option<String>,
}

/// Fields a profile update may touch. `None` leaves the column as is.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    /// Already hashed.
    pub password: Option<String>,
    pub phone: Option<String>,
    pub interest: Option<Vec<String>>,
    pub image: Option<String>,
}
