//! Resource repositories.
//!
//! One per table. Each maps rows to models and funnels partial updates
//! through [`update::UpdateSet`].

pub mod communities;
pub mod events;
pub mod update;
pub mod users;

pub use communities::CommunityRepo;
pub use events::EventRepo;
pub use update::{Changeset, FieldValue, UpdateSet};
pub use users::UserRepo;

const UNIQUE_VIOLATION: &str = "23505";

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("unique constraint '{constraint}' violated")]
    Conflict { constraint: String },
}

impl DbError {
    /// Lifts Postgres unique violations out of the generic sqlx error.
    pub(crate) fn classify(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                return Self::Conflict {
                    constraint: db_err.constraint().unwrap_or_default().to_string(),
                };
            }
        }
        Self::Sqlx(err)
    }
}
