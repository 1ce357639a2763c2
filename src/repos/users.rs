use sqlx::PgPool;
use uuid::Uuid;

use super::{Changeset, DbError, UpdateSet};
use crate::models::{NewUser, User, UserChanges, UserCredentials};

const TABLE: &str = "users";

/// Public columns. `password` is only ever read by [`UserRepo::find_by_email`].
const COLUMNS: &str = "id, name, email, phone, interest, image, created_at";

impl Changeset for UserChanges {
    fn into_update_set(self) -> UpdateSet {
        UpdateSet::new()
            .set("name", self.name)
            .set("email", self.email)
            .set("password", self.password)
            .set("phone", self.phone)
            .set("interest", self.interest)
            .set("image", self.image)
    }
}

pub struct UserRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_all(&self) -> Result<Vec<User>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM {TABLE} ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, User>(&sql).fetch_all(self.pool).await?;
        Ok(rows)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM {TABLE} WHERE id = $1");
        let row = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserCredentials>, DbError> {
        let row = sqlx::query_as::<_, UserCredentials>(
            "SELECT id, name, email, password FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool)
        .await?;
        Ok(row)
    }

    /// Fails with [`DbError::Conflict`] when the email is already registered.
    pub async fn create(&self, new: NewUser) -> Result<User, DbError> {
        let sql = format!(
            "INSERT INTO {TABLE} (name, email, password, phone, interest, image)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(new.name)
            .bind(new.email)
            .bind(new.password)
            .bind(new.phone)
            .bind(new.interest)
            .bind(new.image)
            .fetch_one(self.pool)
            .await
            .map_err(DbError::classify)
    }

    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, DbError> {
        let set = changes.into_update_set();
        if set.is_empty() {
            return self.find_by_id(id).await;
        }
        set.execute(self.pool, TABLE, COLUMNS, id)
            .await
            .map_err(DbError::classify)
    }

    pub async fn remove(&self, id: Uuid) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_is_updatable_but_never_returned() {
        let set = UserChanges {
            password: Some("$argon2id$v=19$...".into()),
            ..Default::default()
        }
        .into_update_set();

        assert_eq!(set.columns(), vec!["password"]);
        assert!(!COLUMNS.contains("password"));
    }
}
