use sqlx::PgPool;
use uuid::Uuid;

use super::{Changeset, DbError, UpdateSet};
use crate::models::{Community, CommunityChanges, NewCommunity};

const TABLE: &str = "community";

const COLUMNS: &str = "id, name, category, sub_category, contact, address, email, \
                       social_links, logo, image, description, in_charge, created_at";

impl Changeset for CommunityChanges {
    fn into_update_set(self) -> UpdateSet {
        UpdateSet::new()
            .set("name", self.name)
            .set("category", self.category)
            .set("sub_category", self.sub_category)
            .set("contact", self.contact)
            .set("address", self.address)
            .set("email", self.email)
            .set("social_links", self.social_links)
            .set("logo", self.logo)
            .set("image", self.image)
            .set("description", self.description)
            .set("in_charge", self.in_charge)
    }
}

pub struct CommunityRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> CommunityRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest first.
    pub async fn find_all(&self) -> Result<Vec<Community>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM {TABLE} ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, Community>(&sql)
            .fetch_all(self.pool)
            .await?;
        Ok(rows)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Community>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM {TABLE} WHERE id = $1");
        let row = sqlx::query_as::<_, Community>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    pub async fn create(&self, new: NewCommunity) -> Result<Community, DbError> {
        let sql = format!(
            "INSERT INTO {TABLE}
               (name, category, sub_category, contact, address, email,
                social_links, logo, image, description, in_charge)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Community>(&sql)
            .bind(new.name)
            .bind(new.category)
            .bind(new.sub_category)
            .bind(new.contact)
            .bind(new.address)
            .bind(new.email)
            .bind(new.social_links)
            .bind(new.logo)
            .bind(new.image)
            .bind(new.description)
            .bind(new.in_charge)
            .fetch_one(self.pool)
            .await
            .map_err(DbError::classify)
    }

    /// Applies only the fields present in `changes`. With nothing to change
    /// the current row is returned untouched. `None` means the row is gone.
    pub async fn update(
        &self,
        id: Uuid,
        changes: CommunityChanges,
    ) -> Result<Option<Community>, DbError> {
        let set = changes.into_update_set();
        if set.is_empty() {
            return self.find_by_id(id).await;
        }
        set.execute(self.pool, TABLE, COLUMNS, id)
            .await
            .map_err(DbError::classify)
    }

    /// Number of rows deleted; 0 when the row was already gone.
    pub async fn remove(&self, id: Uuid) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM community WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
