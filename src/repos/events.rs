use sqlx::PgPool;
use uuid::Uuid;

use super::{Changeset, DbError, UpdateSet};
use crate::models::{Event, EventChanges, NewEvent};

const TABLE: &str = "events";

const COLUMNS: &str = "id, event_name, event_date, event_time, cost, event_image, location, \
                       contact, category, sub_category, social_links, status, priority, created_at";

impl Changeset for EventChanges {
    fn into_update_set(self) -> UpdateSet {
        UpdateSet::new()
            .set("event_name", self.event_name)
            .set("event_date", self.event_date)
            .set("event_time", self.event_time)
            .set("cost", self.cost)
            .set("event_image", self.event_image)
            .set("location", self.location)
            .set("contact", self.contact)
            .set("category", self.category)
            .set("sub_category", self.sub_category)
            .set("social_links", self.social_links)
            .set("status", self.status)
            .set("priority", self.priority)
    }
}

pub struct EventRepo<'a> {
    pool: &'a PgPool,
}

impl<'a> EventRepo<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Newest first.
    pub async fn find_all(&self) -> Result<Vec<Event>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM {TABLE} ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, Event>(&sql).fetch_all(self.pool).await?;
        Ok(rows)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Event>, DbError> {
        let sql = format!("SELECT {COLUMNS} FROM {TABLE} WHERE id = $1");
        let row = sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row)
    }

    /// Absent `status`/`priority` take the column defaults.
    pub async fn create(&self, new: NewEvent) -> Result<Event, DbError> {
        let sql = format!(
            "INSERT INTO {TABLE}
               (event_name, event_date, event_time, cost, event_image, location,
                contact, category, sub_category, social_links, status, priority)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
                     COALESCE($11, 'upcoming'), COALESCE($12, FALSE))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&sql)
            .bind(new.event_name)
            .bind(new.event_date)
            .bind(new.event_time)
            .bind(new.cost)
            .bind(new.event_image)
            .bind(new.location)
            .bind(new.contact)
            .bind(new.category)
            .bind(new.sub_category)
            .bind(new.social_links)
            .bind(new.status)
            .bind(new.priority)
            .fetch_one(self.pool)
            .await
            .map_err(DbError::classify)
    }

    pub async fn update(&self, id: Uuid, changes: EventChanges) -> Result<Option<Event>, DbError> {
        let set = changes.into_update_set();
        if set.is_empty() {
            return self.find_by_id(id).await;
        }
        set.execute(self.pool, TABLE, COLUMNS, id)
            .await
            .map_err(DbError::classify)
    }

    pub async fn remove(&self, id: Uuid) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
