//! Partial update statements.
//!
//! Each resource lists its updatable columns explicitly when turning a
//! changeset into an [`UpdateSet`]; only columns with a value end up in the
//! `SET` clause. The row id is always bound as `$1` and assignments follow
//! from `$2` in insertion order.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// A typed value destined for one column.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    TextArray(Vec<String>),
    Json(Value),
    Date(NaiveDate),
    Time(NaiveTime),
    Decimal(Decimal),
    Bool(bool),
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        Self::TextArray(v)
    }
}

impl From<Value> for FieldValue {
    fn from(v: Value) -> Self {
        Self::Json(v)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for FieldValue {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<Decimal> for FieldValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// Converts a typed changeset into the assignments it carries.
pub trait Changeset {
    fn into_update_set(self) -> UpdateSet;
}

#[derive(Debug, Default)]
pub struct UpdateSet {
    assignments: Vec<(&'static str, FieldValue)>,
}

impl UpdateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `column = value` when `value` is present.
    pub fn set<V: Into<FieldValue>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.assignments.push((column, value.into()));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    pub fn columns(&self) -> Vec<&'static str> {
        self.assignments.iter().map(|(column, _)| *column).collect()
    }

    /// `UPDATE <table> SET a = $2, b = $3 WHERE id = $1 RETURNING <returning>`
    pub fn sql(&self, table: &str, returning: &str) -> String {
        let set_clause = self
            .assignments
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("{} = ${}", column, i + 2))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "UPDATE {} SET {} WHERE id = $1 RETURNING {}",
            table, set_clause, returning
        )
    }

    /// Runs the statement. Callers must check `is_empty` first: an empty set
    /// has no valid SQL.
    pub async fn execute<T>(
        self,
        pool: &PgPool,
        table: &str,
        returning: &str,
        id: Uuid,
    ) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let sql = self.sql(table, returning);
        tracing::debug!(table, columns = ?self.columns(), "Partial update");

        let mut query = sqlx::query_as::<_, T>(&sql).bind(id);
        for (_, value) in self.assignments {
            query = match value {
                FieldValue::Text(v) => query.bind(v),
                FieldValue::TextArray(v) => query.bind(v),
                FieldValue::Json(v) => query.bind(v),
                FieldValue::Date(v) => query.bind(v),
                FieldValue::Time(v) => query.bind(v),
                FieldValue::Decimal(v) => query.bind(v),
                FieldValue::Bool(v) => query.bind(v),
            };
        }

        query.fetch_optional(pool).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values_are_skipped() {
        let set = UpdateSet::new()
            .set("name", Some("Chess Club".to_string()))
            .set::<String>("email", None)
            .set("priority", Some(true));

        assert_eq!(set.columns(), vec!["name", "priority"]);
    }

    #[test]
    fn id_is_pinned_to_first_position() {
        let set = UpdateSet::new()
            .set("name", Some("Chess Club".to_string()))
            .set("social_links", Some(serde_json::json!({"x": "@chess"})))
            .set("logo", Some("uploads/community-images/1-logo.png".to_string()));

        assert_eq!(
            set.sql("community", "id, name"),
            "UPDATE community SET name = $2, social_links = $3, logo = $4 WHERE id = $1 RETURNING id, name"
        );
    }

    #[test]
    fn empty_set_reports_empty() {
        let set = UpdateSet::new().set::<bool>("priority", None);
        assert!(set.is_empty());
        assert!(set.columns().is_empty());
    }
}
