use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub event_name: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub cost: Option<Decimal>,
    pub event_image: Option<String>,
    pub location: Option<String>,
    pub contact: Option<Value>,
    pub category: String,
    pub sub_category: Option<String>,
    pub social_links: Option<Value>,
    pub status: String,
    pub priority: bool,
    pub created_at: DateTime<Utc>,
}

/// `status` and `priority` fall back to the column defaults when absent.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub event_name: String,
    pub event_date: NaiveDate,
    pub event_time: NaiveTime,
    pub cost: Option<Decimal>,
    pub event_image: Option<String>,
    pub location: Option<String>,
    pub contact: Option<Value>,
    pub category: String,
    pub sub_category: Option<String>,
    pub social_links: Option<Value>,
    pub status: Option<String>,
    pub priority: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct EventChanges {
    pub event_name: Option<String>,
    pub event_date: Option<NaiveDate>,
    pub event_time: Option<NaiveTime>,
    pub cost: Option<Decimal>,
    pub event_image: Option<String>,
    pub location: Option<String>,
    pub contact: Option<Value>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub social_links: Option<Value>,
    pub status: Option<String>,
    pub priority: Option<bool>,
}
