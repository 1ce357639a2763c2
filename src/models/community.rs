use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub contact: String,
    pub address: Option<String>,
    pub email: Option<String>,
    pub social_links: Option<Value>,
    pub logo: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub in_charge: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCommunity {
    pub name: String,
    pub category: String,
    pub sub_category: Option<String>,
    pub contact: String,
    pub address: Option<String>,
    pub email: Option<String>,
    pub social_links: Option<Value>,
    pub logo: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub in_charge: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CommunityChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub contact: Option<String>,
    pub address: Option<String>,
    pub email: Option<String>,
    pub social_links: Option<Value>,
    pub logo: Option<String>,
    pub image: Option<String>,
    pub description: Option<String>,
    pub in_charge: Option<String>,
}
