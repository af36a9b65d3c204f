use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A catalog listing. Prices and areas are `NUMERIC` in Postgres and must
/// stay `Decimal` end to end; converting through floats would corrupt them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PropertyRow {
    pub id: Uuid,
    pub title: String,
    pub rooms: i32,
    pub baths: i32,
    pub built_area: Decimal,
    pub lot_area: Decimal,
    pub price_usd: Decimal,
    pub parking: bool,
    pub pool: bool,
    pub zone: String,
    pub city: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
