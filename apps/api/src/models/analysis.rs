use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// A stored CMA run. Rows are append-only: the target description is
/// snapshotted into `target_*` columns at creation time so later edits to
/// catalog properties never rewrite an existing analysis.
///
/// `result_json` holds the model's JSON verbatim and is the source of truth;
/// `min_price` / `suggested_price` / `max_price` / `justification` are
/// denormalized copies for listings and stay NULL/empty when the model
/// omitted them.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CmaAnalysisRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub comparable_1: Uuid,
    pub comparable_2: Uuid,
    pub comparable_3: Uuid,
    pub target_title: String,
    pub target_rooms: i32,
    pub target_baths: i32,
    pub target_built_area: Decimal,
    pub target_lot_area: Decimal,
    pub target_parking: bool,
    pub target_pool: bool,
    pub target_condition: i32,
    pub target_zone: String,
    pub target_city: String,
    pub result_json: Value,
    pub min_price: Option<Decimal>,
    pub suggested_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub justification: String,
    pub created_at: DateTime<Utc>,
}

/// Compact projection for the history listing.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CmaSummaryRow {
    pub id: Uuid,
    pub target_title: String,
    pub min_price: Option<Decimal>,
    pub suggested_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub justification: String,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied description of the property being valued. Every field is
/// optional on the wire; omitted fields take the same fallbacks the prompt
/// assumes, so a half-filled form still yields a usable prompt.
///
/// `context` travels into the prompt only and is never persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSnapshot {
    #[serde(default = "default_target_title")]
    pub title: String,
    #[serde(default = "default_one")]
    pub rooms: i32,
    #[serde(default = "default_one")]
    pub baths: i32,
    #[serde(default)]
    pub built_area: Decimal,
    #[serde(default)]
    pub lot_area: Decimal,
    #[serde(default)]
    pub parking: bool,
    #[serde(default)]
    pub pool: bool,
    #[serde(default = "default_condition")]
    pub condition: i32,
    #[serde(default)]
    pub zone: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub context: String,
}

impl Default for TargetSnapshot {
    fn default() -> Self {
        Self {
            title: default_target_title(),
            rooms: default_one(),
            baths: default_one(),
            built_area: Decimal::ZERO,
            lot_area: Decimal::ZERO,
            parking: false,
            pool: false,
            condition: default_condition(),
            zone: String::new(),
            city: String::new(),
            context: String::new(),
        }
    }
}

fn default_target_title() -> String {
    "Propiedad a valuar".to_string()
}

fn default_one() -> i32 {
    1
}

fn default_condition() -> i32 {
    3
}
