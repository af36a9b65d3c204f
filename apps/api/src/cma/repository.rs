//! Persistence for CMA analysis records.
//!
//! Records are append-only: there is no update path, a rerun creates a new
//! row. Every read is scoped to the owning user inside the query itself.

use sqlx::PgPool;
use uuid::Uuid;

use crate::cma::parser::ParsedCma;
use crate::models::analysis::{CmaAnalysisRow, CmaSummaryRow, TargetSnapshot};

/// Inserts a new analysis row and returns it as stored. Called only after a
/// clean parse; a failed generation never reaches this function.
pub async fn create_analysis(
    pool: &PgPool,
    user_id: Uuid,
    comparable_ids: [Uuid; 3],
    target: &TargetSnapshot,
    parsed: &ParsedCma,
) -> Result<CmaAnalysisRow, sqlx::Error> {
    let id = Uuid::new_v4();

    sqlx::query_as::<_, CmaAnalysisRow>(
        r#"
        INSERT INTO cma_analyses (
            id, user_id, comparable_1, comparable_2, comparable_3,
            target_title, target_rooms, target_baths, target_built_area,
            target_lot_area, target_parking, target_pool, target_condition,
            target_zone, target_city,
            result_json, min_price, suggested_price, max_price, justification
        )
        VALUES (
            $1, $2, $3, $4, $5, $6, $7, $8, $9, $10,
            $11, $12, $13, $14, $15, $16, $17, $18, $19, $20
        )
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(user_id)
    .bind(comparable_ids[0])
    .bind(comparable_ids[1])
    .bind(comparable_ids[2])
    .bind(&target.title)
    .bind(target.rooms)
    .bind(target.baths)
    .bind(target.built_area)
    .bind(target.lot_area)
    .bind(target.parking)
    .bind(target.pool)
    .bind(target.condition)
    .bind(&target.zone)
    .bind(&target.city)
    .bind(&parsed.raw_json)
    .bind(parsed.result.min_price)
    .bind(parsed.result.suggested_price)
    .bind(parsed.result.max_price)
    .bind(&parsed.result.justification)
    .fetch_one(pool)
    .await
}

/// The single lookup behind every read path. Filtering by owner inside the
/// query keeps "not yours" and "does not exist" indistinguishable.
pub async fn get_analysis(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
) -> Result<Option<CmaAnalysisRow>, sqlx::Error> {
    sqlx::query_as::<_, CmaAnalysisRow>("SELECT * FROM cma_analyses WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// History listing for one user, newest first.
pub async fn list_analyses(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<CmaSummaryRow>, sqlx::Error> {
    sqlx::query_as::<_, CmaSummaryRow>(
        r#"
        SELECT id, target_title, min_price, suggested_price, max_price, justification, created_at
        FROM cma_analyses
        WHERE user_id = $1
        ORDER BY created_at DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}
