//! Axum route handlers for the CMA API.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::catalog;
use crate::cma::repository::{get_analysis, list_analyses};
use crate::cma::service::{run_cma, SubmitCmaRequest, SubmitCmaResponse};
use crate::errors::AppError;
use crate::models::analysis::{CmaAnalysisRow, CmaSummaryRow};
use crate::models::property::PropertyRow;
use crate::report::render::render_cma_pdf;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Caller identity for the read endpoints. Authentication lives in front of
/// this service; the id arrives as an explicit query parameter.
#[derive(Debug, Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CmaDetailResponse {
    pub analysis: CmaAnalysisRow,
    pub comparables: [PropertyRow; 3],
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/cma
///
/// Runs the full CMA pipeline: resolve comparables → prompt → LLM → parse →
/// persist. Returns the id of the stored analysis.
pub async fn handle_submit_cma(
    State(state): State<AppState>,
    Json(request): Json<SubmitCmaRequest>,
) -> Result<Json<SubmitCmaResponse>, AppError> {
    let response = run_cma(&state.db, &state.llm, request).await?;
    Ok(Json(response))
}

/// GET /api/v1/cma?user_id=...
///
/// Lists the caller's analyses, newest first.
pub async fn handle_list_cma(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<CmaSummaryRow>>, AppError> {
    let analyses = list_analyses(&state.db, params.user_id).await?;
    Ok(Json(analyses))
}

/// GET /api/v1/cma/:id?user_id=...
///
/// Returns one stored analysis with its three comparables. A record owned by
/// someone else answers exactly like a record that does not exist.
pub async fn handle_get_cma(
    State(state): State<AppState>,
    Path(analysis_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<CmaDetailResponse>, AppError> {
    let analysis = get_analysis(&state.db, analysis_id, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))?;

    let comparables = resolve_comparables(&state.db, &analysis).await?;

    Ok(Json(CmaDetailResponse {
        analysis,
        comparables,
    }))
}

/// GET /api/v1/cma/:id/report?user_id=...
///
/// Renders the stored analysis as a PDF attachment. Compilation is CPU-bound
/// and runs on a blocking thread.
pub async fn handle_cma_report(
    State(state): State<AppState>,
    Path(analysis_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<impl IntoResponse, AppError> {
    let analysis = get_analysis(&state.db, analysis_id, params.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Analysis {analysis_id} not found")))?;

    let comparables = resolve_comparables(&state.db, &analysis).await?;

    // The footer timestamp is the record's creation time, so one record
    // always renders to the same bytes.
    let pdf = tokio::task::spawn_blocking(move || {
        render_cma_pdf(&analysis, &comparables, analysis.created_at)
    })
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!("Report render task failed: {e}")))?
    .map_err(|e| AppError::Report(e.to_string()))?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"CMA_{analysis_id}.pdf\""),
            ),
        ],
        pdf,
    ))
}

/// Loads the three comparables referenced by a stored analysis. The RESTRICT
/// foreign keys guarantee they still exist; a miss here is a data bug, not a
/// caller mistake.
async fn resolve_comparables(
    db: &PgPool,
    analysis: &CmaAnalysisRow,
) -> Result<[PropertyRow; 3], AppError> {
    let mut comparables = Vec::with_capacity(3);
    for comparable_id in [
        analysis.comparable_1,
        analysis.comparable_2,
        analysis.comparable_3,
    ] {
        let property = catalog::get_property(db, comparable_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(anyhow::anyhow!(
                    "Comparable {comparable_id} missing for analysis {}",
                    analysis.id
                ))
            })?;
        comparables.push(property);
    }
    comparables
        .try_into()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Expected exactly 3 comparables")))
}
