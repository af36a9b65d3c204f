//! CMA generation: orchestrates the full pipeline for one request.
//!
//! Flow: validate comparables → resolve catalog rows → build prompts →
//!       single LLM call → parse → persist → return the record id.
//!
//! Nothing is written to the database until the completion has parsed
//! cleanly; a failed call or an unparseable response leaves no trace.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tracing::{error, info};
use uuid::Uuid;

use crate::catalog;
use crate::cma::parser;
use crate::cma::prompts::{build_user_prompt, ComparableInput, CMA_SYSTEM_PROMPT, CMA_TEMPERATURE};
use crate::cma::repository;
use crate::errors::AppError;
use crate::llm_client::LlmClient;
use crate::models::analysis::TargetSnapshot;

/// Condition score assumed when the caller does not supply one.
const DEFAULT_CONDITION: i32 = 3;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

/// Request body for CMA generation.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitCmaRequest {
    pub user_id: Uuid,
    /// Exactly three distinct catalog property ids.
    pub comparable_ids: Vec<Uuid>,
    /// Per-comparable condition scores (1-5), aligned by index with
    /// `comparable_ids`. Missing entries fall back to 3.
    #[serde(default)]
    pub comparable_conditions: Vec<i32>,
    #[serde(default)]
    pub target: TargetSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitCmaResponse {
    pub analysis_id: Uuid,
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

/// Runs the full CMA pipeline and persists the result.
///
/// Steps:
/// 1. Validate the comparable selection (exactly 3 distinct ids)
/// 2. Resolve the catalog rows
/// 3. Build the system + user prompts
/// 4. Single LLM call (no retry; the caller resubmits if they want)
/// 5. Parse the completion
/// 6. INSERT into cma_analyses
pub async fn run_cma(
    pool: &PgPool,
    llm: &LlmClient,
    request: SubmitCmaRequest,
) -> Result<SubmitCmaResponse, AppError> {
    // Step 1: validate the selection
    let comparable_ids = validate_comparable_ids(&request.comparable_ids)?;

    // Step 2: resolve catalog rows. An id that does not resolve is a caller
    // mistake, not a missing record: the caller re-picks comparables.
    let mut comparables = Vec::with_capacity(3);
    for (i, id) in comparable_ids.iter().enumerate() {
        let property = catalog::get_property(pool, *id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Comparable property {id} was not found")))?;
        let condition = request
            .comparable_conditions
            .get(i)
            .copied()
            .unwrap_or(DEFAULT_CONDITION);
        comparables.push(ComparableInput {
            property,
            condition,
        });
    }
    let comparables: [ComparableInput; 3] = comparables
        .try_into()
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Expected exactly 3 resolved comparables")))?;

    // Step 3: build the prompts
    let user_prompt = build_user_prompt(&comparables, &request.target);
    info!(
        "CMA prompt built for user {} ({} chars)",
        request.user_id,
        user_prompt.len()
    );

    // Step 4: single LLM call
    let completion = llm
        .complete(CMA_SYSTEM_PROMPT, &user_prompt, CMA_TEMPERATURE)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;
    info!("CMA completion received ({} chars)", completion.len());

    // Step 5: parse. The raw completion goes to the logs only, never to the
    // HTTP response.
    let parsed = parser::parse(&completion).map_err(|e| {
        error!(
            "CMA completion failed to parse; raw completion follows:\n{}",
            e.raw
        );
        AppError::ResponseParse { reason: e.reason }
    })?;

    // Step 6: persist
    let analysis = repository::create_analysis(
        pool,
        request.user_id,
        comparable_ids,
        &request.target,
        &parsed,
    )
    .await?;

    info!(
        "CMA analysis {} persisted for user {}",
        analysis.id, request.user_id
    );

    Ok(SubmitCmaResponse {
        analysis_id: analysis.id,
    })
}

/// Checks that the selection holds exactly three distinct ids.
fn validate_comparable_ids(ids: &[Uuid]) -> Result<[Uuid; 3], AppError> {
    if ids.len() != 3 {
        return Err(AppError::Validation(format!(
            "A CMA requires exactly 3 comparable properties, got {}",
            ids.len()
        )));
    }
    if ids[0] == ids[1] || ids[0] == ids[2] || ids[1] == ids[2] {
        return Err(AppError::Validation(
            "Comparable properties must be three distinct listings".to_string(),
        ));
    }
    Ok([ids[0], ids[1], ids[2]])
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
