//! Handlers for `/api/adventures/{id}`: prompt assembly, turn enrichment,
//! and character state.
//!
//! All endpoints require authentication and only see adventures owned by the
//! caller; anything else is a 404.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use storyloom_core::attributes::TraitDomain;
use storyloom_core::merge::MergeOutcome;
use storyloom_core::types::DbId;
use storyloom_pipeline::{AssembledPrompt, LoadedState, TurnOutcome, TurnPreview};
use validator::Validate;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// DTOs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PromptQuery {
    #[validate(range(min = 1, max = 200))]
    pub context_window: Option<u32>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TurnRequest {
    #[validate(length(max = 20000))]
    pub assistant_text: String,
    #[validate(length(max = 20000))]
    pub user_text: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TextRequest {
    #[validate(length(min = 1, max = 20000))]
    pub text: String,
}

// ---------------------------------------------------------------------------
// Prompt
// ---------------------------------------------------------------------------

/// GET /api/adventures/{id}/prompt?contextWindow=
///
/// The rendered system prompt plus stop sequences and history window.
pub async fn get_prompt(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(adventure_id): Path<DbId>,
    Query(query): Query<PromptQuery>,
) -> AppResult<Json<DataResponse<AssembledPrompt>>> {
    query.validate()?;
    let prompt = state
        .assembler
        .assemble(adventure_id, auth.user_id, query.context_window)
        .await?;
    Ok(Json(DataResponse::new(prompt)))
}

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

/// POST /api/adventures/{id}/turns
///
/// Enrich character state from a completed chat turn. Only ownership is
/// checked up front; enrichment failures are reported in the body.
pub async fn process_turn(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(adventure_id): Path<DbId>,
    Json(input): Json<TurnRequest>,
) -> AppResult<Json<DataResponse<TurnOutcome>>> {
    input.validate()?;
    state.states.adventure(adventure_id, auth.user_id).await?;

    let outcome = state
        .turns
        .process_turn(
            adventure_id,
            auth.user_id,
            &input.assistant_text,
            input.user_text.as_deref(),
        )
        .await;
    Ok(Json(DataResponse::new(outcome)))
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

/// GET /api/adventures/{id}/state
pub async fn get_state(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(adventure_id): Path<DbId>,
) -> AppResult<Json<DataResponse<LoadedState>>> {
    let adventure = state.states.adventure(adventure_id, auth.user_id).await?;
    let loaded = state.states.load_state(&adventure, auth.user_id).await?;
    Ok(Json(DataResponse::new(loaded)))
}

/// POST /api/adventures/{id}/state/preview
///
/// What a merge of `text` would do, without persisting anything.
pub async fn preview_state(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(adventure_id): Path<DbId>,
    Json(input): Json<TextRequest>,
) -> AppResult<Json<DataResponse<TurnPreview>>> {
    input.validate()?;
    let preview = state
        .turns
        .preview(adventure_id, auth.user_id, &input.text)
        .await?;
    Ok(Json(DataResponse::new(preview)))
}

/// PUT /api/adventures/{id}/state/{domain}
///
/// The player's direct edit of one trait domain.
pub async fn update_domain(
    auth: AuthUser,
    State(state): State<AppState>,
    Path((adventure_id, domain)): Path<(DbId, String)>,
    Json(input): Json<TextRequest>,
) -> AppResult<Json<DataResponse<MergeOutcome>>> {
    input.validate()?;
    let domain: TraitDomain = domain.parse()?;
    let outcome = state
        .states
        .manual_update(adventure_id, auth.user_id, domain, &input.text)
        .await?;
    tracing::info!(
        adventure_id,
        user_id = auth.user_id,
        domain = domain.as_str(),
        updates_applied = outcome.updates_applied,
        "Manual trait update"
    );
    Ok(Json(DataResponse::new(outcome)))
}
