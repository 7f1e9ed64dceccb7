use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::errors::AppError;
use crate::models::{SlotQuery, SlotResponse};
use crate::services::slots::collect_slots;
use crate::state::AppState;

// Kept as strings so bad input gets the same JSON error body as every other failure.
#[derive(Deserialize)]
pub struct SlotParams {
    pub procedure_id: Option<String>,
    pub region_id: Option<String>,
}

// GET /slots?procedure_id=&region_id=
pub async fn get_slots(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SlotParams>,
) -> Result<Json<SlotResponse>, AppError> {
    let query = SlotQuery::parse(params.procedure_id.as_deref(), params.region_id.as_deref())
        .inspect_err(|e| tracing::debug!(error = %e, "rejected slot query"))?;

    tracing::info!(
        procedure = query.procedure_id(),
        region = query.region_id(),
        "fetching slots"
    );

    let response = collect_slots(
        state.slots.as_ref(),
        &state.config.credentials,
        &state.config.scrape,
        query,
    )
    .await
    .inspect_err(|e| tracing::error!(error = %e, status = %e.status(), "slot request failed"))?;

    tracing::info!(count = response.count, "slots retrieved");
    Ok(Json(response))
}
