use adasim_model::{CallerIdentity, RunId};
use axum::{
    Extension, Json,
    extract::{Path, State},
};
use serde_json::{Value, json};
use std::str::FromStr;

use crate::AppState;
use crate::errors::{AppError, AppResult};

/// Run the detection pipeline for a stored run and return the updated
/// run record.
///
/// The run always comes back in a definite state; a detector failure
/// surfaces as 502 with the run already marked `failed`.
pub async fn ingest_run_handler(
    State(state): State<AppState>,
    Extension(caller): Extension<CallerIdentity>,
    Path(run_id): Path<String>,
) -> AppResult<Json<Value>> {
    let run_id = parse_run_id(&run_id)?;

    let run = state.orchestrator.ingest(run_id, &caller).await?;

    Ok(Json(json!({
        "success": true,
        "message": "Run processed",
        "data": run,
    })))
}

pub(crate) fn parse_run_id(raw: &str) -> Result<RunId, AppError> {
    RunId::from_str(raw)
        .map_err(|_| AppError::bad_request(format!("invalid run id: {raw}")))
}
