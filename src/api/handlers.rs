//! Request handlers for the API endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use tracing::warn;

use super::AppState;
use super::types::{
    ComparisonsResponse, DispatchQuery, DispatchRecord, DispatchResponse, ErrorResponse,
};
use crate::config::ScenarioConfig;
use crate::error::EngineError;
use crate::sim::kpi::DispatchSummary;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error(status: StatusCode, body: ErrorResponse) -> ApiError {
    (status, Json(body))
}

/// Returns every comparison from the run the server started with.
///
/// `GET /comparisons` → 200 + `ComparisonsResponse` JSON
pub async fn get_comparisons(State(state): State<Arc<AppState>>) -> Json<ComparisonsResponse> {
    Json(ComparisonsResponse {
        plans: state.plans.clone(),
        comparisons: state.comparisons.clone(),
    })
}

/// Returns the dispatch of one battery, optionally windowed.
///
/// `GET /dispatch/{battery_id}` → 200 + `DispatchResponse` JSON (first plan)
/// `GET /dispatch/{battery_id}?plan=ulo&from=2025-07-01T00:00:00&to=2025-07-02T00:00:00`
/// → one day under the `ulo` plan
/// `GET /dispatch/unknown` → 404 + `ErrorResponse`
/// `from` after `to` → 400 + `ErrorResponse`
pub async fn get_dispatch(
    State(state): State<Arc<AppState>>,
    Path(battery_id): Path<String>,
    Query(query): Query<DispatchQuery>,
) -> Result<Json<DispatchResponse>, ApiError> {
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(error(
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(format!("`from` ({from}) must be <= `to` ({to})")),
            ));
        }
    }

    let run = state
        .find_dispatch(&battery_id, query.plan.as_deref())
        .ok_or_else(|| {
            error(
                StatusCode::NOT_FOUND,
                ErrorResponse::new(format!(
                    "no dispatch for battery \"{battery_id}\" under plan \"{}\"",
                    query
                        .plan
                        .as_deref()
                        .or_else(|| state.plans.first().map(String::as_str))
                        .unwrap_or_default()
                )),
            )
        })?;

    Ok(Json(DispatchResponse {
        battery_id: run.battery_id.clone(),
        plan_id: run.plan_id.clone(),
        summary: DispatchSummary::from_run(run),
        steps: run
            .window(query.from, query.to)
            .map(DispatchRecord::from)
            .collect(),
    }))
}

/// Runs a comparison for a scenario posted as JSON.
///
/// The body uses the same layout as a scenario TOML file. Meter files are
/// not read on the server's behalf, so `household.interval_csv` is refused.
///
/// `POST /compare` → 200 + `ComparisonsResponse` JSON
/// invalid scenario → 422 + `ErrorResponse` with one detail per problem
pub async fn post_compare(
    Json(scenario): Json<ScenarioConfig>,
) -> Result<Json<ComparisonsResponse>, ApiError> {
    if scenario.household.interval_csv.is_some() {
        return Err(error(
            StatusCode::BAD_REQUEST,
            ErrorResponse::new("household.interval_csv is not accepted over HTTP"),
        ));
    }
    let errors = scenario.validate();
    if !errors.is_empty() {
        return Err(error(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse {
                error: "invalid scenario".into(),
                details: errors.iter().map(ToString::to_string).collect(),
            },
        ));
    }

    let outcome = tokio::task::spawn_blocking(move || {
        let engine = scenario.build_engine()?;
        let comparisons = engine.run()?;
        let plans = engine.plans().iter().map(|p| p.id.clone()).collect();
        Ok::<_, EngineError>(ComparisonsResponse { plans, comparisons })
    })
    .await;

    match outcome {
        Ok(Ok(response)) => Ok(Json(response)),
        Ok(Err(e)) => Err(error(
            StatusCode::UNPROCESSABLE_ENTITY,
            ErrorResponse::new(e.to_string()),
        )),
        Err(e) => {
            warn!(error = %e, "comparison task failed");
            Err(error(
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("comparison task failed"),
            ))
        }
    }
}
