//! REST API for comparison results and dispatch detail.
//!
//! Provides three endpoints:
//! - `GET /comparisons`: every battery under every plan
//! - `GET /dispatch/{battery_id}`: per-step dispatch with optional window
//! - `POST /compare`: runs a scenario sent as JSON

mod handlers;
mod types;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tracing::info;

use crate::compare::{BatteryComparison, DetailedComparison};
use crate::sim::types::DispatchRun;

pub use types::{
    ComparisonsResponse, DispatchQuery, DispatchRecord, DispatchResponse, ErrorResponse,
};

/// Immutable application state shared across all request handlers.
///
/// Constructed once after the comparison completes and wrapped in `Arc`.
/// All data is read-only, so no locks are needed.
#[derive(Debug)]
pub struct AppState {
    /// Rate plan ids in comparison order.
    pub plans: Vec<String>,
    pub comparisons: Vec<BatteryComparison>,
    /// Dispatch runs, index-aligned with `comparisons`.
    pub dispatch: Vec<DispatchRun>,
}

impl AppState {
    /// Splits detailed results into comparisons and dispatch runs.
    pub fn from_detailed(results: Vec<DetailedComparison>) -> Self {
        let mut plans: Vec<String> = Vec::new();
        let mut comparisons = Vec::with_capacity(results.len());
        let mut dispatch = Vec::with_capacity(results.len());
        for detailed in results {
            let plan = detailed.comparison.rate_plan_id();
            if !plans.iter().any(|p| p == plan) {
                plans.push(plan.to_owned());
            }
            comparisons.push(detailed.comparison);
            dispatch.push(detailed.dispatch);
        }
        Self {
            plans,
            comparisons,
            dispatch,
        }
    }

    /// Dispatch run for a battery under a plan, or the first plan.
    pub fn find_dispatch(&self, battery_id: &str, plan_id: Option<&str>) -> Option<&DispatchRun> {
        let plan_id = plan_id.or_else(|| self.plans.first().map(String::as_str))?;
        self.dispatch
            .iter()
            .find(|run| run.battery_id == battery_id && run.plan_id == plan_id)
    }
}

/// Builds the axum router with all API routes.
///
/// # Arguments
///
/// * `state` - Shared application state
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/comparisons", get(handlers::get_comparisons))
        .route("/dispatch/{battery_id}", get(handlers::get_dispatch))
        .route("/compare", post(handlers::post_compare))
        .with_state(state)
}

/// Binds to the given address and serves the API until the process exits.
///
/// # Errors
///
/// Returns an I/O error if the listener cannot bind or the server fails.
pub async fn serve(state: Arc<AppState>, addr: SocketAddr) -> std::io::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    axum::serve(listener, app).await
}
