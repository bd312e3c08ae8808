use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use balance_engine::{project, project_today, summarize};
use chrono::NaiveDate;
use domain::{
    BalanceTrend, Dashboard, ProjectRequest, ProjectResponse, Transaction, TrendRequest,
    ValidationError,
};

use crate::{
    error::ApiResult,
    extract::{JsonBody, QueryParams},
    services::dashboard::{build_dashboard, build_trend},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance_trend", post(balance_trend))
        .route("/items/:item_id/dashboard", get(dashboard))
        .route("/project", post(project_balances))
}

async fn balance_trend(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<TrendRequest>,
) -> ApiResult<Json<BalanceTrend>> {
    build_trend(&state, &payload.item_id, payload.window_days, payload.as_of)
        .await
        .map(Json)
}

#[derive(Debug, serde::Deserialize)]
struct DashboardQuery {
    window_days: Option<u32>,
    as_of: Option<NaiveDate>,
}

async fn dashboard(
    State(state): State<AppState>,
    Path(item_id): Path<String>,
    QueryParams(params): QueryParams<DashboardQuery>,
) -> ApiResult<Json<Dashboard>> {
    build_dashboard(&state, &item_id, params.window_days, params.as_of)
        .await
        .map(Json)
}

async fn project_balances(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ProjectRequest>,
) -> ApiResult<Json<ProjectResponse>> {
    if !payload.current_total.is_finite() {
        return Err(ValidationError::NonFiniteTotal.into());
    }
    let transactions = payload
        .transactions
        .iter()
        .map(Transaction::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    let window_days = state.config.window_days(payload.window_days);
    let snapshots = match payload.as_of {
        Some(as_of) => project(&transactions, payload.current_total, window_days, as_of),
        None => project_today(&transactions, payload.current_total, window_days),
    };
    metrics::counter!("balance_projections_total").increment(1);

    Ok(Json(ProjectResponse {
        summary: summarize(&snapshots),
        snapshots,
    }))
}
