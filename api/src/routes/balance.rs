use axum::{Json, Router, extract::State, routing::post};
use domain::{BalanceResponse, ItemRequest, TransactionsResponse};

use crate::{
    error::{ApiError, ApiResult},
    extract::JsonBody,
    services::dashboard::{fetch_balance, load_item},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/balance", post(get_balance))
        .route("/get_transactions", post(get_transactions))
}

async fn get_balance(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ItemRequest>,
) -> ApiResult<Json<BalanceResponse>> {
    // an unknown item and an item without a token look the same to clients
    let item = load_item(&state, &payload.item_id)
        .await
        .map_err(|err| match err {
            ApiError::NotFound(_) => ApiError::MissingAccessToken,
            other => other,
        })?;
    let balance = fetch_balance(&state, &item).await?;
    Ok(Json(BalanceResponse { balance }))
}

async fn get_transactions(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<ItemRequest>,
) -> ApiResult<Json<TransactionsResponse>> {
    let transactions = state
        .transaction_repo
        .list_by_item(&payload.item_id)
        .await?;
    Ok(Json(TransactionsResponse { transactions }))
}
