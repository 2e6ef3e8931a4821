use axum::{
    extract::{Path, State},
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::models::LiquidityResponse;
use crate::api::ApiState;

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new().route("/{user_id}/liquidity", get(get_liquidity))
}

#[utoipa::path(
    get,
    path = "/api/v1/accounts/{user_id}/liquidity",
    params(("user_id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "Aggregated account liquidity", body = LiquidityResponse)
    ),
    tag = "accounts"
)]
pub async fn get_liquidity(
    State(state): State<Arc<ApiState>>,
    Path(user_id): Path<String>,
) -> Json<LiquidityResponse> {
    let result = state
        .db
        .view(|s| state.accounts.calculate_liquidity(s, &user_id, Utc::now()));

    Json(match result {
        Ok(liquidity) => LiquidityResponse {
            user_id,
            liquidity: Some(liquidity),
            error: None,
        },
        Err(code) => LiquidityResponse {
            user_id,
            liquidity: None,
            error: Some(code.to_string()),
        },
    })
}
