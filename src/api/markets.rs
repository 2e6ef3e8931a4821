use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use std::sync::Arc;

use crate::api::models::{ErrorResponse, MarketView};
use crate::api::ApiState;
use crate::core::{Market, MarketStatus};
use crate::service::market as market_math;

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new()
        .route("/", get(list_markets))
        .route("/{asset_id}", get(get_market))
}

#[utoipa::path(
    get,
    path = "/api/v1/markets",
    responses(
        (status = 200, description = "All markets", body = [MarketView])
    ),
    tag = "markets"
)]
pub async fn list_markets(State(state): State<Arc<ApiState>>) -> Json<Vec<MarketView>> {
    let views = state.db.view(|s| {
        s.all_markets()
            .into_iter()
            .map(|m| market_view(&state, s, m))
            .collect()
    });
    Json(views)
}

#[utoipa::path(
    get,
    path = "/api/v1/markets/{asset_id}",
    params(("asset_id" = String, Path, description = "Underlying asset id")),
    responses(
        (status = 200, description = "Market detail", body = MarketView),
        (status = 404, description = "Unknown market", body = ErrorResponse)
    ),
    tag = "markets"
)]
pub async fn get_market(
    State(state): State<Arc<ApiState>>,
    Path(asset_id): Path<String>,
) -> Result<Json<MarketView>, (StatusCode, Json<ErrorResponse>)> {
    state
        .db
        .view(|s| s.find_market(&asset_id).map(|m| market_view(&state, s, m)))
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    code: StatusCode::NOT_FOUND.as_u16(),
                    message: format!("market {asset_id} not found"),
                }),
            )
        })
}

fn market_view(state: &ApiState, s: &crate::store::DbState, market: Market) -> MarketView {
    let utilization = market_math::utilization_rate(&market);
    MarketView {
        exchange_rate: market_math::exchange_rate(&market),
        utilization_rate: utilization,
        borrow_rate: market_math::borrow_rate_per_year(&market, utilization),
        supply_rate: market_math::supply_rate_per_year(&market, utilization),
        price: state.prices.current_price(s, &market.asset_id, Utc::now()),
        status: match market.status {
            MarketStatus::Open => "open".to_string(),
            MarketStatus::Closed => "closed".to_string(),
        },
        asset_id: market.asset_id,
        ctoken_asset_id: market.ctoken_asset_id,
        symbol: market.symbol,
        total_cash: market.total_cash,
        total_borrows: market.total_borrows,
        reserves: market.reserves,
        ctokens: market.ctokens,
        borrow_index: market.borrow_index,
        collateral_factor: market.collateral_factor,
        close_factor: market.close_factor,
        liquidation_incentive: market.liquidation_incentive,
        borrow_cap: market.borrow_cap,
        block_number: market.block_number,
    }
}
