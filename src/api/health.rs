use axum::{extract::State, response::Json, routing::get, Router};
use std::sync::Arc;

use crate::api::models::HealthResponse;
use crate::api::ApiState;
use crate::store::OUTPUTS_CHECKPOINT;

pub fn routes() -> Router<Arc<ApiState>> {
    Router::new().route("/", get(health_check))
}

#[utoipa::path(
    get,
    path = "/api/v1/health",
    responses(
        (status = 200, description = "Health check successful", body = HealthResponse)
    ),
    tag = "health"
)]
pub async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    let markets = state.db.view(|s| s.all_markets().len());
    let checkpoint = state.db.get_property(OUTPUTS_CHECKPOINT);

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        markets,
        outputs_checkpoint: checkpoint,
    })
}
