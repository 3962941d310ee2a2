use axum::{extract::State, response::Json};
use serde_json::{json, Value};

use crate::error::ApiError;

use super::AppState;

/// GET / - service banner
pub async fn root(State(state): State<AppState>) -> Json<Value> {
    let prefix = &state.route_prefix;

    Json(json!({
        "status": "success",
        "data": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health (public)",
                "default": format!("{prefix} (GET, POST), {prefix}/:id (PUT, DELETE) (token required)"),
            }
        }
    }))
}

/// GET /health - database liveness
pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.pools.health_check().await?;

    Ok(Json(json!({
        "status": "success",
        "data": {
            "status": "ok",
            "timestamp": chrono::Utc::now(),
            "database": "ok"
        }
    })))
}

/// Unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("route not found".to_string())
}
