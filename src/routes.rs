use axum::{
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{default, health, AppState};
use crate::middleware::jwt_decode_middleware;

pub fn app(state: AppState, enable_cors: bool) -> Router {
    let router = Router::new()
        // Public
        .route("/", get(health::root))
        .route("/health", get(health::health))
        // Token-aware
        .merge(default_routes(&state))
        .fallback(health::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

fn default_routes(state: &AppState) -> Router<AppState> {
    let prefix = &state.route_prefix;

    Router::new()
        .route(prefix, get(default::list).post(default::create))
        .route(&format!("{}/:id", prefix), put(default::update).delete(default::delete))
        .route_layer(middleware::from_fn_with_state(state.clone(), jwt_decode_middleware))
}
