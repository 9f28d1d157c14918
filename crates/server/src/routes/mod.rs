use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};

use crate::AppState;

pub mod health;
pub mod orchestrate;

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new().merge(orchestrate::router());

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(cors)
}
