use axum::routing::post;
use axum::{middleware, Router};

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod service;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/image", post(handler::generate_image))
        .route("/speech", post(handler::generate_speech))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
}
