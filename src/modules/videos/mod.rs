use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod repository;
pub mod service;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_videos).post(handler::create_video))
        .route("/ai-video", post(handler::create_ai_video))
        .route("/ai-video/status/{request_id}", get(handler::ai_video_status))
        .route("/avatar", post(handler::create_avatar_video))
        .route("/{id}", get(handler::get_video))
        .route("/{id}/render", post(handler::render_video))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
}
