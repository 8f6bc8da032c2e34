use axum::routing::{get, post};
use axum::{middleware, Router};

use crate::state::AppState;

pub mod dto;
pub mod handler;
pub mod model;
pub mod publisher;
pub mod repository;
pub mod service;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(handler::list_queue))
        .route(
            "/{id}",
            post(handler::enqueue)
                .put(handler::update_entry)
                .delete(handler::remove_entry),
        )
        .route("/{id}/post-now", post(handler::post_now))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
}
