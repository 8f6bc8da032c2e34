use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::docs::ApiDoc;
use crate::modules::{auth, media, queue, social, topic, videos};
use crate::state::AppState;

pub fn configure_routes(state: AppState) -> Router<AppState> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = auth::router(state.clone()).nest("/callback", social::callback_router());

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .nest("/api", api_routes())
        .nest("/api/auth", auth_routes)
        .nest("/api/videos", videos::router(state.clone()))
        .nest("/api/topic", topic::router(state.clone()))
        .nest("/api/media", media::router(state.clone()))
        .nest("/api/queue", queue::router(state.clone()))
        .nest("/api/social", social::router(state))
        .layer(cors)
}

fn api_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

async fn health() -> axum::Json<Value> {
    axum::Json(json!({ "status": "ok" }))
}
