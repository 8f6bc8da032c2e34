use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// API routes plus the static media directories.
pub fn create_app(state: AppState) -> Router {
    crate::routes::configure_routes(state.clone())
        .nest_service("/renders", ServeDir::new(state.media.renders_dir()))
        .nest_service("/images", ServeDir::new(state.media.images_dir()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::common::media::MediaKind;
    use crate::modules::auth::service::issue_token;
    use crate::test_support::{empty_registry, TestContext};

    async fn error_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        serde_json::from_slice(&bytes).expect("json error body")
    }

    #[tokio::test]
    async fn health_is_public() {
        let ctx = TestContext::new(empty_registry());
        let response = create_app(ctx.state.clone())
            .oneshot(Request::builder().uri("/api/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn rendered_files_are_served() {
        let ctx = TestContext::new(empty_registry());
        ctx.state
            .media
            .write_bytes(MediaKind::Video, "clip.mp4", b"mp4")
            .await
            .expect("write");

        let response = create_app(ctx.state.clone())
            .oneshot(Request::builder().uri("/renders/clip.mp4").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_routes_require_a_token() {
        let ctx = TestContext::new(empty_registry());
        let response = create_app(ctx.state.clone())
            .oneshot(Request::builder().uri("/api/videos").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unknown_provider_is_an_enveloped_400() {
        let ctx = TestContext::new(empty_registry());
        let token = issue_token(&ctx.state.config.jwt_secret, uuid::Uuid::new_v4()).expect("token");

        let request = Request::post("/api/videos/ai-video")
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", "application/json")
            .body(Body::from(r#"{"prompt":"a cat walks","provider":"sora"}"#))
            .expect("request");
        let response = create_app(ctx.state.clone()).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().is_some_and(|e| e.contains("sora")), "{body}");
        assert!(ctx.videos.all().is_empty());
    }

    #[tokio::test]
    async fn status_check_without_provider_is_an_enveloped_400() {
        let ctx = TestContext::new(empty_registry());
        let token = issue_token(&ctx.state.config.jwt_secret, uuid::Uuid::new_v4()).expect("token");

        let request = Request::get("/api/videos/ai-video/status/abc")
            .header("authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .expect("request");
        let response = create_app(ctx.state.clone()).oneshot(request).await.expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = error_body(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid request");
        assert!(body["error"].as_str().is_some_and(|e| e.contains("provider")), "{body}");
    }
}
