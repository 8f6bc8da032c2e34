//! Linked social accounts and the platforms videos are published to.

use std::sync::Arc;

use axum::routing::{delete, get};
use axum::{middleware, Router};

use crate::common::media::MediaStorage;
use crate::config::settings::AppConfig;
use crate::state::AppState;

pub mod dto;
pub mod error;
pub mod handler;
mod http;
pub mod instagram;
pub mod model;
pub mod oauth_state;
pub mod publisher;
pub mod repository;
pub mod service;
pub mod youtube;

use instagram::InstagramPublisher;
use publisher::PlatformRegistry;
use repository::AccountStore;
use youtube::YouTubePublisher;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/accounts", get(handler::list_accounts))
        .route("/{platform}/connect", get(handler::connect))
        .route("/{platform}", delete(handler::disconnect))
        .route_layer(middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
}

/// OAuth redirect targets, mounted under `/api/auth/callback`. Public: the
/// user is identified by the `state` nonce.
pub fn callback_router() -> Router<AppState> {
    Router::new().route("/{platform}", get(handler::oauth_callback))
}

/// Platforms with OAuth credentials in the environment.
pub fn platforms_from_config(
    config: &AppConfig,
    client: &reqwest::Client,
    accounts: Arc<dyn AccountStore>,
    media: &MediaStorage,
) -> PlatformRegistry {
    let mut registry = PlatformRegistry::new();
    if let Some(oauth) = &config.youtube {
        registry = registry.with_platform(Arc::new(YouTubePublisher::new(
            client.clone(),
            oauth.clone(),
            accounts.clone(),
            media.clone(),
        )));
    }
    if let Some(oauth) = &config.instagram {
        registry = registry.with_platform(Arc::new(InstagramPublisher::new(
            client.clone(),
            oauth.clone(),
            accounts.clone(),
        )));
    }
    registry
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::modules::providers::registry::ProviderRegistry;
    use crate::test_support::{empty_registry, TestContext};

    fn app(ctx: &TestContext) -> Router {
        Router::new()
            .nest("/api/auth/callback", callback_router())
            .with_state(ctx.state.clone())
    }

    fn context() -> TestContext {
        let registry: ProviderRegistry = empty_registry();
        TestContext::new(registry)
    }

    async fn get(app: Router, uri: &str) -> axum::response::Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).expect("request"))
            .await
            .expect("response")
    }

    #[tokio::test]
    async fn callback_without_state_is_unauthorized_and_writes_nothing() {
        let ctx = context();

        let response = get(app(&ctx), "/api/auth/callback/youtube?code=valid-code").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ctx.accounts.upserts(), 0);
    }

    #[tokio::test]
    async fn callback_with_unknown_state_is_unauthorized() {
        let ctx = context();

        let response = get(app(&ctx), "/api/auth/callback/instagram?code=c&state=forged").await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ctx.accounts.upserts(), 0);
    }

    #[tokio::test]
    async fn connected_account_redirects_to_settings() {
        let mut ctx = context();
        ctx.use_fake_platform(model::Platform::YouTube);
        let user = uuid::Uuid::new_v4();
        let nonce = ctx.state.oauth_states.issue(user, model::Platform::YouTube).await.expect("nonce");

        let response = get(app(&ctx), &format!("/api/auth/callback/youtube?code=abc&state={nonce}")).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()["location"].to_str().expect("location");
        assert_eq!(location, "http://frontend.test/settings?platform=youtube&connected=true");
        assert_eq!(ctx.accounts.upserts(), 1);

        // The nonce is single use.
        let replay = get(app(&ctx), &format!("/api/auth/callback/youtube?code=abc&state={nonce}")).await;
        assert_eq!(replay.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ctx.accounts.upserts(), 1);
    }

    #[tokio::test]
    async fn declined_consent_redirects_with_error() {
        let mut ctx = context();
        ctx.use_fake_platform(model::Platform::Instagram);
        let nonce = ctx
            .state
            .oauth_states
            .issue(uuid::Uuid::new_v4(), model::Platform::Instagram)
            .await
            .expect("nonce");

        let response = get(
            app(&ctx),
            &format!("/api/auth/callback/instagram?error=access_denied&state={nonce}"),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let location = response.headers()["location"].to_str().expect("location");
        assert!(location.contains("connected=false"), "{location}");
        assert!(location.contains("error=access_denied"), "{location}");
        assert_eq!(ctx.accounts.upserts(), 0);
    }
}
