use anyhow::anyhow;
use jsonwebtoken::{decode, encode, get_current_timestamp, DecodingKey, EncodingKey, Header, Validation};
use tracing::info;
use uuid::Uuid;

use super::dto::{AuthResponse, LoginRequest, RegisterRequest, TokenClaims, UserResponse};
use crate::common::error::{AppError, AppResult};
use crate::common::security;
use crate::state::AppState;

/// Access token lifetime.
pub const TOKEN_TTL_SECS: u64 = 24 * 60 * 60;

pub struct AuthService;

impl AuthService {
    pub async fn register(state: &AppState, req: RegisterRequest) -> AppResult<UserResponse> {
        let email = req.email.trim().to_lowercase();
        let username = req.username.trim();

        if state.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("Email already exists"));
        }
        if state.users.find_by_username(username).await?.is_some() {
            return Err(AppError::conflict("Username already exists"));
        }

        let password_hash = security::hash_password(&req.password)?;
        let user = state
            .users
            .create(username, &email, &password_hash)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db) if db.is_unique_violation() => {
                    AppError::conflict("Email or username already exists")
                }
                other => AppError::Database(other),
            })?;

        info!("👤 Registered user {}", user.id);
        Ok(user.into())
    }

    pub async fn login(state: &AppState, req: LoginRequest) -> AppResult<AuthResponse> {
        let email = req.email.trim().to_lowercase();
        let user = state
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::unauthorized("Invalid email or password"))?;

        security::verify_password(&req.password, &user.password_hash)
            .map_err(|_| AppError::unauthorized("Invalid email or password"))?;

        let access_token = issue_token(&state.config.jwt_secret, user.id)?;
        Ok(AuthResponse {
            access_token,
            token_type: "Bearer",
            expires_in: TOKEN_TTL_SECS,
            user: user.into(),
        })
    }

    /// Revokes the presented token for the rest of its lifetime.
    pub async fn logout(state: &AppState, token: &str, claims: &TokenClaims) -> AppResult<()> {
        let remaining = (claims.exp as u64).saturating_sub(get_current_timestamp());
        state.revoked.revoke(token, remaining).await?;
        info!("👋 User {} logged out", claims.sub);
        Ok(())
    }

    pub async fn me(state: &AppState, user_id: Uuid) -> AppResult<UserResponse> {
        let user = state
            .users
            .find(user_id)
            .await?
            .ok_or_else(|| AppError::unauthorized("User no longer exists"))?;
        Ok(user.into())
    }
}

pub fn issue_token(secret: &str, user_id: Uuid) -> AppResult<String> {
    let now = get_current_timestamp();
    let claims = TokenClaims {
        sub: user_id,
        exp: (now + TOKEN_TTL_SECS) as usize,
        iat: now as usize,
    };

    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AppError::Internal(anyhow!("signing token: {e}")))
}

pub fn verify_token(secret: &str, token: &str) -> AppResult<TokenClaims> {
    decode::<TokenClaims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::default())
        .map(|data| data.claims)
        .map_err(|_| AppError::unauthorized("Invalid or expired token"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{empty_registry, TestContext};

    fn register_body(email: &str) -> RegisterRequest {
        RegisterRequest {
            username: "maker".into(),
            email: email.into(),
            password: "correct horse".into(),
        }
    }

    #[test]
    fn tokens_verify_only_with_the_signing_secret() {
        let user = Uuid::new_v4();
        let token = issue_token("s1", user).expect("token");

        let claims = verify_token("s1", &token).expect("claims");
        assert_eq!(claims.sub, user);
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_SECS as usize);
        assert!(matches!(verify_token("s2", &token), Err(AppError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn register_then_login() {
        let ctx = TestContext::new(empty_registry());

        let user = AuthService::register(&ctx.state, register_body("Maker@Example.com"))
            .await
            .expect("register");
        assert_eq!(user.email, "maker@example.com");

        let auth = AuthService::login(
            &ctx.state,
            LoginRequest {
                email: "maker@example.com".into(),
                password: "correct horse".into(),
            },
        )
        .await
        .expect("login");
        let claims = verify_token(&ctx.state.config.jwt_secret, &auth.access_token).expect("claims");
        assert_eq!(claims.sub, user.id);
    }

    #[tokio::test]
    async fn duplicate_email_and_bad_password_are_rejected() {
        let ctx = TestContext::new(empty_registry());
        AuthService::register(&ctx.state, register_body("a@example.com"))
            .await
            .expect("register");

        let mut second = register_body("a@example.com");
        second.username = "other".into();
        let err = AuthService::register(&ctx.state, second).await.expect_err("duplicate");
        assert!(matches!(err, AppError::Conflict(_)));

        let err = AuthService::login(
            &ctx.state,
            LoginRequest {
                email: "a@example.com".into(),
                password: "wrong".into(),
            },
        )
        .await
        .expect_err("bad password");
        assert!(matches!(err, AppError::Unauthorized(_)));
    }
}
