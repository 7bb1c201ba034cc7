//! JWT validation middleware and request identity.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, errors::ErrorKind};
use tracing::debug;

use super::claims::Claims;
use super::config::AuthConfig;
use super::error::AuthError;
use crate::api::ApiError;

/// Fallback signing secret for dev mode. Never used when a secret is
/// configured; production mode refuses to start without one.
const DEV_SECRET: &str = "agentgate-dev-secret-do-not-use-in-production";

/// Shared authentication state.
#[derive(Clone)]
pub struct AuthState {
    config: Arc<AuthConfig>,
    decoding_key: Arc<DecodingKey>,
    encoding_key: Arc<EncodingKey>,
}

impl AuthState {
    /// Create authentication state from configuration.
    pub fn new(config: AuthConfig) -> Self {
        let secret = config
            .jwt_secret
            .clone()
            .unwrap_or_else(|| DEV_SECRET.to_string());

        Self {
            config: Arc::new(config),
            decoding_key: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            encoding_key: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
        }
    }

    /// Whether dev mode is enabled.
    pub fn is_dev_mode(&self) -> bool {
        self.config.dev_mode
    }

    /// Configured CORS origins.
    pub fn allowed_origins(&self) -> &[String] {
        &self.config.allowed_origins
    }

    /// Verify a token and return its claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, AuthError> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken(err.to_string()),
            })
    }

    /// Mint a short-lived token for a user. Used by dev tooling and tests;
    /// real deployments receive tokens from the external identity provider.
    pub fn generate_token(&self, user_id: &str) -> Result<String, AuthError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: (now + chrono::Duration::hours(24)).timestamp(),
            iat: Some(now.timestamp()),
            iss: Some("agentgate".to_string()),
            email: None,
            name: None,
        };

        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Pull the token from the request: `Authorization: Bearer` first, then
    /// the configured cookie.
    fn extract_token(&self, parts: &Parts) -> Result<String, AuthError> {
        if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
            let value = value
                .to_str()
                .map_err(|_| AuthError::InvalidToken("malformed header".to_string()))?;
            if let Some(token) = value.strip_prefix("Bearer ") {
                return Ok(token.trim().to_string());
            }
        }

        if let Some(cookies) = parts.headers.get(header::COOKIE) {
            let cookies = cookies
                .to_str()
                .map_err(|_| AuthError::InvalidToken("malformed cookie header".to_string()))?;
            for cookie in cookies.split(';') {
                if let Some((name, value)) = cookie.trim().split_once('=')
                    && name == self.config.cookie_name
                {
                    return Ok(value.to_string());
                }
            }
        }

        Err(AuthError::MissingToken)
    }
}

/// Authenticated identity attached to every protected request.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub claims: Claims,
}

impl CurrentUser {
    /// The user ID forwarded to the agent service.
    pub fn user_id(&self) -> &str {
        &self.claims.sub
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or(ApiError::Unauthenticated)
    }
}

/// Middleware that authenticates the request and attaches [`CurrentUser`].
pub async fn auth_middleware(
    State(auth): State<AuthState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let (mut parts, body) = request.into_parts();

    let token = auth.extract_token(&parts).map_err(|err| {
        debug!("authentication failed: {err}");
        ApiError::Unauthenticated
    })?;
    let claims = auth.verify_token(&token).map_err(|err| {
        debug!("authentication failed: {err}");
        ApiError::Unauthenticated
    })?;

    parts.extensions.insert(CurrentUser { claims });
    request = Request::from_parts(parts, body);

    Ok(next.run(request).await)
}
