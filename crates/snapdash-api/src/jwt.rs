//! Bearer-token gating for table fragments, filter pickers and the
//! notification list.
//!
//! Full pages, writes and the realtime socket are never gated. Gating is
//! on unless `JWT_ENABLED` is `false`; see [`JwtConfig::from_lookup`] for
//! the variables read.
//!
//! ```ignore
//! let protected = Router::new()
//!     .route("/partial/branch", get(branch_partial))
//!     .layer(JwtLayer::new(JwtConfig::from_secret(secret)?));
//! ```

use axum::{
    extract::Request,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use thiserror::Error;
use tower::{Layer, Service};

pub const DEFAULT_ISSUER: &str = "snapdash";
pub const DEFAULT_AUDIENCE: &str = "snapdash-dashboard";
pub const DEFAULT_EXPIRY: Duration = Duration::from_secs(3600);

/// Shortest HMAC secret accepted
pub const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("JWT configuration error: {0}")]
    Config(String),

    #[error("could not sign token: {0}")]
    Signing(String),

    #[error("missing bearer token")]
    MissingToken,

    #[error("token expired")]
    Expired,

    #[error("token signature does not match")]
    BadSignature,

    #[error("token was issued for another issuer or audience")]
    WrongRecipient,

    #[error("malformed token: {0}")]
    Malformed(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::Expired,
            ErrorKind::InvalidSignature => JwtError::BadSignature,
            ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => JwtError::WrongRecipient,
            _ => JwtError::Malformed(err.to_string()),
        }
    }
}

impl IntoResponse for JwtError {
    fn into_response(self) -> Response {
        let status = match self {
            JwtError::Config(_) | JwtError::Signing(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        };
        let body = serde_json::json!({
            "error": self.to_string(),
            "code": status.as_u16(),
        });
        (status, Json(body)).into_response()
    }
}

/// Registered claims carried by dashboard tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iss: String,
    pub aud: String,
    pub iat: u64,
    pub exp: u64,
    pub jti: String,
}

/// Caller identity inserted into request extensions by [`JwtLayer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub subject: String,
    pub token_id: String,
}

impl From<Claims> for AuthenticatedUser {
    fn from(claims: Claims) -> Self {
        Self {
            subject: claims.sub,
            token_id: claims.jti,
        }
    }
}

/// HMAC key material plus the expected issuer and audience
#[derive(Clone)]
pub struct JwtConfig {
    pub algorithm: Algorithm,
    pub issuer: String,
    pub audience: String,
    pub expiry: Duration,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("expiry", &self.expiry)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

impl JwtConfig {
    /// HS256 with the default issuer, audience and expiry
    pub fn from_secret(secret: &[u8]) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LEN {
            return Err(JwtError::Config(format!(
                "secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }

        Ok(Self {
            algorithm: Algorithm::HS256,
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_AUDIENCE.to_string(),
            expiry: DEFAULT_EXPIRY,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
        })
    }

    /// Read gating settings. Gating is on by default; `Ok(None)` only when
    /// `JWT_ENABLED` is `false`, `0`, `no` or `off`.
    ///
    /// - `JWT_SECRET`: required unless gating is turned off
    /// - `JWT_ALGORITHM`: HS256 (default), HS384 or HS512
    /// - `JWT_ISSUER`, `JWT_AUDIENCE`: override the defaults
    /// - `JWT_EXPIRY_SECS`: lifetime of issued tokens, default 3600
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, JwtError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let disabled = lookup("JWT_ENABLED").is_some_and(|v| {
            matches!(v.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off")
        });
        if disabled {
            return Ok(None);
        }

        let secret = lookup("JWT_SECRET").ok_or_else(|| {
            JwtError::Config("JWT_SECRET not set (set JWT_ENABLED=false to serve ungated)".into())
        })?;
        let mut config = Self::from_secret(secret.as_bytes())?;

        if let Some(name) = lookup("JWT_ALGORITHM") {
            config.algorithm = hmac_algorithm(&name)?;
        }
        if let Some(issuer) = lookup("JWT_ISSUER") {
            config.issuer = issuer;
        }
        if let Some(audience) = lookup("JWT_AUDIENCE") {
            config.audience = audience;
        }
        if let Some(raw) = lookup("JWT_EXPIRY_SECS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| JwtError::Config(format!("invalid JWT_EXPIRY_SECS: {:?}", raw)))?;
            config.expiry = Duration::from_secs(secs);
        }

        Ok(Some(config))
    }
}

fn hmac_algorithm(name: &str) -> Result<Algorithm, JwtError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        other => Err(JwtError::Config(format!(
            "unsupported algorithm {}, expected HS256, HS384 or HS512",
            other
        ))),
    }
}

/// Issues and checks dashboard tokens
#[derive(Clone)]
pub struct JwtService {
    config: Arc<JwtConfig>,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Sign a token for `subject`, valid for `lifetime` or the configured
    /// expiry. The server only validates; this backs the binary's
    /// `--issue-token` command and tests.
    pub fn generate_token(
        &self,
        subject: impl Into<String>,
        lifetime: Option<Duration>,
    ) -> Result<String, JwtError> {
        let config = &self.config;
        let iat = chrono::Utc::now().timestamp().max(0) as u64;
        let claims = Claims {
            sub: subject.into(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
            iat,
            exp: iat + lifetime.unwrap_or(config.expiry).as_secs(),
            jti: uuid::Uuid::new_v4().to_string(),
        };

        encode(&Header::new(config.algorithm), &claims, &config.encoding_key)
            .map_err(|e| JwtError::Signing(e.to_string()))
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_audience(&[&self.config.audience]);
        validation.leeway = 0;

        Ok(decode::<Claims>(token, &self.config.decoding_key, &validation)?.claims)
    }

    /// Validate the request's bearer token
    pub fn authorize(&self, headers: &HeaderMap) -> Result<AuthenticatedUser, JwtError> {
        let token = bearer_token(headers).ok_or(JwtError::MissingToken)?;
        self.validate_token(token).map(AuthenticatedUser::from)
    }
}

/// Token from `Authorization: Bearer <token>`, if present and non-blank
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Rejects requests without a valid bearer token
#[derive(Clone)]
pub struct JwtLayer {
    service: JwtService,
}

impl JwtLayer {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            service: JwtService::new(config),
        }
    }
}

impl<S> Layer<S> for JwtLayer {
    type Service = JwtMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        JwtMiddleware {
            inner,
            service: self.service.clone(),
        }
    }
}

#[derive(Clone)]
pub struct JwtMiddleware<S> {
    inner: S,
    service: JwtService,
}

impl<S> Service<Request> for JwtMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + Clone + 'static,
    S::Future: Send + 'static,
{
    type Response = Response;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let user = match self.service.authorize(request.headers()) {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(error = %e, path = %request.uri().path(), "Rejected request");
                return Box::pin(async move { Ok(e.into_response()) });
            }
        };

        request.extensions_mut().insert(user);
        // Call the instance poll_ready readied and keep the fresh clone
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);
        Box::pin(async move { inner.call(request).await })
    }
}
