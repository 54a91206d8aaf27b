//! Bearer-token authentication for protected routes.
//!
//! Tokens are HS256 JWTs signed with `JWT_SECRET`. The `sub` claim is the
//! authenticated user id handed to the payment service.

use actix_web::dev::Payload;
use actix_web::{web, FromRequest, HttpRequest};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::future::{ready, Ready};

use crate::error::ApiError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
struct Header {
    alg: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub nbf: Option<i64>,
}

/// Verify an HS256 JWT and return its claims.
///
/// `now` is the current unix time in seconds.
pub fn verify_token(secret: &[u8], token: &str, now: i64) -> Result<Claims, &'static str> {
    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) =
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(c), Some(s), None) => (h, c, s),
            _ => return Err("Invalid token"),
        };

    let header: Header = URL_SAFE_NO_PAD
        .decode(header_b64)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or("Invalid token")?;
    if header.alg != "HS256" {
        return Err("Invalid token");
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| "Invalid token")?;
    let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| "Invalid token")?;
    mac.update(header_b64.as_bytes());
    mac.update(b".");
    mac.update(claims_b64.as_bytes());
    mac.verify_slice(&signature).map_err(|_| "Invalid token")?;

    let claims: Claims = URL_SAFE_NO_PAD
        .decode(claims_b64)
        .ok()
        .and_then(|bytes| serde_json::from_slice(&bytes).ok())
        .ok_or("Invalid token claims")?;

    if claims.sub.trim().is_empty() {
        return Err("Invalid user ID in token");
    }
    if matches!(claims.exp, Some(exp) if exp <= now) {
        return Err("Token expired");
    }
    if matches!(claims.nbf, Some(nbf) if nbf > now) {
        return Err("Token not yet valid");
    }
    Ok(claims)
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Result<&str, &'static str> {
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) if !token.is_empty() => Ok(token),
        _ => Err("Invalid authorization header format"),
    }
}

/// The verified user behind a request. Rejects with 401 when absent or invalid.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    fn from_http(req: &HttpRequest) -> Result<Self, ApiError> {
        let state = req
            .app_data::<web::Data<AppState>>()
            .ok_or_else(|| ApiError::Internal("application state not configured".to_string()))?;

        let header = req
            .headers()
            .get(actix_web::http::header::AUTHORIZATION)
            .ok_or(ApiError::Unauthorized("Authorization header required"))?
            .to_str()
            .map_err(|_| ApiError::Unauthorized("Invalid authorization header format"))?;

        let token = bearer_token(header).map_err(ApiError::Unauthorized)?;
        let now = chrono::Utc::now().timestamp();
        let claims = verify_token(&state.config.jwt_secret, token, now).map_err(|reason| {
            tracing::debug!(reason, "bearer token rejected");
            ApiError::Unauthorized(reason)
        })?;

        Ok(AuthenticatedUser(claims.sub))
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(Self::from_http(req))
    }
}
