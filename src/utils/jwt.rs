// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::{config::Config, error::AppError, models::user::UserId, quiz::Identity};

/// Token payload. `sub` is the user id in decimal.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub name: String,
    /// Unix timestamp, checked by `jsonwebtoken`.
    pub exp: usize,
}

impl Claims {
    /// Parses the subject into a user id.
    pub fn user_id(&self) -> Result<UserId, AppError> {
        self.sub
            .parse::<UserId>()
            .map_err(|_| AppError::AuthError("Invalid token subject".to_string()))
    }
}

/// A verified token is the signed-in identity for a quiz session.
impl Identity for Claims {
    fn current_user(&self) -> Option<UserId> {
        self.sub.parse().ok()
    }
}

/// Issues a token for `id`, valid for `ttl_seconds` from now.
pub fn sign_jwt(
    id: UserId,
    display_name: &str,
    secret: &str,
    ttl_seconds: u64,
) -> Result<String, AppError> {
    let ttl = i64::try_from(ttl_seconds)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| AppError::InternalServerError("JWT lifetime out of range".to_string()))?;
    let exp = (Utc::now() + ttl).timestamp();

    let claims = Claims {
        sub: id.to_string(),
        name: display_name.to_owned(),
        exp: usize::try_from(exp).unwrap_or(usize::MAX),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Decodes `token` and checks signature, expiry and subject.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Rejected token: {}", e);
        AppError::AuthError("Invalid token".to_string())
    })?
    .claims;

    claims.user_id()?;
    Ok(claims)
}

fn bearer_token(req: &Request<Body>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects the request with 401 unless it carries a valid bearer token.
/// On success the decoded `Claims` are available to handlers as an `Extension`.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = bearer_token(&req).ok_or(StatusCode::UNAUTHORIZED)?;
    let claims = verify_jwt(token, &config.jwt_secret).map_err(|_| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify_round_trip() {
        let token = sign_jwt(17, "Amina", "secret", 600).unwrap();
        let claims = verify_jwt(&token, "secret").unwrap();

        assert_eq!(claims.user_id().unwrap(), 17);
        assert_eq!(claims.name, "Amina");
        assert_eq!(claims.current_user(), Some(17));
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let token = sign_jwt(17, "Amina", "secret", 600).unwrap();
        assert!(matches!(
            verify_jwt(&token, "other"),
            Err(AppError::AuthError(_))
        ));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let claims = Claims {
            sub: "17".to_string(),
            name: "Amina".to_string(),
            exp: 1_000,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();

        assert!(verify_jwt(&token, "secret").is_err());
    }

    #[test]
    fn test_non_numeric_subject_has_no_identity() {
        let claims = Claims {
            sub: "abc".to_string(),
            name: String::new(),
            exp: 0,
        };
        assert_eq!(claims.current_user(), None);
        assert!(claims.user_id().is_err());
    }
}
