//! Editor access tokens.
//!
//! One HS256 token authenticates both the HTTP routes (Bearer header) and
//! the sync socket (`auth` frame). The subject is the editing user's id.

use gridline_core::types::DbId;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const DEFAULT_EXPIRY_MINS: i64 = 60;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: DbId,
    pub exp: i64,
    pub iat: i64,
    /// Random per-token id so two tokens minted in the same second differ.
    pub jti: String,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub access_token_expiry_mins: i64,
}

impl JwtConfig {
    /// Reads `JWT_SECRET` (required, non-empty) and `JWT_ACCESS_EXPIRY_MINS`
    /// (default 60). Panics on bad values; called once at startup.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET").unwrap_or_default();
        assert!(!secret.is_empty(), "JWT_SECRET must be set and non-empty");

        let access_token_expiry_mins = match std::env::var("JWT_ACCESS_EXPIRY_MINS") {
            Ok(raw) => raw
                .parse()
                .unwrap_or_else(|_| panic!("JWT_ACCESS_EXPIRY_MINS is not a number: {raw}")),
            Err(_) => DEFAULT_EXPIRY_MINS,
        };

        Self {
            secret,
            access_token_expiry_mins,
        }
    }
}

/// Why a presented token was refused.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("Access token has expired")]
    Expired,
    #[error("Access token is invalid")]
    Invalid,
}

pub fn generate_access_token(
    user_id: DbId,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        exp: iat + config.access_token_expiry_mins * 60,
        iat,
        jti: Uuid::new_v4().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Check signature and expiry, returning the user the token was issued to.
pub fn authenticate(token: &str, config: &JwtConfig) -> Result<DbId, TokenError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims.sub)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.to_string(),
            access_token_expiry_mins: 15,
        }
    }

    #[test]
    fn token_names_its_user() {
        let cfg = config("editor-secret");
        let token = generate_access_token(42, &cfg).unwrap();
        assert_eq!(authenticate(&token, &cfg), Ok(42));
    }

    #[test]
    fn stale_token_reports_expiry() {
        let cfg = config("editor-secret");
        let now = chrono::Utc::now().timestamp();
        // Past the 60s leeway the validator allows.
        let claims = Claims {
            sub: 1,
            exp: now - 600,
            iat: now - 1200,
            jti: "old".into(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(cfg.secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(authenticate(&token, &cfg), Err(TokenError::Expired));
    }

    #[test]
    fn foreign_or_malformed_tokens_are_invalid() {
        let token = generate_access_token(1, &config("one")).unwrap();
        assert_eq!(authenticate(&token, &config("two")), Err(TokenError::Invalid));
        assert_eq!(
            authenticate("not-a-jwt", &config("one")),
            Err(TokenError::Invalid)
        );
    }
}
