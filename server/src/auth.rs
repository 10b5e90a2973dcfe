use crate::app::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

/// Used when no secret is configured. Fine for development, nothing else.
pub const DEFAULT_JWT_SECRET: &str = "a-secure-secret-for-development";

/// Environment variable also accepted for the signing secret when
/// `WEBSERVER_JWT_SECRET` is unset.
pub const JWT_SECRET_ALIAS: &str = "JWT_SECRET";

/// How long an issued token stays valid.
pub const TOKEN_LIFETIME_S: i64 = 60 * 60 * 24;

#[derive(Clone)]
pub struct TokenHandler {
    jwt_secret: String,
    encoding_key: EncodingKey,
}

impl TokenHandler {
    pub fn new(jwt_secret: String) -> Self {
        let encoding_key = EncodingKey::from_secret(jwt_secret.as_bytes());
        Self {
            jwt_secret,
            encoding_key,
        }
    }

    /// Checks signature and expiry, returning the embedded claims.
    pub fn verify_token(&self, token: &str) -> Result<Claims, JwtError> {
        let key = DecodingKey::from_secret(self.jwt_secret.as_bytes());
        match jsonwebtoken::decode(token, &key, &Validation::new(Algorithm::HS256)) {
            Ok(token_data) => Ok(token_data.claims),
            Err(e) => {
                warn!("failed to validate token with error: '{}'", e);
                Err(e)
            }
        }
    }

    pub fn generate_token(&self, username: &str) -> AppResult<String> {
        let exp = Utc::now()
            .checked_add_signed(Duration::seconds(TOKEN_LIFETIME_S))
            .ok_or_else(|| {
                AppError::internal_error()
                    .with_context(&"failed to add token lifetime to current timestamp")
            })?
            .timestamp();

        self.encode_claims(&Claims::new(username.to_owned(), exp))
            .map_err(|e| AppError::internal_error().with_context(&e))
    }

    fn encode_claims(&self, claims: &Claims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)
    }
}

/// Payload of a session token. Nothing about it is stored server side.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub username: String,
    pub exp: i64,
}

impl Claims {
    pub fn new(username: String, exp: i64) -> Self {
        Self { username, exp }
    }
}

/// Picks the signing secret: the configured one, then the alias, then the
/// development default. Empty values count as unset.
pub fn resolve_jwt_secret(configured: Option<String>, alias: Option<String>) -> String {
    configured
        .into_iter()
        .chain(alias)
        .find(|secret| !secret.is_empty())
        .unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string())
}
