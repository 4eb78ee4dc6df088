use std::time::Duration;

use async_trait::async_trait;
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TokenError;

/// Claims carried by an identity token. The login is the only identity claim.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub iat: u64,
    /// Unique per issuance so a fresh login never reproduces an old token.
    pub jti: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<u64>,
}

#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<Claims, TokenError>;
}

/// Issues and verifies HS256 tokens signed with a shared secret.
pub struct Hs256TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Option<Duration>,
}

impl Hs256TokenService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: None,
        }
    }

    /// Tokens issued from now on expire after `ttl`, and tokens without an
    /// expiry are refused.
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn issue(&self, login: &str) -> Result<String, TokenError> {
        let now = get_current_timestamp();
        let claims = Claims {
            sub: login.to_string(),
            iat: now,
            jti: Uuid::new_v4().to_string(),
            exp: self.ttl.map(|ttl| now + ttl.as_secs()),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        if self.ttl.is_some() {
            validation.set_required_spec_claims(&["sub", "exp"]);
        } else {
            validation.validate_exp = false;
            validation.set_required_spec_claims(&["sub"]);
        }
        validation
    }
}

#[async_trait]
impl TokenVerifier for Hs256TokenService {
    async fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding, &self.validation())
            .map(|data| data.claims)
            .map_err(|_| TokenError::Invalid)
    }
}
