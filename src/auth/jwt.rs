use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Role;

/// Short-lived bearer token carried on every API call.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl AccessClaims {
    pub fn new(user_id: Uuid, email: String, role: Role, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            email,
            role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Long-lived token exchanged for a new pair. `jti` keeps every issued token
/// distinct even when two are minted within the same second.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub jti: Uuid,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            jti: Uuid::now_v7(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

pub fn encode_token<T: Serialize>(claims: &T, secret: &str) -> Result<String, String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| format!("JWT encode failed: {e}"))
}

pub fn decode_token<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T, String> {
    decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("JWT decode failed: {e}"))
}
