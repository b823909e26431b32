use chrono::{Duration, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{SqliteConnection, SqlitePool};

use crate::auth::jwt::{self, AccessClaims, RefreshClaims};
use crate::config::Config;
use crate::db;
use crate::error::AppError;
use crate::models::User;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Refresh tokens are stored as SHA-256 digests, never verbatim.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn access_token(config: &Config, user: &User) -> Result<String, AppError> {
    let claims = AccessClaims::new(
        user.id,
        user.email.clone(),
        user.role,
        Duration::minutes(config.access_token_minutes),
    );
    jwt::encode_token(&claims, &config.jwt_secret).map_err(AppError::Internal)
}

/// Mint an access/refresh pair and persist the refresh half.
pub async fn issue(
    conn: &mut SqliteConnection,
    config: &Config,
    user: &User,
) -> Result<TokenPair, AppError> {
    let access_token = access_token(config, user)?;

    let ttl = Duration::days(config.refresh_token_days);
    let claims = RefreshClaims::new(user.id, ttl);
    let refresh_token =
        jwt::encode_token(&claims, &config.jwt_refresh_secret).map_err(AppError::Internal)?;

    db::refresh_tokens::create(&mut *conn, user.id, &hash_token(&refresh_token), Utc::now() + ttl)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
    })
}

/// Exchange a refresh token for a new pair. A valid signature is not enough:
/// the token must still be on record, unexpired and unused.
pub async fn rotate(
    pool: &SqlitePool,
    config: &Config,
    presented: &str,
) -> Result<TokenPair, AppError> {
    let invalid = || AppError::Unauthorized("Invalid refresh token".to_string());

    let claims: RefreshClaims =
        jwt::decode_token(presented, &config.jwt_refresh_secret).map_err(|_| invalid())?;

    let stored = db::refresh_tokens::find_by_hash(pool, &hash_token(presented))
        .await?
        .ok_or_else(invalid)?;

    if stored.user_id != claims.sub {
        return Err(invalid());
    }

    if stored.used {
        tracing::warn!(
            "Refresh token reuse detected for user {}. Revoking all sessions.",
            stored.user_id
        );
        db::refresh_tokens::delete_all_for_user(pool, stored.user_id).await?;
        return Err(AppError::Unauthorized(
            "Refresh token reuse detected. All sessions revoked.".to_string(),
        ));
    }

    if stored.expires_at < Utc::now() {
        return Err(AppError::Unauthorized("Refresh token expired".to_string()));
    }

    let mut tx = pool.begin().await?;

    // Loses the race if a concurrent request already consumed this token.
    if !db::refresh_tokens::mark_used(&mut *tx, stored.id).await? {
        return Err(invalid());
    }

    let user = db::users::find_active_by_id(&mut *tx, stored.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found or inactive".to_string()))?;

    let pair = issue(&mut *tx, config, &user).await?;
    tx.commit().await?;

    Ok(pair)
}
