use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::auth::jwt::{self, AccessClaims};
use crate::db;
use crate::error::AppError;
use crate::models::Role;
use crate::permissions::{self, Permission};
use crate::state::SharedState;

/// The principal behind a verified access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::Forbidden("Admin access required".to_string()))
        }
    }

    /// Admins always pass in addition to the listed roles.
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if self.is_admin() || allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }

    /// Checks a capability against the toggles currently persisted.
    pub async fn require_permission(
        &self,
        pool: &SqlitePool,
        permission: Permission,
    ) -> Result<(), AppError> {
        if self.is_admin() {
            return Ok(());
        }
        let toggles = db::settings::load_toggles(pool).await?;
        if permissions::has_permission(self.role, permission, &toggles) {
            Ok(())
        } else {
            tracing::debug!(
                user_id = %self.user_id,
                role = %self.role,
                %permission,
                "Permission denied"
            );
            Err(AppError::Forbidden("Insufficient permissions".to_string()))
        }
    }
}

impl From<AccessClaims> for AuthUser {
    fn from(claims: AccessClaims) -> Self {
        Self {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

impl FromRequestParts<SharedState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| AppError::Unauthorized("Access token required".to_string()))?;

        let claims: AccessClaims = jwt::decode_token(bearer.token(), &state.config.jwt_secret)
            .map_err(|_| AppError::Forbidden("Invalid or expired token".to_string()))?;

        Ok(claims.into())
    }
}
