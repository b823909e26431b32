use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::Role;
use crate::permissions::{self, Feature, FeatureToggles, Permission};
use crate::routes::ApiJson;
use crate::state::SharedState;

#[derive(Debug, Serialize, Deserialize)]
pub struct Toggle {
    pub feature: Feature,
    pub role: Role,
    pub enabled: bool,
}

#[derive(Debug, Serialize)]
pub struct RolePermissions {
    pub role: Role,
    pub permissions: Vec<Permission>,
}

/// Stored toggles plus what each role ends up with once they are applied.
#[derive(Debug, Serialize)]
pub struct PermissionMatrix {
    pub toggles: Vec<Toggle>,
    pub roles: Vec<RolePermissions>,
}

impl PermissionMatrix {
    fn from_toggles(toggles: &FeatureToggles) -> Self {
        let mut stored: Vec<Toggle> = toggles
            .iter()
            .map(|(feature, role, enabled)| Toggle {
                feature,
                role,
                enabled,
            })
            .collect();
        stored.sort_by_key(|t| (t.feature, t.role.as_str()));

        let roles = Role::ALL
            .into_iter()
            .map(|role| RolePermissions {
                role,
                permissions: permissions::effective_permissions(role, toggles),
            })
            .collect();

        Self {
            toggles: stored,
            roles,
        }
    }
}

pub async fn get_permissions(
    _auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<PermissionMatrix>, AppError> {
    let toggles = db::settings::load_toggles(&state.pool).await?;
    Ok(Json(PermissionMatrix::from_toggles(&toggles)))
}

pub async fn update_permission(
    auth: AuthUser,
    State(state): State<SharedState>,
    ApiJson(req): ApiJson<Toggle>,
) -> Result<Json<PermissionMatrix>, AppError> {
    auth.require_admin()?;

    if req.role == Role::Admin {
        return Err(AppError::BadRequest(
            "Admin permissions cannot be toggled".to_string(),
        ));
    }

    db::settings::upsert_toggle(&state.pool, req.feature, req.role, req.enabled).await?;

    tracing::info!(
        actor = %auth.user_id,
        feature = req.feature.as_str(),
        role = %req.role,
        enabled = req.enabled,
        "Feature toggle changed"
    );

    let toggles = db::settings::load_toggles(&state.pool).await?;
    Ok(Json(PermissionMatrix::from_toggles(&toggles)))
}

pub async fn reset_permissions(
    auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<PermissionMatrix>, AppError> {
    auth.require_admin()?;

    db::settings::reset(&state.pool).await?;
    tracing::info!(actor = %auth.user_id, "Feature toggles reset to defaults");

    Ok(Json(PermissionMatrix::from_toggles(&FeatureToggles::new())))
}
