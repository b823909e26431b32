use chrono::Utc;
use sqlx::SqlitePool;

use crate::models::Role;
use crate::permissions::{Feature, FeatureToggles};

pub async fn load_toggles(pool: &SqlitePool) -> Result<FeatureToggles, sqlx::Error> {
    let rows: Vec<(String, Role, bool)> =
        sqlx::query_as("SELECT feature, role, enabled FROM feature_permissions")
            .fetch_all(pool)
            .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(feature, role, enabled)| match feature.parse::<Feature>() {
            Ok(feature) => Some((feature, role, enabled)),
            Err(e) => {
                tracing::warn!("Ignoring stored feature toggle: {e}");
                None
            }
        })
        .collect())
}

pub async fn upsert_toggle(
    pool: &SqlitePool,
    feature: Feature,
    role: Role,
    enabled: bool,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO feature_permissions (feature, role, enabled, updated_at)
         VALUES ($1, $2, $3, $4)
         ON CONFLICT (feature, role) DO UPDATE SET enabled = excluded.enabled, updated_at = excluded.updated_at",
    )
    .bind(feature.as_str())
    .bind(role)
    .bind(enabled)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn reset(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM feature_permissions")
        .execute(pool)
        .await?;
    Ok(())
}
