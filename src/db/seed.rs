use sqlx::SqlitePool;

use crate::auth::password;
use crate::config::AdminSeed;
use crate::db;
use crate::db::users::NewUser;
use crate::models::Role;

const DEPARTMENTS: [(&str, &str, &str); 4] = [
    ("dept-it", "IT", "Information Technology"),
    ("dept-support", "Support", "Customer Support"),
    ("dept-sales", "Sales", "Sales Team"),
    ("dept-engineering", "Engineering", "Software Engineering"),
];

/// Provision the administrator and default departments on first boot.
/// Later boots find the admin already present and change nothing.
pub async fn run(pool: &SqlitePool, admin: &AdminSeed) -> Result<(), String> {
    if db::users::find_by_email(pool, &admin.email)
        .await
        .map_err(|e| format!("Failed to look up seed admin: {e}"))?
        .is_some()
    {
        return Ok(());
    }

    let pw_hash = password::hash(&admin.password)?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| format!("Failed to start seed transaction: {e}"))?;

    let user = db::users::create(
        &mut *tx,
        &NewUser {
            name: &admin.name,
            email: &admin.email,
            password_hash: &pw_hash,
            role: Role::Admin,
            department: Some("IT"),
        },
    )
    .await
    .map_err(|e| format!("Failed to create seed admin: {e}"))?;

    for (id, name, description) in DEPARTMENTS {
        db::departments::insert_if_missing(&mut *tx, id, name, description, Some(user.id))
            .await
            .map_err(|e| format!("Failed to seed department {name}: {e}"))?;
    }

    tx.commit()
        .await
        .map_err(|e| format!("Failed to commit seed data: {e}"))?;

    tracing::info!("Seeded admin account {} and default departments", admin.email);
    Ok(())
}
