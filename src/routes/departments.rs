use axum::extract::State;
use axum::Json;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::models::Department;
use crate::state::SharedState;

pub async fn list(
    _auth: AuthUser,
    State(state): State<SharedState>,
) -> Result<Json<Vec<Department>>, AppError> {
    let departments = db::departments::list(&state.pool).await?;
    Ok(Json(departments))
}
