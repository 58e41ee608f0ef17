use std::sync::Arc;

use axum::{
    extract::{Path, State, Extension},
    http::StatusCode,
    Json,
};
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{User, UserRole};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{CreateStaffRequest, StaffKind, StaffMember};
use crate::services::StaffService;

const ADMIN: &[UserRole] = &[UserRole::Administrator];

#[axum::debug_handler]
pub async fn list_staff(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, ADMIN, "manage staff")?;

    let staff = StaffService::new(&state).list_staff(auth.token()).await?;

    Ok(Json(json!({
        "staff": staff,
        "total": staff.len()
    })))
}

#[axum::debug_handler]
pub async fn create_staff(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<StaffMember>), AppError> {
    require_role(&user, ADMIN, "manage staff")?;

    let member = StaffService::new(&state).create_staff(request, auth.token()).await?;

    Ok((StatusCode::CREATED, Json(member)))
}

#[axum::debug_handler]
pub async fn delete_staff(
    State(state): State<Arc<AppConfig>>,
    Path((kind, id)): Path<(String, Uuid)>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<StatusCode, AppError> {
    require_role(&user, ADMIN, "manage staff")?;
    let kind: StaffKind = kind.parse()?;

    StaffService::new(&state).delete_staff(kind, id, auth.token()).await?;

    Ok(StatusCode::NO_CONTENT)
}
