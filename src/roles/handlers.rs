use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::models::{CreateRoleRequest, Role, UpdateRoleRequest};
use super::services::RolesService;
use crate::auth::models::SuccessResponse;
use crate::auth::AuthedUser;
use crate::common::{ApiError, AppState};

/// GET /roles - List all roles
pub async fn list_roles(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    _user: AuthedUser,
) -> Result<Json<SuccessResponse<Vec<Role>>>, ApiError> {
    let app_state = state.read().await;
    let roles_service = RolesService::new(app_state.db.clone());

    let roles = roles_service.list_roles().await?;
    Ok(Json(SuccessResponse::new("Roles retrieved successfully", roles)))
}

/// POST /roles - Create a role
pub async fn create_role(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    _user: AuthedUser,
    payload: Result<Json<CreateRoleRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let app_state = state.read().await;
    let roles_service = RolesService::new(app_state.db.clone());

    let role = roles_service.create_role(request).await?;
    Ok((
        StatusCode::CREATED,
        Json(SuccessResponse::new("Role created successfully", role)),
    ))
}

/// GET /roles/:id
pub async fn get_role(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    _user: AuthedUser,
    Path(role_id): Path<String>,
) -> Result<Json<SuccessResponse<Role>>, ApiError> {
    let app_state = state.read().await;
    let roles_service = RolesService::new(app_state.db.clone());

    let role = roles_service.get_role(&role_id).await?;
    Ok(Json(SuccessResponse::new("Role retrieved successfully", role)))
}

/// PUT /roles/:id
pub async fn update_role(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    _user: AuthedUser,
    Path(role_id): Path<String>,
    payload: Result<Json<UpdateRoleRequest>, JsonRejection>,
) -> Result<Json<SuccessResponse<Role>>, ApiError> {
    let Json(request) = payload?;
    let app_state = state.read().await;
    let roles_service = RolesService::new(app_state.db.clone());

    let role = roles_service.update_role(&role_id, request).await?;
    Ok(Json(SuccessResponse::new("Role updated successfully", role)))
}

/// DELETE /roles/:id
pub async fn delete_role(
    Extension(state): Extension<Arc<RwLock<AppState>>>,
    _user: AuthedUser,
    Path(role_id): Path<String>,
) -> Result<Json<SuccessResponse<serde_json::Value>>, ApiError> {
    let app_state = state.read().await;
    let roles_service = RolesService::new(app_state.db.clone());

    roles_service.delete_role(&role_id).await?;
    Ok(Json(SuccessResponse::new(
        "Role deleted successfully",
        serde_json::json!({ "id": role_id }),
    )))
}
