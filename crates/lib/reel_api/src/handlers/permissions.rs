//! Permission administration handlers. Every route sits behind a permission gate.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use reel_core::models::permission::{NewPermission, Permission, PermissionUpdate};

use crate::AppState;
use crate::error::AppResult;
use crate::models::{PermissionCodesRequest, UserPermissionsResponse};
use crate::services::with_deadline;

/// `POST /api/v1/permissions`
pub async fn add_permission_handler(
    State(state): State<AppState>,
    Json(body): Json<NewPermission>,
) -> AppResult<(StatusCode, Json<Permission>)> {
    let permission = with_deadline(
        state.config.request_timeout,
        state.permissions.add_permission(&body),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

/// `GET /api/v1/permissions/{id}`
pub async fn get_permission_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<Permission>> {
    let permission = with_deadline(
        state.config.request_timeout,
        state.permissions.get_permission(id),
    )
    .await?;
    Ok(Json(permission))
}

/// `PUT /api/v1/permissions`
pub async fn update_permission_handler(
    State(state): State<AppState>,
    Json(body): Json<PermissionUpdate>,
) -> AppResult<Json<Permission>> {
    let permission = with_deadline(
        state.config.request_timeout,
        state.permissions.update_permission(&body),
    )
    .await?;
    Ok(Json(permission))
}

/// `DELETE /api/v1/permissions/{id}`
pub async fn delete_permission_handler(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    with_deadline(
        state.config.request_timeout,
        state.permissions.delete_permission(id),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/v1/permissions/users/{id}`
pub async fn user_permissions_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
) -> AppResult<Json<UserPermissionsResponse>> {
    let permissions = with_deadline(
        state.config.request_timeout,
        state.permissions.user_permissions(user_id),
    )
    .await?;
    Ok(Json(UserPermissionsResponse {
        user_id,
        permissions,
    }))
}

/// `POST /api/v1/permissions/users/{id}`
pub async fn grant_permissions_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<PermissionCodesRequest>,
) -> AppResult<StatusCode> {
    with_deadline(
        state.config.request_timeout,
        state.permissions.set_user_permissions(user_id, &body.codes),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /api/v1/permissions/users/{id}`
pub async fn revoke_permissions_handler(
    State(state): State<AppState>,
    Path(user_id): Path<i64>,
    Json(body): Json<PermissionCodesRequest>,
) -> AppResult<StatusCode> {
    with_deadline(
        state.config.request_timeout,
        state.permissions.delete_user_permissions(user_id, &body.codes),
    )
    .await?;
    Ok(StatusCode::NO_CONTENT)
}
