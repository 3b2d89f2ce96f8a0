//! Per-route permission gate.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use reel_core::auth::Principal;
use reel_core::models::permission::has_code;
use reel_core::permissions::PermissionService;
use tracing::{debug, error};

use crate::AppState;
use crate::error::AppError;

/// State for [`require_permission`]: the code a route requires and where to
/// look it up.
#[derive(Clone)]
pub struct PermissionGate {
    code: &'static str,
    permissions: PermissionService,
    timeout: Duration,
}

impl PermissionGate {
    pub fn new(code: &'static str, state: &AppState) -> Self {
        Self {
            code,
            permissions: state.permissions.clone(),
            timeout: state.config.request_timeout,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

/// Lets the request through only if the caller currently holds the gate's
/// code. The grant set is read fresh on every request.
pub async fn require_permission(
    State(gate): State<PermissionGate>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = match request.extensions().get::<Principal>() {
        Some(Principal::Authenticated(identity)) => identity.id,
        _ => {
            return Err(AppError::Unauthorized(
                "you must be authenticated to access this resource".into(),
            ));
        }
    };

    let permissions =
        match tokio::time::timeout(gate.timeout, gate.permissions.user_permissions(user_id)).await {
            Ok(Ok(permissions)) => permissions,
            Ok(Err(e)) => {
                error!(user_id, code = gate.code, error = %e, "permission lookup failed");
                return Err(AppError::Internal(format!("permission lookup: {e}")));
            }
            Err(_) => {
                error!(user_id, code = gate.code, "permission lookup timed out");
                return Err(AppError::Internal("permission lookup timed out".into()));
            }
        };

    if !has_code(&permissions, gate.code) {
        debug!(user_id, code = gate.code, "permission denied");
        return Err(AppError::Forbidden(
            "your user account doesn't have the necessary permissions to access this resource"
                .into(),
        ));
    }
    Ok(next.run(request).await)
}
