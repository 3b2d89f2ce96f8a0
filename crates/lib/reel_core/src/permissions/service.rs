//! Validated access to the permission catalog and user grants.

use std::sync::Arc;

use tracing::{debug, info};

use super::{PermissionError, PermissionRepository};
use crate::models::permission::{
    NewPermission, Permission, PermissionCode, PermissionCodes, PermissionUpdate,
};
use crate::repository::RepositoryError;
use crate::validation::validate;

/// Permission operations. Input is checked here, never left to storage.
#[derive(Clone)]
pub struct PermissionService {
    repo: Arc<dyn PermissionRepository>,
}

impl PermissionService {
    pub fn new(repo: Arc<dyn PermissionRepository>) -> Self {
        Self { repo }
    }

    pub async fn add_permission(&self, input: &NewPermission) -> Result<Permission, PermissionError> {
        validate(input).map_err(PermissionError::Validation)?;
        let code = PermissionCode::parse(&input.code)?;
        let permission = self.repo.add_permission(&code).await?;
        info!(id = permission.id, code = %permission.code, "permission added");
        Ok(permission)
    }

    pub async fn get_permission(&self, id: i64) -> Result<Permission, PermissionError> {
        if id < 1 {
            return Err(RepositoryError::NotFound(format!("permission {id}")).into());
        }
        Ok(self.repo.get_permission(id).await?)
    }

    pub async fn update_permission(
        &self,
        input: &PermissionUpdate,
    ) -> Result<Permission, PermissionError> {
        validate(input).map_err(PermissionError::Validation)?;
        let permission = Permission {
            id: input.id,
            code: PermissionCode::parse(&input.code)?,
        };
        self.repo.update_permission(&permission).await?;
        Ok(permission)
    }

    pub async fn delete_permission(&self, id: i64) -> Result<(), PermissionError> {
        if id < 1 {
            return Err(RepositoryError::NotFound(format!("permission {id}")).into());
        }
        self.repo.delete_permission(id).await?;
        info!(id, "permission deleted");
        Ok(())
    }

    /// Permissions granted to `user_id`. An empty set is a valid answer.
    pub async fn user_permissions(&self, user_id: i64) -> Result<Vec<Permission>, PermissionError> {
        check_user_id(user_id)?;
        Ok(self.repo.user_permissions(user_id).await?)
    }

    /// Grant `codes` to `user_id`. Any malformed code rejects the whole batch
    /// before storage is touched.
    pub async fn set_user_permissions<I, S>(
        &self,
        user_id: i64,
        codes: I,
    ) -> Result<(), PermissionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        check_user_id(user_id)?;
        let codes = PermissionCodes::parse(codes)?;
        if codes.is_empty() {
            return Ok(());
        }
        self.repo.add_user_permissions(user_id, &codes).await?;
        info!(user_id, count = codes.len(), "permissions granted");
        Ok(())
    }

    /// Revoke `codes` from `user_id`, with the same all-or-nothing validation.
    pub async fn delete_user_permissions<I, S>(
        &self,
        user_id: i64,
        codes: I,
    ) -> Result<(), PermissionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        check_user_id(user_id)?;
        let codes = PermissionCodes::parse(codes)?;
        if codes.is_empty() {
            return Ok(());
        }
        self.repo.delete_user_permissions(user_id, &codes).await?;
        info!(user_id, count = codes.len(), "permissions revoked");
        Ok(())
    }
}

fn check_user_id(user_id: i64) -> Result<(), PermissionError> {
    if user_id < 1 {
        debug!(user_id, "rejected user id");
        return Err(PermissionError::InvalidUserId(user_id));
    }
    Ok(())
}
