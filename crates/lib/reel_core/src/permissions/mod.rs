//! Permission catalog and user grants.

pub mod queries;
pub mod service;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::permission::{
    InvalidPermissionCode, Permission, PermissionCode, PermissionCodes,
};
use crate::repository::RepositoryError;
use crate::validation::FieldErrors;

pub use queries::PgPermissionRepository;
pub use service::PermissionService;

/// Permission errors.
#[derive(Debug, Error)]
pub enum PermissionError {
    #[error("invalid permission format")]
    InvalidCode(#[from] InvalidPermissionCode),

    #[error("user id must be at least 1, got {0}")]
    InvalidUserId(i64),

    #[error("validation failed")]
    Validation(FieldErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Storage for the permission catalog and the user↔permission join.
#[async_trait]
pub trait PermissionRepository: Send + Sync {
    async fn add_permission(&self, code: &PermissionCode) -> Result<Permission, RepositoryError>;

    async fn get_permission(&self, id: i64) -> Result<Permission, RepositoryError>;

    async fn update_permission(&self, permission: &Permission) -> Result<(), RepositoryError>;

    async fn delete_permission(&self, id: i64) -> Result<(), RepositoryError>;

    /// Permissions currently granted to a user; empty when none.
    async fn user_permissions(&self, user_id: i64) -> Result<Vec<Permission>, RepositoryError>;

    /// Grant every catalog entry whose code is in `codes`.
    async fn add_user_permissions(
        &self,
        user_id: i64,
        codes: &PermissionCodes,
    ) -> Result<(), RepositoryError>;

    async fn delete_user_permissions(
        &self,
        user_id: i64,
        codes: &PermissionCodes,
    ) -> Result<(), RepositoryError>;
}
