//! PostgreSQL-backed [`PermissionRepository`].

use async_trait::async_trait;
use sqlx::PgPool;

use super::PermissionRepository;
use crate::models::permission::{Permission, PermissionCode, PermissionCodes};
use crate::repository::RepositoryError;

/// Permission queries over a connection pool.
#[derive(Clone)]
pub struct PgPermissionRepository {
    pool: PgPool,
}

impl PgPermissionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Rows come from the catalog, whose codes are validated on the way in.
fn to_permission((id, code): (i64, String)) -> Result<Permission, RepositoryError> {
    let code = PermissionCode::try_from(code).map_err(|e| {
        RepositoryError::Database(sqlx::Error::Decode(Box::new(e)))
    })?;
    Ok(Permission { id, code })
}

#[async_trait]
impl PermissionRepository for PgPermissionRepository {
    async fn add_permission(&self, code: &PermissionCode) -> Result<Permission, RepositoryError> {
        let id = sqlx::query_scalar::<_, i64>(
            "INSERT INTO permissions (code) VALUES ($1) RETURNING id",
        )
        .bind(code.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(Permission {
            id,
            code: code.clone(),
        })
    }

    async fn get_permission(&self, id: i64) -> Result<Permission, RepositoryError> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "SELECT id, code FROM permissions WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("permission {id}")))?;
        to_permission(row)
    }

    async fn update_permission(&self, permission: &Permission) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE permissions SET code = $2 WHERE id = $1")
            .bind(permission.id)
            .bind(permission.code.as_str())
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!(
                "permission {}",
                permission.id
            )));
        }
        Ok(())
    }

    async fn delete_permission(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("permission {id}")));
        }
        Ok(())
    }

    async fn user_permissions(&self, user_id: i64) -> Result<Vec<Permission>, RepositoryError> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT p.id, p.code \
             FROM permissions p \
             JOIN users_permissions up ON up.permission_id = p.id \
             WHERE up.user_id = $1 \
             ORDER BY p.code",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(to_permission).collect()
    }

    async fn add_user_permissions(
        &self,
        user_id: i64,
        codes: &PermissionCodes,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO users_permissions (user_id, permission_id) \
             SELECT $1, p.id FROM permissions p WHERE p.code = ANY($2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(codes.to_strings())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_user_permissions(
        &self,
        user_id: i64,
        codes: &PermissionCodes,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            "DELETE FROM users_permissions \
             WHERE user_id = $1 \
               AND permission_id IN (SELECT id FROM permissions WHERE code = ANY($2))",
        )
        .bind(user_id)
        .bind(codes.to_strings())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
