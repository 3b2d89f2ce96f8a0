//! User storage.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::models::auth::{NewUser, User, UserWithPassword};
use crate::repository::RepositoryError;

/// Storage for user accounts.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user. A duplicate email is [`RepositoryError::Conflict`].
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError>;

    async fn get_by_id(&self, id: i64) -> Result<User, RepositoryError>;

    async fn get_by_email(&self, email: &str) -> Result<UserWithPassword, RepositoryError>;

    async fn set_activated(&self, id: i64) -> Result<User, RepositoryError>;
}

/// PostgreSQL-backed [`UserRepository`].
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

type UserRow = (i64, String, String, bool, chrono::DateTime<chrono::Utc>);

fn to_user((id, name, email, activated, created_at): UserRow) -> User {
    User {
        id,
        name,
        email,
        activated,
        created_at,
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING id, name, email, activated, created_at",
        )
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await?;
        Ok(to_user(row))
    }

    async fn get_by_id(&self, id: i64) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, name, email, activated, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(to_user)
        .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))
    }

    async fn get_by_email(&self, email: &str) -> Result<UserWithPassword, RepositoryError> {
        let (id, name, email, activated, created_at, password_hash) =
            sqlx::query_as::<_, (i64, String, String, bool, chrono::DateTime<chrono::Utc>, String)>(
                "SELECT id, name, email, activated, created_at, password_hash \
                 FROM users WHERE email = $1",
            )
            .bind(email)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| RepositoryError::NotFound(format!("user with email {email}")))?;
        Ok(UserWithPassword {
            user: to_user((id, name, email, activated, created_at)),
            password_hash,
        })
    }

    async fn set_activated(&self, id: i64) -> Result<User, RepositoryError> {
        sqlx::query_as::<_, UserRow>(
            "UPDATE users SET activated = TRUE WHERE id = $1 \
             RETURNING id, name, email, activated, created_at",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(to_user)
        .ok_or_else(|| RepositoryError::NotFound(format!("user {id}")))
    }
}
