use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use tracing::error;

use crate::users::repo_types::{NewUser, User};

/// Which uniqueness rule a write collided with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    Username,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0:?}")]
    Duplicate(UniqueField),
    #[error("user not found")]
    NotFound,
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence boundary for user records.
///
/// Every lookup only sees active (not soft-deleted) rows and matches exactly,
/// case-sensitive as stored. Implementations own uniqueness of email and
/// username among active rows and report a collision as `StoreError::Duplicate`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, user: NewUser) -> StoreResult<User>;
    async fn find_by_id(&self, id: i64) -> StoreResult<User>;
    async fn find_by_email(&self, email: &str) -> StoreResult<User>;
    async fn find_by_username(&self, username: &str) -> StoreResult<User>;
    /// Full-record replace by id. Returns the stored row with a refreshed `updated_at`.
    async fn update(&self, user: &User) -> StoreResult<User>;
    /// Soft delete.
    async fn delete(&self, id: i64) -> StoreResult<()>;
}

const USER_COLUMNS: &str =
    "id, email, username, password_hash, created_at, updated_at, deleted_at";

/// Postgres-backed store. Uniqueness comes from the partial unique indexes
/// in `migrations/0001_init.sql`.
#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_sqlx(e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() {
            let field = match db_err.constraint() {
                Some(c) if c.contains("username") => UniqueField::Username,
                _ => UniqueField::Email,
            };
            return StoreError::Duplicate(field);
        }
    }
    error!(error = %e, "users query failed");
    StoreError::Storage(e.into())
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: NewUser) -> StoreResult<User> {
        let sql = format!(
            r#"
            INSERT INTO users (email, username, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_one(&self.db)
            .await
            .map_err(map_sqlx)
    }

    async fn find_by_id(&self, id: i64) -> StoreResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .map_err(map_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> StoreResult<User> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .map_err(map_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<User> {
        let sql =
            format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.db)
            .await
            .map_err(map_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, user: &User) -> StoreResult<User> {
        let sql = format!(
            r#"
            UPDATE users
            SET email = $2, username = $3, password_hash = $4, updated_at = now()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {USER_COLUMNS}
            "#
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.username)
            .bind(&user.password_hash)
            .fetch_optional(&self.db)
            .await
            .map_err(map_sqlx)?
            .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let res = sqlx::query(
            "UPDATE users SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(map_sqlx)?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
