use crate::error::ApiError;
use crate::models::{Image, User};
use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Repository Trait
///
/// Defines the abstract contract for all persistence operations, mirroring the
/// external Persistent Store collaborator: find-by-id, find-by-unique-field,
/// insert-or-update save, delete, and existence checks, each atomic for a
/// single record.
///
/// **Send + Sync + async_trait** are required to make the trait object
/// (`Arc<dyn Repository>`) safely shareable across Axum's asynchronous task
/// boundaries, and let the tests substitute in-memory mocks.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, ApiError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError>;
    async fn username_exists(&self, username: &str) -> Result<bool, ApiError>;
    async fn email_exists(&self, email: &str) -> Result<bool, ApiError>;
    async fn list_users(&self) -> Result<Vec<User>, ApiError>;
    // Insert-or-update keyed on the primary key.
    async fn save_user(&self, user: &User) -> Result<User, ApiError>;
    // Returns false when no row matched (caller maps to NotFound).
    async fn delete_user(&self, id: Uuid) -> Result<bool, ApiError>;

    // --- Images ---
    async fn find_image(&self, id: Uuid) -> Result<Option<Image>, ApiError>;
    async fn list_images(&self) -> Result<Vec<Image>, ApiError>;
    // Insert-or-update keyed on the primary key.
    async fn save_image(&self, image: &Image) -> Result<Image, ApiError>;
    async fn delete_image(&self, id: Uuid) -> Result<bool, ApiError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The concrete implementation of the `Repository` trait, backed by PostgreSQL.
/// Uses the runtime query API with bound parameters throughout, so there is no
/// SQL injection surface and no compile-time database dependency.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at, last_login";
const IMAGE_COLUMNS: &str = "id, user_id, filename, original_filename, content_type, file_size, \
                             width, height, title, description, created_at, updated_at";

#[async_trait]
impl Repository for PostgresRepository {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn username_exists(&self, username: &str) -> Result<bool, ApiError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = $1)")
                .bind(username)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = $1)")
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let users = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    /// save_user
    ///
    /// Insert-or-update keyed on `id`. A single atomic statement, per the
    /// persistent-store contract.
    async fn save_user(&self, user: &User) -> Result<User, ApiError> {
        let saved = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, username, email, password_hash, created_at, last_login)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (id) DO UPDATE
            SET username = EXCLUDED.username,
                email = EXCLUDED.email,
                password_hash = EXCLUDED.password_hash,
                last_login = EXCLUDED.last_login
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .bind(user.last_login)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<Image>, ApiError> {
        let image = sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(image)
    }

    async fn list_images(&self) -> Result<Vec<Image>, ApiError> {
        let images = sqlx::query_as::<_, Image>(&format!(
            "SELECT {IMAGE_COLUMNS} FROM images ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(images)
    }

    /// save_image
    ///
    /// Insert-or-update keyed on `id`. `user_id` is deliberately absent from
    /// the update set: ownership is immutable after creation.
    async fn save_image(&self, image: &Image) -> Result<Image, ApiError> {
        let saved = sqlx::query_as::<_, Image>(&format!(
            r#"
            INSERT INTO images (id, user_id, filename, original_filename, content_type,
                                file_size, width, height, title, description,
                                created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE
            SET filename = EXCLUDED.filename,
                original_filename = EXCLUDED.original_filename,
                content_type = EXCLUDED.content_type,
                file_size = EXCLUDED.file_size,
                width = EXCLUDED.width,
                height = EXCLUDED.height,
                title = EXCLUDED.title,
                description = EXCLUDED.description,
                updated_at = EXCLUDED.updated_at
            RETURNING {IMAGE_COLUMNS}
            "#
        ))
        .bind(image.id)
        .bind(image.user_id)
        .bind(&image.filename)
        .bind(&image.original_filename)
        .bind(&image.content_type)
        .bind(image.file_size)
        .bind(image.width)
        .bind(image.height)
        .bind(&image.title)
        .bind(&image.description)
        .bind(image.created_at)
        .bind(image.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
