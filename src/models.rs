use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Represents the user's canonical identity record stored in the `users`
/// table — the Principal. The password hash is never serialized outward.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    /// Unique login name; also the token subject's human-readable identity.
    pub username: String,
    /// Unique contact address.
    pub email: String,
    /// One-way argon2 digest. Excluded from every JSON response.
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Image
///
/// Represents an uploaded image record from the `images` table. This is the
/// primary resource of the application: owned by exactly one user, pointing at
/// exactly one stored file.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Image {
    pub id: Uuid,
    // FK to users.id (Owner). Immutable after creation.
    pub user_id: Uuid,
    /// Generated name of the backing file within the storage root.
    pub filename: String,
    /// The client-supplied filename, kept for display only.
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    // Intrinsic dimensions, extracted best-effort at upload time.
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// --- Request Payloads (Input Schemas) ---

/// RegisterRequest
///
/// Input payload for the public registration endpoint (POST /api/users/register).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// LoginRequest
///
/// Input payload for POST /api/users/login.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// LoginResponse
///
/// Output schema carrying the signed bearer token the client presents on all
/// subsequent authenticated requests.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginResponse {
    pub token: String,
}

/// ChangePasswordRequest
///
/// Input payload for POST /api/users/change-password. The response carries a
/// freshly issued token.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub new_password: String,
}

/// UpdateUserRequest
///
/// Partial update payload for PUT /api/users/{id}.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

// --- Response Schemas (Output) ---

/// UserResponse
///
/// Public projection of a User record: everything except the password hash.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

/// ImageResponse
///
/// Public projection of an Image record, augmented with the resolved public
/// URL (`base_url` + generated filename). URL construction happens only here;
/// the storage layer deals exclusively in bare names.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ImageResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub content_type: String,
    pub file_size: i64,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl ImageResponse {
    /// from_image
    ///
    /// Maps the database record into the API shape, resolving the public URL
    /// against the configured base.
    pub fn from_image(image: Image, base_url: &str) -> Self {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), image.filename);
        Self {
            id: image.id,
            user_id: image.user_id,
            filename: image.filename,
            original_filename: image.original_filename,
            content_type: image.content_type,
            file_size: image.file_size,
            width: image.width,
            height: image.height,
            title: image.title,
            description: image.description,
            url,
            created_at: image.created_at,
            updated_at: image.updated_at,
        }
    }
}
