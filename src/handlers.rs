use crate::{
    AppState,
    auth::{self, AuthUser, is_owner},
    error::ApiError,
    models::{
        ChangePasswordRequest, ImageResponse, LoginRequest, LoginResponse, RegisterRequest,
        UpdateUserRequest, User, UserResponse,
    },
    service::{ImageUpdate, ImageUpload, NewFile},
};
use axum::{
    Json,
    extract::{Multipart, Path, State},
    http::StatusCode,
};
use chrono::Utc;
use uuid::Uuid;

// --- Auth & User Handlers ---

/// register_user
///
/// [Public Route] Creates a new user account. Username and email must both be
/// unique; violations answer 409 before any write occurs. The password is
/// hashed with argon2 and the plaintext is never persisted or logged.
#[utoipa::path(
    post,
    path = "/api/users/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registered", body = UserResponse),
        (status = 409, description = "Username or email taken")
    )
)]
pub async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if payload.username.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "username and password are required".to_string(),
        ));
    }

    if state.repo.username_exists(&payload.username).await? {
        return Err(ApiError::Conflict("username already exists".to_string()));
    }
    if state.repo.email_exists(&payload.email).await? {
        return Err(ApiError::Conflict("email already exists".to_string()));
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        username: payload.username,
        email: payload.email,
        password_hash: auth::hash_password(&payload.password)?,
        created_at: now,
        last_login: Some(now),
    };

    let saved = state.repo.save_user(&user).await?;
    Ok(Json(saved.into()))
}

/// login
///
/// [Public Route] Verifies username/password against the credential store and
/// issues a signed bearer token on success. Unknown usernames and wrong
/// passwords are indistinguishable to the caller (both 401).
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = LoginResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let mut user = state
        .repo
        .find_user_by_username(&payload.username)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !auth::verify_password(&payload.password, &user.password_hash) {
        return Err(ApiError::InvalidCredentials);
    }

    user.last_login = Some(Utc::now());
    let user = state.repo.save_user(&user).await?;

    let token = state.tokens.issue(user.id)?;
    Ok(Json(LoginResponse { token }))
}

/// change_password
///
/// [Authenticated Route] Re-hashes and stores a new password for the acting
/// principal, then issues a fresh token so clients can rotate immediately.
#[utoipa::path(
    post,
    path = "/api/users/change-password",
    request_body = ChangePasswordRequest,
    responses((status = 200, description = "Password changed", body = LoginResponse))
)]
pub async fn change_password(
    principal: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    if payload.new_password.trim().is_empty() {
        return Err(ApiError::InvalidInput(
            "new password must not be empty".to_string(),
        ));
    }

    let mut user = state
        .repo
        .find_user(principal.id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found with id: {}", principal.id)))?;

    user.password_hash = auth::hash_password(&payload.new_password)?;
    let user = state.repo.save_user(&user).await?;

    let token = state.tokens.issue(user.id)?;
    Ok(Json(LoginResponse { token }))
}

/// get_me
///
/// [Authenticated Route] Provides the authenticated user's profile record.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses((status = 200, description = "Profile", body = UserResponse))
)]
pub async fn get_me(
    AuthUser { id, .. }: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found with id: {id}")))?;
    Ok(Json(user.into()))
}

/// get_users
///
/// [Authenticated Route] Lists all registered users (public projection only).
#[utoipa::path(
    get,
    path = "/api/users",
    responses((status = 200, description = "Users", body = [UserResponse]))
)]
pub async fn get_users(
    _principal: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.repo.list_users().await?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// get_user_by_id
///
/// [Authenticated Route] Retrieves a single user by id.
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses((status = 200, description = "Found", body = UserResponse))
)]
pub async fn get_user_by_id(
    _principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found with id: {id}")))?;
    Ok(Json(user.into()))
}

/// get_user_by_username
///
/// [Authenticated Route] Retrieves a single user by unique username.
#[utoipa::path(
    get,
    path = "/api/users/username/{username}",
    params(("username" = String, Path, description = "Username")),
    responses((status = 200, description = "Found", body = UserResponse))
)]
pub async fn get_user_by_username(
    _principal: AuthUser,
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state
        .repo
        .find_user_by_username(&username)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found with username: {username}")))?;
    Ok(Json(user.into()))
}

/// update_user
///
/// [Authenticated Route] Owner-only profile update (username/email).
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated", body = UserResponse),
        (status = 403, description = "Not your account")
    )
)]
pub async fn update_user(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if !is_owner(&principal, id) {
        return Err(ApiError::Forbidden(
            "you can only update your own account".to_string(),
        ));
    }

    let mut user = state
        .repo
        .find_user(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found with id: {id}")))?;

    if let Some(username) = payload.username {
        if username != user.username && state.repo.username_exists(&username).await? {
            return Err(ApiError::Conflict("username already exists".to_string()));
        }
        user.username = username;
    }
    if let Some(email) = payload.email {
        if email != user.email && state.repo.email_exists(&email).await? {
            return Err(ApiError::Conflict("email already exists".to_string()));
        }
        user.email = email;
    }

    let saved = state.repo.save_user(&user).await?;
    Ok(Json(saved.into()))
}

/// delete_user
///
/// [Authenticated Route] Owner-only account removal.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not your account"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_user(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    if !is_owner(&principal, id) {
        return Err(ApiError::Forbidden(
            "you can only delete your own account".to_string(),
        ));
    }

    if state.repo.delete_user(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("user not found with id: {id}")))
    }
}

// --- Image Handlers ---

/// Parsed form of the multipart body shared by upload and update: an optional
/// `image` part plus optional `title` and `description` text parts.
struct ImageForm {
    file: Option<(Vec<u8>, String, String)>,
    title: Option<String>,
    description: Option<String>,
}

/// read_image_form
///
/// Drains the multipart stream. Unknown parts are ignored; a present-but-
/// unreadable part is a client error.
async fn read_image_form(mut multipart: Multipart) -> Result<ImageForm, ApiError> {
    let mut form = ImageForm {
        file: None,
        title: None,
        description: None,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "image" => {
                let original_filename = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::InvalidInput(format!("failed to read file: {e}")))?;
                form.file = Some((data.to_vec(), original_filename, content_type));
            }
            "title" => {
                form.title = Some(field.text().await.map_err(|e| {
                    ApiError::InvalidInput(format!("failed to read title: {e}"))
                })?);
            }
            "description" => {
                form.description = Some(field.text().await.map_err(|e| {
                    ApiError::InvalidInput(format!("failed to read description: {e}"))
                })?);
            }
            _ => {}
        }
    }

    Ok(form)
}

/// upload_image
///
/// [Authenticated Route] Accepts a multipart upload (`image` part required,
/// `title`/`description` optional) and creates an image owned by the acting
/// principal. Validation runs before any storage or database write.
#[utoipa::path(
    post,
    path = "/api/images",
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Uploaded", body = ImageResponse),
        (status = 400, description = "Empty file or disallowed content type")
    )
)]
pub async fn upload_image(
    principal: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<ImageResponse>, ApiError> {
    let form = read_image_form(multipart).await?;
    let (data, original_filename, content_type) = form
        .file
        .ok_or_else(|| ApiError::InvalidInput("missing 'image' part".to_string()))?;

    let response = state
        .images
        .upload(
            &principal,
            ImageUpload {
                data,
                original_filename,
                content_type,
                title: form.title,
                description: form.description,
            },
        )
        .await?;

    Ok(Json(response))
}

/// get_images
///
/// [Authenticated Route] Lists all images. Reads carry no ownership filter.
#[utoipa::path(
    get,
    path = "/api/images",
    responses((status = 200, description = "Images", body = [ImageResponse]))
)]
pub async fn get_images(
    _principal: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<ImageResponse>>, ApiError> {
    Ok(Json(state.images.list().await?))
}

/// get_image
///
/// [Authenticated Route] Retrieves a single image by id.
#[utoipa::path(
    get,
    path = "/api/images/{id}",
    params(("id" = Uuid, Path, description = "Image ID")),
    responses(
        (status = 200, description = "Found", body = ImageResponse),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_image(
    _principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ImageResponse>, ApiError> {
    Ok(Json(state.images.get(id).await?))
}

/// update_image
///
/// [Authenticated Route] Owner-only partial update. All parts optional: a new
/// `image` part replaces the stored file under the ordered-write protocol,
/// `title`/`description` update in place.
#[utoipa::path(
    patch,
    path = "/api/images/{id}",
    params(("id" = Uuid, Path, description = "Image ID")),
    request_body(content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Updated", body = ImageResponse),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn update_image(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ImageResponse>, ApiError> {
    let form = read_image_form(multipart).await?;

    let update = ImageUpdate {
        file: form
            .file
            .map(|(data, original_filename, content_type)| NewFile {
                data,
                original_filename,
                content_type,
            }),
        title: form.title,
        description: form.description,
    };

    let response = state.images.update(&principal, id, update).await?;
    Ok(Json(response))
}

/// delete_image
///
/// [Authenticated Route] Owner-only removal of the record and its backing file.
#[utoipa::path(
    delete,
    path = "/api/images/{id}",
    params(("id" = Uuid, Path, description = "Image ID")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Not Owner"),
        (status = 404, description = "Not Found")
    )
)]
pub async fn delete_image(
    principal: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.images.delete(&principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
