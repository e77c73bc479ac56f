use chrono::Utc;
use uuid::Uuid;

use crate::{
    auth::{AuthUser, is_owner},
    error::ApiError,
    models::{Image, ImageResponse},
    repository::RepositoryState,
    storage::FileStorageState,
};

/// Content types accepted for upload. Anything else is rejected before the
/// storage engine or the repository is touched.
pub const ALLOWED_CONTENT_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/gif"];

/// ImageUpload
///
/// The validated-input shape for a new upload: raw bytes plus the client's
/// declared metadata, assembled by the multipart handler.
pub struct ImageUpload {
    pub data: Vec<u8>,
    pub original_filename: String,
    pub content_type: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// NewFile
///
/// A replacement file supplied on update.
pub struct NewFile {
    pub data: Vec<u8>,
    pub original_filename: String,
    pub content_type: String,
}

/// ImageUpdate
///
/// Partial update payload: every part optional, absent parts untouched.
#[derive(Default)]
pub struct ImageUpdate {
    pub file: Option<NewFile>,
    pub title: Option<String>,
    pub description: Option<String>,
}

/// ImageService
///
/// Orchestrates upload/read/update/delete of user-owned images over the
/// Repository and File Storage trait objects. Every mutating operation takes
/// the acting principal explicitly — there is no ambient "current user"
/// lookup anywhere in this module — and runs the ownership check before any
/// write.
///
/// Write ordering rules (no cross-store transaction exists, these substitute):
/// - upload: store file, then persist record. A crash in between leaks an
///   orphaned file, never a record pointing at nothing.
/// - update with replacement file: store new file, persist record pointing at
///   the new name, only then delete the old file.
/// - delete: remove the record, then the backing file (consistent
///   persist-then-delete ordering; worst case is a transient orphaned file).
#[derive(Clone)]
pub struct ImageService {
    repo: RepositoryState,
    storage: FileStorageState,
    base_url: String,
}

impl ImageService {
    pub fn new(repo: RepositoryState, storage: FileStorageState, base_url: impl Into<String>) -> Self {
        Self {
            repo,
            storage,
            base_url: base_url.into(),
        }
    }

    /// upload
    ///
    /// Validates, stores the bytes, and persists the owned record. Dimension
    /// extraction is best-effort: a file that declares an image content type
    /// but fails to decode is still accepted, without dimensions.
    pub async fn upload(
        &self,
        principal: &AuthUser,
        upload: ImageUpload,
    ) -> Result<ImageResponse, ApiError> {
        validate_upload(&upload.data, &upload.content_type)?;

        let filename = self
            .storage
            .store(&upload.data, &upload.original_filename)
            .await?;

        let (width, height) = extract_dimensions(&upload.data);

        let now = Utc::now();
        let image = Image {
            id: Uuid::new_v4(),
            user_id: principal.id,
            filename,
            original_filename: upload.original_filename,
            content_type: upload.content_type,
            file_size: upload.data.len() as i64,
            width,
            height,
            title: upload.title,
            description: upload.description,
            created_at: now,
            updated_at: now,
        };

        // Persist only after the file store succeeded.
        let saved = self.repo.save_image(&image).await?;
        Ok(ImageResponse::from_image(saved, &self.base_url))
    }

    /// get
    ///
    /// Plain read by id. No ownership check: reads are visible across owners
    /// (a deliberate asymmetry with the mutating operations).
    pub async fn get(&self, id: Uuid) -> Result<ImageResponse, ApiError> {
        let image = self
            .repo
            .find_image(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("image not found with id: {id}")))?;
        Ok(ImageResponse::from_image(image, &self.base_url))
    }

    /// list
    ///
    /// All images, newest first. Visible across owners like `get`.
    pub async fn list(&self) -> Result<Vec<ImageResponse>, ApiError> {
        let images = self.repo.list_images().await?;
        Ok(images
            .into_iter()
            .map(|image| ImageResponse::from_image(image, &self.base_url))
            .collect())
    }

    /// update
    ///
    /// Owner-only partial update. When a replacement file is supplied it is
    /// validated like an upload and stored first; the record is persisted
    /// pointing at the new name, and only after that write succeeds is the
    /// old file deleted. The record therefore never references a file that
    /// has already been removed.
    pub async fn update(
        &self,
        principal: &AuthUser,
        id: Uuid,
        update: ImageUpdate,
    ) -> Result<ImageResponse, ApiError> {
        let mut image = self
            .repo
            .find_image(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("image not found with id: {id}")))?;

        if !is_owner(principal, image.user_id) {
            return Err(ApiError::Forbidden(
                "you can only update your own images".to_string(),
            ));
        }

        let mut old_filename: Option<String> = None;

        if let Some(file) = update.file {
            validate_upload(&file.data, &file.content_type)?;

            let new_filename = self.storage.store(&file.data, &file.original_filename).await?;
            old_filename = Some(std::mem::replace(&mut image.filename, new_filename));

            let (width, height) = extract_dimensions(&file.data);
            image.original_filename = file.original_filename;
            image.content_type = file.content_type;
            image.file_size = file.data.len() as i64;
            image.width = width;
            image.height = height;
        }
        if let Some(title) = update.title {
            image.title = Some(title);
        }
        if let Some(description) = update.description {
            image.description = Some(description);
        }
        image.updated_at = Utc::now();

        let saved = self.repo.save_image(&image).await?;

        // Only now is the old file unreferenced and safe to remove.
        if let Some(old) = old_filename {
            if !self.storage.delete(&old).await {
                tracing::warn!(filename = %old, "replaced file could not be deleted");
            }
        }

        Ok(ImageResponse::from_image(saved, &self.base_url))
    }

    /// delete
    ///
    /// Owner-only removal: record first, backing file second.
    pub async fn delete(&self, principal: &AuthUser, id: Uuid) -> Result<(), ApiError> {
        let image = self
            .repo
            .find_image(id)
            .await?
            .ok_or_else(|| ApiError::NotFound(format!("image not found with id: {id}")))?;

        if !is_owner(principal, image.user_id) {
            return Err(ApiError::Forbidden(
                "you can only delete your own images".to_string(),
            ));
        }

        if !self.repo.delete_image(id).await? {
            // Raced with a concurrent delete; the record is gone either way.
            return Err(ApiError::NotFound(format!("image not found with id: {id}")));
        }

        if !self.storage.delete(&image.filename).await {
            tracing::warn!(filename = %image.filename, "backing file could not be deleted");
        }

        Ok(())
    }
}

/// validate_upload
///
/// The fixed whitelist gate: non-empty bytes and a declared content type in
/// {jpeg, png, gif}. Runs before any storage or repository call.
fn validate_upload(data: &[u8], content_type: &str) -> Result<(), ApiError> {
    if data.is_empty() {
        return Err(ApiError::InvalidInput("file is empty".to_string()));
    }
    if !ALLOWED_CONTENT_TYPES.contains(&content_type) {
        return Err(ApiError::InvalidInput(
            "invalid file type, allowed types: JPEG, PNG, GIF".to_string(),
        ));
    }
    Ok(())
}

/// extract_dimensions
///
/// Best-effort intrinsic dimension probe. Decode failures are swallowed by
/// contract: the image record is created without dimensions rather than the
/// upload failing.
fn extract_dimensions(data: &[u8]) -> (Option<i32>, Option<i32>) {
    match image::load_from_memory(data) {
        Ok(decoded) => (Some(decoded.width() as i32), Some(decoded.height() as i32)),
        Err(e) => {
            tracing::debug!(error = %e, "dimension extraction failed, storing without dimensions");
            (None, None)
        }
    }
}
