#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use image_vault::{
    error::ApiError,
    models::{Image, User},
    repository::Repository,
};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// In-memory Repository double backing the handler/service/extractor tests.
/// Single-record atomicity falls out of the mutex; everything else mirrors the
/// Postgres implementation's contracts.
#[derive(Default)]
pub struct MockRepository {
    pub users: Mutex<Vec<User>>,
    pub images: Mutex<HashMap<Uuid, Image>>,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user: User) -> Self {
        self.users.lock().unwrap().push(user);
        self
    }

    pub fn with_image(self, image: Image) -> Self {
        self.images.lock().unwrap().insert(image.id, image);
        self
    }

    pub fn image(&self, id: Uuid) -> Option<Image> {
        self.images.lock().unwrap().get(&id).cloned()
    }

    pub fn image_count(&self) -> usize {
        self.images.lock().unwrap().len()
    }
}

#[async_trait]
impl Repository for MockRepository {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>, ApiError> {
        Ok(self.users.lock().unwrap().iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, ApiError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn username_exists(&self, username: &str) -> Result<bool, ApiError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .any(|u| u.username == username))
    }

    async fn email_exists(&self, email: &str) -> Result<bool, ApiError> {
        Ok(self.users.lock().unwrap().iter().any(|u| u.email == email))
    }

    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        Ok(self.users.lock().unwrap().clone())
    }

    async fn save_user(&self, user: &User) -> Result<User, ApiError> {
        let mut users = self.users.lock().unwrap();
        if let Some(existing) = users.iter_mut().find(|u| u.id == user.id) {
            *existing = user.clone();
        } else {
            users.push(user.clone());
        }
        Ok(user.clone())
    }

    async fn delete_user(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut users = self.users.lock().unwrap();
        let before = users.len();
        users.retain(|u| u.id != id);
        Ok(users.len() < before)
    }

    async fn find_image(&self, id: Uuid) -> Result<Option<Image>, ApiError> {
        Ok(self.images.lock().unwrap().get(&id).cloned())
    }

    async fn list_images(&self) -> Result<Vec<Image>, ApiError> {
        Ok(self.images.lock().unwrap().values().cloned().collect())
    }

    async fn save_image(&self, image: &Image) -> Result<Image, ApiError> {
        self.images
            .lock()
            .unwrap()
            .insert(image.id, image.clone());
        Ok(image.clone())
    }

    async fn delete_image(&self, id: Uuid) -> Result<bool, ApiError> {
        Ok(self.images.lock().unwrap().remove(&id).is_some())
    }
}

/// Builds a User record with a real argon2 digest so login flows verify.
pub fn test_user(id: Uuid, username: &str, password: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{username}@example.com"),
        password_hash: image_vault::auth::hash_password(password).unwrap(),
        created_at: Utc::now(),
        last_login: None,
    }
}

/// Builds an Image record owned by `user_id`, backed by `filename`.
pub fn test_image(id: Uuid, user_id: Uuid, filename: &str) -> Image {
    let now = Utc::now();
    Image {
        id,
        user_id,
        filename: filename.to_string(),
        original_filename: "original.jpg".to_string(),
        content_type: "image/jpeg".to_string(),
        file_size: 42,
        width: None,
        height: None,
        title: Some("a title".to_string()),
        description: None,
        created_at: now,
        updated_at: now,
    }
}

/// A tiny valid PNG (encoded on the fly) for dimension-extraction tests.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbaImage::new(width, height);
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png)
        .expect("png encoding");
    buf.into_inner()
}
