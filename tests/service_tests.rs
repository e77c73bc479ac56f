mod common;

use common::{MockRepository, png_bytes, test_image, test_user};
use image_vault::{
    ImageService, MockFileStorage,
    auth::AuthUser,
    error::ApiError,
    service::{ImageUpdate, ImageUpload, NewFile},
    storage::FileStorage,
};
use std::sync::Arc;
use uuid::Uuid;

// --- Test Utilities ---

const BASE_URL: &str = "http://localhost:3000/uploads";

fn principal(id: Uuid) -> AuthUser {
    AuthUser {
        id,
        username: "alice".to_string(),
    }
}

fn service(repo: Arc<MockRepository>, storage: Arc<MockFileStorage>) -> ImageService {
    ImageService::new(repo, storage, BASE_URL)
}

fn upload_payload(data: Vec<u8>, content_type: &str) -> ImageUpload {
    ImageUpload {
        data,
        original_filename: "holiday.png".to_string(),
        content_type: content_type.to_string(),
        title: Some("Holiday".to_string()),
        description: None,
    }
}

// --- Upload ---

#[tokio::test]
async fn test_upload_persists_record_and_file() {
    let repo = Arc::new(MockRepository::new());
    let storage = Arc::new(MockFileStorage::new());
    let svc = service(repo.clone(), storage.clone());
    let user_id = Uuid::new_v4();

    let response = svc
        .upload(&principal(user_id), upload_payload(png_bytes(2, 3), "image/png"))
        .await
        .unwrap();

    assert_eq!(response.user_id, user_id);
    assert_eq!(response.title, Some("Holiday".to_string()));
    assert_eq!(response.width, Some(2));
    assert_eq!(response.height, Some(3));
    assert_eq!(response.url, format!("{BASE_URL}/{}", response.filename));

    assert_eq!(repo.image_count(), 1);
    assert!(storage.contains(&response.filename));
}

#[tokio::test]
async fn test_upload_rejects_disallowed_content_type() {
    let repo = Arc::new(MockRepository::new());
    let storage = Arc::new(MockFileStorage::new());
    let svc = service(repo.clone(), storage.clone());

    let result = svc
        .upload(&principal(Uuid::new_v4()), upload_payload(b"hello".to_vec(), "text/plain"))
        .await;

    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    // Validation runs before any write: neither store touched.
    assert_eq!(storage.store_calls(), 0);
    assert_eq!(repo.image_count(), 0);
}

#[tokio::test]
async fn test_upload_rejects_empty_file() {
    let repo = Arc::new(MockRepository::new());
    let storage = Arc::new(MockFileStorage::new());
    let svc = service(repo.clone(), storage.clone());

    let result = svc
        .upload(&principal(Uuid::new_v4()), upload_payload(vec![], "image/png"))
        .await;

    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    assert_eq!(storage.store_calls(), 0);
}

#[tokio::test]
async fn test_upload_swallows_dimension_failure() {
    // Declared image type, undecodable bytes: accepted, no dimensions.
    let repo = Arc::new(MockRepository::new());
    let storage = Arc::new(MockFileStorage::new());
    let svc = service(repo.clone(), storage.clone());

    let response = svc
        .upload(
            &principal(Uuid::new_v4()),
            upload_payload(b"not a real png".to_vec(), "image/png"),
        )
        .await
        .unwrap();

    assert_eq!(response.width, None);
    assert_eq!(response.height, None);
    assert_eq!(repo.image_count(), 1);
}

#[tokio::test]
async fn test_upload_storage_failure_leaves_no_record() {
    let repo = Arc::new(MockRepository::new());
    let storage = Arc::new(MockFileStorage::new_failing());
    let svc = service(repo.clone(), storage.clone());

    let result = svc
        .upload(&principal(Uuid::new_v4()), upload_payload(png_bytes(1, 1), "image/png"))
        .await;

    assert!(matches!(result, Err(ApiError::Storage(_))));
    // Store-then-persist ordering: the record is never written.
    assert_eq!(repo.image_count(), 0);
}

// --- Read ---

#[tokio::test]
async fn test_get_missing_image_is_not_found() {
    let svc = service(
        Arc::new(MockRepository::new()),
        Arc::new(MockFileStorage::new()),
    );

    let result = svc.get(Uuid::new_v4()).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_reads_are_visible_across_owners() {
    let owner = Uuid::new_v4();
    let image_id = Uuid::new_v4();
    let repo = Arc::new(
        MockRepository::new().with_image(test_image(image_id, owner, "stored.jpg")),
    );
    let svc = service(repo, Arc::new(MockFileStorage::new()));

    // No principal is needed for reads at the service layer.
    let response = svc.get(image_id).await.unwrap();
    assert_eq!(response.user_id, owner);

    let all = svc.list().await.unwrap();
    assert_eq!(all.len(), 1);
}

// --- Update ---

#[tokio::test]
async fn test_update_by_non_owner_is_forbidden() {
    let owner = Uuid::new_v4();
    let image_id = Uuid::new_v4();
    let repo = Arc::new(
        MockRepository::new().with_image(test_image(image_id, owner, "stored.jpg")),
    );
    let storage = Arc::new(MockFileStorage::new());
    let svc = service(repo.clone(), storage.clone());

    let update = ImageUpdate {
        title: Some("hijacked".to_string()),
        ..Default::default()
    };
    let result = svc.update(&principal(Uuid::new_v4()), image_id, update).await;

    assert!(matches!(result, Err(ApiError::Forbidden(_))));
    // Record untouched, storage never consulted.
    assert_eq!(repo.image(image_id).unwrap().title, Some("a title".to_string()));
    assert_eq!(storage.store_calls(), 0);
}

#[tokio::test]
async fn test_update_metadata_only_keeps_file() {
    let owner = Uuid::new_v4();
    let image_id = Uuid::new_v4();
    let repo = Arc::new(
        MockRepository::new().with_image(test_image(image_id, owner, "stored.jpg")),
    );
    let storage = Arc::new(MockFileStorage::new());
    let svc = service(repo.clone(), storage.clone());

    let update = ImageUpdate {
        title: Some("new title".to_string()),
        description: Some("new description".to_string()),
        ..Default::default()
    };
    let response = svc.update(&principal(owner), image_id, update).await.unwrap();

    assert_eq!(response.title, Some("new title".to_string()));
    assert_eq!(response.description, Some("new description".to_string()));
    assert_eq!(response.filename, "stored.jpg");
    assert_eq!(storage.store_calls(), 0);
    assert!(storage.deleted().is_empty());
}

#[tokio::test]
async fn test_update_with_replacement_file_swaps_and_cleans_up() {
    let owner = Uuid::new_v4();
    let image_id = Uuid::new_v4();
    let repo = Arc::new(MockRepository::new());
    let storage = Arc::new(MockFileStorage::new());

    // Seed through the mock so the old file actually exists in storage.
    let old_name = storage.store(b"old", "old.jpg").await.unwrap();
    let mut seeded = test_image(image_id, owner, &old_name);
    seeded.width = Some(10);
    repo.images.lock().unwrap().insert(image_id, seeded);

    let svc = service(repo.clone(), storage.clone());
    let update = ImageUpdate {
        file: Some(NewFile {
            data: png_bytes(4, 5),
            original_filename: "replacement.png".to_string(),
            content_type: "image/png".to_string(),
        }),
        ..Default::default()
    };
    let response = svc.update(&principal(owner), image_id, update).await.unwrap();

    // Record points at the new file, dimensions re-extracted.
    assert_ne!(response.filename, old_name);
    assert_eq!(response.width, Some(4));
    assert_eq!(response.height, Some(5));
    assert_eq!(response.content_type, "image/png");

    // New file present, old one removed after the record was persisted.
    assert!(storage.contains(&response.filename));
    assert!(!storage.contains(&old_name));
    assert_eq!(storage.deleted(), vec![old_name]);
    assert_eq!(repo.image(image_id).unwrap().filename, response.filename);
}

#[tokio::test]
async fn test_update_validates_replacement_file() {
    let owner = Uuid::new_v4();
    let image_id = Uuid::new_v4();
    let repo = Arc::new(
        MockRepository::new().with_image(test_image(image_id, owner, "stored.jpg")),
    );
    let storage = Arc::new(MockFileStorage::new());
    let svc = service(repo.clone(), storage.clone());

    let update = ImageUpdate {
        file: Some(NewFile {
            data: b"%PDF-1.7".to_vec(),
            original_filename: "doc.pdf".to_string(),
            content_type: "application/pdf".to_string(),
        }),
        ..Default::default()
    };
    let result = svc.update(&principal(owner), image_id, update).await;

    assert!(matches!(result, Err(ApiError::InvalidInput(_))));
    assert_eq!(storage.store_calls(), 0);
    assert_eq!(repo.image(image_id).unwrap().filename, "stored.jpg");
}

#[tokio::test]
async fn test_update_missing_image_is_not_found() {
    let svc = service(
        Arc::new(MockRepository::new()),
        Arc::new(MockFileStorage::new()),
    );

    let result = svc
        .update(&principal(Uuid::new_v4()), Uuid::new_v4(), ImageUpdate::default())
        .await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

// --- Delete ---

#[tokio::test]
async fn test_delete_removes_record_and_file() {
    let owner = Uuid::new_v4();
    let image_id = Uuid::new_v4();
    let repo = Arc::new(MockRepository::new());
    let storage = Arc::new(MockFileStorage::new());

    let name = storage.store(b"data", "a.jpg").await.unwrap();
    repo.images
        .lock()
        .unwrap()
        .insert(image_id, test_image(image_id, owner, &name));

    let svc = service(repo.clone(), storage.clone());
    svc.delete(&principal(owner), image_id).await.unwrap();

    assert_eq!(repo.image_count(), 0);
    assert!(!storage.contains(&name));
    assert_eq!(storage.deleted(), vec![name]);
}

#[tokio::test]
async fn test_delete_by_non_owner_is_forbidden() {
    let owner = Uuid::new_v4();
    let image_id = Uuid::new_v4();
    let repo = Arc::new(MockRepository::new());
    let storage = Arc::new(MockFileStorage::new());

    let name = storage.store(b"data", "a.jpg").await.unwrap();
    repo.images
        .lock()
        .unwrap()
        .insert(image_id, test_image(image_id, owner, &name));

    let svc = service(repo.clone(), storage.clone());
    let result = svc.delete(&principal(Uuid::new_v4()), image_id).await;

    assert!(matches!(result, Err(ApiError::Forbidden(_))));
    // Nothing removed anywhere.
    assert_eq!(repo.image_count(), 1);
    assert!(storage.contains(&name));
}

#[tokio::test]
async fn test_delete_missing_image_is_not_found() {
    let svc = service(
        Arc::new(MockRepository::new()),
        Arc::new(MockFileStorage::new()),
    );

    let result = svc.delete(&principal(Uuid::new_v4()), Uuid::new_v4()).await;
    assert!(matches!(result, Err(ApiError::NotFound(_))));
}

#[tokio::test]
async fn test_delete_survives_storage_refusal() {
    // The record is authoritative: a file the storage engine refuses to
    // delete (here: never existed) does not fail the operation.
    let owner = Uuid::new_v4();
    let image_id = Uuid::new_v4();
    let repo = Arc::new(
        MockRepository::new().with_image(test_image(image_id, owner, "ghost.jpg")),
    );
    let storage = Arc::new(MockFileStorage::new());
    let svc = service(repo.clone(), storage.clone());

    svc.delete(&principal(owner), image_id).await.unwrap();
    assert_eq!(repo.image_count(), 0);
}
