use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::ApiError;

// 1. FileStorage Contract
/// FileStorage
///
/// Defines the abstract contract for all interactions with the file storage
/// layer. This trait allows us to swap the concrete implementation — from the
/// real local-disk backend (LocalFileStorage) in production to the in-memory
/// Mock (MockFileStorage) during testing — without affecting the image
/// service. An object-storage backend could implement the same capability set
/// without any caller changes.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Persists `data` under a freshly generated, collision-resistant name and
    /// returns that name. The name is not a path or URL; URL construction is a
    /// caller concern. Any underlying I/O fault propagates as
    /// `ApiError::Storage`.
    async fn store(&self, data: &[u8], original_name: &str) -> Result<String, ApiError>;

    /// Deletes the file stored under `name`. Returns `false` (without touching
    /// the filesystem) if the name resolves outside the storage root, if the
    /// file does not exist, or on any I/O fault. Defined to never error.
    async fn delete(&self, name: &str) -> bool;

    /// Lists the names of all files directly under the storage root
    /// (non-recursive). I/O faults are logged and yield an empty list.
    async fn list(&self) -> Vec<String>;
}

/// FileStorageState
///
/// The concrete type used to share the storage service across the application state.
pub type FileStorageState = Arc<dyn FileStorage>;

// 2. The Real Implementation (Local Disk)
/// LocalFileStorage
///
/// Stores uploaded bytes on the local filesystem, confined to a single storage
/// root. Names are `{uuid-v4}.{ext}` with the extension derived from the
/// original filename hint, so two stores never collide and stored names never
/// contain path separators.
pub struct LocalFileStorage {
    root: PathBuf,
}

impl LocalFileStorage {
    /// new
    ///
    /// Resolves the storage root and creates it (including parents) if absent.
    /// Fails with `ApiError::Storage` if the directory cannot be created,
    /// which the startup path treats as fatal.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .map_err(|e| ApiError::Storage(format!("could not create storage root: {e}")))?;
        Ok(Self { root })
    }

    /// generate_name
    ///
    /// Derives a lowercase extension from the original filename hint (absent
    /// extensions are tolerated) and prefixes it with a random UUID base name.
    fn generate_name(original_name: &str) -> String {
        let base = Uuid::new_v4();
        match Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
        {
            Some(ext) if !ext.is_empty() => format!("{}.{}", base, ext.to_lowercase()),
            _ => base.to_string(),
        }
    }

    /// resolve_within_root
    ///
    /// Joins `name` onto the root, lexically normalizes the result (resolving
    /// `.` and `..` components without touching the filesystem), and verifies
    /// the normalized path is still prefixed by the root. Returns None for any
    /// path that escapes — the fail-closed defense against traversal
    /// sequences such as `../../etc/passwd`.
    fn resolve_within_root(&self, name: &str) -> Option<PathBuf> {
        let candidate = self.root.join(name);

        let mut normalized = PathBuf::new();
        for component in candidate.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    // Popping above the filesystem root would silently drop
                    // the component; treat any failed pop as an escape.
                    if !normalized.pop() {
                        return None;
                    }
                }
                other => normalized.push(other),
            }
        }

        if normalized.starts_with(&self.root) {
            Some(normalized)
        } else {
            None
        }
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    /// store
    ///
    /// Writes the bytes under `root/generated_name`. Overwriting is not
    /// expected (names are random UUIDs) but tolerated by `File::create`.
    async fn store(&self, data: &[u8], original_name: &str) -> Result<String, ApiError> {
        let name = Self::generate_name(original_name);
        let target = self.root.join(&name);

        let mut file = fs::File::create(&target)
            .await
            .map_err(|e| ApiError::Storage(format!("failed to create {name}: {e}")))?;
        file.write_all(data)
            .await
            .map_err(|e| ApiError::Storage(format!("failed to write {name}: {e}")))?;
        file.flush()
            .await
            .map_err(|e| ApiError::Storage(format!("failed to flush {name}: {e}")))?;

        tracing::debug!(name = %name, size = data.len(), "file stored");
        Ok(name)
    }

    async fn delete(&self, name: &str) -> bool {
        // Fail closed: anything resolving outside the root is rejected before
        // any filesystem access.
        let Some(path) = self.resolve_within_root(name) else {
            tracing::warn!(name = %name, "rejected delete outside storage root");
            return false;
        };

        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(name = %name, "file deleted");
                true
            }
            // Missing files and I/O faults both report false per the contract.
            Err(e) => {
                tracing::debug!(name = %name, error = %e, "delete did not remove a file");
                false
            }
        }
    }

    async fn list(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::error!(error = %e, "failed to read storage root");
                return names;
            }
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names
    }
}

// 3. The Mock Implementation (For Unit Tests)
/// MockFileStorage
///
/// An in-memory implementation of `FileStorage` used exclusively for unit and
/// integration testing. It records every stored name and deleted name so tests
/// can assert on call ordering and on the engine never being touched for
/// rejected uploads.
#[derive(Default)]
pub struct MockFileStorage {
    /// When true, `store` returns a simulated failure.
    pub should_fail: bool,
    state: Mutex<MockState>,
}

#[derive(Default)]
struct MockState {
    files: Vec<String>,
    deleted: Vec<String>,
    store_calls: usize,
}

impl MockFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            should_fail: true,
            ..Self::default()
        }
    }

    /// Number of times `store` was invoked (including failures).
    pub fn store_calls(&self) -> usize {
        self.state.lock().unwrap().store_calls
    }

    /// Names passed to `delete` that were actually removed.
    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().unwrap().deleted.clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.state.lock().unwrap().files.iter().any(|f| f == name)
    }
}

#[async_trait]
impl FileStorage for MockFileStorage {
    async fn store(&self, _data: &[u8], original_name: &str) -> Result<String, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.store_calls += 1;

        if self.should_fail {
            return Err(ApiError::Storage("mock storage failure".to_string()));
        }

        let name = LocalFileStorage::generate_name(original_name);
        state.files.push(name.clone());
        Ok(name)
    }

    async fn delete(&self, name: &str) -> bool {
        // Mirror the real backend's traversal defense so ordering tests see
        // the same contract.
        if name.contains("..") || name.contains('/') {
            return false;
        }
        let mut state = self.state.lock().unwrap();
        let before = state.files.len();
        state.files.retain(|f| f != name);
        if state.files.len() < before {
            state.deleted.push(name.to_string());
            true
        } else {
            false
        }
    }

    async fn list(&self) -> Vec<String> {
        self.state.lock().unwrap().files.clone()
    }
}
