use std::fmt;

use crate::storage::location::Location;
use crate::storage::path::{child, last_component, parent};
use crate::storage::service::StorageService;

/// Pointer to an object or folder: a storage instance plus a [`Location`].
///
/// References are cheap to clone and never change once created; navigation helpers return new
/// references.
#[derive(Clone)]
pub struct StorageReference {
    storage: StorageService,
    location: Location,
}

impl StorageReference {
    pub(crate) fn new(storage: StorageService, location: Location) -> Self {
        Self { storage, location }
    }

    pub fn storage(&self) -> &StorageService {
        &self.storage
    }

    pub fn location(&self) -> &Location {
        &self.location
    }

    pub fn bucket(&self) -> &str {
        self.location.bucket()
    }

    pub fn full_path(&self) -> &str {
        self.location.path()
    }

    pub fn name(&self) -> &str {
        last_component(self.location.path())
    }

    pub fn is_root(&self) -> bool {
        self.location.is_root()
    }

    pub fn to_gs_url(&self) -> String {
        format!("gs://{}/{}", self.location.bucket(), self.location.path())
    }

    pub fn root(&self) -> StorageReference {
        self.with_path("")
    }

    /// `None` for the bucket root.
    pub fn parent(&self) -> Option<StorageReference> {
        parent(self.location.path()).map(|path| self.with_path(&path))
    }

    pub fn child(&self, segment: &str) -> StorageReference {
        self.with_path(&child(self.location.path(), segment))
    }

    fn with_path(&self, path: &str) -> StorageReference {
        StorageReference::new(self.storage.clone(), Location::new(self.location.bucket(), path))
    }
}

impl PartialEq for StorageReference {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location && self.storage.same_service(&other.storage)
    }
}

impl fmt::Display for StorageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_gs_url())
    }
}

impl fmt::Debug for StorageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageReference")
            .field("app", &self.storage.app().name())
            .field("bucket", &self.location.bucket())
            .field("path", &self.location.path())
            .finish()
    }
}
