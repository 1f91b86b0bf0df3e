use crate::storage::reference::StorageReference;
use crate::storage::service::StorageService;

/// The polymorphic first argument accepted by the modular storage functions.
///
/// Functions that need a reference reject `Service`, functions that need a service reject
/// `Reference`, and every function rejects `Absent` with a `storage/invalid-argument` error naming
/// the parameter.
#[derive(Clone, Copy, Debug)]
pub enum StorageHandle<'a> {
    Service(&'a StorageService),
    Reference(&'a StorageReference),
    Absent,
}

impl<'a> StorageHandle<'a> {
    pub fn service(&self) -> Option<&'a StorageService> {
        match *self {
            StorageHandle::Service(service) => Some(service),
            StorageHandle::Reference(reference) => Some(reference.storage()),
            StorageHandle::Absent => None,
        }
    }

    /// Name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageHandle::Service(_) => "StorageService",
            StorageHandle::Reference(_) => "StorageReference",
            StorageHandle::Absent => "nothing",
        }
    }
}

impl<'a> From<&'a StorageService> for StorageHandle<'a> {
    fn from(service: &'a StorageService) -> Self {
        StorageHandle::Service(service)
    }
}

impl<'a> From<&'a StorageReference> for StorageHandle<'a> {
    fn from(reference: &'a StorageReference) -> Self {
        StorageHandle::Reference(reference)
    }
}

impl<'a> From<Option<&'a StorageService>> for StorageHandle<'a> {
    fn from(service: Option<&'a StorageService>) -> Self {
        service.map_or(StorageHandle::Absent, StorageHandle::Service)
    }
}

impl<'a> From<Option<&'a StorageReference>> for StorageHandle<'a> {
    fn from(reference: Option<&'a StorageReference>) -> Self {
        reference.map_or(StorageHandle::Absent, StorageHandle::Reference)
    }
}
