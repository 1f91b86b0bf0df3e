use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;

use crate::storage::error::{unsupported_environment, StorageResult};
use crate::storage::list::{ListOptions, ListResult};
use crate::storage::metadata::{ObjectMetadata, SettableMetadata, UploadMetadata};
use crate::storage::reference::StorageReference;
use crate::storage::string::{prepare_string_upload, StringFormat};
use crate::storage::upload::{ProgressReporter, UploadResult};

/// Pending backend call returned by the modular functions once their arguments have been
/// validated.
pub type StorageFuture<T> = BoxFuture<'static, StorageResult<T>>;

/// The storage implementation every modular function forwards to.
///
/// Arguments reaching a backend have already passed validation: references are real references,
/// list options are in range and upload payloads are present. Errors returned here are surfaced to
/// callers untouched.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn list(&self, reference: &StorageReference, options: &ListOptions) -> StorageResult<ListResult>;

    /// Lists everything below `reference` by following page tokens until the backend stops
    /// returning one.
    async fn list_all(&self, reference: &StorageReference) -> StorageResult<ListResult> {
        let mut accumulated = ListResult::default();
        let mut page_token: Option<String> = None;
        loop {
            let options = ListOptions {
                max_results: None,
                page_token: page_token.take(),
            };
            let page = self.list(reference, &options).await?;
            accumulated.merge(page);
            match accumulated.next_page_token.clone() {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }
        Ok(accumulated)
    }

    async fn delete_object(&self, reference: &StorageReference) -> StorageResult<()>;

    async fn get_download_url(&self, reference: &StorageReference) -> StorageResult<String>;

    async fn get_metadata(&self, reference: &StorageReference) -> StorageResult<ObjectMetadata>;

    async fn update_metadata(
        &self,
        reference: &StorageReference,
        metadata: &SettableMetadata,
    ) -> StorageResult<ObjectMetadata>;

    async fn upload_bytes(
        &self,
        reference: &StorageReference,
        data: Bytes,
        metadata: Option<UploadMetadata>,
    ) -> StorageResult<UploadResult>;

    /// Uploads `data` while publishing progress through `progress`. Backends without chunked
    /// transfers fall back to a single [`StorageBackend::upload_bytes`] call.
    async fn upload_bytes_resumable(
        &self,
        reference: &StorageReference,
        data: Bytes,
        metadata: Option<UploadMetadata>,
        progress: &ProgressReporter,
    ) -> StorageResult<UploadResult> {
        let total = data.len() as u64;
        let result = self.upload_bytes(reference, data, metadata).await?;
        progress.report(total);
        Ok(result)
    }

    async fn upload_string(
        &self,
        reference: &StorageReference,
        value: String,
        format: StringFormat,
        metadata: Option<UploadMetadata>,
    ) -> StorageResult<UploadResult> {
        let prepared = prepare_string_upload(&value, format)?;
        let metadata = merge_metadata(metadata, prepared.content_type);
        self.upload_bytes(reference, Bytes::from(prepared.bytes), metadata)
            .await
    }

    async fn put_file(
        &self,
        reference: &StorageReference,
        file_path: PathBuf,
        metadata: Option<UploadMetadata>,
    ) -> StorageResult<UploadResult> {
        let _ = (reference, metadata);
        Err(unsupported_environment(format!(
            "This storage backend cannot read local files ({}).",
            file_path.display()
        )))
    }
}

/// Fills in a content type inferred from the payload unless the caller already set one.
pub(crate) fn merge_metadata(
    metadata: Option<UploadMetadata>,
    inferred_content_type: Option<String>,
) -> Option<UploadMetadata> {
    match (metadata, inferred_content_type) {
        (Some(mut metadata), Some(content_type)) => {
            metadata.content_type.get_or_insert(content_type);
            Some(metadata)
        }
        (Some(metadata), None) => Some(metadata),
        (None, Some(content_type)) => Some(UploadMetadata::new().with_content_type(content_type)),
        (None, None) => None,
    }
}
