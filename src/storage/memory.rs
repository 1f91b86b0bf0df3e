use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{SecondsFormat, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;

use crate::storage::backend::StorageBackend;
use crate::storage::constants::MAX_LIST_RESULTS;
use crate::storage::error::{
    internal_error, invalid_argument, invalid_root_operation, no_download_url, object_not_found, StorageResult,
};
use crate::storage::list::{ListOptions, ListResult};
use crate::storage::location::Location;
use crate::storage::logger::LOGGER;
use crate::storage::metadata::{ObjectMetadata, SettableMetadata, UploadMetadata};
use crate::storage::path::last_component;
use crate::storage::reference::StorageReference;
use crate::storage::upload::{ProgressReporter, UploadResult, RESUMABLE_UPLOAD_CHUNK_SIZE};

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const DOWNLOAD_TOKEN_LEN: usize = 32;

/// In-process [`StorageBackend`] keeping objects in memory.
///
/// Objects are keyed by bucket and path. Listings follow the delimiter model used by Cloud
/// Storage: direct children become items and deeper paths collapse into prefixes.
#[derive(Debug, Default)]
pub struct MemoryStorageBackend {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    objects: BTreeMap<(String, String), StoredObject>,
    next_generation: u64,
}

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    metadata: ObjectMetadata,
}

impl MemoryStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    /// Returns the stored bytes for `location`, if any.
    pub fn read_object(&self, location: &Location) -> Option<Bytes> {
        self.state()
            .objects
            .get(&object_key(location))
            .map(|object| object.data.clone())
    }

    pub fn object_count(&self) -> usize {
        self.state().objects.len()
    }

    fn store(
        &self,
        reference: &StorageReference,
        data: Bytes,
        metadata: Option<UploadMetadata>,
    ) -> StorageResult<UploadResult> {
        let location = reference.location();
        if location.is_root() {
            return Err(invalid_root_operation("put"));
        }
        let metadata = metadata.unwrap_or_default();
        let now = timestamp();

        let mut state = self.state();
        state.next_generation += 1;
        let object_metadata = ObjectMetadata {
            bucket: location.bucket().to_string(),
            name: last_component(location.path()).to_string(),
            full_path: location.path().to_string(),
            generation: state.next_generation.to_string(),
            metageneration: "1".to_string(),
            size: data.len() as u64,
            time_created: now.clone(),
            updated: now,
            md5_hash: metadata.md5_hash,
            content_type: Some(
                metadata
                    .content_type
                    .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
            ),
            cache_control: metadata.cache_control,
            content_disposition: metadata.content_disposition,
            content_language: metadata.content_language,
            content_encoding: metadata.content_encoding,
            custom_metadata: metadata.custom_metadata.filter(|custom| !custom.is_empty()),
            download_tokens: Some(download_token()),
        };
        state.objects.insert(
            object_key(location),
            StoredObject {
                data,
                metadata: object_metadata.clone(),
            },
        );
        drop(state);

        LOGGER.debug(format!("Stored {location} in memory"));
        Ok(UploadResult {
            metadata: object_metadata,
            reference: reference.clone(),
        })
    }

    fn existing_metadata(&self, location: &Location) -> StorageResult<ObjectMetadata> {
        self.state()
            .objects
            .get(&object_key(location))
            .map(|object| object.metadata.clone())
            .ok_or_else(|| object_not_found(location.path()))
    }
}

#[async_trait]
impl StorageBackend for MemoryStorageBackend {
    async fn list(&self, reference: &StorageReference, options: &ListOptions) -> StorageResult<ListResult> {
        let location = reference.location();
        let prefix = if location.is_root() {
            String::new()
        } else {
            format!("{}/", location.path())
        };

        // (name, is_item): prefixes sort before an item of the same name.
        let mut entries: BTreeSet<(String, bool)> = BTreeSet::new();
        {
            let state = self.state();
            for (bucket, path) in state.objects.keys() {
                if bucket != location.bucket() {
                    continue;
                }
                let Some(rest) = path.strip_prefix(prefix.as_str()) else {
                    continue;
                };
                match rest.split_once('/') {
                    Some((folder, _)) => entries.insert((format!("{prefix}{folder}"), false)),
                    None => entries.insert((path.clone(), true)),
                };
            }
        }

        let start = match options.page_token.as_deref() {
            Some(token) => Some(decode_page_token(token)?),
            None => None,
        };
        let page_size = options.max_results.unwrap_or(MAX_LIST_RESULTS) as usize;

        let mut remaining = entries
            .into_iter()
            .filter(|entry| start.as_ref().map_or(true, |start| entry > start))
            .peekable();

        let mut result = ListResult::default();
        let mut last: Option<(String, bool)> = None;
        for entry in remaining.by_ref().take(page_size) {
            let child = reference
                .storage()
                .make_reference(Location::new(location.bucket(), &entry.0));
            if entry.1 {
                result.items.push(child);
            } else {
                result.prefixes.push(child);
            }
            last = Some(entry);
        }
        if remaining.peek().is_some() {
            result.next_page_token = last.map(|entry| encode_page_token(&entry));
        }
        Ok(result)
    }

    async fn delete_object(&self, reference: &StorageReference) -> StorageResult<()> {
        let location = reference.location();
        if location.is_root() {
            return Err(invalid_root_operation("delete"));
        }
        self.state()
            .objects
            .remove(&object_key(location))
            .map(|_| ())
            .ok_or_else(|| object_not_found(location.path()))
    }

    async fn get_download_url(&self, reference: &StorageReference) -> StorageResult<String> {
        let location = reference.location();
        if location.is_root() {
            return Err(invalid_root_operation("getDownloadURL"));
        }
        let metadata = self.existing_metadata(location)?;
        let token = metadata
            .download_tokens
            .as_deref()
            .and_then(|tokens| tokens.split(',').next())
            .filter(|token| !token.is_empty())
            .ok_or_else(no_download_url)?;
        Ok(format!(
            "{}/v0{}?alt=media&token={}",
            reference.storage().origin(),
            location.full_server_url(),
            token
        ))
    }

    async fn get_metadata(&self, reference: &StorageReference) -> StorageResult<ObjectMetadata> {
        let location = reference.location();
        if location.is_root() {
            return Err(invalid_root_operation("getMetadata"));
        }
        self.existing_metadata(location)
    }

    async fn update_metadata(
        &self,
        reference: &StorageReference,
        metadata: &SettableMetadata,
    ) -> StorageResult<ObjectMetadata> {
        let location = reference.location();
        if location.is_root() {
            return Err(invalid_root_operation("updateMetadata"));
        }
        let mut state = self.state();
        let object = state
            .objects
            .get_mut(&object_key(location))
            .ok_or_else(|| object_not_found(location.path()))?;

        object.metadata.apply_update(metadata);
        let metageneration = object.metadata.metageneration.parse::<u64>().unwrap_or(0) + 1;
        object.metadata.metageneration = metageneration.to_string();
        object.metadata.updated = timestamp();
        Ok(object.metadata.clone())
    }

    async fn upload_bytes(
        &self,
        reference: &StorageReference,
        data: Bytes,
        metadata: Option<UploadMetadata>,
    ) -> StorageResult<UploadResult> {
        self.store(reference, data, metadata)
    }

    async fn upload_bytes_resumable(
        &self,
        reference: &StorageReference,
        data: Bytes,
        metadata: Option<UploadMetadata>,
        progress: &ProgressReporter,
    ) -> StorageResult<UploadResult> {
        if reference.is_root() {
            return Err(invalid_root_operation("put"));
        }
        let mut transferred = 0u64;
        for chunk in data.chunks(RESUMABLE_UPLOAD_CHUNK_SIZE) {
            transferred += chunk.len() as u64;
            progress.report(transferred);
        }
        self.store(reference, data, metadata)
    }

    async fn put_file(
        &self,
        reference: &StorageReference,
        file_path: PathBuf,
        metadata: Option<UploadMetadata>,
    ) -> StorageResult<UploadResult> {
        let data = std::fs::read(&file_path)
            .map_err(|err| internal_error(format!("Failed to read '{}': {err}", file_path.display())))?;
        self.store(reference, Bytes::from(data), metadata)
    }
}

fn object_key(location: &Location) -> (String, String) {
    (location.bucket().to_string(), location.path().to_string())
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn download_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(DOWNLOAD_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn encode_page_token(entry: &(String, bool)) -> String {
    let kind = if entry.1 { "i" } else { "p" };
    format!("{kind}:{}", entry.0)
}

fn decode_page_token(token: &str) -> StorageResult<(String, bool)> {
    match token.split_once(':') {
        Some(("i", name)) => Ok((name.to_string(), true)),
        Some(("p", name)) => Ok((name.to_string(), false)),
        _ => Err(invalid_argument(
            "options.pageToken",
            "Page token was not returned by this backend.",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
    use crate::storage::service::StorageService;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn build_root() -> (Arc<MemoryStorageBackend>, StorageReference) {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        let options = FirebaseOptions {
            storage_bucket: Some("memory-bucket".into()),
            ..Default::default()
        };
        let settings = FirebaseAppSettings {
            name: Some(format!("storage-memory-{}", COUNTER.fetch_add(1, Ordering::SeqCst))),
            ..Default::default()
        };
        let app = initialize_app(options, Some(settings)).unwrap();
        let backend = Arc::new(MemoryStorageBackend::new());
        let service = StorageService::new(app, None, backend.clone()).unwrap();
        (backend, service.root_reference().unwrap())
    }

    #[tokio::test]
    async fn upload_then_read_metadata() {
        let (backend, root) = build_root();
        let file = root.child("docs/readme.txt");
        let result = backend
            .upload_bytes(&file, Bytes::from_static(b"hello"), None)
            .await
            .unwrap();
        assert_eq!(result.reference, file);
        assert_eq!(result.metadata.size, 5);
        assert_eq!(result.metadata.name, "readme.txt");
        assert_eq!(result.metadata.content_type.as_deref(), Some(DEFAULT_CONTENT_TYPE));
        assert_eq!(backend.read_object(file.location()).unwrap(), Bytes::from_static(b"hello"));

        let metadata = backend.get_metadata(&file).await.unwrap();
        assert_eq!(metadata, result.metadata);
    }

    #[tokio::test]
    async fn list_splits_prefixes_and_items_with_paging() {
        let (backend, root) = build_root();
        for path in ["a.txt", "b.txt", "folder/one.txt", "folder/deep/two.txt", "z/three.txt"] {
            backend
                .upload_bytes(&root.child(path), Bytes::from_static(b"x"), None)
                .await
                .unwrap();
        }

        let all = backend.list(&root, &ListOptions::default()).await.unwrap();
        let items: Vec<_> = all.items.iter().map(|item| item.full_path().to_string()).collect();
        let prefixes: Vec<_> = all.prefixes.iter().map(|p| p.full_path().to_string()).collect();
        assert_eq!(items, ["a.txt", "b.txt"]);
        assert_eq!(prefixes, ["folder", "z"]);
        assert!(all.next_page_token.is_none());

        let first = backend
            .list(&root, &ListOptions::new().with_max_results(3))
            .await
            .unwrap();
        assert_eq!(first.items.len() + first.prefixes.len(), 3);
        let token = first.next_page_token.clone().unwrap();
        let second = backend
            .list(&root, &ListOptions::new().with_max_results(3).with_page_token(token))
            .await
            .unwrap();
        assert_eq!(second.prefixes.len(), 1);
        assert_eq!(second.prefixes[0].full_path(), "z");
        assert!(second.next_page_token.is_none());

        let nested = backend.list(&root.child("folder"), &ListOptions::default()).await.unwrap();
        assert_eq!(nested.items[0].full_path(), "folder/one.txt");
        assert_eq!(nested.prefixes[0].full_path(), "folder/deep");
    }

    #[tokio::test]
    async fn list_all_follows_page_tokens() {
        let (backend, root) = build_root();
        for index in 0..5 {
            backend
                .upload_bytes(&root.child(&format!("file-{index}")), Bytes::new(), None)
                .await
                .unwrap();
        }
        let all = backend.list_all(&root).await.unwrap();
        assert_eq!(all.items.len(), 5);
        assert!(all.next_page_token.is_none());
    }

    #[tokio::test]
    async fn download_url_contains_encoded_path_and_token() {
        let (backend, root) = build_root();
        let file = root.child("images/a b.png");
        let uploaded = backend.upload_bytes(&file, Bytes::from_static(b"png"), None).await.unwrap();
        let url = backend.get_download_url(&file).await.unwrap();
        let token = uploaded.metadata.download_tokens.unwrap();
        assert_eq!(
            url,
            format!(
                "https://firebasestorage.googleapis.com/v0/b/memory-bucket/o/images%2Fa%20b%2Epng?alt=media&token={token}"
            )
        );
        assert_eq!(token.len(), DOWNLOAD_TOKEN_LEN);
    }

    #[tokio::test]
    async fn update_metadata_bumps_metageneration() {
        let (backend, root) = build_root();
        let file = root.child("notes.md");
        let metadata = UploadMetadata::new().with_custom_metadata("draft", "yes");
        backend.upload_bytes(&file, Bytes::from_static(b"#"), Some(metadata)).await.unwrap();

        let updated = backend
            .update_metadata(
                &file,
                &SettableMetadata::new().with_content_type("text/markdown").remove_custom("draft"),
            )
            .await
            .unwrap();
        assert_eq!(updated.metageneration, "2");
        assert_eq!(updated.content_type.as_deref(), Some("text/markdown"));
        assert!(updated.custom_metadata.is_none());

        let missing = backend
            .update_metadata(&root.child("missing"), &SettableMetadata::new())
            .await
            .unwrap_err();
        assert_eq!(missing.code_str(), "storage/object-not-found");
    }

    #[tokio::test]
    async fn delete_removes_object_and_rejects_root() {
        let (backend, root) = build_root();
        let file = root.child("tmp.bin");
        backend.upload_bytes(&file, Bytes::from_static(b"1"), None).await.unwrap();
        backend.delete_object(&file).await.unwrap();
        assert_eq!(backend.object_count(), 0);
        assert_eq!(
            backend.delete_object(&file).await.unwrap_err().code_str(),
            "storage/object-not-found"
        );
        assert_eq!(
            backend.delete_object(&root).await.unwrap_err().code_str(),
            "storage/invalid-root-operation"
        );
    }

    #[tokio::test]
    async fn upload_string_infers_data_url_content_type() {
        let (backend, root) = build_root();
        let file = root.child("hello.txt");
        let result = backend
            .upload_string(&file, "data:text/plain;base64,aGk=".into(), crate::storage::StringFormat::DataUrl, None)
            .await
            .unwrap();
        assert_eq!(result.metadata.content_type.as_deref(), Some("text/plain"));
        assert_eq!(backend.read_object(file.location()).unwrap(), Bytes::from_static(b"hi"));
    }

    #[test]
    fn page_tokens_must_come_from_this_backend() {
        assert_eq!(decode_page_token("i:a/b").unwrap(), ("a/b".to_string(), true));
        assert!(decode_page_token("garbage").is_err());
    }
}
