use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use futures::FutureExt;

use crate::app::{get_app, is_registered_app, FirebaseApp};
use crate::storage::backend::{StorageBackend, StorageFuture};
use crate::storage::error::{app_deleted, invalid_argument, unsupported_environment, StorageResult};
use crate::storage::handle::StorageHandle;
use crate::storage::list::{ListOptions, ListResult};
use crate::storage::location::{is_gs_url, looks_like_http_url, Location};
use crate::storage::logger::LOGGER;
use crate::storage::metadata::{ObjectMetadata, SettableMetadata, UploadMetadata};
use crate::storage::reference::StorageReference;
use crate::storage::service::StorageService;
use crate::storage::upload::{UploadData, UploadResult, UploadTask};
use crate::storage::validate::{
    expected, parse_string_format, require_non_empty, require_positive_time, require_reference,
    require_service, require_string, require_upload_data,
};

type InstanceKey = (String, Option<String>);

static STORAGE_BACKEND: LazyLock<Mutex<Option<Arc<dyn StorageBackend>>>> = LazyLock::new(|| Mutex::new(None));

static STORAGE_INSTANCES: LazyLock<Mutex<HashMap<InstanceKey, StorageService>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

fn instances_guard() -> MutexGuard<'static, HashMap<InstanceKey, StorageService>> {
    STORAGE_INSTANCES
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

/// Installs the backend used by storage instances created through [`get_storage`].
///
/// Previously cached instances are dropped so the next [`get_storage`] call binds to `backend`.
pub fn register_storage_backend(backend: Arc<dyn StorageBackend>) {
    *STORAGE_BACKEND
        .lock()
        .unwrap_or_else(|poison| poison.into_inner()) = Some(backend);
    instances_guard().clear();
    LOGGER.debug("registered storage backend");
}

fn registered_backend() -> Option<Arc<dyn StorageBackend>> {
    STORAGE_BACKEND
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
        .clone()
}

/// Returns the storage instance for `app` (the default app when `None`), optionally pinned to
/// `bucket_url`.
///
/// Instances are cached per app and bucket URL; repeated calls hand out handles to the same
/// instance until the app is deleted.
///
/// # Errors
///
/// * `storage/invalid-argument` naming `app` when the app is deleted or not registered.
/// * `storage/invalid-default-bucket` when `bucket_url` contains an object path.
/// * `storage/unsupported-environment` when no backend was registered.
pub fn get_storage(app: Option<&FirebaseApp>, bucket_url: Option<&str>) -> StorageResult<StorageService> {
    let app = match app {
        Some(app) => app.clone(),
        None => get_app(None).map_err(|_| expected("app", "a valid FirebaseApp instance"))?,
    };
    if !is_registered_app(&app) {
        return Err(expected("app", "a valid FirebaseApp instance"));
    }

    let key: InstanceKey = (app.name().to_string(), bucket_url.map(str::to_string));
    let mut instances = instances_guard();
    instances.retain(|_, service| is_registered_app(service.app()));
    if let Some(existing) = instances.get(&key) {
        return Ok(existing.clone());
    }

    let backend = registered_backend().ok_or_else(|| {
        unsupported_environment("No storage backend registered; call register_storage_backend first.")
    })?;
    let service = StorageService::new(app, key.1.clone(), backend)?;
    LOGGER.debug(format!("created storage instance for app '{}'", key.0));
    instances.insert(key, service.clone());
    Ok(service)
}

/// Points `storage` at a local emulator. URLs on `host:port` become resolvable by [`storage_ref`].
pub fn connect_storage_emulator<'a>(
    storage: impl Into<StorageHandle<'a>>,
    host: &str,
    port: u16,
) -> StorageResult<()> {
    let service = require_service(storage.into())?;
    require_non_empty("host", host)?;
    service.connect_emulator(host, port)?;
    LOGGER.info(format!("using storage emulator at {host}:{port}"));
    Ok(())
}

/// Resolves a service or reference plus an optional path or URL into a [`StorageReference`].
///
/// * No `path_or_url`: the service's root reference, or a clone of the given reference.
/// * `gs://bucket/path` and `http(s)://` download URLs: a reference on the bucket named by the
///   URL, bound to the handle's service. Any other input starting with `http` is rejected as a
///   malformed URL.
/// * Anything else: a path relative to the handle.
pub fn storage_ref<'a>(
    storage_or_ref: impl Into<StorageHandle<'a>>,
    path_or_url: Option<&str>,
) -> StorageResult<StorageReference> {
    let handle = storage_or_ref.into();
    match path_or_url {
        Some(url) if is_gs_url(url) || looks_like_http_url(url) => {
            let service = handle
                .service()
                .ok_or_else(|| expected("storageOrRef", "either a StorageService or StorageReference instance"))?;
            let location = if is_gs_url(url) {
                Location::parse_gs_url(url).map_err(|_| {
                    invalid_argument(
                        "url",
                        "Unable to parse provided URL, ensure it's a valid Google Storage url.",
                    )
                })?
            } else {
                Location::parse_http_url(url, &service.host()).map_err(|_| {
                    invalid_argument("url", "Unable to parse provided URL, ensure it's a valid storage url.")
                })?
            };
            Ok(service.make_reference(location))
        }
        path => match handle {
            StorageHandle::Service(service) => {
                let root = service.root_reference()?;
                Ok(match path {
                    Some(path) => root.child(path),
                    None => root,
                })
            }
            StorageHandle::Reference(reference) => Ok(match path {
                Some(path) => reference.child(path),
                None => reference.clone(),
            }),
            StorageHandle::Absent => Err(expected("storage", "a StorageService instance")),
        },
    }
}

/// Hands the validated call to the reference's backend.
fn forward<T, F, Fut>(reference: StorageReference, call: F) -> StorageFuture<T>
where
    T: Send + 'static,
    F: FnOnce(Arc<dyn StorageBackend>, StorageReference) -> Fut + Send + 'static,
    Fut: Future<Output = StorageResult<T>> + Send + 'static,
{
    let backend = reference.storage().backend();
    async move {
        if reference.storage().app().is_deleted() {
            return Err(app_deleted());
        }
        call(backend, reference).await
    }
    .boxed()
}

/// Lists one page of prefixes and items below `reference`.
pub fn list<'a>(
    reference: impl Into<StorageHandle<'a>>,
    options: Option<ListOptions>,
) -> StorageResult<StorageFuture<ListResult>> {
    let reference = require_reference(reference.into())?;
    let options = options.unwrap_or_default();
    options.validate().map_err(|err| {
        LOGGER.debug(format!("rejected call: {}", err.message()));
        err
    })?;
    Ok(forward(reference, |backend, reference| async move {
        backend.list(&reference, &options).await
    }))
}

/// Lists everything below `reference`, following page tokens.
pub fn list_all<'a>(reference: impl Into<StorageHandle<'a>>) -> StorageResult<StorageFuture<ListResult>> {
    let reference = require_reference(reference.into())?;
    Ok(forward(reference, |backend, reference| async move {
        backend.list_all(&reference).await
    }))
}

pub fn delete_object<'a>(reference: impl Into<StorageHandle<'a>>) -> StorageResult<StorageFuture<()>> {
    let reference = require_reference(reference.into())?;
    Ok(forward(reference, |backend, reference| async move {
        backend.delete_object(&reference).await
    }))
}

pub fn get_download_url<'a>(reference: impl Into<StorageHandle<'a>>) -> StorageResult<StorageFuture<String>> {
    let reference = require_reference(reference.into())?;
    Ok(forward(reference, |backend, reference| async move {
        backend.get_download_url(&reference).await
    }))
}

pub fn get_metadata<'a>(reference: impl Into<StorageHandle<'a>>) -> StorageResult<StorageFuture<ObjectMetadata>> {
    let reference = require_reference(reference.into())?;
    Ok(forward(reference, |backend, reference| async move {
        backend.get_metadata(&reference).await
    }))
}

/// Applies a partial metadata update; see [`SettableMetadata`] for the merge rules.
pub fn update_metadata<'a>(
    reference: impl Into<StorageHandle<'a>>,
    metadata: SettableMetadata,
) -> StorageResult<StorageFuture<ObjectMetadata>> {
    let reference = require_reference(reference.into())?;
    Ok(forward(reference, |backend, reference| async move {
        backend.update_metadata(&reference, &metadata).await
    }))
}

pub fn upload_bytes<'a>(
    reference: impl Into<StorageHandle<'a>>,
    data: Option<UploadData>,
    metadata: Option<UploadMetadata>,
) -> StorageResult<StorageFuture<UploadResult>> {
    let reference = require_reference(reference.into())?;
    let data = require_upload_data(data)?;
    Ok(forward(reference, |backend, reference| async move {
        backend.upload_bytes(&reference, data, metadata).await
    }))
}

/// Starts an upload whose progress can be observed through [`UploadTask::progress`].
pub fn upload_bytes_resumable<'a>(
    reference: impl Into<StorageHandle<'a>>,
    data: Option<UploadData>,
    metadata: Option<UploadMetadata>,
) -> StorageResult<UploadTask> {
    let reference = require_reference(reference.into())?;
    let data = require_upload_data(data)?;
    let total_bytes = data.len() as u64;
    let upload_reference = reference.clone();
    Ok(UploadTask::new(reference, total_bytes, move |reporter| {
        forward(upload_reference, move |backend, reference| async move {
            backend
                .upload_bytes_resumable(&reference, data, metadata, &reporter)
                .await
        })
    }))
}

/// Uploads `value` decoded according to `format` (`raw` when unset).
pub fn upload_string<'a>(
    reference: impl Into<StorageHandle<'a>>,
    value: Option<&str>,
    format: Option<&str>,
    metadata: Option<UploadMetadata>,
) -> StorageResult<StorageFuture<UploadResult>> {
    let reference = require_reference(reference.into())?;
    let value = require_string("value", value)?;
    let format = parse_string_format(format)?;
    Ok(forward(reference, move |backend, reference| async move {
        backend.upload_string(&reference, value, format, metadata).await
    }))
}

/// Uploads the contents of a local file.
pub fn put_file<'a>(
    reference: impl Into<StorageHandle<'a>>,
    file_path: impl AsRef<Path>,
    metadata: Option<UploadMetadata>,
) -> StorageResult<StorageFuture<UploadResult>> {
    let reference = require_reference(reference.into())?;
    let file_path = file_path.as_ref();
    require_non_empty("filePath", &file_path.to_string_lossy())?;
    let file_path = file_path.to_path_buf();
    Ok(forward(reference, |backend, reference| async move {
        backend.put_file(&reference, file_path, metadata).await
    }))
}

/// Sets the retry ceiling, in milliseconds, for non-transfer operations.
pub async fn set_max_operation_retry_time<'a>(storage: impl Into<StorageHandle<'a>>, time: i64) -> StorageResult<()> {
    let service = require_service(storage.into())?;
    service.set_max_operation_retry_time(require_positive_time(time)?);
    Ok(())
}

/// Sets the retry ceiling, in milliseconds, for uploads.
pub async fn set_max_upload_retry_time<'a>(storage: impl Into<StorageHandle<'a>>, time: i64) -> StorageResult<()> {
    let service = require_service(storage.into())?;
    service.set_max_upload_retry_time(require_positive_time(time)?);
    Ok(())
}

/// Sets the retry ceiling, in milliseconds, for downloads.
pub async fn set_max_download_retry_time<'a>(storage: impl Into<StorageHandle<'a>>, time: i64) -> StorageResult<()> {
    let service = require_service(storage.into())?;
    service.set_max_download_retry_time(require_positive_time(time)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::{delete_app, initialize_app, FirebaseAppSettings, FirebaseOptions};
    use crate::storage::memory::MemoryStorageBackend;
    use crate::storage::upload::UploadTaskState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static BACKEND_GUARD: Mutex<()> = Mutex::new(());

    fn unique_settings() -> FirebaseAppSettings {
        static COUNTER: AtomicUsize = AtomicUsize::new(0);
        FirebaseAppSettings {
            name: Some(format!("storage-api-{}", COUNTER.fetch_add(1, Ordering::SeqCst))),
            ..Default::default()
        }
    }

    fn build_app() -> FirebaseApp {
        let options = FirebaseOptions {
            storage_bucket: Some("bucket".into()),
            ..Default::default()
        };
        initialize_app(options, Some(unique_settings())).unwrap()
    }

    fn build_service() -> StorageService {
        StorageService::new(build_app(), None, Arc::new(MemoryStorageBackend::new())).unwrap()
    }

    #[test]
    fn storage_ref_without_path_returns_root_or_same_reference() {
        let service = build_service();
        let root = storage_ref(&service, None).unwrap();
        assert_eq!(root.to_gs_url(), "gs://bucket/");
        let child = root.child("child");
        assert_eq!(storage_ref(&child, None).unwrap(), child);
    }

    #[test]
    fn storage_ref_resolves_paths_relative_to_handle() {
        let service = build_service();
        let image = storage_ref(&service, Some("images/stars.jpg")).unwrap();
        assert_eq!(image.full_path(), "images/stars.jpg");
        let nested = storage_ref(&image.parent().unwrap(), Some("/thumbs//a.png/")).unwrap();
        assert_eq!(nested.full_path(), "images/thumbs/a.png");
    }

    #[test]
    fn storage_ref_parses_gs_urls() {
        let service = build_service();
        let reference = storage_ref(&service, Some("gs://bucket/o/stars.jpg")).unwrap();
        assert_eq!(reference.bucket(), "bucket");
        assert_eq!(reference.full_path(), "o/stars.jpg");

        let host_like = storage_ref(
            &service,
            Some("gs://firebasestorage.googleapis.com/b/bucket/o/images%20stars.jpg"),
        )
        .unwrap();
        assert_eq!(host_like.bucket(), "firebasestorage.googleapis.com");
        assert_eq!(host_like.full_path(), "b/bucket/o/images%20stars.jpg");

        for invalid in ["gs://bucket", "gs://bucket/", "gs:///path"] {
            let err = storage_ref(&service, Some(invalid)).unwrap_err();
            assert_eq!(
                err.message(),
                "Invalid argument 'url'. Unable to parse provided URL, ensure it's a valid Google Storage url."
            );
        }
    }

    #[test]
    fn storage_ref_parses_download_urls() {
        let service = build_service();
        let reference = storage_ref(
            &service,
            Some("https://firebasestorage.googleapis.com/b/bucket/o/images%20stars.jpg"),
        )
        .unwrap();
        assert_eq!(reference.full_path(), "images stars.jpg");

        let versioned = storage_ref(
            &service,
            Some("https://firebasestorage.googleapis.com/v0/b/other/o/a%2Fb.png?alt=media&token=abc"),
        )
        .unwrap();
        assert_eq!(versioned.bucket(), "other");
        assert_eq!(versioned.full_path(), "a/b.png");

        for invalid in ["https://example.com/not/storage", "http", "httpbin"] {
            let err = storage_ref(&service, Some(invalid)).unwrap_err();
            assert_eq!(
                err.message(),
                "Invalid argument 'url'. Unable to parse provided URL, ensure it's a valid storage url."
            );
        }
    }

    #[test]
    fn storage_ref_accepts_emulator_urls_after_connecting() {
        let service = build_service();
        let url = "http://localhost:9199/v0/b/bucket/o/file.txt";
        assert!(storage_ref(&service, Some(url)).is_err());
        connect_storage_emulator(&service, "localhost", 9199).unwrap();
        assert_eq!(storage_ref(&service, Some(url)).unwrap().full_path(), "file.txt");
    }

    #[test]
    fn storage_ref_rejects_absent_handles() {
        let err = storage_ref(None::<&StorageService>, Some("gs://bucket/path")).unwrap_err();
        assert_eq!(
            err.message(),
            "Invalid argument 'storageOrRef'. Expected either a StorageService or StorageReference instance."
        );
        let err = storage_ref(None::<&StorageService>, Some("http")).unwrap_err();
        assert_eq!(err.argument(), Some("storageOrRef"));
        let err = storage_ref(None::<&StorageService>, Some("path")).unwrap_err();
        assert_eq!(err.argument(), Some("storage"));
        let err = storage_ref(None::<&StorageReference>, None).unwrap_err();
        assert_eq!(err.argument(), Some("storage"));
    }

    #[test]
    fn object_operations_require_references() {
        let service = build_service();
        let checks = [
            list(&service, None).err(),
            list_all(&service).err(),
            delete_object(&service).err(),
            get_download_url(&service).err(),
            get_metadata(&service).err(),
            update_metadata(&service, SettableMetadata::new()).err(),
            upload_bytes(&service, Some(UploadData::from(vec![1u8])), None).err(),
            upload_bytes_resumable(&service, Some(UploadData::from(vec![1u8])), None).err(),
            upload_string(&service, Some("x"), None, None).err(),
            put_file(&service, "file.txt", None).err(),
        ];
        for err in checks {
            let err = err.expect("service handle must be rejected");
            assert_eq!(err.message(), "Invalid argument 'ref'. Expected a StorageReference instance.");
        }
    }

    #[test]
    fn shape_errors_are_synchronous_and_name_parameters() {
        let reference = build_service().root_reference().unwrap().child("file");
        let err = list(&reference, Some(ListOptions::new().with_max_results(0))).err().unwrap();
        assert_eq!(err.argument(), Some("options.maxResults"));
        let err = upload_bytes(&reference, None, None).err().unwrap();
        assert_eq!(err.argument(), Some("data"));
        let err = upload_string(&reference, None, None, None).err().unwrap();
        assert_eq!(err.message(), "Invalid argument 'value'. Expected a string value.");
        let err = upload_string(&reference, Some("test"), Some("unknown"), None).err().unwrap();
        assert_eq!(err.message(), "Invalid argument 'format'. Expected a StringFormat value.");
        let err = put_file(&reference, "", None).err().unwrap();
        assert_eq!(err.message(), "Invalid argument 'filePath'. Expected a string value.");
    }

    #[tokio::test]
    async fn operations_forward_to_backend() {
        let reference = build_service().root_reference().unwrap().child("docs/a.txt");
        let uploaded = upload_string(&reference, Some("hello"), None, None).unwrap().await.unwrap();
        assert_eq!(uploaded.metadata.size, 5);

        let metadata = get_metadata(&reference).unwrap().await.unwrap();
        assert_eq!(metadata.full_path, "docs/a.txt");

        let listed = list_all(&reference.root()).unwrap().await.unwrap();
        assert_eq!(listed.prefixes.len(), 1);

        delete_object(&reference).unwrap().await.unwrap();
        let err = get_metadata(&reference).unwrap().await.unwrap_err();
        assert_eq!(err.code_str(), "storage/object-not-found");
    }

    #[tokio::test]
    async fn resumable_upload_reports_completion() {
        let reference = build_service().root_reference().unwrap().child("big.bin");
        let task = upload_bytes_resumable(&reference, Some(UploadData::from(vec![7u8; 600 * 1024])), None).unwrap();
        assert_eq!(task.progress().state, UploadTaskState::Running);
        assert_eq!(task.reference(), &reference);

        let mut task = task;
        let result = (&mut task).await.unwrap();
        assert_eq!(result.metadata.size, 600 * 1024);
        let progress = task.progress();
        assert_eq!(progress.state, UploadTaskState::Success);
        assert_eq!(progress.bytes_transferred, progress.total_bytes);
    }

    #[tokio::test]
    async fn retry_setters_validate_when_awaited() {
        let service = build_service();
        set_max_operation_retry_time(&service, 10).await.unwrap();
        set_max_upload_retry_time(&service, 20).await.unwrap();
        set_max_download_retry_time(&service, 30).await.unwrap();
        assert_eq!(service.max_operation_retry_time(), 10);
        assert_eq!(service.max_upload_retry_time(), 20);
        assert_eq!(service.max_download_retry_time(), 30);

        let pending = set_max_upload_retry_time(&service, -1);
        let err = pending.await.unwrap_err();
        assert_eq!(err.message(), "Invalid argument 'time'. Expected a positive integer value.");
        assert_eq!(service.max_upload_retry_time(), 20);

        let reference = service.root_reference().unwrap();
        let err = set_max_download_retry_time(&reference, 5).await.unwrap_err();
        assert_eq!(err.message(), "Invalid argument 'storage'. Expected a StorageService instance.");
    }

    #[test]
    fn get_storage_caches_instances_per_bucket() {
        let _guard = BACKEND_GUARD.lock().unwrap_or_else(|poison| poison.into_inner());
        register_storage_backend(Arc::new(MemoryStorageBackend::new()));
        let app = build_app();

        let first = get_storage(Some(&app), None).unwrap();
        let second = get_storage(Some(&app), None).unwrap();
        assert!(first.same_service(&second));

        let custom = get_storage(Some(&app), Some("gs://custom")).unwrap();
        assert!(!custom.same_service(&first));
        assert_eq!(custom.bucket().unwrap().bucket(), "custom");
    }

    #[test]
    fn get_storage_rejects_deleted_apps() {
        let _guard = BACKEND_GUARD.lock().unwrap_or_else(|poison| poison.into_inner());
        register_storage_backend(Arc::new(MemoryStorageBackend::new()));
        let app = build_app();
        get_storage(Some(&app), None).unwrap();
        delete_app(&app).unwrap();

        let err = get_storage(Some(&app), None).unwrap_err();
        assert_eq!(err.message(), "Invalid argument 'app'. Expected a valid FirebaseApp instance.");
    }

    #[tokio::test]
    async fn operations_on_deleted_apps_fail() {
        let service = build_service();
        let reference = service.root_reference().unwrap().child("file");
        delete_app(service.app()).unwrap();
        let err = get_metadata(&reference).unwrap().await.unwrap_err();
        assert_eq!(err.code_str(), "storage/app-deleted");
    }
}
