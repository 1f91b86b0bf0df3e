//! Modular Cloud Storage for Firebase API.
//!
//! Every operation checks the shape of its arguments, resolves the target [`StorageReference`]
//! and forwards the call to the [`StorageBackend`] bound to the storage instance. Shape errors are
//! returned synchronously as `storage/invalid-argument`; backend work is returned as a pending
//! [`StorageFuture`].
//!
//! ```
//! use std::sync::Arc;
//! use firebase_storage_modular::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
//! use firebase_storage_modular::storage::{
//!     get_storage, register_storage_backend, storage_ref, upload_string, MemoryStorageBackend,
//! };
//!
//! # futures::executor::block_on(async {
//! register_storage_backend(Arc::new(MemoryStorageBackend::new()));
//! let options = FirebaseOptions {
//!     storage_bucket: Some("my-bucket".into()),
//!     ..Default::default()
//! };
//! let settings = FirebaseAppSettings {
//!     name: Some("storage-docs".into()),
//!     ..Default::default()
//! };
//! let app = initialize_app(options, Some(settings)).unwrap();
//! let storage = get_storage(Some(&app), None).unwrap();
//!
//! let notes = storage_ref(&storage, Some("notes/today.txt")).unwrap();
//! let uploaded = upload_string(&notes, Some("hello"), None, None).unwrap().await.unwrap();
//! assert_eq!(uploaded.metadata.size, 5);
//! # });
//! ```

mod api;
mod backend;
mod constants;
mod error;
mod handle;
mod list;
mod location;
mod logger;
mod memory;
mod metadata;
mod path;
mod reference;
mod service;
mod string;
mod upload;
mod validate;

#[doc(inline)]
pub use api::{
    connect_storage_emulator, delete_object, get_download_url, get_metadata, get_storage, list, list_all,
    put_file, register_storage_backend, set_max_download_retry_time, set_max_operation_retry_time,
    set_max_upload_retry_time, storage_ref, update_metadata, upload_bytes, upload_bytes_resumable,
    upload_string,
};

#[doc(inline)]
pub use backend::{StorageBackend, StorageFuture};

#[doc(inline)]
pub use constants::{
    DEFAULT_HOST, DEFAULT_MAX_DOWNLOAD_RETRY_TIME_MS, DEFAULT_MAX_OPERATION_RETRY_TIME_MS,
    DEFAULT_MAX_UPLOAD_RETRY_TIME_MS, DEFAULT_PROTOCOL, MAX_LIST_RESULTS,
};

#[doc(inline)]
pub use error::{
    app_deleted, bucket_not_found, expected_argument, internal_error, invalid_argument, invalid_default_bucket,
    invalid_format, invalid_root_operation, invalid_url, no_default_bucket, no_download_url, object_not_found,
    unknown_error, unsupported_environment, StorageError, StorageErrorCode, StorageResult,
};

#[doc(inline)]
pub use handle::StorageHandle;

#[doc(inline)]
pub use list::{ListOptions, ListResult};

#[doc(inline)]
pub use location::Location;

#[doc(inline)]
pub use logger::LOGGER;

#[doc(inline)]
pub use memory::MemoryStorageBackend;

#[doc(inline)]
pub use metadata::{ObjectMetadata, SettableMetadata, UploadMetadata};

#[doc(inline)]
pub use path::{child, last_component, parent};

#[doc(inline)]
pub use reference::StorageReference;

#[doc(inline)]
pub use service::{RetrySettings, StorageService};

#[doc(inline)]
pub use string::{prepare_string_upload, PreparedString, StringFormat};

#[doc(inline)]
pub use upload::{
    ProgressReporter, UploadData, UploadProgress, UploadResult, UploadTask, UploadTaskState,
    RESUMABLE_UPLOAD_CHUNK_SIZE,
};
