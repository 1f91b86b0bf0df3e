use std::sync::{Arc, Mutex, MutexGuard};

use crate::app::FirebaseApp;
use crate::storage::backend::StorageBackend;
use crate::storage::constants::{
    DEFAULT_HOST, DEFAULT_MAX_DOWNLOAD_RETRY_TIME_MS, DEFAULT_MAX_OPERATION_RETRY_TIME_MS,
    DEFAULT_MAX_UPLOAD_RETRY_TIME_MS, DEFAULT_PROTOCOL,
};
use crate::storage::error::{no_default_bucket, StorageResult};
use crate::storage::location::Location;
use crate::storage::reference::StorageReference;

/// Retry ceilings handed to the backend, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetrySettings {
    pub max_operation_retry_time_ms: u64,
    pub max_upload_retry_time_ms: u64,
    pub max_download_retry_time_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_operation_retry_time_ms: DEFAULT_MAX_OPERATION_RETRY_TIME_MS,
            max_upload_retry_time_ms: DEFAULT_MAX_UPLOAD_RETRY_TIME_MS,
            max_download_retry_time_ms: DEFAULT_MAX_DOWNLOAD_RETRY_TIME_MS,
        }
    }
}

/// A storage instance bound to one app (and optionally one custom bucket).
///
/// Clones share state, so retry settings changed through one handle are visible to all of them
/// and to every [`StorageReference`] created from it.
#[derive(Clone)]
pub struct StorageService {
    app: FirebaseApp,
    url_override: Option<String>,
    backend: Arc<dyn StorageBackend>,
    state: Arc<Mutex<StorageServiceState>>,
}

struct StorageServiceState {
    bucket: Option<Location>,
    host: String,
    protocol: String,
    is_using_emulator: bool,
    retry: RetrySettings,
}

impl StorageService {
    /// Creates a service for `app`, pinned to `url_override` when given and otherwise to the
    /// app's `storage_bucket` option. Calls are forwarded to `backend`.
    pub fn new(
        app: FirebaseApp,
        url_override: Option<String>,
        backend: Arc<dyn StorageBackend>,
    ) -> StorageResult<Self> {
        let host = DEFAULT_HOST.to_string();
        let bucket = resolve_bucket(&app, url_override.as_deref(), &host)?;

        let state = StorageServiceState {
            bucket,
            host,
            protocol: DEFAULT_PROTOCOL.to_string(),
            is_using_emulator: false,
            retry: RetrySettings::default(),
        };

        Ok(Self {
            app,
            url_override,
            backend,
            state: Arc::new(Mutex::new(state)),
        })
    }

    fn state(&self) -> MutexGuard<'_, StorageServiceState> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn app(&self) -> &FirebaseApp {
        &self.app
    }

    pub fn url_override(&self) -> Option<&str> {
        self.url_override.as_deref()
    }

    pub fn bucket(&self) -> Option<Location> {
        self.state().bucket.clone()
    }

    pub fn host(&self) -> String {
        self.state().host.clone()
    }

    pub fn protocol(&self) -> String {
        self.state().protocol.clone()
    }

    /// `<protocol>://<host>`, the origin download URLs are minted against.
    pub fn origin(&self) -> String {
        let state = self.state();
        format!("{}://{}", state.protocol, state.host)
    }

    pub fn is_using_emulator(&self) -> bool {
        self.state().is_using_emulator
    }

    pub fn retry_settings(&self) -> RetrySettings {
        self.state().retry
    }

    pub fn max_operation_retry_time(&self) -> u64 {
        self.state().retry.max_operation_retry_time_ms
    }

    pub fn max_upload_retry_time(&self) -> u64 {
        self.state().retry.max_upload_retry_time_ms
    }

    pub fn max_download_retry_time(&self) -> u64 {
        self.state().retry.max_download_retry_time_ms
    }

    pub(crate) fn set_max_operation_retry_time(&self, millis: u64) {
        self.state().retry.max_operation_retry_time_ms = millis;
    }

    pub(crate) fn set_max_upload_retry_time(&self, millis: u64) {
        self.state().retry.max_upload_retry_time_ms = millis;
    }

    pub(crate) fn set_max_download_retry_time(&self, millis: u64) {
        self.state().retry.max_download_retry_time_ms = millis;
    }

    pub(crate) fn connect_emulator(&self, host: &str, port: u16) -> StorageResult<()> {
        let host = format!("{host}:{port}");
        let bucket = resolve_bucket(&self.app, self.url_override.as_deref(), &host)?;
        let mut state = self.state();
        state.host = host;
        state.bucket = bucket;
        state.protocol = "http".to_string();
        state.is_using_emulator = true;
        Ok(())
    }

    pub(crate) fn backend(&self) -> Arc<dyn StorageBackend> {
        Arc::clone(&self.backend)
    }

    /// Returns true when both handles share the same underlying instance.
    pub fn same_service(&self, other: &StorageService) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }

    pub fn make_reference(&self, location: Location) -> StorageReference {
        StorageReference::new(self.clone(), location)
    }

    /// Reference to the root of the default bucket.
    pub fn root_reference(&self) -> StorageResult<StorageReference> {
        let bucket = self.bucket().ok_or_else(no_default_bucket)?;
        Ok(self.make_reference(bucket))
    }
}

impl std::fmt::Debug for StorageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("StorageService")
            .field("app", &self.app.name())
            .field("bucket", &state.bucket)
            .field("host", &state.host)
            .field("retry", &state.retry)
            .finish()
    }
}

fn resolve_bucket(app: &FirebaseApp, url_override: Option<&str>, host: &str) -> StorageResult<Option<Location>> {
    match url_override {
        Some(url) => Ok(Some(Location::from_bucket_spec(url, host)?)),
        None => match app.options().storage_bucket {
            Some(bucket) => Ok(Some(Location::from_bucket_spec(&bucket, host)?)),
            None => Ok(None),
        },
    }
}
