use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::app::errors::{AppError, AppResult};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirebaseOptions {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub app_id: Option<String>,
    /// Default bucket for storage instances, either `gs://bucket` or a bare bucket name.
    pub storage_bucket: Option<String>,
}

impl FirebaseOptions {
    pub(crate) fn is_defined(&self) -> bool {
        self.api_key.is_some() || self.project_id.is_some() || self.app_id.is_some() || self.storage_bucket.is_some()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FirebaseAppSettings {
    pub name: Option<String>,
    pub automatic_data_collection_enabled: Option<bool>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FirebaseAppConfig {
    pub name: Arc<str>,
    pub automatic_data_collection_enabled: bool,
}

impl FirebaseAppConfig {
    pub fn new(name: impl Into<String>, automatic: bool) -> Self {
        Self {
            name: Arc::from(name.into().into_boxed_str()),
            automatic_data_collection_enabled: automatic,
        }
    }
}

/// Handle to an initialized Firebase app. Clones share the same underlying app.
#[derive(Clone)]
pub struct FirebaseApp {
    inner: Arc<FirebaseAppInner>,
}

struct FirebaseAppInner {
    options: FirebaseOptions,
    config: FirebaseAppConfig,
    is_deleted: AtomicBool,
}

impl FirebaseApp {
    pub(crate) fn new(options: FirebaseOptions, config: FirebaseAppConfig) -> Self {
        Self {
            inner: Arc::new(FirebaseAppInner {
                options,
                config,
                is_deleted: AtomicBool::new(false),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn options(&self) -> FirebaseOptions {
        self.inner.options.clone()
    }

    pub fn config(&self) -> FirebaseAppConfig {
        self.inner.config.clone()
    }

    pub fn automatic_data_collection_enabled(&self) -> bool {
        self.inner.config.automatic_data_collection_enabled
    }

    pub fn is_deleted(&self) -> bool {
        self.inner.is_deleted.load(Ordering::SeqCst)
    }

    pub(crate) fn set_is_deleted(&self, value: bool) {
        self.inner.is_deleted.store(value, Ordering::SeqCst);
    }

    /// Returns true when both handles refer to the same initialized app.
    pub fn same_app(&self, other: &FirebaseApp) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn check_destroyed(&self) -> AppResult<()> {
        if self.is_deleted() {
            return Err(AppError::AppDeleted {
                app_name: self.name().to_owned(),
            });
        }
        Ok(())
    }
}

impl std::fmt::Debug for FirebaseApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FirebaseApp")
            .field("name", &self.name())
            .field("is_deleted", &self.is_deleted())
            .finish()
    }
}
