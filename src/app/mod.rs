//! Firebase app handles: options, named app registry and lifecycle.
//!
//! Storage instances are resolved against a [`FirebaseApp`]; the app supplies the default bucket
//! (`FirebaseOptions::storage_bucket`) and scopes the per-app storage instance cache.

mod api;
mod constants;
mod errors;
mod logger;
mod registry;
mod types;

#[doc(inline)]
pub use api::{delete_app, get_app, get_apps, initialize_app, is_registered_app, SDK_VERSION};

#[doc(inline)]
pub use constants::DEFAULT_ENTRY_NAME;

#[doc(inline)]
pub use errors::{AppError, AppResult};

#[doc(inline)]
pub use logger::LOGGER;

#[doc(inline)]
pub use types::{FirebaseApp, FirebaseAppConfig, FirebaseAppSettings, FirebaseOptions};
