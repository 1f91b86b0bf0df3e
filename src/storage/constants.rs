pub const DEFAULT_HOST: &str = "firebasestorage.googleapis.com";

pub const DEFAULT_PROTOCOL: &str = "https";

/// Cloud Storage hosts whose URLs use the `/<bucket>/<path>` layout.
pub const CLOUD_STORAGE_HOSTS: [&str; 2] = ["storage.googleapis.com", "storage.cloud.google.com"];

pub const DEFAULT_MAX_OPERATION_RETRY_TIME_MS: u64 = 2 * 60 * 1_000;

pub const DEFAULT_MAX_UPLOAD_RETRY_TIME_MS: u64 = 10 * 60 * 1_000;

pub const DEFAULT_MAX_DOWNLOAD_RETRY_TIME_MS: u64 = 10 * 60 * 1_000;

/// Upper bound accepted for `ListOptions::max_results`.
pub const MAX_LIST_RESULTS: u32 = 1_000;
