use bytes::Bytes;

use crate::storage::error::{expected_argument, StorageError, StorageResult};
use crate::storage::handle::StorageHandle;
use crate::storage::logger::LOGGER;
use crate::storage::reference::StorageReference;
use crate::storage::service::StorageService;
use crate::storage::string::StringFormat;
use crate::storage::upload::UploadData;

fn reject(error: StorageError) -> StorageError {
    LOGGER.debug(format!("rejected call: {}", error.message()));
    error
}

pub(crate) fn expected(argument: &str, description: &str) -> StorageError {
    reject(expected_argument(argument, description))
}

fn wrong_handle(handle: StorageHandle<'_>, argument: &str, description: &str) -> StorageError {
    LOGGER.debug(format!("'{argument}' received {}", handle.kind()));
    expected(argument, description)
}

/// The `ref` parameter of object operations.
pub(crate) fn require_reference(handle: StorageHandle<'_>) -> StorageResult<StorageReference> {
    match handle {
        StorageHandle::Reference(reference) => Ok(reference.clone()),
        other => Err(wrong_handle(other, "ref", "a StorageReference instance")),
    }
}

/// The `storage` parameter of service-level operations.
pub(crate) fn require_service(handle: StorageHandle<'_>) -> StorageResult<StorageService> {
    match handle {
        StorageHandle::Service(service) => Ok(service.clone()),
        other => Err(wrong_handle(other, "storage", "a StorageService instance")),
    }
}

pub(crate) fn require_upload_data(data: Option<UploadData>) -> StorageResult<Bytes> {
    data.map(UploadData::into_bytes)
        .ok_or_else(|| expected("data", "a Blob, Uint8Array or ArrayBuffer value"))
}

pub(crate) fn require_string(argument: &str, value: Option<&str>) -> StorageResult<String> {
    value
        .map(str::to_string)
        .ok_or_else(|| expected(argument, "a string value"))
}

pub(crate) fn require_non_empty(argument: &str, value: &str) -> StorageResult<()> {
    if value.is_empty() {
        return Err(expected(argument, "a string value"));
    }
    Ok(())
}

/// Unset means [`StringFormat::Raw`].
pub(crate) fn parse_string_format(format: Option<&str>) -> StorageResult<StringFormat> {
    match format {
        None => Ok(StringFormat::default()),
        Some(format) => format.parse().map_err(reject),
    }
}

pub(crate) fn require_positive_time(time: i64) -> StorageResult<u64> {
    u64::try_from(time)
        .ok()
        .filter(|millis| *millis > 0)
        .ok_or_else(|| expected("time", "a positive integer value"))
}
