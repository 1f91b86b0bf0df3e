use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll};

use bytes::Bytes;

use crate::storage::backend::StorageFuture;
use crate::storage::error::StorageResult;
use crate::storage::metadata::ObjectMetadata;
use crate::storage::reference::StorageReference;

/// Chunk size backends should use when reporting resumable upload progress.
pub const RESUMABLE_UPLOAD_CHUNK_SIZE: usize = 256 * 1024;

/// Binary payload accepted by the byte upload functions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UploadData {
    /// Immutable shared bytes.
    Blob(Bytes),
    /// Fixed-size buffer.
    Buffer(Box<[u8]>),
    /// Growable byte array.
    Array(Vec<u8>),
}

impl UploadData {
    pub fn len(&self) -> usize {
        match self {
            UploadData::Blob(bytes) => bytes.len(),
            UploadData::Buffer(buffer) => buffer.len(),
            UploadData::Array(array) => array.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_bytes(self) -> Bytes {
        match self {
            UploadData::Blob(bytes) => bytes,
            UploadData::Buffer(buffer) => Bytes::from(buffer),
            UploadData::Array(array) => Bytes::from(array),
        }
    }
}

impl From<Bytes> for UploadData {
    fn from(bytes: Bytes) -> Self {
        UploadData::Blob(bytes)
    }
}

impl From<Box<[u8]>> for UploadData {
    fn from(buffer: Box<[u8]>) -> Self {
        UploadData::Buffer(buffer)
    }
}

impl From<Vec<u8>> for UploadData {
    fn from(array: Vec<u8>) -> Self {
        UploadData::Array(array)
    }
}

impl From<&[u8]> for UploadData {
    fn from(slice: &[u8]) -> Self {
        UploadData::Array(slice.to_vec())
    }
}

/// Outcome of a completed upload.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadResult {
    pub metadata: ObjectMetadata,
    pub reference: StorageReference,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadTaskState {
    Running,
    Success,
    Error,
}

/// Snapshot of a resumable upload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UploadProgress {
    pub bytes_transferred: u64,
    pub total_bytes: u64,
    pub state: UploadTaskState,
}

/// Handle a backend uses to publish progress for a resumable upload.
#[derive(Clone, Debug)]
pub struct ProgressReporter {
    progress: Arc<Mutex<UploadProgress>>,
}

impl ProgressReporter {
    fn new(total_bytes: u64) -> Self {
        Self {
            progress: Arc::new(Mutex::new(UploadProgress {
                bytes_transferred: 0,
                total_bytes,
                state: UploadTaskState::Running,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, UploadProgress> {
        self.progress.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    pub fn total_bytes(&self) -> u64 {
        self.lock().total_bytes
    }

    /// Records `bytes_transferred`; values never move backwards or past the total.
    pub fn report(&self, bytes_transferred: u64) {
        let mut progress = self.lock();
        progress.bytes_transferred = bytes_transferred.clamp(progress.bytes_transferred, progress.total_bytes);
    }

    fn finish(&self, succeeded: bool) {
        let mut progress = self.lock();
        if succeeded {
            progress.bytes_transferred = progress.total_bytes;
            progress.state = UploadTaskState::Success;
        } else {
            progress.state = UploadTaskState::Error;
        }
    }

    fn snapshot(&self) -> UploadProgress {
        *self.lock()
    }
}

/// A resumable upload handed over to the backend. Await it for the [`UploadResult`] and poll
/// [`UploadTask::progress`] in the meantime.
pub struct UploadTask {
    reference: StorageReference,
    reporter: ProgressReporter,
    upload: StorageFuture<UploadResult>,
}

impl UploadTask {
    pub(crate) fn new<F>(reference: StorageReference, total_bytes: u64, start: F) -> Self
    where
        F: FnOnce(ProgressReporter) -> StorageFuture<UploadResult>,
    {
        let reporter = ProgressReporter::new(total_bytes);
        let upload = start(reporter.clone());
        Self {
            reference,
            reporter,
            upload,
        }
    }

    pub fn reference(&self) -> &StorageReference {
        &self.reference
    }

    pub fn progress(&self) -> UploadProgress {
        self.reporter.snapshot()
    }
}

impl Future for UploadTask {
    type Output = StorageResult<UploadResult>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = &mut *self;
        match this.upload.as_mut().poll(cx) {
            Poll::Ready(result) => {
                this.reporter.finish(result.is_ok());
                Poll::Ready(result)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl std::fmt::Debug for UploadTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadTask")
            .field("reference", &self.reference)
            .field("progress", &self.progress())
            .finish()
    }
}
