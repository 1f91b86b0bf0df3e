//! Uploads a string to an in-memory bucket through the modular API and reads it back.

use std::sync::Arc;

use firebase_storage_modular::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
use firebase_storage_modular::storage::{
    get_download_url, get_metadata, get_storage, register_storage_backend, storage_ref, update_metadata,
    upload_string, MemoryStorageBackend, SettableMetadata, UploadMetadata,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    register_storage_backend(Arc::new(MemoryStorageBackend::new()));

    let options = FirebaseOptions {
        storage_bucket: Some("your-project.appspot.com".into()),
        ..Default::default()
    };
    let app = initialize_app(options, Some(FirebaseAppSettings::default()))?;
    let storage = get_storage(Some(&app), None)?;

    let reference = storage_ref(&storage, Some("demo/uploaded.txt"))?;
    let metadata = UploadMetadata::new().with_custom_metadata("source", "demo");

    let uploaded = upload_string(&reference, Some("Hello from Rust!"), None, Some(metadata))?.await?;
    println!("Uploaded object: {} ({} bytes)", uploaded.metadata.full_path, uploaded.metadata.size);

    let encoded = storage_ref(&storage, Some("demo/encoded.txt"))?;
    upload_string(&encoded, Some("SGVsbG8gYWdhaW4h"), Some("base64"), None)?.await?;

    update_metadata(&reference, SettableMetadata::new().with_content_type("text/plain"))?.await?;
    let current = get_metadata(&reference)?.await?;
    println!("Content type: {:?}, metageneration {}", current.content_type, current.metageneration);

    println!("Download URL: {}", get_download_url(&reference)?.await?);
    Ok(())
}
