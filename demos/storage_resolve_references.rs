//! Shows how paths, `gs://` URLs and download URLs resolve to storage references.

use std::sync::Arc;

use firebase_storage_modular::app::{initialize_app, FirebaseAppSettings, FirebaseOptions};
use firebase_storage_modular::storage::{
    connect_storage_emulator, get_storage, register_storage_backend, storage_ref, MemoryStorageBackend,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    register_storage_backend(Arc::new(MemoryStorageBackend::new()));

    let options = FirebaseOptions {
        storage_bucket: Some("gs://your-project.appspot.com".into()),
        ..Default::default()
    };
    let app = initialize_app(options, Some(FirebaseAppSettings::default()))?;
    let storage = get_storage(Some(&app), None)?;

    let inputs = [
        "images/stars.jpg",
        "gs://other-bucket/o/stars.jpg",
        "https://firebasestorage.googleapis.com/v0/b/other-bucket/o/images%20stars.jpg?alt=media",
        "https://storage.googleapis.com/other-bucket/images/stars.jpg",
        "gs://missing-path",
    ];
    for input in inputs {
        match storage_ref(&storage, Some(input)) {
            Ok(reference) => println!("{input} -> {reference} (name: {})", reference.name()),
            Err(err) => println!("{input} -> error: {err}"),
        }
    }

    connect_storage_emulator(&storage, "127.0.0.1", 9199)?;
    let emulated = storage_ref(&storage, Some("http://127.0.0.1:9199/v0/b/local/o/file.txt"))?;
    println!("emulator URL -> {emulated}");
    Ok(())
}
