//! Modular Cloud Storage for Firebase API for Rust.
//!
//! The [`storage`] module validates arguments and resolves references before handing each call
//! to a pluggable [`storage::StorageBackend`]. [`app`] holds the Firebase app registry the storage
//! instances are bound to, and [`logger`] is the shared logging facility.

pub mod app;
pub mod logger;
pub mod storage;
