//! `opsdeck-store` -- script definition models and the JSON-file
//! backed catalog store.
//!
//! The catalog is one whole-document JSON file: every mutation
//! read-modify-writes the full collection under a single mutex and
//! persists it atomically (write-to-temp-then-rename), so readers
//! never observe a partial write.

pub mod error;
pub mod models;
pub mod store;

pub use error::StoreError;
pub use store::ScriptStore;
