//! oumatrix-store — Record and attachment stores.
//!
//! Implements the `RecordStore` and `AttachmentStore` traits from
//! `oumatrix-core` twice: in memory (tests, embedding) and as JSON documents
//! in a directory (the CLI's default).

pub mod areas;
pub mod config;
pub mod file;
pub mod memory;
pub mod tables;

pub use config::{open_store, OpenStore};
pub use file::{JsonFileAttachments, JsonFileStore};
pub use memory::{MemoryAttachments, MemoryStore};
