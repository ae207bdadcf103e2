//! Store construction from configuration.

use anyhow::{Context, Result};

use oumatrix_core::config::StoreConfig;
use oumatrix_core::traits::{AttachmentStore, RecordStore};

use crate::file::{JsonFileAttachments, JsonFileStore};
use crate::memory::{MemoryAttachments, MemoryStore};

/// A record store paired with the attachment store that goes with it.
pub struct OpenStore {
    pub records: Box<dyn RecordStore>,
    pub files: Box<dyn AttachmentStore>,
}

/// Create the stores described by `config`.
pub fn open_store(config: &StoreConfig) -> Result<OpenStore> {
    match config {
        StoreConfig::Memory => Ok(OpenStore {
            records: Box::new(MemoryStore::new()),
            files: Box::new(MemoryAttachments::new()),
        }),
        StoreConfig::File { path } => {
            let records = JsonFileStore::open(path)
                .with_context(|| format!("failed to open record store in {}", path.display()))?;
            let files = JsonFileAttachments::open(path)
                .with_context(|| format!("failed to open file store in {}", path.display()))?;
            tracing::debug!("using file store at {}", path.display());
            Ok(OpenStore {
                records: Box::new(records),
                files: Box::new(files),
            })
        }
    }
}
