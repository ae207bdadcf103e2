//! JSON-file backed stores.
//!
//! Records live in `records.json` and stored file areas in `files.json`
//! under one data directory. Outside a transaction every write is flushed
//! immediately; inside one, the file is only rewritten on commit.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::de::DeserializeOwned;
use serde::Serialize;

use oumatrix_core::error::StoreError;
use oumatrix_core::model::ContextId;
use oumatrix_core::traits::{
    AttachmentStore, DraftHandle, FileOwner, Filter, Record, RecordId, RecordStore, StoredFile,
    Table,
};

use crate::areas::{AreaEntry, Areas};
use crate::tables::{Snapshot, Tables};

const RECORDS_FILE: &str = "records.json";
const FILES_FILE: &str = "files.json";

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Read a JSON document, or `None` if the file does not exist yet.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(path)(e)),
    }
}

/// Write a JSON document through a temporary file and rename it into place.
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content).map_err(io_error(&tmp))?;
    std::fs::rename(&tmp, path).map_err(io_error(path))?;
    Ok(())
}

#[derive(Debug)]
struct FileState {
    tables: Tables,
    transaction: Option<Snapshot>,
}

/// Record store persisted as a single JSON document.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    state: Mutex<FileState>,
}

impl JsonFileStore {
    /// Open (or lazily create) the store in `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(RECORDS_FILE);
        let tables = read_json(&path)?.unwrap_or_default();
        tracing::debug!("opened record store at {}", path.display());
        Ok(Self {
            path,
            state: Mutex::new(FileState {
                tables,
                transaction: None,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> Result<MutexGuard<'_, FileState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Tables) -> Result<T, StoreError>) -> Result<T, StoreError> {
        let mut state = self.lock()?;
        let result = f(&mut state.tables)?;
        if state.transaction.is_none() {
            write_json(&self.path, &state.tables)?;
        }
        Ok(result)
    }
}

impl RecordStore for JsonFileStore {
    fn get(&self, table: Table, filter: &Filter) -> Result<Option<Record>, StoreError> {
        Ok(self.get_all(table, filter)?.into_iter().next())
    }

    fn get_all(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        Ok(self.lock()?.tables.select(table, filter))
    }

    fn insert(&self, table: Table, record: Record) -> Result<RecordId, StoreError> {
        self.write(|tables| Ok(tables.insert(table, record)))
    }

    fn update(&self, table: Table, record: Record) -> Result<(), StoreError> {
        self.write(|tables| tables.update(table, record))
    }

    fn delete(&self, table: Table, filter: &Filter) -> Result<usize, StoreError> {
        self.write(|tables| Ok(tables.delete(table, filter)))
    }

    fn begin(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.transaction.is_some() {
            return Err(StoreError::TransactionInProgress);
        }
        state.transaction = Some(state.tables.snapshot());
        Ok(())
    }

    fn commit(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        if state.transaction.is_none() {
            return Err(StoreError::NoTransaction);
        }
        write_json(&self.path, &state.tables)?;
        state.transaction = None;
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let snapshot = state.transaction.take().ok_or(StoreError::NoTransaction)?;
        state.tables.restore(snapshot);
        // Persist the advanced sequences so rolled back ids stay unused.
        write_json(&self.path, &state.tables)?;
        tracing::debug!("rolled back transaction on {}", self.path.display());
        Ok(())
    }
}

/// Attachment store persisting stored areas as JSON. Draft areas are kept
/// in memory only.
#[derive(Debug)]
pub struct JsonFileAttachments {
    path: PathBuf,
    areas: Mutex<Areas>,
}

impl JsonFileAttachments {
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(FILES_FILE);
        let entries: Vec<AreaEntry> = read_json(&path)?.unwrap_or_default();
        Ok(Self {
            path,
            areas: Mutex::new(Areas::from_entries(entries)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Areas>, StoreError> {
        self.areas.lock().map_err(|_| StoreError::Poisoned)
    }

    fn flush(&self, areas: &Areas) -> Result<(), StoreError> {
        write_json(&self.path, &areas.entries())
    }
}

impl AttachmentStore for JsonFileAttachments {
    fn prepare_draft_area(&self, owner: &FileOwner) -> Result<DraftHandle, StoreError> {
        let mut areas = self.lock()?;
        let files = areas.files(owner);
        Ok(areas.new_draft(files))
    }

    fn persist_draft_as_files(
        &self,
        draft: DraftHandle,
        owner: &FileOwner,
        text: &str,
    ) -> Result<String, StoreError> {
        let mut areas = self.lock()?;
        let text = areas.persist(draft, owner, text)?;
        self.flush(&areas)?;
        Ok(text)
    }

    fn move_files(&self, owner: &FileOwner, to_context: ContextId) -> Result<(), StoreError> {
        let mut areas = self.lock()?;
        if areas.move_to(owner, to_context) {
            self.flush(&areas)?;
        }
        Ok(())
    }

    fn delete_files(&self, owner: &FileOwner) -> Result<(), StoreError> {
        let mut areas = self.lock()?;
        if areas.delete(owner) {
            self.flush(&areas)?;
        }
        Ok(())
    }

    fn files(&self, owner: &FileOwner) -> Result<Vec<StoredFile>, StoreError> {
        Ok(self.lock()?.files(owner))
    }

    fn import_files_as_draft(&self, files: Vec<StoredFile>) -> Result<DraftHandle, StoreError> {
        Ok(self.lock()?.new_draft(files))
    }
}
