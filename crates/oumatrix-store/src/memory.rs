//! In-memory stores for tests and embedding.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard};

use oumatrix_core::error::StoreError;
use oumatrix_core::model::ContextId;
use oumatrix_core::traits::{
    AttachmentStore, DraftHandle, FileOwner, Filter, Record, RecordId, RecordStore, StoredFile,
    Table,
};

use crate::areas::Areas;
use crate::tables::{Snapshot, Tables};

#[derive(Debug, Default)]
struct MemoryState {
    tables: Tables,
    transaction: Option<Snapshot>,
}

/// A record store held entirely in memory.
///
/// Supports one transaction at a time; rollback restores record contents
/// but not id sequences.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    /// Number of write calls made (insert, update, delete).
    write_count: AtomicU32,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently in `table`.
    pub fn count(&self, table: Table) -> usize {
        self.lock().map(|s| s.tables.count(table)).unwrap_or(0)
    }

    /// Get the number of write calls made to this store.
    pub fn write_count(&self) -> u32 {
        self.write_count.load(Ordering::Relaxed)
    }

    pub fn in_transaction(&self) -> bool {
        self.lock().map(|s| s.transaction.is_some()).unwrap_or(false)
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, table: Table, filter: &Filter) -> Result<Option<Record>, StoreError> {
        Ok(self.get_all(table, filter)?.into_iter().next())
    }

    fn get_all(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, StoreError> {
        Ok(self.lock()?.tables.select(table, filter))
    }

    fn insert(&self, table: Table, record: Record) -> Result<RecordId, StoreError> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.lock()?.tables.insert(table, record))
    }

    fn update(&self, table: Table, record: Record) -> Result<(), StoreError> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        self.lock()?.tables.update(table, record)
    }

    fn delete(&self, table: Table, filter: &Filter) -> Result<usize, StoreError> {
        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(self.lock()?.tables.delete(table, filter))
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
        self.lock()?
            .transaction
            .take()
            .map(|_| ())
            .ok_or(StoreError::NoTransaction)
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let snapshot = state.transaction.take().ok_or(StoreError::NoTransaction)?;
        state.tables.restore(snapshot);
        tracing::debug!("memory store rolled back");
        Ok(())
    }
}

/// An attachment store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryAttachments {
    areas: Mutex<Areas>,
}

impl MemoryAttachments {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Areas>, StoreError> {
        self.areas.lock().map_err(|_| StoreError::Poisoned)
    }
}

impl AttachmentStore for MemoryAttachments {
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
        self.lock()?.persist(draft, owner, text)
    }

    fn move_files(&self, owner: &FileOwner, to_context: ContextId) -> Result<(), StoreError> {
        self.lock()?.move_to(owner, to_context);
        Ok(())
    }

    fn delete_files(&self, owner: &FileOwner) -> Result<(), StoreError> {
        self.lock()?.delete(owner);
        Ok(())
    }

    fn files(&self, owner: &FileOwner) -> Result<Vec<StoredFile>, StoreError> {
        Ok(self.lock()?.files(owner))
    }

    fn import_files_as_draft(&self, files: Vec<StoredFile>) -> Result<DraftHandle, StoreError> {
        Ok(self.lock()?.new_draft(files))
    }
}
