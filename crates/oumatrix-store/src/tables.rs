//! Table state shared by the memory and file stores.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use oumatrix_core::error::StoreError;
use oumatrix_core::traits::{record_id, Filter, Record, RecordId, Table};

/// Records of every table plus the id sequence of each.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tables {
    #[serde(default)]
    records: BTreeMap<Table, Vec<Record>>,
    #[serde(default)]
    sequences: BTreeMap<Table, u64>,
}

/// Saved record contents for rolling back a transaction.
///
/// Sequences are not part of a snapshot, so ids handed out inside a rolled
/// back transaction are never reused.
#[derive(Debug, Clone)]
pub struct Snapshot(BTreeMap<Table, Vec<Record>>);

impl Tables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Matching records in insertion order.
    pub fn select(&self, table: Table, filter: &Filter) -> Vec<Record> {
        self.records
            .get(&table)
            .map(|rows| rows.iter().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default()
    }

    pub fn insert(&mut self, table: Table, mut record: Record) -> RecordId {
        let next = self.sequences.entry(table).or_insert(0);
        *next += 1;
        let id = RecordId(*next);
        record.insert("id".to_string(), id.0.into());
        self.records.entry(table).or_default().push(record);
        id
    }

    pub fn update(&mut self, table: Table, record: Record) -> Result<(), StoreError> {
        let id = record_id(&record).ok_or(StoreError::MissingId { table })?;
        let slot = self
            .records
            .get_mut(&table)
            .and_then(|rows| rows.iter_mut().find(|r| record_id(r) == Some(id)))
            .ok_or(StoreError::NotFound { table, id })?;
        *slot = record;
        Ok(())
    }

    pub fn delete(&mut self, table: Table, filter: &Filter) -> usize {
        let Some(rows) = self.records.get_mut(&table) else {
            return 0;
        };
        let before = rows.len();
        rows.retain(|r| !filter.matches(r));
        before - rows.len()
    }

    /// Number of records in `table`.
    pub fn count(&self, table: Table) -> usize {
        self.records.get(&table).map_or(0, Vec::len)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot(self.records.clone())
    }

    pub fn restore(&mut self, snapshot: Snapshot) {
        self.records = snapshot.0;
    }
}
