//! File-area state shared by the attachment stores.
//!
//! Stored areas are keyed by owner; draft areas live only as long as the
//! process and are consumed when persisted.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use oumatrix_core::error::StoreError;
use oumatrix_core::model::ContextId;
use oumatrix_core::traits::{to_plugin_urls, DraftHandle, FileOwner, StoredFile};

/// One stored area as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaEntry {
    pub owner: FileOwner,
    pub files: Vec<StoredFile>,
}

#[derive(Debug, Default)]
pub struct Areas {
    stored: BTreeMap<FileOwner, Vec<StoredFile>>,
    drafts: HashMap<DraftHandle, Vec<StoredFile>>,
}

impl Areas {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<AreaEntry>) -> Self {
        Self {
            stored: entries.into_iter().map(|e| (e.owner, e.files)).collect(),
            drafts: HashMap::new(),
        }
    }

    pub fn entries(&self) -> Vec<AreaEntry> {
        self.stored
            .iter()
            .map(|(owner, files)| AreaEntry {
                owner: *owner,
                files: files.clone(),
            })
            .collect()
    }

    /// Files of an area, ordered by path and name.
    pub fn files(&self, owner: &FileOwner) -> Vec<StoredFile> {
        let mut files = self.stored.get(owner).cloned().unwrap_or_default();
        files.sort_by(|a, b| (&a.path, &a.name).cmp(&(&b.path, &b.name)));
        files
    }

    pub fn new_draft(&mut self, files: Vec<StoredFile>) -> DraftHandle {
        let handle = DraftHandle::new();
        self.drafts.insert(handle, files);
        handle
    }

    /// Replace `owner`'s files with the draft's and rewrite `text`.
    pub fn persist(
        &mut self,
        draft: DraftHandle,
        owner: &FileOwner,
        text: &str,
    ) -> Result<String, StoreError> {
        let files = self
            .drafts
            .remove(&draft)
            .ok_or(StoreError::UnknownDraft(draft))?;
        if files.is_empty() {
            self.stored.remove(owner);
        } else {
            self.stored.insert(*owner, files);
        }
        Ok(to_plugin_urls(text))
    }

    /// Move an area to another context. Returns whether anything moved.
    pub fn move_to(&mut self, owner: &FileOwner, to: ContextId) -> bool {
        match self.stored.remove(owner) {
            Some(files) => {
                self.stored.insert(owner.in_context(to), files);
                true
            }
            None => false,
        }
    }

    pub fn delete(&mut self, owner: &FileOwner) -> bool {
        self.stored.remove(owner).is_some()
    }
}
