//! Capabilities the core consumes from its host.
//!
//! The persistence layer is a key-value record store and the file subsystem
//! an opaque blob store keyed by owner. Both are traits here and are
//! implemented by the `oumatrix-store` crate.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{ContextId, HintId, QuestionId, RowId};

// ---------------------------------------------------------------------------
// Record store
// ---------------------------------------------------------------------------

/// A stored record: a flat key-value object.
pub type Record = Map<String, Value>;

/// Identifier assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The tables the matrix question type owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Options,
    Columns,
    Rows,
    /// Hints shared with the host's other question types.
    Hints,
}

impl Table {
    pub const ALL: [Table; 4] = [Table::Options, Table::Columns, Table::Rows, Table::Hints];

    /// Physical table name.
    pub fn name(self) -> &'static str {
        match self {
            Table::Options => "qtype_oumatrix_options",
            Table::Columns => "qtype_oumatrix_columns",
            Table::Rows => "qtype_oumatrix_rows",
            Table::Hints => "question_hints",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Equality filter over record fields. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<(String, Value)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field_eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and(field, value)
    }

    pub fn and(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    /// All records belonging to a question.
    pub fn by_question(question_id: QuestionId) -> Self {
        Self::field_eq("questionid", question_id.0)
    }

    pub fn by_id(id: RecordId) -> Self {
        Self::field_eq("id", id.0)
    }

    pub fn matches(&self, record: &Record) -> bool {
        self.conditions
            .iter()
            .all(|(field, value)| record.get(field) == Some(value))
    }
}

/// Read the `id` field of a record.
pub fn record_id(record: &Record) -> Option<RecordId> {
    record.get("id").and_then(Value::as_u64).map(RecordId)
}

/// Key-value record store with per-record atomicity.
///
/// `begin`/`commit`/`rollback` bracket multi-record work; stores that cannot
/// roll back must still accept the calls.
pub trait RecordStore: Send + Sync {
    /// First record matching `filter`, if any.
    fn get(&self, table: Table, filter: &Filter) -> Result<Option<Record>, StoreError>;

    /// All records matching `filter`, in insertion order.
    fn get_all(&self, table: Table, filter: &Filter) -> Result<Vec<Record>, StoreError>;

    /// Insert a record and return its new id. Any `id` field is overwritten.
    fn insert(&self, table: Table, record: Record) -> Result<RecordId, StoreError>;

    /// Replace the record with the same `id`.
    fn update(&self, table: Table, record: Record) -> Result<(), StoreError>;

    /// Delete every matching record and return how many were removed.
    fn delete(&self, table: Table, filter: &Filter) -> Result<usize, StoreError>;

    fn begin(&self) -> Result<(), StoreError>;

    fn commit(&self) -> Result<(), StoreError>;

    fn rollback(&self) -> Result<(), StoreError>;
}

// ---------------------------------------------------------------------------
// Attachment store
// ---------------------------------------------------------------------------

/// Placeholder that stored texts use to reference their own files.
pub const PLUGINFILE_PREFIX: &str = "@@PLUGINFILE@@/";

/// Placeholder used by texts that reference files in a draft area.
pub const DRAFTFILE_PREFIX: &str = "@@DRAFTFILE@@/";

/// Rewrite stored file references to point at a draft area.
pub fn to_draft_urls(text: &str) -> String {
    text.replace(PLUGINFILE_PREFIX, DRAFTFILE_PREFIX)
}

/// Rewrite draft file references back to stored references.
pub fn to_plugin_urls(text: &str) -> String {
    text.replace(DRAFTFILE_PREFIX, PLUGINFILE_PREFIX)
}

/// Handle to a temporary area holding files while text is edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DraftHandle(pub Uuid);

impl DraftHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DraftHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DraftHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which text field a set of files belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileArea {
    /// Per-row feedback, owned by a row id.
    RowFeedback,
    /// Combined feedback fields, owned by the question id.
    CorrectFeedback,
    PartiallyCorrectFeedback,
    IncorrectFeedback,
    /// Hint text, owned by a hint id.
    Hint,
}

impl FileArea {
    pub const COMBINED: [FileArea; 3] = [
        FileArea::CorrectFeedback,
        FileArea::PartiallyCorrectFeedback,
        FileArea::IncorrectFeedback,
    ];

    /// Component that owns the area.
    pub fn component(self) -> &'static str {
        match self {
            FileArea::RowFeedback => "qtype_oumatrix",
            _ => "question",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FileArea::RowFeedback => "feedback",
            FileArea::CorrectFeedback => "correctfeedback",
            FileArea::PartiallyCorrectFeedback => "partiallycorrectfeedback",
            FileArea::IncorrectFeedback => "incorrectfeedback",
            FileArea::Hint => "hint",
        }
    }
}

/// Full address of a file area.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FileOwner {
    pub context: ContextId,
    pub area: FileArea,
    pub item_id: u64,
}

impl FileOwner {
    pub fn row_feedback(context: ContextId, row: RowId) -> Self {
        Self {
            context,
            area: FileArea::RowFeedback,
            item_id: row.0,
        }
    }

    pub fn hint(context: ContextId, hint: HintId) -> Self {
        Self {
            context,
            area: FileArea::Hint,
            item_id: hint.0,
        }
    }

    pub fn combined(context: ContextId, area: FileArea, question: QuestionId) -> Self {
        Self {
            context,
            area,
            item_id: question.0,
        }
    }

    /// Same owner in another context.
    pub fn in_context(self, context: ContextId) -> Self {
        Self { context, ..self }
    }
}

impl fmt::Display for FileOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.context,
            self.area.component(),
            self.area.name(),
            self.item_id
        )
    }
}

/// A stored attachment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    pub name: String,
    /// Directory path inside the area, `/` for the root.
    pub path: String,
    pub content: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            path: "/".to_string(),
            content,
            created_at: Utc::now(),
        }
    }
}

/// Opaque blob store for files embedded in rich text.
pub trait AttachmentStore: Send + Sync {
    /// Copy an owner's files into a fresh draft area.
    fn prepare_draft_area(&self, owner: &FileOwner) -> Result<DraftHandle, StoreError>;

    /// Replace `owner`'s files with the draft's and return the text with
    /// draft references rewritten to stored references.
    fn persist_draft_as_files(
        &self,
        draft: DraftHandle,
        owner: &FileOwner,
        text: &str,
    ) -> Result<String, StoreError>;

    /// Move an owner's files to another context.
    fn move_files(&self, owner: &FileOwner, to_context: ContextId) -> Result<(), StoreError>;

    fn delete_files(&self, owner: &FileOwner) -> Result<(), StoreError>;

    /// Files currently stored for `owner`, ordered by path and name.
    fn files(&self, owner: &FileOwner) -> Result<Vec<StoredFile>, StoreError>;

    /// Create a draft area pre-filled with `files`.
    fn import_files_as_draft(&self, files: Vec<StoredFile>) -> Result<DraftHandle, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn filter_matches_all_conditions() {
        let r = record(json!({"id": 3, "questionid": 9, "number": 0}));
        assert!(Filter::by_question(QuestionId(9)).matches(&r));
        assert!(Filter::by_question(QuestionId(9)).and("number", 0).matches(&r));
        assert!(!Filter::by_question(QuestionId(9)).and("number", 1).matches(&r));
        assert!(Filter::new().matches(&r));
        assert_eq!(record_id(&r), Some(RecordId(3)));
    }

    #[test]
    fn draft_url_rewriting_roundtrips() {
        let stored = "<img src=\"@@PLUGINFILE@@/cat.png\">";
        let draft = to_draft_urls(stored);
        assert_eq!(draft, "<img src=\"@@DRAFTFILE@@/cat.png\">");
        assert_eq!(to_plugin_urls(&draft), stored);
    }

    #[test]
    fn file_owner_display() {
        let owner = FileOwner::row_feedback(ContextId(2), RowId(14));
        assert_eq!(owner.to_string(), "2/qtype_oumatrix/feedback/14");
        let moved = owner.in_context(ContextId(5));
        assert_eq!(moved.item_id, 14);
        assert_eq!(moved.context, ContextId(5));

        let hint = FileOwner::hint(ContextId(2), HintId(8));
        assert_eq!(hint.to_string(), "2/question/hint/8");
        assert_eq!(Table::Hints.to_string(), "question_hints");
    }
}
