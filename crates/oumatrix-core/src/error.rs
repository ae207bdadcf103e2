//! Error types for the matrix pipeline.
//!
//! Validation failures are collected as field-keyed lists and travel inside
//! [`MatrixError::Invalid`]; integrity failures on load are a single typed
//! [`MatrixError::IncompleteQuestion`]. Store, codec and registry errors are
//! defined here so every crate in the workspace can match on them.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::model::QuestionId;
use crate::traits::{DraftHandle, RecordId, Table};
use crate::validation::FieldError;

/// Top-level error for mapper and pipeline operations.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// The authored form failed validation. Correctable by the author.
    #[error("matrix question is invalid ({} field error(s))", .0.len())]
    Invalid(Vec<FieldError>),

    /// Columns or rows are missing for a stored question.
    #[error("question {question_id} is incomplete: missing {missing}")]
    IncompleteQuestion {
        question_id: QuestionId,
        missing: MissingPart,
    },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl MatrixError {
    /// Field errors carried by an [`MatrixError::Invalid`], empty otherwise.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            MatrixError::Invalid(errors) => errors,
            _ => &[],
        }
    }

    /// Returns `true` for the "incomplete question" integrity condition.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, MatrixError::IncompleteQuestion { .. })
    }
}

/// Which required part of a stored question is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingPart {
    Columns,
    Rows,
}

impl fmt::Display for MissingPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingPart::Columns => write!(f, "columns"),
            MissingPart::Rows => write!(f, "rows"),
        }
    }
}

/// Errors from the answer codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The persisted correct-answer blob could not be parsed.
    #[error("malformed correct-answer blob: {reason}")]
    MalformedBlob { reason: String },

    /// A single-mode choice names a column that was not created.
    #[error("row {row}: column {ordinal} does not exist ({columns} column(s) defined)")]
    ColumnOrdinalOutOfRange {
        row: usize,
        ordinal: usize,
        columns: usize,
    },

    /// A single-mode choice carries no column ordinal at all.
    #[error("row {row}: '{value}' is not a column choice")]
    InvalidChoice { row: usize, value: String },

    /// A form field could not be interpreted.
    #[error("form field '{field}' has an invalid value '{value}'")]
    InvalidField { field: String, value: String },
}

/// The kind of registry entry an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Column,
    Row,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryKind::Column => write!(f, "column"),
            EntryKind::Row => write!(f, "row"),
        }
    }
}

/// Errors raised while building a column or row registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("{kind} {number} has a blank name")]
    BlankName { kind: EntryKind, number: usize },

    #[error("{kind} name '{name}' is used more than once")]
    DuplicateName { kind: EntryKind, name: String },

    #[error("{kind} numbers out of order: {found} follows {previous}")]
    OutOfOrder {
        kind: EntryKind,
        previous: usize,
        found: usize,
    },
}

/// Errors from record and attachment stores.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An update targeted a record that does not exist.
    #[error("no {table} record with id {id}")]
    NotFound { table: Table, id: RecordId },

    /// An update was given a record without an `id` field.
    #[error("{table} record has no id")]
    MissingId { table: Table },

    /// A record could not be converted to or from its typed form.
    #[error("failed to convert record: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backing file could not be read or written.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("a transaction is already in progress")]
    TransactionInProgress,

    #[error("no transaction in progress")]
    NoTransaction,

    /// A draft handle that the attachment store never issued.
    #[error("unknown draft area {0}")]
    UnknownDraft(DraftHandle),

    /// A lock guarding store state was poisoned by a panicking thread.
    #[error("store state lock poisoned")]
    Poisoned,
}
