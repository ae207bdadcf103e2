//! Errors raised while reading or writing interchange documents.

use oumatrix_core::error::{CodecError, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InterchangeError {
    /// The text is not a well-formed document.
    #[error("malformed document at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("expected a question of type 'oumatrix', found '{0}'")]
    WrongType(String),

    /// A required element is absent.
    #[error("<{parent}> has no <{element}> element")]
    MissingElement { parent: String, element: String },

    /// An element holds a value outside its enumeration.
    #[error("invalid <{element}> value '{value}'")]
    InvalidValue { element: String, value: String },

    #[error("attachment '{name}' is not valid base64: {source}")]
    Attachment {
        name: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("row '{row}' has a bad correct-answer blob: {source}")]
    CorrectAnswers {
        row: String,
        #[source]
        source: CodecError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}
