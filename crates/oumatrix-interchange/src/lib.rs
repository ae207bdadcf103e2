//! oumatrix-interchange — Portable question documents.
//!
//! Exports stored matrix questions to an XML interchange document keyed by
//! position rather than storage id, and imports such documents back into
//! authored forms that feed the normal save path.

pub mod document;
pub mod error;
pub mod export;
pub mod import;

pub use document::{parse_document, Element};
pub use error::InterchangeError;
pub use export::{export_question, export_quiz, QUESTION_TYPE};
pub use import::{import_document, import_question, ImportCursor};
