//! oumatrix-core — Answer-matrix data model and transformation pipeline.
//!
//! This crate defines the matrix question model (columns, rows and their
//! correct-answer sets), the codec between its flat encodings, authored-form
//! validation, the persistence mapper over pluggable record/attachment stores,
//! and the correctness evaluator.

pub mod codec;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod form;
pub mod mapper;
pub mod model;
pub mod parser;
pub mod registry;
pub mod traits;
pub mod validation;

pub use config::MatrixConfig;
pub use error::{CodecError, MatrixError, RegistryError, StoreError};
pub use form::{AuthoredForm, AuthoredHint, AuthoredRow};
pub use mapper::PersistenceMapper;
pub use model::{
    Column, ColumnId, CorrectAnswers, GradeMethod, Hint, HintId, InputMode, MatrixQuestion,
    QuestionId, QuestionOptions, Row, RowId,
};
pub use registry::{ColumnRegistry, RowRegistry};
