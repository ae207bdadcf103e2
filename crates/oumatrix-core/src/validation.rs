//! Authored-form validation.
//!
//! Six independent checks run in a fixed order and every failure is
//! collected; nothing short-circuits. Each error is keyed to the form widget
//! it belongs to so the authoring boundary can attach it in place.

use std::collections::HashSet;
use std::fmt;

use crate::codec::parse_choice;
use crate::config::ValidationLimits;
use crate::error::{CodecError, MatrixError};
use crate::form::AuthoredForm;
use crate::model::InputMode;

/// The form widget an error attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FieldKey {
    /// The name field of column slot `i`.
    ColumnName(usize),
    /// The group of fields of row slot `i`.
    RowOptions(usize),
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKey::ColumnName(i) => write!(f, "columnname[{i}]"),
            FieldKey::RowOptions(i) => write!(f, "rowoptions[{i}]"),
        }
    }
}

/// Machine-readable reason for a validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    NotEnoughColumns { min: usize },
    DuplicateName { name: String },
    /// A blank column slot sits before a named one.
    BlankColumn,
    NotEnoughRows { min: usize },
    MissingAnswer,
    /// A single-mode choice names a column that does not exist.
    UnknownColumn { ordinal: usize },
    /// A single-mode choice carries no column number.
    InvalidChoice { value: String },
}

/// A validation failure attached to one form widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub key: FieldKey,
    pub kind: ValidationErrorKind,
}

impl FieldError {
    pub fn new(key: FieldKey, kind: ValidationErrorKind) -> Self {
        Self { key, kind }
    }

    /// Message shown to the author.
    pub fn message(&self) -> String {
        match &self.kind {
            ValidationErrorKind::NotEnoughColumns { min } => {
                format!("You must have at least {min} columns.")
            }
            ValidationErrorKind::DuplicateName { name } => {
                format!("Duplicate name '{name}' is not allowed.")
            }
            ValidationErrorKind::BlankColumn => {
                "Blank columns are not allowed before a named column.".to_string()
            }
            ValidationErrorKind::NotEnoughRows { min } => {
                format!("You must have at least {min} rows.")
            }
            ValidationErrorKind::MissingAnswer => {
                "This row needs at least one correct answer.".to_string()
            }
            ValidationErrorKind::UnknownColumn { ordinal } => {
                format!("Column {ordinal} does not exist.")
            }
            ValidationErrorKind::InvalidChoice { value } => {
                format!("'{value}' is not a column choice.")
            }
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.key, self.message())
    }
}

/// Run every check over `form` and return the errors in rule order.
///
/// An empty list means the form can be saved.
pub fn validate_form(form: &AuthoredForm, limits: &ValidationLimits) -> Vec<FieldError> {
    let columns: Vec<&str> = form.columns.iter().map(String::as_str).collect();
    let rows: Vec<&str> = form.rows.iter().map(|r| r.name.as_str()).collect();

    let mut errors = Vec::new();
    check_minimum(&columns, limits.min_columns, &mut errors, |slot, min| {
        FieldError::new(
            FieldKey::ColumnName(slot),
            ValidationErrorKind::NotEnoughColumns { min },
        )
    });
    check_duplicates(&columns, &mut errors, FieldKey::ColumnName);
    check_interior_blanks(&columns, &mut errors);
    check_minimum(&rows, limits.min_rows, &mut errors, |slot, min| {
        FieldError::new(
            FieldKey::RowOptions(slot),
            ValidationErrorKind::NotEnoughRows { min },
        )
    });
    check_duplicates(&rows, &mut errors, FieldKey::RowOptions);
    check_answers(form, &mut errors);
    errors
}

fn is_blank(name: &str) -> bool {
    name.trim().is_empty()
}

fn check_minimum(
    names: &[&str],
    min: usize,
    errors: &mut Vec<FieldError>,
    error: impl Fn(usize, usize) -> FieldError,
) {
    let filled = names.iter().filter(|n| !is_blank(n)).count();
    if filled < min {
        let slot = names.iter().position(|n| is_blank(n)).unwrap_or(names.len());
        errors.push(error(slot, min));
    }
}

fn check_duplicates(names: &[&str], errors: &mut Vec<FieldError>, key: fn(usize) -> FieldKey) {
    let mut seen = HashSet::new();
    for (slot, name) in names.iter().enumerate() {
        if is_blank(name) {
            continue;
        }
        if !seen.insert(name.trim()) {
            errors.push(FieldError::new(
                key(slot),
                ValidationErrorKind::DuplicateName {
                    name: name.trim().to_string(),
                },
            ));
        }
    }
}

fn check_interior_blanks(columns: &[&str], errors: &mut Vec<FieldError>) {
    let Some(last_named) = columns.iter().rposition(|n| !is_blank(n)) else {
        return;
    };
    for (slot, name) in columns[..last_named].iter().enumerate() {
        if is_blank(name) {
            errors.push(FieldError::new(
                FieldKey::ColumnName(slot),
                ValidationErrorKind::BlankColumn,
            ));
        }
    }
}

fn check_answers(form: &AuthoredForm, errors: &mut Vec<FieldError>) {
    let column_slots = form.columns.len();
    for (slot, row) in form.rows.iter().enumerate() {
        if row.is_blank() {
            continue;
        }
        if !row.has_answer(form.input_mode, column_slots) {
            errors.push(FieldError::new(
                FieldKey::RowOptions(slot),
                ValidationErrorKind::MissingAnswer,
            ));
            continue;
        }
        if form.input_mode == InputMode::Single {
            if let Some(Err(err)) = row.choice.as_deref().map(|c| parse_choice(slot, c)) {
                errors.extend(codec_failure(err).field_errors().iter().cloned());
            }
        }
    }
}

/// Convert a codec failure raised while decoding an authored row into the
/// error the author sees.
///
/// Unusable single-mode choices become a field error on the row; anything
/// else passes through unchanged.
pub fn codec_failure(err: CodecError) -> MatrixError {
    match err {
        CodecError::ColumnOrdinalOutOfRange { row, ordinal, .. } => {
            MatrixError::Invalid(vec![FieldError::new(
                FieldKey::RowOptions(row),
                ValidationErrorKind::UnknownColumn { ordinal },
            )])
        }
        CodecError::InvalidChoice { row, value } => MatrixError::Invalid(vec![FieldError::new(
            FieldKey::RowOptions(row),
            ValidationErrorKind::InvalidChoice { value },
        )]),
        other => MatrixError::Codec(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::AuthoredRow;
    use proptest::prelude::*;

    fn form(columns: &[&str], rows: Vec<AuthoredRow>) -> AuthoredForm {
        AuthoredForm {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
            ..AuthoredForm::default()
        }
    }

    fn answered(names: &[&str]) -> Vec<AuthoredRow> {
        names.iter().map(|n| AuthoredRow::new(*n).choose(1)).collect()
    }

    fn limits() -> ValidationLimits {
        ValidationLimits::default()
    }

    #[test]
    fn valid_form_has_no_errors() {
        let f = form(&["Yes", "No"], answered(&["a", "b"]));
        assert!(validate_form(&f, &limits()).is_empty());
    }

    #[test]
    fn duplicate_column_keyed_to_second_occurrence() {
        let f = form(&["A", "A", "B"], answered(&["a", "b"]));
        let errors = validate_form(&f, &limits());
        assert_eq!(
            errors,
            vec![FieldError::new(
                FieldKey::ColumnName(1),
                ValidationErrorKind::DuplicateName { name: "A".into() }
            )]
        );
        assert_eq!(errors[0].key.to_string(), "columnname[1]");
    }

    #[test]
    fn interior_blank_column_rejected() {
        let f = form(&["A", "", "B"], answered(&["a", "b"]));
        let errors = validate_form(&f, &limits());
        assert_eq!(
            errors,
            vec![FieldError::new(
                FieldKey::ColumnName(1),
                ValidationErrorKind::BlankColumn
            )]
        );
    }

    #[test]
    fn trailing_blank_column_tolerated() {
        let f = form(&["A", "B", ""], answered(&["a", "b"]));
        assert!(validate_form(&f, &limits()).is_empty());
    }

    #[test]
    fn too_few_columns_keyed_to_first_blank_slot() {
        let f = form(&["A", "", ""], answered(&["a", "b"]));
        let errors = validate_form(&f, &limits());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key, FieldKey::ColumnName(1));
        assert_eq!(errors[0].kind, ValidationErrorKind::NotEnoughColumns { min: 2 });
    }

    #[test]
    fn too_few_columns_without_blank_keyed_past_end() {
        let f = form(&["A"], answered(&["a", "b"]));
        let errors = validate_form(&f, &limits());
        assert_eq!(errors[0].key, FieldKey::ColumnName(1));
    }

    #[test]
    fn too_few_rows() {
        let f = form(&["A", "B"], answered(&["only"]));
        let errors = validate_form(&f, &limits());
        assert_eq!(
            errors,
            vec![FieldError::new(
                FieldKey::RowOptions(1),
                ValidationErrorKind::NotEnoughRows { min: 2 }
            )]
        );
    }

    #[test]
    fn duplicate_rows_compared_trimmed_and_case_sensitive() {
        let f = form(&["A", "B"], answered(&["x", " x ", "X"]));
        let errors = validate_form(&f, &limits());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key.to_string(), "rowoptions[1]");
    }

    #[test]
    fn missing_single_answer() {
        let rows = vec![AuthoredRow::new("a").choose(2), AuthoredRow::new("b")];
        let f = form(&["A", "B"], rows);
        let errors = validate_form(&f, &limits());
        assert_eq!(
            errors,
            vec![FieldError::new(
                FieldKey::RowOptions(1),
                ValidationErrorKind::MissingAnswer
            )]
        );
    }

    #[test]
    fn choice_without_column_number_is_a_row_error() {
        let rows = vec![
            AuthoredRow::new("a").choose(1),
            AuthoredRow::new("b").with_choice_value("none"),
        ];
        let f = form(&["A", "B"], rows);
        let expected = vec![FieldError::new(
            FieldKey::RowOptions(1),
            ValidationErrorKind::InvalidChoice {
                value: "none".into(),
            },
        )];
        assert_eq!(validate_form(&f, &limits()), expected);

        match f.normalize(crate::model::QuestionId(1)) {
            Err(MatrixError::Invalid(errors)) => assert_eq!(errors, expected),
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn multiple_mode_ignores_flags_outside_columns() {
        let rows = vec![AuthoredRow::new("a").flag(0), AuthoredRow::new("b").flag(5)];
        let f = AuthoredForm {
            input_mode: InputMode::Multiple,
            ..form(&["A", "B"], rows)
        };
        let errors = validate_form(&f, &limits());
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key, FieldKey::RowOptions(1));
    }

    #[test]
    fn blank_rows_need_no_answer() {
        let mut rows = answered(&["a", "b"]);
        rows.push(AuthoredRow::new(""));
        let f = form(&["A", "B"], rows);
        assert!(validate_form(&f, &limits()).is_empty());
    }

    #[test]
    fn all_rules_run_in_order() {
        let rows = vec![AuthoredRow::new("a"), AuthoredRow::new("a").choose(1)];
        let f = form(&["A", "", "A"], rows);
        let kinds: Vec<_> = validate_form(&f, &limits())
            .into_iter()
            .map(|e| e.key.to_string())
            .collect();
        assert_eq!(
            kinds,
            vec!["columnname[2]", "columnname[1]", "rowoptions[1]", "rowoptions[0]"]
        );
    }

    #[test]
    fn configured_minimums_apply() {
        let f = form(&["A", "B"], answered(&["a", "b"]));
        let strict = ValidationLimits {
            min_columns: 3,
            min_rows: 3,
        };
        let errors = validate_form(&f, &strict);
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].kind, ValidationErrorKind::NotEnoughColumns { min: 3 });
        assert_eq!(errors[1].kind, ValidationErrorKind::NotEnoughRows { min: 3 });
    }

    #[test]
    fn codec_ordinal_failure_becomes_field_error() {
        let err = codec_failure(CodecError::ColumnOrdinalOutOfRange {
            row: 3,
            ordinal: 9,
            columns: 2,
        });
        assert_eq!(err.field_errors()[0].key, FieldKey::RowOptions(3));
        assert_eq!(err.field_errors()[0].message(), "Column 9 does not exist.");
    }

    proptest! {
        /// Forms the validator accepts normalise into rows whose correct
        /// sets are non-empty subsets of the created columns.
        #[test]
        fn accepted_forms_normalise(
            ncols in 2usize..6,
            picks in prop::collection::vec(prop::collection::btree_set(0usize..6, 1..4), 2..6),
            multiple in any::<bool>(),
        ) {
            let columns: Vec<String> = (0..ncols).map(|i| format!("C{i}")).collect();
            let rows: Vec<AuthoredRow> = picks
                .iter()
                .enumerate()
                .map(|(i, set)| {
                    let mut row = AuthoredRow::new(format!("R{i}"));
                    if multiple {
                        for k in set {
                            row = row.flag(*k % ncols);
                        }
                    } else if let Some(k) = set.iter().next() {
                        row = row.choose(k % ncols + 1);
                    }
                    row
                })
                .collect();
            let f = AuthoredForm {
                input_mode: if multiple { InputMode::Multiple } else { InputMode::Single },
                columns,
                rows,
                ..AuthoredForm::default()
            };
            prop_assume!(validate_form(&f, &limits()).is_empty());

            let question = f.normalize(crate::model::QuestionId(1)).unwrap();
            let ids = question.columns.ids();
            for row in &question.rows {
                prop_assert!(!row.correct_answers.is_empty());
                prop_assert!(row.correct_answers.column_ids().all(|id| ids.contains(&id)));
            }
        }
    }
}
