//! Correctness signals for a response against a stored question.
//!
//! None of this is grading. It answers per-cell questions for rendering
//! feedback icons and computes the reporting baselines.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{InputMode, MatrixQuestion};
use crate::registry::RowRegistry;

/// Selected column numbers per row number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatrixResponse {
    selections: BTreeMap<usize, BTreeSet<usize>>,
}

impl MatrixResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `column` to the selection of `row`.
    pub fn select(mut self, row: usize, column: usize) -> Self {
        self.selections.entry(row).or_default().insert(column);
        self
    }

    /// Make `column` the only selection of `row`.
    pub fn choose(mut self, row: usize, column: usize) -> Self {
        self.selections.insert(row, BTreeSet::from([column]));
        self
    }

    pub fn is_selected(&self, row: usize, column: usize) -> bool {
        self.selections
            .get(&row)
            .is_some_and(|columns| columns.contains(&column))
    }

    pub fn selected(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        self.selections.get(&row).into_iter().flatten().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.selections.values().all(BTreeSet::is_empty)
    }
}

/// Outcome of one cell of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellFeedback {
    pub row: usize,
    pub column: usize,
    pub selected: bool,
    pub correct: bool,
}

/// Whether column `column_number` is correct for row `row_number`.
///
/// Unknown rows or columns are never right.
pub fn is_right(question: &MatrixQuestion, row_number: usize, column_number: usize) -> bool {
    let (Some(row), Some(column)) = (
        question.rows.get(row_number),
        question.columns.get(column_number),
    ) else {
        return false;
    };
    column.id.is_some_and(|id| row.correct_answers.contains(id))
}

/// Feedback for every cell, row by row.
pub fn cell_feedback(question: &MatrixQuestion, response: &MatrixResponse) -> Vec<CellFeedback> {
    question
        .rows
        .iter()
        .flat_map(|row| {
            question.columns.iter().map(move |column| CellFeedback {
                row: row.number,
                column: column.number,
                selected: response.is_selected(row.number, column.number),
                correct: column.id.is_some_and(|id| row.correct_answers.contains(id)),
            })
        })
        .collect()
}

/// Count of correct cells whose marker is exactly 1.
pub fn num_correct_choices(rows: &RowRegistry) -> usize {
    rows.iter().map(|row| row.correct_answers.counted()).sum()
}

/// Baseline score for uninformed guessing: correct cells divided by rows.
///
/// This is a reporting heuristic, not a probability. It assumes the student
/// is told how many answers each row has, and it exceeds 1.0 whenever rows
/// have more than one correct column. An empty question scores 0.0.
pub fn random_guess_score(rows: &RowRegistry) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    num_correct_choices(rows) as f64 / rows.len() as f64
}

/// Total number of selected cells.
pub fn num_selected_choices(response: &MatrixResponse) -> usize {
    response.selections.values().map(BTreeSet::len).sum()
}

/// Whether a multiple-mode response selects more cells than are correct.
///
/// Always `false` in single mode.
pub fn too_many_selected(question: &MatrixQuestion, response: &MatrixResponse) -> bool {
    question.input_mode() == InputMode::Multiple
        && num_selected_choices(response) > num_correct_choices(&question.rows)
}

/// Number of rows whose selection is exactly the correct set.
pub fn rows_fully_correct(question: &MatrixQuestion, response: &MatrixResponse) -> usize {
    question
        .rows
        .iter()
        .filter(|row| {
            let correct: BTreeSet<usize> = question
                .columns
                .iter()
                .filter(|c| c.id.is_some_and(|id| row.correct_answers.contains(id)))
                .map(|c| c.number)
                .collect();
            let selected: BTreeSet<usize> = response.selected(row.number).collect();
            !correct.is_empty() && correct == selected
        })
        .count()
}

/// Text describing the right answer, e.g.
/// `The correct answers are: Cats => Mammal, Frogs => Amphibian`.
///
/// Empty when no row has a correct column.
pub fn correct_response_summary(question: &MatrixQuestion) -> String {
    let parts: Vec<String> = question
        .rows
        .iter()
        .filter_map(|row| {
            let names = question.correct_column_names(row);
            (!names.is_empty()).then(|| format!("{} => {}", row.name, names.join(", ")))
        })
        .collect();

    match parts.len() {
        0 => String::new(),
        1 => format!("The correct answer is: {}", parts[0]),
        _ => format!("The correct answers are: {}", parts.join(", ")),
    }
}
