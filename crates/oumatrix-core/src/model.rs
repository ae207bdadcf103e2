//! Core data model types for matrix questions.
//!
//! A matrix question is a grid of rows (sub-questions) against columns
//! (answer options). Each row carries the set of columns that are correct
//! for it: exactly one in single mode, one or more in multiple mode.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::registry::{ColumnRegistry, RowRegistry};
use crate::traits::{DraftHandle, RecordId};

/// Identifier of the question a matrix belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub u64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a persisted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnId(pub u64);

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RecordId> for ColumnId {
    fn from(id: RecordId) -> Self {
        ColumnId(id.0)
    }
}

/// Identifier of a persisted row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RecordId> for RowId {
    fn from(id: RecordId) -> Self {
        RowId(id.0)
    }
}

/// Identifier of a persisted hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HintId(pub u64);

impl fmt::Display for HintId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<RecordId> for HintId {
    fn from(id: RecordId) -> Self {
        HintId(id.0)
    }
}

/// The context (course, category) that owns a question's files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContextId(pub u64);

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How many columns a row may have correct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputMode {
    /// Exactly one correct column per row (radio buttons).
    Single,
    /// Any non-empty subset of columns per row (checkboxes).
    Multiple,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputMode::Single => write!(f, "single"),
            InputMode::Multiple => write!(f, "multiple"),
        }
    }
}

impl FromStr for InputMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" => Ok(InputMode::Single),
            "multiple" | "multi" => Ok(InputMode::Multiple),
            other => Err(format!("unknown input mode: {other}")),
        }
    }
}

/// Grading method; only meaningful in multiple mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GradeMethod {
    #[serde(rename = "partial")]
    PartialCredit,
    #[serde(rename = "allnone")]
    AllOrNothing,
}

impl GradeMethod {
    /// The grade method that actually applies under `mode`.
    ///
    /// Single mode has nothing to grade partially, so the stored value is
    /// ignored there.
    pub fn effective(self, mode: InputMode) -> Option<GradeMethod> {
        match mode {
            InputMode::Single => None,
            InputMode::Multiple => Some(self),
        }
    }
}

impl fmt::Display for GradeMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GradeMethod::PartialCredit => write!(f, "partial"),
            GradeMethod::AllOrNothing => write!(f, "allnone"),
        }
    }
}

impl FromStr for GradeMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "partial" => Ok(GradeMethod::PartialCredit),
            "allnone" => Ok(GradeMethod::AllOrNothing),
            other => Err(format!("unknown grade method: {other}")),
        }
    }
}

/// Text format of feedback fields, numbered as the host stores them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum TextFormat {
    Moodle,
    Html,
    Plain,
    Markdown,
}

impl From<TextFormat> for u8 {
    fn from(format: TextFormat) -> Self {
        match format {
            TextFormat::Moodle => 0,
            TextFormat::Html => 1,
            TextFormat::Plain => 2,
            TextFormat::Markdown => 4,
        }
    }
}

impl TryFrom<u8> for TextFormat {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TextFormat::Moodle),
            1 => Ok(TextFormat::Html),
            2 => Ok(TextFormat::Plain),
            4 => Ok(TextFormat::Markdown),
            other => Err(format!("unknown text format: {other}")),
        }
    }
}

impl fmt::Display for TextFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TextFormat::Moodle => write!(f, "moodle_auto_format"),
            TextFormat::Html => write!(f, "html"),
            TextFormat::Plain => write!(f, "plain_text"),
            TextFormat::Markdown => write!(f, "markdown"),
        }
    }
}

impl FromStr for TextFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "moodle_auto_format" | "moodle" => Ok(TextFormat::Moodle),
            "html" => Ok(TextFormat::Html),
            "plain_text" | "plain" => Ok(TextFormat::Plain),
            "markdown" => Ok(TextFormat::Markdown),
            other => Err(format!("unknown text format: {other}")),
        }
    }
}

/// A rich-text field, optionally backed by an attachment draft area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RichText {
    pub text: String,
    pub format: TextFormat,
    /// Draft area holding embedded files while the text is being edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub draft: Option<DraftHandle>,
}

impl RichText {
    pub fn html(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            format: TextFormat::Html,
            draft: None,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

impl Default for RichText {
    fn default() -> Self {
        Self::html("")
    }
}

/// Whole-question feedback shown according to the overall outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombinedFeedback {
    pub correct: RichText,
    pub partially_correct: RichText,
    pub incorrect: RichText,
}

/// Per-question settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOptions {
    /// Record id, `None` until persisted.
    pub id: Option<RecordId>,
    pub question_id: QuestionId,
    pub input_mode: InputMode,
    pub grade_method: GradeMethod,
    pub shuffle_answers: bool,
    pub shown_num_correct: bool,
    pub combined_feedback: CombinedFeedback,
}

/// Marker stored against a correct column in single mode.
pub const SELECTED_MARKER: &str = "1";

/// Whether a stored marker counts toward the number of correct choices.
///
/// The marker's leading integer must be exactly 1: `"1"` and `"1.0"` count,
/// `"2"`, `"0"`, `"a1"` and `"true"` do not.
pub fn counts_as_correct(marker: &str) -> bool {
    let marker = marker.trim_start();
    let unsigned = marker.strip_prefix('+').unwrap_or(marker);
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    unsigned[..digits].parse::<u64>() == Ok(1)
}

/// The sparse set of correct columns for one row, keyed by column id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrectAnswers(BTreeMap<ColumnId, String>);

impl CorrectAnswers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `column` correct with the given marker.
    pub fn insert(&mut self, column: ColumnId, marker: impl Into<String>) {
        self.0.insert(column, marker.into());
    }

    pub fn contains(&self, column: ColumnId) -> bool {
        self.0.contains_key(&column)
    }

    pub fn marker(&self, column: ColumnId) -> Option<&str> {
        self.0.get(&column).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn column_ids(&self) -> impl Iterator<Item = ColumnId> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ColumnId, &str)> {
        self.0.iter().map(|(id, marker)| (*id, marker.as_str()))
    }

    /// Number of entries whose marker counts as correct.
    pub fn counted(&self) -> usize {
        self.0.values().filter(|m| counts_as_correct(m)).count()
    }
}

impl FromIterator<(ColumnId, String)> for CorrectAnswers {
    fn from_iter<I: IntoIterator<Item = (ColumnId, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An answer option shared by every row of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub id: Option<ColumnId>,
    pub question_id: QuestionId,
    /// 0-based ordinal within the question.
    pub number: usize,
    pub name: String,
}

impl Column {
    pub fn new(question_id: QuestionId, number: usize, name: impl Into<String>) -> Self {
        Self {
            id: None,
            question_id,
            number,
            name: name.into(),
        }
    }

    pub fn with_id(mut self, id: ColumnId) -> Self {
        self.id = Some(id);
        self
    }
}

/// A sub-question rated against the columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: Option<RowId>,
    pub question_id: QuestionId,
    /// 0-based ordinal within the question.
    pub number: usize,
    pub name: String,
    pub correct_answers: CorrectAnswers,
    pub feedback: String,
    pub feedback_format: TextFormat,
}

impl Row {
    pub fn new(question_id: QuestionId, number: usize, name: impl Into<String>) -> Self {
        Self {
            id: None,
            question_id,
            number,
            name: name.into(),
            correct_answers: CorrectAnswers::new(),
            feedback: String::new(),
            feedback_format: TextFormat::Html,
        }
    }

    pub fn with_id(mut self, id: RowId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_correct_answers(mut self, answers: CorrectAnswers) -> Self {
        self.correct_answers = answers;
        self
    }
}

/// Whether a stored hint `options` value turns row feedback on.
///
/// Empty and `"0"` mean off; anything else means on.
pub fn hint_options_set(options: &str) -> bool {
    let options = options.trim();
    !options.is_empty() && options != "0"
}

/// A hint shown after a wrong try in interactive behaviours.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hint {
    pub id: Option<HintId>,
    pub question_id: QuestionId,
    pub text: String,
    pub format: TextFormat,
    /// Tell the student how many cells they got right.
    pub shown_num_correct: bool,
    /// Clear wrong choices before the next try.
    pub clear_wrong: bool,
    /// Show each row's feedback together with the hint.
    pub show_row_feedback: bool,
}

impl Hint {
    pub fn new(question_id: QuestionId, text: impl Into<String>) -> Self {
        Self {
            id: None,
            question_id,
            text: text.into(),
            format: TextFormat::Html,
            shown_num_correct: false,
            clear_wrong: false,
            show_row_feedback: false,
        }
    }

    pub fn with_id(mut self, id: HintId) -> Self {
        self.id = Some(id);
        self
    }
}

/// A fully loaded matrix question in normalized form.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixQuestion {
    pub question_id: QuestionId,
    pub options: QuestionOptions,
    pub columns: ColumnRegistry,
    pub rows: RowRegistry,
    /// Hints in the order they are shown.
    pub hints: Vec<Hint>,
}

impl MatrixQuestion {
    pub fn input_mode(&self) -> InputMode {
        self.options.input_mode
    }

    /// Names of the correct columns of `row`, in column order.
    pub fn correct_column_names(&self, row: &Row) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.id.is_some_and(|id| row.correct_answers.contains(id)))
            .map(|c| c.name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_mode_display_and_parse() {
        assert_eq!(InputMode::Single.to_string(), "single");
        assert_eq!("multiple".parse::<InputMode>().unwrap(), InputMode::Multiple);
        assert_eq!(" Single ".parse::<InputMode>().unwrap(), InputMode::Single);
        assert!("radio".parse::<InputMode>().is_err());
    }

    #[test]
    fn grade_method_persisted_spelling() {
        assert_eq!(GradeMethod::AllOrNothing.to_string(), "allnone");
        assert_eq!(
            serde_json::to_string(&GradeMethod::PartialCredit).unwrap(),
            "\"partial\""
        );
        assert_eq!(
            "allnone".parse::<GradeMethod>().unwrap(),
            GradeMethod::AllOrNothing
        );
    }

    #[test]
    fn grade_method_ignored_in_single_mode() {
        assert_eq!(GradeMethod::AllOrNothing.effective(InputMode::Single), None);
        assert_eq!(
            GradeMethod::AllOrNothing.effective(InputMode::Multiple),
            Some(GradeMethod::AllOrNothing)
        );
    }

    #[test]
    fn text_format_numbers() {
        assert_eq!(serde_json::to_string(&TextFormat::Html).unwrap(), "1");
        let parsed: TextFormat = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, TextFormat::Markdown);
        assert!(serde_json::from_str::<TextFormat>("3").is_err());
        assert_eq!("plain_text".parse::<TextFormat>().unwrap(), TextFormat::Plain);
    }

    #[test]
    fn only_unit_markers_count() {
        assert!(counts_as_correct("1"));
        assert!(counts_as_correct(" 1"));
        assert!(counts_as_correct("+1"));
        assert!(counts_as_correct("1.0"));
        assert!(!counts_as_correct("2"));
        assert!(!counts_as_correct("-1"));
        assert!(!counts_as_correct("a1"));
        assert!(!counts_as_correct("0"));
        assert!(!counts_as_correct(""));
        assert!(!counts_as_correct("true"));
    }

    #[test]
    fn hint_options_flag() {
        assert!(hint_options_set("1"));
        assert!(hint_options_set("yes"));
        assert!(!hint_options_set(""));
        assert!(!hint_options_set(" "));
        assert!(!hint_options_set("0"));
    }

    #[test]
    fn correct_answers_counts_unit_entries() {
        let mut answers = CorrectAnswers::new();
        answers.insert(ColumnId(3), "1");
        answers.insert(ColumnId(5), "0");
        answers.insert(ColumnId(6), "2");
        assert_eq!(answers.len(), 3);
        assert_eq!(answers.counted(), 1);
        assert!(answers.contains(ColumnId(5)));
        assert_eq!(answers.marker(ColumnId(3)), Some("1"));
        assert_eq!(
            answers.column_ids().collect::<Vec<_>>(),
            vec![ColumnId(3), ColumnId(5), ColumnId(6)]
        );
    }
}
