//! The authored form: what an author submits before it becomes a question.
//!
//! Columns are name slots, rows are per-row structs carrying both answer
//! fields, so slot alignment between names and answers cannot drift.
//! [`FormFields`] is the flat, string-keyed layout the host form engine
//! works with; it is the only place field names like `rowanswersa2[0]` are
//! built or parsed.

use std::collections::BTreeMap;

use crate::codec::{decode_form, encode_form};
use crate::config::MatrixDefaults;
use crate::error::{CodecError, MatrixError};
use crate::model::{
    Column, ColumnId, CombinedFeedback, GradeMethod, Hint, HintId, InputMode, MatrixQuestion,
    QuestionId, QuestionOptions, RichText, Row, RowId, TextFormat, SELECTED_MARKER,
};
use crate::registry::{ColumnRegistry, RowRegistry};
use crate::traits::DraftHandle;
use crate::validation::codec_failure;

/// 0-based column position in the authored form.
pub type ColumnOrdinal = usize;

/// Flag values of one column across rows, keyed by row slot.
pub type FlagSequence = BTreeMap<usize, String>;

/// Largest slot index accepted from form fields.
const MAX_SLOTS: usize = 1000;

/// One authored row slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthoredRow {
    pub name: String,
    /// Submitted radio value (single mode), e.g. `"2"` or `"a2"`.
    pub choice: Option<String>,
    /// Checkbox flags by column ordinal (multiple mode). Absent means unchecked.
    pub flags: BTreeMap<ColumnOrdinal, String>,
    pub feedback: RichText,
}

impl AuthoredRow {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Choose the column with the given 1-based ordinal.
    pub fn choose(self, ordinal: usize) -> Self {
        self.with_choice_value(ordinal.to_string())
    }

    /// Set the raw radio value as the form engine submits it.
    pub fn with_choice_value(mut self, value: impl Into<String>) -> Self {
        self.choice = Some(value.into());
        self
    }

    /// Check the box of the column with the given 0-based ordinal.
    pub fn flag(mut self, ordinal: ColumnOrdinal) -> Self {
        self.flags.insert(ordinal, SELECTED_MARKER.to_string());
        self
    }

    pub fn with_feedback(mut self, feedback: RichText) -> Self {
        self.feedback = feedback;
        self
    }

    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// Whether the field `mode` reads records at least one answer.
    ///
    /// Flags for ordinals at or beyond `column_slots` do not count.
    pub fn has_answer(&self, mode: InputMode, column_slots: usize) -> bool {
        match mode {
            InputMode::Single => self.choice.as_deref().is_some_and(|c| !c.trim().is_empty()),
            InputMode::Multiple => self.flags.keys().any(|k| *k < column_slots),
        }
    }
}

/// One authored hint slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthoredHint {
    pub hint: RichText,
    pub shown_num_correct: bool,
    pub clear_wrong: bool,
    pub show_row_feedback: bool,
}

impl AuthoredHint {
    pub fn new(hint: RichText) -> Self {
        Self {
            hint,
            ..Self::default()
        }
    }

    /// A slot with no text and no option ticked is not saved.
    pub fn is_blank(&self) -> bool {
        self.hint.is_blank()
            && !self.shown_num_correct
            && !self.clear_wrong
            && !self.show_row_feedback
    }
}

/// A complete authored matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthoredForm {
    pub input_mode: InputMode,
    pub grade_method: GradeMethod,
    pub shuffle_answers: bool,
    pub shown_num_correct: bool,
    pub combined_feedback: CombinedFeedback,
    /// Column name slots, possibly with blank trailing slots.
    pub columns: Vec<String>,
    pub rows: Vec<AuthoredRow>,
    /// Hint slots, possibly with blank slots.
    pub hints: Vec<AuthoredHint>,
}

impl Default for AuthoredForm {
    fn default() -> Self {
        Self::new(&MatrixDefaults::default())
    }
}

impl AuthoredForm {
    /// An empty form pre-filled with the configured defaults.
    pub fn new(defaults: &MatrixDefaults) -> Self {
        Self {
            input_mode: defaults.input_mode,
            grade_method: defaults.grade_method,
            shuffle_answers: defaults.shuffle_answers,
            shown_num_correct: defaults.shown_num_correct,
            combined_feedback: CombinedFeedback::default(),
            columns: Vec::new(),
            rows: Vec::new(),
            hints: Vec::new(),
        }
    }

    /// Named column slots with their slot index.
    pub fn filled_columns(&self) -> impl Iterator<Item = (usize, &str)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, name)| !name.trim().is_empty())
            .map(|(slot, name)| (slot, name.as_str()))
    }

    /// Named row slots with their slot index.
    pub fn filled_rows(&self) -> impl Iterator<Item = (usize, &AuthoredRow)> {
        self.rows.iter().enumerate().filter(|(_, row)| !row.is_blank())
    }

    /// Hint slots that will be saved, in order.
    pub fn filled_hints(&self) -> impl Iterator<Item = &AuthoredHint> {
        self.hints.iter().filter(|hint| !hint.is_blank())
    }

    /// The checkbox layout seen column by column.
    pub fn flag_sequences(&self) -> BTreeMap<ColumnOrdinal, FlagSequence> {
        let mut sequences: BTreeMap<ColumnOrdinal, FlagSequence> = BTreeMap::new();
        for (slot, row) in self.rows.iter().enumerate() {
            for (ordinal, value) in &row.flags {
                sequences
                    .entry(*ordinal)
                    .or_default()
                    .insert(slot, value.clone());
            }
        }
        sequences
    }

    /// Build the normalized question without touching storage.
    ///
    /// Columns and rows get sequential numbers and ids starting at 1, in the
    /// same order the mapper would create them.
    pub fn normalize(&self, question_id: QuestionId) -> Result<MatrixQuestion, MatrixError> {
        let mut columns = ColumnRegistry::new();
        for (number, (_, name)) in self.filled_columns().enumerate() {
            columns.push(
                Column::new(question_id, number, name).with_id(ColumnId(number as u64 + 1)),
            )?;
        }
        let column_ids = columns.ids();

        let mut rows = RowRegistry::new();
        for (number, (slot, authored)) in self.filled_rows().enumerate() {
            let answers = decode_form(slot, authored, self.input_mode, &column_ids)
                .map_err(codec_failure)?;
            let mut row = Row::new(question_id, number, &authored.name)
                .with_id(RowId(number as u64 + 1))
                .with_correct_answers(answers);
            row.feedback = authored.feedback.text.clone();
            row.feedback_format = authored.feedback.format;
            rows.push(row)?;
        }

        let hints = self
            .filled_hints()
            .enumerate()
            .map(|(number, hint)| hint.to_hint(question_id).with_id(HintId(number as u64 + 1)))
            .collect();

        Ok(MatrixQuestion {
            question_id,
            options: self.options(question_id),
            columns,
            rows,
            hints,
        })
    }

    /// Question options carried by the form.
    pub fn options(&self, question_id: QuestionId) -> QuestionOptions {
        QuestionOptions {
            id: None,
            question_id,
            input_mode: self.input_mode,
            grade_method: self.grade_method,
            shuffle_answers: self.shuffle_answers,
            shown_num_correct: self.shown_num_correct,
            combined_feedback: self.combined_feedback.clone(),
        }
    }

    /// Flatten into host form fields.
    pub fn to_fields(&self) -> FormFields {
        let mut fields = FormFields::new();
        fields.insert(fields::INPUT_TYPE, self.input_mode.to_string());
        fields.insert(fields::GRADE_METHOD, self.grade_method.to_string());
        fields.insert(fields::SHUFFLE_ANSWERS, flag_value(self.shuffle_answers));
        fields.insert(fields::SHOW_NUM_CORRECT, flag_value(self.shown_num_correct));

        for (area, text) in combined_parts(&self.combined_feedback) {
            insert_rich_text(&mut fields, area, text);
        }

        for (slot, name) in self.columns.iter().enumerate() {
            fields.insert(fields::column_name(slot), name.clone());
        }
        for (slot, row) in self.rows.iter().enumerate() {
            fields.insert(fields::row_name(slot), row.name.clone());
            if let Some(choice) = &row.choice {
                fields.insert(fields::row_answer(slot), choice.clone());
            }
            for (ordinal, value) in &row.flags {
                fields.insert(fields::row_flag(*ordinal, slot), value.clone());
            }
            insert_rich_text(&mut fields, &format!("feedback[{slot}]"), &row.feedback);
        }
        for (slot, hint) in self.hints.iter().enumerate() {
            insert_rich_text(&mut fields, &format!("{}[{slot}]", fields::HINT), &hint.hint);
            for (key, set) in [
                (fields::hint_shown_num_correct(slot), hint.shown_num_correct),
                (fields::hint_clear_wrong(slot), hint.clear_wrong),
                (fields::hint_options(slot), hint.show_row_feedback),
            ] {
                if set {
                    fields.insert(key, "1");
                }
            }
        }
        fields
    }

    /// Rebuild a form from host form fields.
    ///
    /// Unrecognised fields are ignored; recognised fields with unusable
    /// values are errors.
    pub fn from_fields(fields: &FormFields) -> Result<Self, CodecError> {
        let mut form = AuthoredForm::default();

        if let Some(v) = fields.get(fields::INPUT_TYPE) {
            form.input_mode = v.parse().map_err(|_| invalid(fields::INPUT_TYPE, v))?;
        }
        if let Some(v) = fields.get(fields::GRADE_METHOD) {
            form.grade_method = v.parse().map_err(|_| invalid(fields::GRADE_METHOD, v))?;
        }
        if let Some(v) = fields.get(fields::SHUFFLE_ANSWERS) {
            form.shuffle_answers = parse_flag(fields::SHUFFLE_ANSWERS, v)?;
        }
        if let Some(v) = fields.get(fields::SHOW_NUM_CORRECT) {
            form.shown_num_correct = parse_flag(fields::SHOW_NUM_CORRECT, v)?;
        }

        form.combined_feedback = CombinedFeedback {
            correct: read_rich_text(fields, fields::CORRECT_FEEDBACK)?,
            partially_correct: read_rich_text(fields, fields::PARTIALLY_CORRECT_FEEDBACK)?,
            incorrect: read_rich_text(fields, fields::INCORRECT_FEEDBACK)?,
        };

        for (key, value) in fields.iter() {
            let Some((name, slot, rest)) = split_indexed(key) else {
                continue;
            };
            if slot >= MAX_SLOTS {
                return Err(invalid(key, value));
            }
            match (name, rest) {
                ("columnname", "") => *slot_mut(&mut form.columns, slot) = value.to_string(),
                ("rowname", "") => slot_mut(&mut form.rows, slot).name = value.to_string(),
                ("rowanswers", "") => {
                    slot_mut(&mut form.rows, slot).choice = Some(value.to_string())
                }
                ("feedback", "[text]") => {
                    slot_mut(&mut form.rows, slot).feedback.text = value.to_string()
                }
                ("feedback", "[format]") => {
                    slot_mut(&mut form.rows, slot).feedback.format =
                        value.parse().map_err(|_| invalid(key, value))?
                }
                ("feedback", "[itemid]") => {
                    slot_mut(&mut form.rows, slot).feedback.draft = Some(parse_draft(key, value)?)
                }
                ("hint", "[text]") => slot_mut(&mut form.hints, slot).hint.text = value.to_string(),
                ("hint", "[format]") => {
                    slot_mut(&mut form.hints, slot).hint.format =
                        value.parse().map_err(|_| invalid(key, value))?
                }
                ("hint", "[itemid]") => {
                    slot_mut(&mut form.hints, slot).hint.draft = Some(parse_draft(key, value)?)
                }
                ("hintshownumcorrect", "") => {
                    slot_mut(&mut form.hints, slot).shown_num_correct = parse_flag(key, value)?
                }
                ("hintclearwrong", "") => {
                    slot_mut(&mut form.hints, slot).clear_wrong = parse_flag(key, value)?
                }
                ("hintoptions", "") => {
                    slot_mut(&mut form.hints, slot).show_row_feedback = parse_flag(key, value)?
                }
                (flag, "") if flag.starts_with(fields::ROW_FLAG_PREFIX) => {
                    let ordinal = flag[fields::ROW_FLAG_PREFIX.len()..]
                        .parse::<usize>()
                        .ok()
                        .filter(|k| (1..=MAX_SLOTS).contains(k))
                        .ok_or_else(|| invalid(key, value))?;
                    slot_mut(&mut form.rows, slot)
                        .flags
                        .insert(ordinal - 1, value.to_string());
                }
                _ => {}
            }
        }
        Ok(form)
    }
}

impl MatrixQuestion {
    /// Rebuild the authored form an editor would show for this question.
    pub fn to_form(&self) -> AuthoredForm {
        let mode = self.options.input_mode;
        let rows = self
            .rows
            .iter()
            .map(|row| {
                let mut authored = AuthoredRow::new(&row.name).with_feedback(RichText {
                    text: row.feedback.clone(),
                    format: row.feedback_format,
                    draft: None,
                });
                encode_form(&row.correct_answers, &self.columns, mode).apply_to(&mut authored);
                authored
            })
            .collect();

        AuthoredForm {
            input_mode: mode,
            grade_method: self.options.grade_method,
            shuffle_answers: self.options.shuffle_answers,
            shown_num_correct: self.options.shown_num_correct,
            combined_feedback: self.options.combined_feedback.clone(),
            columns: self.columns.iter().map(|c| c.name.clone()).collect(),
            rows,
            hints: self.hints.iter().map(AuthoredHint::from).collect(),
        }
    }
}

impl AuthoredHint {
    /// The hint this slot saves as, not yet persisted.
    pub fn to_hint(&self, question_id: QuestionId) -> Hint {
        Hint {
            id: None,
            question_id,
            text: self.hint.text.clone(),
            format: self.hint.format,
            shown_num_correct: self.shown_num_correct,
            clear_wrong: self.clear_wrong,
            show_row_feedback: self.show_row_feedback,
        }
    }
}

impl From<&Hint> for AuthoredHint {
    fn from(hint: &Hint) -> Self {
        Self {
            hint: RichText {
                text: hint.text.clone(),
                format: hint.format,
                draft: None,
            },
            shown_num_correct: hint.shown_num_correct,
            clear_wrong: hint.clear_wrong,
            show_row_feedback: hint.show_row_feedback,
        }
    }
}

// ---------------------------------------------------------------------------
// Flat field layout
// ---------------------------------------------------------------------------

/// Host form fields by name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormFields(BTreeMap<String, String>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl FromIterator<(String, String)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Field names of the host authoring form.
pub mod fields {
    pub const INPUT_TYPE: &str = "inputtype";
    pub const GRADE_METHOD: &str = "grademethod";
    pub const SHUFFLE_ANSWERS: &str = "shuffleanswers";
    pub const SHOW_NUM_CORRECT: &str = "shownumcorrect";
    pub const CORRECT_FEEDBACK: &str = "correctfeedback";
    pub const PARTIALLY_CORRECT_FEEDBACK: &str = "partiallycorrectfeedback";
    pub const INCORRECT_FEEDBACK: &str = "incorrectfeedback";
    pub const HINT: &str = "hint";
    pub(crate) const ROW_FLAG_PREFIX: &str = "rowanswersa";

    pub fn column_name(slot: usize) -> String {
        format!("columnname[{slot}]")
    }

    pub fn row_name(slot: usize) -> String {
        format!("rowname[{slot}]")
    }

    /// Radio group of a row (single mode).
    pub fn row_answer(slot: usize) -> String {
        format!("rowanswers[{slot}]")
    }

    /// Checkbox of column `ordinal` (0-based) on a row. Field names count
    /// columns from 1.
    pub fn row_flag(ordinal: usize, slot: usize) -> String {
        format!("{ROW_FLAG_PREFIX}{}[{slot}]", ordinal + 1)
    }

    pub fn hint_shown_num_correct(slot: usize) -> String {
        format!("hintshownumcorrect[{slot}]")
    }

    pub fn hint_clear_wrong(slot: usize) -> String {
        format!("hintclearwrong[{slot}]")
    }

    /// "Show the feedback for each row" checkbox of a hint.
    pub fn hint_options(slot: usize) -> String {
        format!("hintoptions[{slot}]")
    }
}

fn combined_parts(feedback: &CombinedFeedback) -> [(&'static str, &RichText); 3] {
    [
        (fields::CORRECT_FEEDBACK, &feedback.correct),
        (fields::PARTIALLY_CORRECT_FEEDBACK, &feedback.partially_correct),
        (fields::INCORRECT_FEEDBACK, &feedback.incorrect),
    ]
}

fn insert_rich_text(fields: &mut FormFields, prefix: &str, text: &RichText) {
    fields.insert(format!("{prefix}[text]"), text.text.clone());
    fields.insert(format!("{prefix}[format]"), text.format.to_string());
    if let Some(draft) = text.draft {
        fields.insert(format!("{prefix}[itemid]"), draft.to_string());
    }
}

fn read_rich_text(fields: &FormFields, prefix: &str) -> Result<RichText, CodecError> {
    let mut text = RichText::default();
    if let Some(v) = fields.get(&format!("{prefix}[text]")) {
        text.text = v.to_string();
    }
    let format_key = format!("{prefix}[format]");
    if let Some(v) = fields.get(&format_key) {
        text.format = v.parse::<TextFormat>().map_err(|_| invalid(&format_key, v))?;
    }
    let item_key = format!("{prefix}[itemid]");
    if let Some(v) = fields.get(&item_key) {
        text.draft = Some(parse_draft(&item_key, v)?);
    }
    Ok(text)
}

fn parse_draft(key: &str, value: &str) -> Result<DraftHandle, CodecError> {
    value
        .parse()
        .map(DraftHandle)
        .map_err(|_| invalid(key, value))
}

fn flag_value(flag: bool) -> &'static str {
    if flag {
        "1"
    } else {
        "0"
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, CodecError> {
    match value.trim() {
        "1" | "true" => Ok(true),
        "0" | "false" | "" => Ok(false),
        _ => Err(invalid(key, value)),
    }
}

fn invalid(key: &str, value: &str) -> CodecError {
    CodecError::InvalidField {
        field: key.to_string(),
        value: value.to_string(),
    }
}

/// Split `name[3][text]` into `("name", 3, "[text]")`.
fn split_indexed(key: &str) -> Option<(&str, usize, &str)> {
    let open = key.find('[')?;
    let close = open + key[open..].find(']')?;
    let slot = key[open + 1..close].parse().ok()?;
    Some((&key[..open], slot, &key[close + 1..]))
}

fn slot_mut<T: Default>(items: &mut Vec<T>, slot: usize) -> &mut T {
    if items.len() <= slot {
        items.resize_with(slot + 1, T::default);
    }
    &mut items[slot]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CorrectAnswers;

    fn sample() -> AuthoredForm {
        AuthoredForm {
            input_mode: InputMode::Multiple,
            columns: vec!["Yes".into(), "No".into(), "Maybe".into(), "".into()],
            rows: vec![
                AuthoredRow::new("First").flag(0).flag(2),
                AuthoredRow::new("Second")
                    .flag(1)
                    .with_feedback(RichText::html("<p>Think again</p>")),
            ],
            ..AuthoredForm::default()
        }
    }

    #[test]
    fn multiple_mode_field_layout() {
        let fields = sample().to_fields();
        assert_eq!(fields.get("rowanswersa1[0]"), Some("1"));
        assert!(!fields.contains("rowanswersa2[0]"));
        assert_eq!(fields.get("rowanswersa3[0]"), Some("1"));
        assert_eq!(fields.get("rowanswersa2[1]"), Some("1"));
        assert_eq!(fields.get("columnname[2]"), Some("Maybe"));
        assert_eq!(fields.get("inputtype"), Some("multiple"));
        assert_eq!(fields.get("feedback[1][text]"), Some("<p>Think again</p>"));
    }

    #[test]
    fn fields_roundtrip() {
        let form = sample();
        let back = AuthoredForm::from_fields(&form.to_fields()).unwrap();
        assert_eq!(back, form);
    }

    #[test]
    fn single_mode_fields_roundtrip() {
        let mut form = AuthoredForm {
            columns: vec!["A".into(), "B".into()],
            rows: vec![AuthoredRow::new("r1").choose(2), AuthoredRow::new("r2").choose(1)],
            ..AuthoredForm::default()
        };
        form.combined_feedback.correct = RichText::html("Well done");
        form.rows[0].feedback.draft = Some(DraftHandle::new());
        let fields = form.to_fields();
        assert_eq!(fields.get("rowanswers[0]"), Some("2"));
        assert_eq!(fields.get("correctfeedback[text]"), Some("Well done"));
        assert_eq!(AuthoredForm::from_fields(&fields).unwrap(), form);
    }

    #[test]
    fn hint_fields_roundtrip() {
        let mut form = sample();
        form.hints = vec![
            AuthoredHint {
                shown_num_correct: true,
                show_row_feedback: true,
                ..AuthoredHint::new(RichText::html("Look at the second column"))
            },
            AuthoredHint {
                clear_wrong: true,
                ..AuthoredHint::new(RichText::html("Nearly"))
            },
        ];
        form.hints[1].hint.draft = Some(DraftHandle::new());

        let fields = form.to_fields();
        assert_eq!(fields.get("hint[0][text]"), Some("Look at the second column"));
        assert_eq!(fields.get("hintshownumcorrect[0]"), Some("1"));
        assert_eq!(fields.get("hintoptions[0]"), Some("1"));
        assert!(!fields.contains("hintclearwrong[0]"));
        assert_eq!(fields.get("hintclearwrong[1]"), Some("1"));
        assert!(fields.contains("hint[1][itemid]"));
        assert_eq!(AuthoredForm::from_fields(&fields).unwrap(), form);
    }

    #[test]
    fn normalize_drops_blank_hints() {
        let mut form = sample();
        form.hints = vec![
            AuthoredHint::new(RichText::html("First hint")),
            AuthoredHint::new(RichText::html("  ")),
            AuthoredHint {
                clear_wrong: true,
                ..AuthoredHint::default()
            },
        ];
        let question = form.normalize(QuestionId(3)).unwrap();
        assert_eq!(question.hints.len(), 2);
        assert_eq!(question.hints[0].text, "First hint");
        assert_eq!(question.hints[0].id, Some(HintId(1)));
        assert!(question.hints[1].clear_wrong);
        assert!(question.hints[1].text.is_empty());

        let back = question.to_form();
        assert_eq!(back.hints.len(), 2);
        assert!(back.hints[1].clear_wrong);
    }

    #[test]
    fn from_fields_rejects_bad_values() {
        let mut fields = FormFields::new();
        fields.insert("inputtype", "radio");
        assert!(matches!(
            AuthoredForm::from_fields(&fields),
            Err(CodecError::InvalidField { .. })
        ));

        let mut fields = FormFields::new();
        fields.insert("rowanswersa0[0]", "1");
        assert!(AuthoredForm::from_fields(&fields).is_err());

        let mut fields = FormFields::new();
        fields.insert("columnname[5000]", "far away");
        assert!(AuthoredForm::from_fields(&fields).is_err());
    }

    #[test]
    fn from_fields_ignores_unknown_fields() {
        let mut fields = FormFields::new();
        fields.insert("questiontext[text]", "Rate these");
        fields.insert("columnname[1]", "B");
        let form = AuthoredForm::from_fields(&fields).unwrap();
        assert_eq!(form.columns, vec!["".to_string(), "B".to_string()]);
    }

    #[test]
    fn flag_sequences_by_column() {
        let sequences = sample().flag_sequences();
        assert_eq!(sequences.len(), 3);
        assert_eq!(sequences[&0].keys().copied().collect::<Vec<_>>(), vec![0]);
        assert_eq!(sequences[&1].keys().copied().collect::<Vec<_>>(), vec![1]);
        assert_eq!(sequences[&2].keys().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn normalize_skips_blank_slots() {
        let mut form = sample();
        form.rows.insert(1, AuthoredRow::new("  "));
        let question = form.normalize(QuestionId(4)).unwrap();
        assert_eq!(question.columns.len(), 3);
        assert_eq!(question.rows.len(), 2);
        let second = question.rows.get(1).unwrap();
        assert_eq!(second.name, "Second");
        assert_eq!(second.feedback, "<p>Think again</p>");
        assert!(second.correct_answers.contains(ColumnId(2)));
    }

    #[test]
    fn normalize_reports_unknown_choice() {
        let form = AuthoredForm {
            columns: vec!["A".into(), "B".into()],
            rows: vec![AuthoredRow::new("r1").choose(1), AuthoredRow::new("r2").choose(7)],
            ..AuthoredForm::default()
        };
        let err = form.normalize(QuestionId(1)).unwrap_err();
        assert_eq!(err.field_errors()[0].key.to_string(), "rowoptions[1]");
    }

    #[test]
    fn question_to_form_and_back() {
        let question = sample().normalize(QuestionId(9)).unwrap();
        let form = question.to_form();
        assert_eq!(form.columns, vec!["Yes", "No", "Maybe"]);
        let again = form.normalize(QuestionId(9)).unwrap();
        assert_eq!(again, question);

        let first = question.rows.get(0).unwrap();
        let expected: CorrectAnswers = [(ColumnId(1), "1".to_string()), (ColumnId(3), "1".to_string())]
            .into_iter()
            .collect();
        assert_eq!(first.correct_answers, expected);
    }
}
