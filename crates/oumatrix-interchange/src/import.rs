//! Import of interchange documents into authored forms.
//!
//! Imported questions come back in the authored-form shape so they go
//! through the same validation and save path as a live authoring session.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use oumatrix_core::codec::decode_markers;
use oumatrix_core::form::{AuthoredForm, AuthoredHint, AuthoredRow};
use oumatrix_core::model::{
    hint_options_set, CombinedFeedback, GradeMethod, InputMode, RichText, TextFormat,
};
use oumatrix_core::traits::{to_draft_urls, AttachmentStore, StoredFile};

use crate::document::{parse_document, Element};
use crate::error::InterchangeError;
use crate::export::QUESTION_TYPE;

/// State carried across successive imports.
///
/// Tracks column and row positions within the current question, which stand
/// in for a missing `key` attribute, and counts the questions imported so
/// far.
#[derive(Debug, Default)]
pub struct ImportCursor {
    next_column: usize,
    next_row: usize,
    imported: usize,
}

impl ImportCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of questions imported through this cursor.
    pub fn imported(&self) -> usize {
        self.imported
    }

    fn start_question(&mut self) {
        self.next_column = 0;
        self.next_row = 0;
    }

    fn column_position(&mut self) -> usize {
        let position = self.next_column;
        self.next_column += 1;
        position
    }

    fn row_slot(&mut self) -> usize {
        let slot = self.next_row;
        self.next_row += 1;
        slot
    }
}

/// Import every matrix question of a document.
///
/// The root may be a single `<question>` or a `<quiz>` wrapping several;
/// questions of other types inside a quiz are skipped.
pub fn import_document(
    text: &str,
    files: &dyn AttachmentStore,
    cursor: &mut ImportCursor,
) -> Result<Vec<AuthoredForm>, InterchangeError> {
    let root = parse_document(text)?;
    match root.name.as_str() {
        "question" => Ok(vec![import_question(&root, files, cursor)?]),
        "quiz" => {
            let mut forms = Vec::new();
            for question in root.children_named("question") {
                let kind = question.attr("type").unwrap_or_default();
                if kind != QUESTION_TYPE {
                    tracing::warn!("skipping question of type '{kind}'");
                    continue;
                }
                forms.push(import_question(question, files, cursor)?);
            }
            Ok(forms)
        }
        other => Err(InterchangeError::Malformed {
            line: 1,
            reason: format!("unexpected root element <{other}>"),
        }),
    }
}

/// Import one `<question type="oumatrix">` element.
pub fn import_question(
    question: &Element,
    files: &dyn AttachmentStore,
    cursor: &mut ImportCursor,
) -> Result<AuthoredForm, InterchangeError> {
    let kind = question.attr("type").unwrap_or_default();
    if kind != QUESTION_TYPE {
        return Err(InterchangeError::WrongType(kind.to_string()));
    }
    cursor.start_question();

    let mut form = AuthoredForm::default();
    form.input_mode = enumerated(question, "inputtype", InputMode::Single)?;
    form.grade_method = enumerated(question, "grademethod", GradeMethod::PartialCredit)?;
    form.shuffle_answers = match question.child("shuffleanswers") {
        Some(e) => parse_flag(&e.text())?,
        None => true,
    };
    form.shown_num_correct = question.child("shownumcorrect").is_some();

    // Column key -> ordinal, in encounter order.
    let mut keys: Vec<String> = Vec::new();
    if let Some(columns) = question.child("columns") {
        for column in columns.children_named("column") {
            let position = cursor.column_position();
            let key = match column.attr("key") {
                Some(key) => key.trim().to_string(),
                None => position.to_string(),
            };
            keys.push(key);
            form.columns.push(text_of(column).trim().to_string());
        }
    }

    if let Some(rows) = question.child("rows") {
        for row in rows.children_named("row") {
            let slot = cursor.row_slot();
            form.rows.push(import_row(row, slot, form.input_mode, &keys, files)?);
        }
    }

    form.combined_feedback = CombinedFeedback {
        correct: optional_rich_text(question, "correctfeedback", files)?,
        partially_correct: optional_rich_text(question, "partiallycorrectfeedback", files)?,
        incorrect: optional_rich_text(question, "incorrectfeedback", files)?,
    };

    for hint in question.children_named("hint") {
        form.hints.push(AuthoredHint {
            hint: rich_text(hint, files)?,
            shown_num_correct: hint.child("shownumcorrect").is_some(),
            clear_wrong: hint.child("clearwrong").is_some(),
            show_row_feedback: hint
                .child("options")
                .is_some_and(|options| hint_options_set(&options.text())),
        });
    }

    cursor.imported += 1;
    tracing::info!(
        "imported matrix question {} ({} column(s), {} row(s), {} hint(s))",
        cursor.imported,
        form.columns.len(),
        form.rows.len(),
        form.hints.len()
    );
    Ok(form)
}

fn import_row(
    row: &Element,
    slot: usize,
    mode: InputMode,
    keys: &[String],
    files: &dyn AttachmentStore,
) -> Result<AuthoredRow, InterchangeError> {
    let name = row.child_text("name").unwrap_or_default().trim().to_string();
    let blob = row.child_text("correctanswers").unwrap_or_default();
    let markers: BTreeMap<String, String> = decode_markers(&blob)
        .map_err(|source| InterchangeError::CorrectAnswers {
            row: name.clone(),
            source,
        })?
        .into_iter()
        .map(|(key, marker)| (key.trim().to_string(), marker))
        .collect();

    let mut authored = AuthoredRow::new(name);
    let mut matching = keys
        .iter()
        .enumerate()
        .filter(|(_, key)| markers.contains_key(key.as_str()))
        .map(|(ordinal, _)| ordinal);
    match mode {
        InputMode::Single => {
            if let Some(ordinal) = matching.next() {
                authored = authored.choose(ordinal + 1);
            }
        }
        InputMode::Multiple => {
            authored = matching.fold(authored, AuthoredRow::flag);
        }
    }

    if let Some(feedback) = row.child("feedback") {
        authored.feedback = rich_text(feedback, files)?;
    }
    tracing::debug!("imported row {slot}");
    Ok(authored)
}

fn enumerated<T>(question: &Element, element: &str, default: T) -> Result<T, InterchangeError>
where
    T: std::str::FromStr,
{
    match question.child(element) {
        None => Ok(default),
        Some(e) => {
            let value = text_of(e);
            value.parse().map_err(|_| InterchangeError::InvalidValue {
                element: element.to_string(),
                value: value.trim().to_string(),
            })
        }
    }
}

/// Text of an element, either direct or wrapped in `<text>`.
fn text_of(element: &Element) -> String {
    match element.child("text") {
        Some(text) => text.text(),
        None => element.text(),
    }
}

fn parse_flag(value: &str) -> Result<bool, InterchangeError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(InterchangeError::InvalidValue {
            element: "shuffleanswers".to_string(),
            value: other.to_string(),
        }),
    }
}

fn optional_rich_text(
    question: &Element,
    name: &str,
    files: &dyn AttachmentStore,
) -> Result<RichText, InterchangeError> {
    match question.child(name) {
        Some(element) => rich_text(element, files),
        None => Ok(RichText::default()),
    }
}

/// A rich-text field; embedded files become a draft area.
fn rich_text(element: &Element, files: &dyn AttachmentStore) -> Result<RichText, InterchangeError> {
    let format = match element.attr("format") {
        Some(value) => value
            .parse::<TextFormat>()
            .map_err(|_| InterchangeError::InvalidValue {
                element: format!("{} format", element.name),
                value: value.to_string(),
            })?,
        None => TextFormat::Html,
    };

    let attachments = element
        .children_named("file")
        .map(decode_file)
        .collect::<Result<Vec<_>, _>>()?;

    let text = element.child("text").map(Element::text).unwrap_or_default();
    if attachments.is_empty() {
        return Ok(RichText {
            text,
            format,
            draft: None,
        });
    }
    let draft = files.import_files_as_draft(attachments)?;
    Ok(RichText {
        text: to_draft_urls(&text),
        format,
        draft: Some(draft),
    })
}

fn decode_file(file: &Element) -> Result<StoredFile, InterchangeError> {
    let name = file.attr("name").unwrap_or_default().to_string();
    let encoded: String = file.text().split_whitespace().collect();
    let content = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|source| InterchangeError::Attachment {
            name: name.clone(),
            source,
        })?;
    let mut stored = StoredFile::new(name, content);
    if let Some(path) = file.attr("path") {
        stored.path = path.to_string();
    }
    Ok(stored)
}
