//! Export of stored questions to interchange documents.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use oumatrix_core::codec::encode_markers;
use oumatrix_core::model::{ColumnId, ContextId, Hint, MatrixQuestion, RichText, Row, TextFormat};
use oumatrix_core::traits::{AttachmentStore, FileArea, FileOwner};

use crate::document::Element;
use crate::error::InterchangeError;

/// Value of the `type` attribute on exported questions.
pub const QUESTION_TYPE: &str = "oumatrix";

/// Build the `<question>` element for a stored question.
///
/// Columns and rows are keyed by position, and each row's correct-answer
/// blob is re-keyed from column id to column key.
pub fn export_question(
    question: &MatrixQuestion,
    context: ContextId,
    files: &dyn AttachmentStore,
) -> Result<Element, InterchangeError> {
    let options = &question.options;
    let mut root = Element::new("question")
        .with_attr("type", QUESTION_TYPE)
        .with_child(Element::new("inputtype").with_text(options.input_mode.to_string()))
        .with_child(Element::new("grademethod").with_text(options.grade_method.to_string()))
        .with_child(
            Element::new("shuffleanswers").with_text(options.shuffle_answers.to_string()),
        );

    let mut keys = BTreeMap::new();
    let mut columns = Element::new("columns");
    for (key, column) in question.columns.iter().enumerate() {
        if let Some(id) = column.id {
            keys.insert(id, key);
        }
        columns.push(
            Element::new("column")
                .with_attr("key", key.to_string())
                .with_child(text_element(&column.name)),
        );
    }
    root.push(columns);

    let mut rows = Element::new("rows");
    for (key, row) in question.rows.iter().enumerate() {
        rows.push(export_row(key, row, &keys, context, files)?);
    }
    root.push(rows);

    let feedback = &options.combined_feedback;
    for (area, text) in [
        (FileArea::CorrectFeedback, &feedback.correct),
        (FileArea::PartiallyCorrectFeedback, &feedback.partially_correct),
        (FileArea::IncorrectFeedback, &feedback.incorrect),
    ] {
        let owner = FileOwner::combined(context, area, question.question_id);
        root.push(rich_text_element(area.name(), text, &owner, files)?);
    }
    if options.shown_num_correct {
        root.push(Element::new("shownumcorrect"));
    }

    for hint in &question.hints {
        root.push(export_hint(hint, context, files)?);
    }

    tracing::debug!(
        "exported question {} with {} column(s), {} row(s) and {} hint(s)",
        question.question_id,
        question.columns.len(),
        question.rows.len(),
        question.hints.len()
    );
    Ok(root)
}

fn export_row(
    key: usize,
    row: &Row,
    keys: &BTreeMap<ColumnId, usize>,
    context: ContextId,
    files: &dyn AttachmentStore,
) -> Result<Element, InterchangeError> {
    let answers = encode_markers(
        row.correct_answers
            .iter()
            .filter_map(|(id, marker)| keys.get(&id).map(|k| (k.to_string(), marker))),
    );
    let mut element = Element::new("row")
        .with_attr("key", key.to_string())
        .with_child(Element::new("name").with_child(text_element(&row.name)))
        .with_child(Element::new("correctanswers").with_child(text_element(&answers)));

    if !row.feedback.is_empty() {
        let text = RichText {
            text: row.feedback.clone(),
            format: row.feedback_format,
            draft: None,
        };
        element.push(match row.id {
            Some(id) => {
                rich_text_element("feedback", &text, &FileOwner::row_feedback(context, id), files)?
            }
            None => formatted(Element::new("feedback"), text.format)
                .with_child(text_element(&text.text)),
        });
    }
    Ok(element)
}

/// A `<hint>` with its options as trailing markers.
fn export_hint(
    hint: &Hint,
    context: ContextId,
    files: &dyn AttachmentStore,
) -> Result<Element, InterchangeError> {
    let text = RichText {
        text: hint.text.clone(),
        format: hint.format,
        draft: None,
    };
    let mut element = match hint.id {
        Some(id) => rich_text_element("hint", &text, &FileOwner::hint(context, id), files)?,
        None => formatted(Element::new("hint"), text.format).with_child(text_element(&text.text)),
    };
    if hint.shown_num_correct {
        element.push(Element::new("shownumcorrect"));
    }
    if hint.clear_wrong {
        element.push(Element::new("clearwrong"));
    }
    if hint.show_row_feedback {
        element.push(Element::new("options").with_text("1"));
    }
    Ok(element)
}

fn text_element(text: &str) -> Element {
    Element::new("text").with_text(text)
}

fn formatted(element: Element, format: TextFormat) -> Element {
    element.with_attr("format", format.to_string())
}

/// A rich-text field with its stored files embedded as base64.
fn rich_text_element(
    name: &str,
    text: &RichText,
    owner: &FileOwner,
    files: &dyn AttachmentStore,
) -> Result<Element, InterchangeError> {
    let mut element =
        formatted(Element::new(name), text.format).with_child(text_element(&text.text));
    for file in files.files(owner)? {
        element.push(
            Element::new("file")
                .with_attr("name", &file.name)
                .with_attr("path", &file.path)
                .with_attr("encoding", "base64")
                .with_text(STANDARD.encode(&file.content)),
        );
    }
    Ok(element)
}

/// Wrap exported questions in a `<quiz>` document.
pub fn export_quiz(questions: impl IntoIterator<Item = Element>) -> String {
    let quiz = questions
        .into_iter()
        .fold(Element::new("quiz"), Element::with_child);
    format!("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n{}", quiz.to_xml())
}
