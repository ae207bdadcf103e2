//! Persistence mapper.
//!
//! Translates between the normalized question and its record tables
//! (`options`, `columns`, `rows` and the shared `question_hints`) plus the
//! attachment areas of its feedback and hint texts. Multi-record writes run
//! inside a store transaction.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::{decode_form, decode_persisted, encode_persisted};
use crate::config::MatrixConfig;
use crate::error::{MatrixError, MissingPart, StoreError};
use crate::form::AuthoredForm;
use crate::model::{
    hint_options_set, Column, ColumnId, CombinedFeedback, ContextId, GradeMethod, Hint, HintId,
    InputMode, MatrixQuestion, QuestionId, QuestionOptions, RichText, Row, RowId, TextFormat,
};
use crate::registry::{ColumnRegistry, RowRegistry};
use crate::traits::{
    record_id, to_draft_urls, AttachmentStore, FileArea, FileOwner, Filter, Record, RecordId,
    RecordStore, Table,
};
use crate::validation::{codec_failure, validate_form};

// ---------------------------------------------------------------------------
// Record shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OptionsRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    questionid: u64,
    inputtype: InputMode,
    grademethod: GradeMethod,
    shuffleanswers: u8,
    shownumcorrect: u8,
    correctfeedback: String,
    correctfeedbackformat: TextFormat,
    partiallycorrectfeedback: String,
    partiallycorrectfeedbackformat: TextFormat,
    incorrectfeedback: String,
    incorrectfeedbackformat: TextFormat,
}

impl OptionsRecord {
    /// The record created the first time a question is saved.
    fn initial(question_id: QuestionId, config: &MatrixConfig) -> Self {
        Self {
            id: None,
            questionid: question_id.0,
            inputtype: config.defaults.input_mode,
            grademethod: config.defaults.grade_method,
            shuffleanswers: config.defaults.shuffle_answers.into(),
            shownumcorrect: 0,
            correctfeedback: String::new(),
            correctfeedbackformat: TextFormat::Html,
            partiallycorrectfeedback: String::new(),
            partiallycorrectfeedbackformat: TextFormat::Html,
            incorrectfeedback: String::new(),
            incorrectfeedbackformat: TextFormat::Html,
        }
    }

    fn into_options(self) -> QuestionOptions {
        QuestionOptions {
            id: self.id.map(RecordId),
            question_id: QuestionId(self.questionid),
            input_mode: self.inputtype,
            grade_method: self.grademethod,
            shuffle_answers: self.shuffleanswers != 0,
            shown_num_correct: self.shownumcorrect != 0,
            combined_feedback: CombinedFeedback {
                correct: stored_text(self.correctfeedback, self.correctfeedbackformat),
                partially_correct: stored_text(
                    self.partiallycorrectfeedback,
                    self.partiallycorrectfeedbackformat,
                ),
                incorrect: stored_text(self.incorrectfeedback, self.incorrectfeedbackformat),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ColumnRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    questionid: u64,
    number: usize,
    name: String,
}

impl ColumnRecord {
    fn into_column(self) -> Column {
        Column {
            id: self.id.map(ColumnId),
            question_id: QuestionId(self.questionid),
            number: self.number,
            name: self.name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RowRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    questionid: u64,
    number: usize,
    name: String,
    #[serde(default)]
    correctanswers: String,
    #[serde(default)]
    feedback: String,
    #[serde(default = "html_format")]
    feedbackformat: TextFormat,
}

/// A row of the host's shared hints table.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct HintRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    questionid: u64,
    hint: String,
    #[serde(default = "html_format")]
    hintformat: TextFormat,
    #[serde(default)]
    shownumcorrect: u8,
    #[serde(default)]
    clearwrong: u8,
    /// Type-specific options; the matrix stores its show-row-feedback flag.
    #[serde(default)]
    options: String,
}

impl HintRecord {
    fn into_hint(self) -> Hint {
        Hint {
            id: self.id.map(HintId),
            question_id: QuestionId(self.questionid),
            text: self.hint,
            format: self.hintformat,
            shown_num_correct: self.shownumcorrect != 0,
            clear_wrong: self.clearwrong != 0,
            show_row_feedback: hint_options_set(&self.options),
        }
    }
}

fn html_format() -> TextFormat {
    TextFormat::Html
}

fn stored_text(text: String, format: TextFormat) -> RichText {
    RichText {
        text,
        format,
        draft: None,
    }
}

fn to_record<T: Serialize>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(record) => Ok(record),
        _ => Err(<serde_json::Error as serde::ser::Error>::custom(
            "record did not serialize to an object",
        )
        .into()),
    }
}

fn from_record<T: DeserializeOwned>(record: Record) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

// ---------------------------------------------------------------------------
// Mapper
// ---------------------------------------------------------------------------

/// Saves, loads and deletes matrix questions against host stores.
pub struct PersistenceMapper<'a> {
    store: &'a dyn RecordStore,
    files: &'a dyn AttachmentStore,
    config: &'a MatrixConfig,
}

impl<'a> PersistenceMapper<'a> {
    pub fn new(
        store: &'a dyn RecordStore,
        files: &'a dyn AttachmentStore,
        config: &'a MatrixConfig,
    ) -> Self {
        Self {
            store,
            files,
            config,
        }
    }

    /// Options for a question that has none stored yet.
    pub fn default_options(&self, question_id: QuestionId) -> QuestionOptions {
        let defaults = &self.config.defaults;
        let feedback = &self.config.feedback;
        QuestionOptions {
            id: None,
            question_id,
            input_mode: defaults.input_mode,
            grade_method: defaults.grade_method,
            shuffle_answers: defaults.shuffle_answers,
            shown_num_correct: true,
            combined_feedback: CombinedFeedback {
                correct: RichText::html(&feedback.correct),
                partially_correct: RichText::html(&feedback.partially_correct),
                incorrect: RichText::html(&feedback.incorrect),
            },
        }
    }

    /// Validate and persist an authored form, replacing any previous
    /// columns and rows of the question. Returns the question as stored.
    pub fn save(
        &self,
        question_id: QuestionId,
        context: ContextId,
        form: &AuthoredForm,
    ) -> Result<MatrixQuestion, MatrixError> {
        let errors = validate_form(form, &self.config.limits);
        if !errors.is_empty() {
            tracing::info!(
                "question {question_id} not saved: {} validation error(s)",
                errors.len()
            );
            return Err(MatrixError::Invalid(errors));
        }

        let replaced = self.in_transaction(|| {
            self.upsert_options(question_id, context, form)?;
            let replaced = self.item_owners(question_id, context)?;
            let filter = Filter::by_question(question_id);
            for table in [Table::Columns, Table::Rows, Table::Hints] {
                self.store.delete(table, &filter)?;
            }
            let column_ids = self.insert_columns(question_id, form)?;
            self.insert_rows(question_id, context, form, &column_ids)?;
            self.insert_hints(question_id, context, form)?;
            Ok(replaced)
        })?;

        for owner in replaced {
            self.files.delete_files(&owner)?;
        }

        let question = self.load(question_id)?;
        tracing::info!(
            "saved question {question_id}: {} column(s), {} row(s), {} hint(s)",
            question.columns.len(),
            question.rows.len(),
            question.hints.len()
        );
        Ok(question)
    }

    /// Load a stored question.
    ///
    /// Missing options are synthesized from the configured defaults; missing
    /// columns or rows mean the question is incomplete.
    pub fn load(&self, question_id: QuestionId) -> Result<MatrixQuestion, MatrixError> {
        let filter = Filter::by_question(question_id);

        let options = match self.store.get(Table::Options, &filter)? {
            Some(record) => from_record::<OptionsRecord>(record)?.into_options(),
            None => {
                tracing::debug!("question {question_id} has no stored options, using defaults");
                self.default_options(question_id)
            }
        };

        let column_records = self.store.get_all(Table::Columns, &filter)?;
        if column_records.is_empty() {
            return Err(MatrixError::IncompleteQuestion {
                question_id,
                missing: MissingPart::Columns,
            });
        }
        let columns = ColumnRegistry::from_columns(
            column_records
                .into_iter()
                .map(|r| from_record::<ColumnRecord>(r).map(ColumnRecord::into_column))
                .collect::<Result<Vec<_>, _>>()?,
        )?;

        let row_records = self.store.get_all(Table::Rows, &filter)?;
        if row_records.is_empty() {
            return Err(MatrixError::IncompleteQuestion {
                question_id,
                missing: MissingPart::Rows,
            });
        }
        let mut rows = Vec::with_capacity(row_records.len());
        for record in row_records {
            let r: RowRecord = from_record(record)?;
            rows.push(Row {
                id: r.id.map(RowId),
                question_id: QuestionId(r.questionid),
                number: r.number,
                correct_answers: decode_persisted(&r.correctanswers, &columns)?,
                name: r.name,
                feedback: r.feedback,
                feedback_format: r.feedbackformat,
            });
        }
        let rows = RowRegistry::from_rows(rows)?;

        let hints = self
            .store
            .get_all(Table::Hints, &filter)?
            .into_iter()
            .map(|r| from_record::<HintRecord>(r).map(HintRecord::into_hint))
            .collect::<Result<Vec<_>, _>>()?;

        tracing::debug!(
            "loaded question {question_id}: {} column(s), {} row(s), {} hint(s)",
            columns.len(),
            rows.len(),
            hints.len()
        );
        Ok(MatrixQuestion {
            question_id,
            options,
            columns,
            rows,
            hints,
        })
    }

    /// Delete a question's records, then its files.
    pub fn delete(&self, question_id: QuestionId, context: ContextId) -> Result<(), MatrixError> {
        let owners = self.file_owners(question_id, context)?;

        let removed = self.in_transaction(|| {
            let filter = Filter::by_question(question_id);
            let mut removed = 0;
            for table in Table::ALL {
                removed += self.store.delete(table, &filter)?;
            }
            Ok(removed)
        })?;

        for owner in owners {
            self.files.delete_files(&owner)?;
        }
        tracing::info!("deleted question {question_id} ({removed} record(s))");
        Ok(())
    }

    /// Move every feedback and hint file of a question to another context.
    pub fn move_files(
        &self,
        question_id: QuestionId,
        from: ContextId,
        to: ContextId,
    ) -> Result<(), MatrixError> {
        for owner in self.file_owners(question_id, from)? {
            self.files.move_files(&owner, to)?;
        }
        tracing::debug!("moved files of question {question_id} from context {from} to {to}");
        Ok(())
    }

    /// The authored form an editor would show for a stored question, with a
    /// draft area prepared for every feedback and hint text.
    pub fn prepare_form(
        &self,
        question_id: QuestionId,
        context: ContextId,
    ) -> Result<AuthoredForm, MatrixError> {
        let question = self.load(question_id)?;
        let mut form = question.to_form();

        for (row, authored) in question.rows.iter().zip(form.rows.iter_mut()) {
            if let Some(row_id) = row.id {
                let owner = FileOwner::row_feedback(context, row_id);
                self.open_draft(&mut authored.feedback, &owner)?;
            }
        }

        for (hint, authored) in question.hints.iter().zip(form.hints.iter_mut()) {
            if let Some(hint_id) = hint.id {
                self.open_draft(&mut authored.hint, &FileOwner::hint(context, hint_id))?;
            }
        }

        let feedback = &mut form.combined_feedback;
        for (area, text) in [
            (FileArea::CorrectFeedback, &mut feedback.correct),
            (FileArea::PartiallyCorrectFeedback, &mut feedback.partially_correct),
            (FileArea::IncorrectFeedback, &mut feedback.incorrect),
        ] {
            self.open_draft(text, &FileOwner::combined(context, area, question_id))?;
        }
        Ok(form)
    }

    fn open_draft(&self, text: &mut RichText, owner: &FileOwner) -> Result<(), MatrixError> {
        text.draft = Some(self.files.prepare_draft_area(owner)?);
        text.text = to_draft_urls(&text.text);
        Ok(())
    }

    /// Run `work` inside a store transaction, rolling back on failure.
    fn in_transaction<T>(
        &self,
        work: impl FnOnce() -> Result<T, MatrixError>,
    ) -> Result<T, MatrixError> {
        self.store.begin()?;
        match work() {
            Ok(value) => {
                self.store.commit()?;
                Ok(value)
            }
            Err(err) => {
                match self.store.rollback() {
                    Ok(()) => tracing::warn!("rolled back: {err}"),
                    Err(rollback) => tracing::error!("rollback failed after '{err}': {rollback}"),
                }
                Err(err)
            }
        }
    }

    fn upsert_options(
        &self,
        question_id: QuestionId,
        context: ContextId,
        form: &AuthoredForm,
    ) -> Result<(), MatrixError> {
        let mut record = match self
            .store
            .get(Table::Options, &Filter::by_question(question_id))?
        {
            Some(existing) => from_record::<OptionsRecord>(existing)?,
            None => {
                let initial = OptionsRecord::initial(question_id, self.config);
                let id = self.store.insert(Table::Options, to_record(&initial)?)?;
                tracing::debug!("created options record {id} for question {question_id}");
                OptionsRecord {
                    id: Some(id.0),
                    ..initial
                }
            }
        };

        record.inputtype = form.input_mode;
        record.grademethod = form.grade_method;
        record.shuffleanswers = form.shuffle_answers.into();
        record.shownumcorrect = form.shown_num_correct.into();

        let feedback = &form.combined_feedback;
        let owner = |area| FileOwner::combined(context, area, question_id);
        record.correctfeedback =
            self.persist_text(&feedback.correct, &owner(FileArea::CorrectFeedback))?;
        record.correctfeedbackformat = feedback.correct.format;
        record.partiallycorrectfeedback = self.persist_text(
            &feedback.partially_correct,
            &owner(FileArea::PartiallyCorrectFeedback),
        )?;
        record.partiallycorrectfeedbackformat = feedback.partially_correct.format;
        record.incorrectfeedback =
            self.persist_text(&feedback.incorrect, &owner(FileArea::IncorrectFeedback))?;
        record.incorrectfeedbackformat = feedback.incorrect.format;

        self.store.update(Table::Options, to_record(&record)?)?;
        Ok(())
    }

    /// Final text of a rich-text field, moving its draft files to `owner`.
    fn persist_text(&self, text: &RichText, owner: &FileOwner) -> Result<String, MatrixError> {
        match text.draft {
            Some(draft) => Ok(self.files.persist_draft_as_files(draft, owner, &text.text)?),
            None => Ok(text.text.clone()),
        }
    }

    fn insert_columns(
        &self,
        question_id: QuestionId,
        form: &AuthoredForm,
    ) -> Result<Vec<ColumnId>, MatrixError> {
        let mut ids = Vec::new();
        for (number, (_, name)) in form.filled_columns().enumerate() {
            let record = ColumnRecord {
                id: None,
                questionid: question_id.0,
                number,
                name: name.to_string(),
            };
            ids.push(ColumnId::from(self.store.insert(Table::Columns, to_record(&record)?)?));
        }
        Ok(ids)
    }

    fn insert_rows(
        &self,
        question_id: QuestionId,
        context: ContextId,
        form: &AuthoredForm,
        column_ids: &[ColumnId],
    ) -> Result<(), MatrixError> {
        for (number, (slot, authored)) in form.filled_rows().enumerate() {
            let answers = decode_form(slot, authored, form.input_mode, column_ids)
                .map_err(codec_failure)?;
            let mut record = RowRecord {
                id: None,
                questionid: question_id.0,
                number,
                name: authored.name.clone(),
                correctanswers: encode_persisted(&answers),
                feedback: authored.feedback.text.clone(),
                feedbackformat: authored.feedback.format,
            };
            let id = self.store.insert(Table::Rows, to_record(&record)?)?;

            if let Some(draft) = authored.feedback.draft {
                if !authored.feedback.text.is_empty() {
                    let owner = FileOwner::row_feedback(context, RowId::from(id));
                    record.id = Some(id.0);
                    record.feedback =
                        self.files
                            .persist_draft_as_files(draft, &owner, &authored.feedback.text)?;
                    self.store.update(Table::Rows, to_record(&record)?)?;
                }
            }
        }
        Ok(())
    }

    fn insert_hints(
        &self,
        question_id: QuestionId,
        context: ContextId,
        form: &AuthoredForm,
    ) -> Result<(), MatrixError> {
        for authored in form.filled_hints() {
            let mut record = HintRecord {
                id: None,
                questionid: question_id.0,
                hint: authored.hint.text.clone(),
                hintformat: authored.hint.format,
                shownumcorrect: authored.shown_num_correct.into(),
                clearwrong: authored.clear_wrong.into(),
                options: if authored.show_row_feedback { "1" } else { "" }.to_string(),
            };
            let id = self.store.insert(Table::Hints, to_record(&record)?)?;

            if let Some(draft) = authored.hint.draft {
                if !authored.hint.text.is_empty() {
                    let owner = FileOwner::hint(context, HintId::from(id));
                    record.id = Some(id.0);
                    record.hint =
                        self.files
                            .persist_draft_as_files(draft, &owner, &authored.hint.text)?;
                    self.store.update(Table::Hints, to_record(&record)?)?;
                }
            }
        }
        Ok(())
    }

    fn record_ids(
        &self,
        table: Table,
        question_id: QuestionId,
    ) -> Result<Vec<RecordId>, MatrixError> {
        Ok(self
            .store
            .get_all(table, &Filter::by_question(question_id))?
            .iter()
            .filter_map(record_id)
            .collect())
    }

    /// File areas owned by the question's rows and hints.
    fn item_owners(
        &self,
        question_id: QuestionId,
        context: ContextId,
    ) -> Result<Vec<FileOwner>, MatrixError> {
        let rows = self
            .record_ids(Table::Rows, question_id)?
            .into_iter()
            .map(|id| FileOwner::row_feedback(context, RowId::from(id)));
        let hints = self
            .record_ids(Table::Hints, question_id)?
            .into_iter()
            .map(|id| FileOwner::hint(context, HintId::from(id)));
        Ok(rows.chain(hints).collect())
    }

    /// Every file area of the question, combined feedback included.
    fn file_owners(
        &self,
        question_id: QuestionId,
        context: ContextId,
    ) -> Result<Vec<FileOwner>, MatrixError> {
        let mut owners = self.item_owners(question_id, context)?;
        owners.extend(
            FileArea::COMBINED
                .into_iter()
                .map(|area| FileOwner::combined(context, area, question_id)),
        );
        Ok(owners)
    }
}
