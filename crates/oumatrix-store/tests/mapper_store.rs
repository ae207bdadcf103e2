//! Persistence mapper running against the JSON file stores.

use oumatrix_core::form::{AuthoredForm, AuthoredRow};
use oumatrix_core::model::{ContextId, InputMode, QuestionId, RichText};
use oumatrix_core::traits::{AttachmentStore, FileArea, FileOwner, StoredFile};
use oumatrix_core::{MatrixConfig, MatrixError, PersistenceMapper};
use oumatrix_store::{JsonFileAttachments, JsonFileStore, MemoryAttachments, MemoryStore};

const CONTEXT: ContextId = ContextId(1);

fn multiple_form() -> AuthoredForm {
    let mut form = AuthoredForm::default();
    form.input_mode = InputMode::Multiple;
    form.columns = vec!["Salmon".into(), "Trout".into(), "Cod".into()];
    form.rows = vec![
        AuthoredRow::new("Freshwater").flag(0).flag(1),
        AuthoredRow::new("Saltwater").flag(0).flag(2),
    ];
    form
}

#[test]
fn saved_question_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = MatrixConfig::default();
    let saved = {
        let store = JsonFileStore::open(dir.path()).unwrap();
        let files = JsonFileAttachments::open(dir.path()).unwrap();
        let mapper = PersistenceMapper::new(&store, &files, &config);
        mapper.save(QuestionId(12), CONTEXT, &multiple_form()).unwrap()
    };

    let store = JsonFileStore::open(dir.path()).unwrap();
    let files = JsonFileAttachments::open(dir.path()).unwrap();
    let mapper = PersistenceMapper::new(&store, &files, &config);
    let loaded = mapper.load(QuestionId(12)).unwrap();

    assert_eq!(loaded, saved);
    assert_eq!(loaded.input_mode(), InputMode::Multiple);
    let first = loaded.rows.get(0).unwrap();
    assert_eq!(loaded.correct_column_names(first), vec!["Salmon", "Trout"]);
}

#[test]
fn feedback_files_follow_save_and_delete() {
    let dir = tempfile::tempdir().unwrap();
    let config = MatrixConfig::default();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let files = JsonFileAttachments::open(dir.path()).unwrap();
    let mapper = PersistenceMapper::new(&store, &files, &config);

    let draft = files
        .import_files_as_draft(vec![StoredFile::new("fish.png", vec![0xff])])
        .unwrap();
    let mut form = multiple_form();
    form.combined_feedback.correct = RichText {
        draft: Some(draft),
        ..RichText::html("<img src=\"@@DRAFTFILE@@/fish.png\">")
    };
    mapper.save(QuestionId(3), CONTEXT, &form).unwrap();

    let owner = FileOwner::combined(CONTEXT, FileArea::CorrectFeedback, QuestionId(3));
    assert_eq!(files.files(&owner).unwrap().len(), 1);
    let loaded = mapper.load(QuestionId(3)).unwrap();
    assert_eq!(
        loaded.options.combined_feedback.correct.text,
        "<img src=\"@@PLUGINFILE@@/fish.png\">"
    );

    mapper.delete(QuestionId(3), CONTEXT).unwrap();
    assert!(files.files(&owner).unwrap().is_empty());
    let err = mapper.load(QuestionId(3)).unwrap_err();
    assert!(err.is_incomplete());
}

#[test]
fn invalid_form_leaves_store_untouched() {
    let config = MatrixConfig::default();
    let store = MemoryStore::new();
    let files = MemoryAttachments::new();
    let mapper = PersistenceMapper::new(&store, &files, &config);

    let mut form = multiple_form();
    form.rows[1] = AuthoredRow::new("Saltwater");
    let err = mapper.save(QuestionId(5), CONTEXT, &form).unwrap_err();

    assert!(matches!(err, MatrixError::Invalid(_)));
    assert_eq!(err.field_errors()[0].key.to_string(), "rowoptions[1]");
    assert_eq!(store.write_count(), 0);
}
