//! End-to-end pipeline tests: TOML form → save → load → evaluate → export →
//! import → save, against the JSON file stores the CLI uses.

use std::path::Path;

use oumatrix_core::config::MatrixDefaults;
use oumatrix_core::evaluator::{
    cell_feedback, correct_response_summary, is_right, random_guess_score, rows_fully_correct,
    too_many_selected, MatrixResponse,
};
use oumatrix_core::form::AuthoredForm;
use oumatrix_core::model::{ContextId, InputMode, QuestionId};
use oumatrix_core::parser::parse_form_str;
use oumatrix_core::{MatrixConfig, MatrixQuestion, PersistenceMapper};
use oumatrix_interchange::{export_question, export_quiz, import_document, ImportCursor};
use oumatrix_store::{JsonFileAttachments, JsonFileStore};

const CONTEXT: ContextId = ContextId(3);

const ANIMALS: &str = r#"
input_mode = "multiple"
columns = ["Flies", "Swims", "Walks"]

[[rows]]
name = "Duck"
correct = [1, 2, 3]

[[rows]]
name = "Trout"
correct = [2]

[[rows]]
name = "Horse"
correct = [3]
feedback = "<p>Horses can swim too, but not by choice.</p>"
"#;

fn parse(content: &str) -> AuthoredForm {
    parse_form_str(content, Path::new("animals.toml"), &MatrixDefaults::default()).unwrap()
}

fn answers(question: &MatrixQuestion) -> Vec<Vec<&str>> {
    question
        .rows
        .iter()
        .map(|row| question.correct_column_names(row))
        .collect()
}

#[test]
fn authored_form_to_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let files = JsonFileAttachments::open(dir.path()).unwrap();
    let config = MatrixConfig::default();
    let mapper = PersistenceMapper::new(&store, &files, &config);

    let saved = mapper.save(QuestionId(1), CONTEXT, &parse(ANIMALS)).unwrap();
    assert_eq!(saved.input_mode(), InputMode::Multiple);
    assert_eq!(
        answers(&saved),
        vec![vec!["Flies", "Swims", "Walks"], vec!["Swims"], vec!["Walks"]]
    );

    // Five correct cells over three rows.
    assert!((random_guess_score(&saved.rows) - 5.0 / 3.0).abs() < 1e-9);
    assert!(is_right(&saved, 0, 1));
    assert!(!is_right(&saved, 1, 0));

    let response = MatrixResponse::new()
        .select(0, 0)
        .select(0, 1)
        .select(0, 2)
        .select(1, 1)
        .select(2, 0);
    assert_eq!(rows_fully_correct(&saved, &response), 2);
    assert!(!too_many_selected(&saved, &response));
    let cells = cell_feedback(&saved, &response);
    assert_eq!(cells.len(), 9);
    assert_eq!(cells.iter().filter(|c| c.selected && !c.correct).count(), 1);

    assert_eq!(
        correct_response_summary(&saved),
        "The correct answers are: Duck => Flies, Swims, Walks, Trout => Swims, Horse => Walks"
    );
}

#[test]
fn export_import_between_stores() {
    let source_dir = tempfile::tempdir().unwrap();
    let target_dir = tempfile::tempdir().unwrap();
    let config = MatrixConfig::default();

    let document = {
        let store = JsonFileStore::open(source_dir.path()).unwrap();
        let files = JsonFileAttachments::open(source_dir.path()).unwrap();
        let mapper = PersistenceMapper::new(&store, &files, &config);
        let saved = mapper.save(QuestionId(8), CONTEXT, &parse(ANIMALS)).unwrap();
        export_quiz([export_question(&saved, CONTEXT, &files).unwrap()])
    };

    let store = JsonFileStore::open(target_dir.path()).unwrap();
    let files = JsonFileAttachments::open(target_dir.path()).unwrap();
    let mapper = PersistenceMapper::new(&store, &files, &config);
    let mut cursor = ImportCursor::new();
    let forms = import_document(&document, &files, &mut cursor).unwrap();
    let copy = mapper.save(QuestionId(1), CONTEXT, &forms[0]).unwrap();

    assert_eq!(cursor.imported(), 1);
    assert_eq!(
        answers(&copy),
        vec![vec!["Flies", "Swims", "Walks"], vec!["Swims"], vec!["Walks"]]
    );
    assert_eq!(
        copy.rows.get(2).unwrap().feedback,
        "<p>Horses can swim too, but not by choice.</p>"
    );
}

#[test]
fn edit_cycle_through_form_fields() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonFileStore::open(dir.path()).unwrap();
    let files = JsonFileAttachments::open(dir.path()).unwrap();
    let config = MatrixConfig::default();
    let mapper = PersistenceMapper::new(&store, &files, &config);
    let original = mapper.save(QuestionId(2), CONTEXT, &parse(ANIMALS)).unwrap();

    // Prepare the edit form, pass it through the host field layout, untick
    // "Flies" for the duck and save again.
    let prepared = mapper.prepare_form(QuestionId(2), CONTEXT).unwrap();
    let mut fields = prepared.to_fields();
    assert_eq!(fields.get("rowanswersa1[0]"), Some("1"));
    let mut edited = AuthoredForm::from_fields(&fields).unwrap();
    edited.rows[0].flags.remove(&0);
    fields = edited.to_fields();
    assert!(!fields.contains("rowanswersa1[0]"));

    let resaved = mapper.save(QuestionId(2), CONTEXT, &edited).unwrap();
    assert_eq!(resaved.columns.names(), original.columns.names());
    assert_eq!(answers(&resaved)[0], vec!["Swims", "Walks"]);
    assert_eq!(
        resaved.rows.get(2).unwrap().feedback,
        "<p>Horses can swim too, but not by choice.</p>"
    );
}
