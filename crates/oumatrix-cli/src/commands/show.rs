//! The `oumatrix show` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use oumatrix_core::evaluator::{correct_response_summary, random_guess_score};
use oumatrix_core::model::QuestionId;
use oumatrix_core::{MatrixQuestion, PersistenceMapper};

use super::open;

pub fn execute(question: u64, fields: bool, config_path: Option<PathBuf>) -> Result<()> {
    let (config, store) = open(config_path.as_deref())?;
    let mapper = PersistenceMapper::new(store.records.as_ref(), store.files.as_ref(), &config);
    let loaded = mapper.load(QuestionId(question))?;

    if fields {
        for (key, value) in loaded.to_form().to_fields().iter() {
            println!("{key} = {value}");
        }
        return Ok(());
    }

    let options = &loaded.options;
    println!(
        "Question {} ({} mode, grading: {}, shuffle: {})",
        loaded.question_id, options.input_mode, options.grade_method, options.shuffle_answers
    );
    println!("\n{}", matrix_table(&loaded));
    println!("\nRandom guess score: {:.2}", random_guess_score(&loaded.rows));

    let summary = correct_response_summary(&loaded);
    if !summary.is_empty() {
        println!("{summary}");
    }

    for (number, hint) in loaded.hints.iter().enumerate() {
        let mut options = Vec::new();
        if hint.shown_num_correct {
            options.push("show number correct");
        }
        if hint.clear_wrong {
            options.push("clear wrong");
        }
        if hint.show_row_feedback {
            options.push("show row feedback");
        }
        if options.is_empty() {
            println!("Hint {}: {}", number + 1, hint.text);
        } else {
            println!("Hint {}: {} ({})", number + 1, hint.text, options.join(", "));
        }
    }
    Ok(())
}

fn matrix_table(question: &MatrixQuestion) -> Table {
    let mut table = Table::new();
    let mut header = vec![Cell::new("Row")];
    header.extend(question.columns.iter().map(|c| Cell::new(&c.name)));
    table.set_header(header);

    for row in question.rows.iter() {
        let mut cells = vec![Cell::new(&row.name)];
        cells.extend(question.columns.iter().map(|column| {
            let correct = column.id.is_some_and(|id| row.correct_answers.contains(id));
            Cell::new(if correct { "✓" } else { "" })
        }));
        table.add_row(cells);
    }
    table
}
