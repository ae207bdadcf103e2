//! The `oumatrix import` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use oumatrix_core::model::{ContextId, QuestionId};
use oumatrix_core::PersistenceMapper;
use oumatrix_interchange::{import_document, ImportCursor};

use super::{open, report};

pub fn execute(
    input: PathBuf,
    first_question: u64,
    context: u64,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let text = std::fs::read_to_string(&input)
        .with_context(|| format!("failed to read {}", input.display()))?;

    let (config, store) = open(config_path.as_deref())?;
    let mut cursor = ImportCursor::new();
    let forms = import_document(&text, store.files.as_ref(), &mut cursor)
        .with_context(|| format!("failed to import {}", input.display()))?;
    if forms.is_empty() {
        anyhow::bail!("{} contains no matrix questions", input.display());
    }
    tracing::info!("read {} matrix question(s) from {}", forms.len(), input.display());

    let mapper = PersistenceMapper::new(store.records.as_ref(), store.files.as_ref(), &config);
    for (question_id, form) in (first_question..).zip(&forms) {
        let saved = mapper
            .save(QuestionId(question_id), ContextId(context), form)
            .map_err(report)
            .with_context(|| format!("failed to save imported question {question_id}"))?;
        println!(
            "Imported question {}: {} column(s), {} row(s)",
            saved.question_id,
            saved.columns.len(),
            saved.rows.len()
        );
    }

    println!("{} question(s) imported.", cursor.imported());
    Ok(())
}
