//! The `oumatrix export` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use oumatrix_core::model::{ContextId, QuestionId};
use oumatrix_core::PersistenceMapper;
use oumatrix_interchange::{export_question, export_quiz};

use super::open;

pub fn execute(
    question: u64,
    context: u64,
    output: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (config, store) = open(config_path.as_deref())?;
    let mapper = PersistenceMapper::new(store.records.as_ref(), store.files.as_ref(), &config);
    let loaded = mapper.load(QuestionId(question))?;

    let element = export_question(&loaded, ContextId(context), store.files.as_ref())?;
    let document = export_quiz([element]);
    tracing::debug!("exported question {question}: {} byte(s)", document.len());

    match output {
        Some(path) => {
            std::fs::write(&path, &document)
                .with_context(|| format!("failed to write {}", path.display()))?;
            eprintln!("Exported question {question} to {}", path.display());
        }
        None => print!("{document}"),
    }
    Ok(())
}
