//! The `oumatrix save` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use oumatrix_core::model::{ContextId, QuestionId};
use oumatrix_core::parser::parse_form;
use oumatrix_core::PersistenceMapper;

use super::{config_target, open, report};

pub fn execute(
    form_path: PathBuf,
    question: u64,
    context: u64,
    remember_defaults: bool,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let (mut config, store) = open(config_path.as_deref())?;
    let form = parse_form(&form_path, &config.defaults)?;
    tracing::debug!("parsed form {} for question {question}", form_path.display());

    let mapper = PersistenceMapper::new(store.records.as_ref(), store.files.as_ref(), &config);
    let saved = mapper
        .save(QuestionId(question), ContextId(context), &form)
        .map_err(report)
        .with_context(|| format!("failed to save {}", form_path.display()))?;

    println!(
        "Saved question {}: {} column(s), {} row(s), {} mode",
        saved.question_id,
        saved.columns.len(),
        saved.rows.len(),
        saved.input_mode()
    );

    if remember_defaults {
        let target = config_target(config_path);
        config.defaults.remember(&form);
        config.save(&target)?;
        println!("Remembered defaults in {}", target.display());
    }
    Ok(())
}
