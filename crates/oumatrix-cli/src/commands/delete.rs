//! The `oumatrix delete` command.

use std::path::PathBuf;

use anyhow::Result;

use oumatrix_core::model::{ContextId, QuestionId};
use oumatrix_core::PersistenceMapper;

use super::open;

pub fn execute(question: u64, context: u64, config_path: Option<PathBuf>) -> Result<()> {
    let (config, store) = open(config_path.as_deref())?;
    let mapper = PersistenceMapper::new(store.records.as_ref(), store.files.as_ref(), &config);
    tracing::debug!("deleting question {question} from context {context}");
    mapper.delete(QuestionId(question), ContextId(context))?;
    println!("Deleted question {question}");
    Ok(())
}
