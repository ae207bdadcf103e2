//! The `oumatrix validate` command.

use std::path::PathBuf;

use anyhow::Result;

use oumatrix_core::config::load_config_from;
use oumatrix_core::parser::parse_form;
use oumatrix_core::validation::validate_form;

use super::print_field_errors;

pub fn execute(form_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let config = load_config_from(config_path.as_deref())?;
    let form = parse_form(&form_path, &config.defaults)?;

    println!(
        "Form: {} ({} column slot(s), {} row slot(s), {} mode)",
        form_path.display(),
        form.columns.len(),
        form.rows.len(),
        form.input_mode
    );

    let errors = validate_form(&form, &config.limits);
    if errors.is_empty() {
        println!("Form is valid.");
        return Ok(());
    }

    print_field_errors(&errors);
    anyhow::bail!("{} validation error(s) found", errors.len())
}
