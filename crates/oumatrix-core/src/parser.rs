//! TOML authored-form parser.
//!
//! Loads an authored matrix from a TOML file so forms can be kept under
//! version control and fed to the save pipeline.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::config::MatrixDefaults;
use crate::form::{AuthoredForm, AuthoredHint, AuthoredRow};
use crate::model::{CombinedFeedback, InputMode, RichText, TextFormat};

/// Intermediate TOML structure for parsing form files.
#[derive(Debug, Deserialize)]
struct TomlForm {
    #[serde(default)]
    input_mode: Option<String>,
    #[serde(default)]
    grade_method: Option<String>,
    #[serde(default)]
    shuffle_answers: Option<bool>,
    #[serde(default)]
    shown_num_correct: Option<bool>,
    #[serde(default)]
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<TomlRow>,
    #[serde(default)]
    combined_feedback: Option<TomlCombinedFeedback>,
    #[serde(default)]
    hints: Vec<TomlHint>,
}

#[derive(Debug, Deserialize)]
struct TomlRow {
    name: String,
    /// 1-based column ordinals.
    #[serde(default)]
    correct: Vec<usize>,
    #[serde(default)]
    feedback: String,
    #[serde(default = "default_format")]
    feedback_format: String,
}

#[derive(Debug, Deserialize)]
struct TomlCombinedFeedback {
    #[serde(default)]
    correct: String,
    #[serde(default)]
    partially_correct: String,
    #[serde(default)]
    incorrect: String,
}

#[derive(Debug, Deserialize)]
struct TomlHint {
    #[serde(default)]
    text: String,
    #[serde(default = "default_format")]
    format: String,
    #[serde(default)]
    shown_num_correct: bool,
    #[serde(default)]
    clear_wrong: bool,
    #[serde(default)]
    show_row_feedback: bool,
}

fn default_format() -> String {
    "html".to_string()
}

/// Parse a form file, filling unset options from `defaults`.
pub fn parse_form(path: &Path, defaults: &MatrixDefaults) -> Result<AuthoredForm> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read form file: {}", path.display()))?;

    parse_form_str(&content, path, defaults)
}

/// Parse a TOML string into an `AuthoredForm` (useful for testing).
pub fn parse_form_str(
    content: &str,
    source_path: &Path,
    defaults: &MatrixDefaults,
) -> Result<AuthoredForm> {
    let parsed: TomlForm = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let mut form = AuthoredForm::new(defaults);
    if let Some(mode) = parsed.input_mode {
        form.input_mode = mode.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?;
    }
    if let Some(method) = parsed.grade_method {
        form.grade_method = method.parse().map_err(|e: String| anyhow::anyhow!("{}", e))?;
    }
    if let Some(shuffle) = parsed.shuffle_answers {
        form.shuffle_answers = shuffle;
    }
    if let Some(shown) = parsed.shown_num_correct {
        form.shown_num_correct = shown;
    }
    if let Some(feedback) = parsed.combined_feedback {
        form.combined_feedback = CombinedFeedback {
            correct: RichText::html(feedback.correct),
            partially_correct: RichText::html(feedback.partially_correct),
            incorrect: RichText::html(feedback.incorrect),
        };
    }

    let mode = form.input_mode;
    form.columns = parsed.columns;
    form.rows = parsed
        .rows
        .into_iter()
        .map(|r| {
            if mode == InputMode::Single && r.correct.len() > 1 {
                anyhow::bail!(
                    "row '{}' lists {} correct columns but the form is in single mode",
                    r.name,
                    r.correct.len()
                );
            }
            if let Some(zero) = r.correct.iter().find(|n| **n == 0) {
                anyhow::bail!("row '{}': column ordinals start at 1, got {zero}", r.name);
            }

            let format: TextFormat = r
                .feedback_format
                .parse()
                .map_err(|e: String| anyhow::anyhow!("{}", e))?;
            let mut row = AuthoredRow::new(r.name).with_feedback(RichText {
                text: r.feedback,
                format,
                draft: None,
            });
            row = match mode {
                InputMode::Single => match r.correct.first() {
                    Some(ordinal) => row.choose(*ordinal),
                    None => row,
                },
                InputMode::Multiple => r.correct.iter().fold(row, |row, n| row.flag(n - 1)),
            };
            Ok(row)
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid rows in {}", source_path.display()))?;

    form.hints = parsed
        .hints
        .into_iter()
        .map(|h| {
            let format: TextFormat = h
                .format
                .parse()
                .map_err(|e: String| anyhow::anyhow!("{}", e))?;
            Ok(AuthoredHint {
                hint: RichText {
                    text: h.text,
                    format,
                    draft: None,
                },
                shown_num_correct: h.shown_num_correct,
                clear_wrong: h.clear_wrong,
                show_row_feedback: h.show_row_feedback,
            })
        })
        .collect::<Result<Vec<_>>>()
        .with_context(|| format!("invalid hints in {}", source_path.display()))?;

    Ok(form)
}
