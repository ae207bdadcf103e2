//! Process-wide configuration.
//!
//! Defaults for new questions, validation limits, default feedback texts and
//! the store the CLI opens. The configuration is passed explicitly into the
//! mapper; nothing here is read from ambient state after loading.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::form::AuthoredForm;
use crate::model::{GradeMethod, InputMode};

/// Settings applied to newly created questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixDefaults {
    #[serde(default = "default_input_mode")]
    pub input_mode: InputMode,
    #[serde(default = "default_grade_method")]
    pub grade_method: GradeMethod,
    #[serde(default = "default_true")]
    pub shuffle_answers: bool,
    #[serde(default = "default_true")]
    pub shown_num_correct: bool,
}

fn default_input_mode() -> InputMode {
    InputMode::Single
}
fn default_grade_method() -> GradeMethod {
    GradeMethod::PartialCredit
}
fn default_true() -> bool {
    true
}

impl Default for MatrixDefaults {
    fn default() -> Self {
        Self {
            input_mode: default_input_mode(),
            grade_method: default_grade_method(),
            shuffle_answers: true,
            shown_num_correct: true,
        }
    }
}

impl MatrixDefaults {
    /// Remember the settings of a saved form for the next new question.
    pub fn remember(&mut self, form: &AuthoredForm) {
        self.input_mode = form.input_mode;
        self.grade_method = form.grade_method;
        self.shuffle_answers = form.shuffle_answers;
        self.shown_num_correct = form.shown_num_correct;
    }
}

/// Minimum sizes the validator enforces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationLimits {
    #[serde(default = "default_min")]
    pub min_columns: usize,
    #[serde(default = "default_min")]
    pub min_rows: usize,
}

fn default_min() -> usize {
    2
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            min_columns: default_min(),
            min_rows: default_min(),
        }
    }
}

/// Default combined-feedback texts for new questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackDefaults {
    #[serde(default = "default_correct")]
    pub correct: String,
    #[serde(default = "default_partially_correct")]
    pub partially_correct: String,
    #[serde(default = "default_incorrect")]
    pub incorrect: String,
}

fn default_correct() -> String {
    "Your answer is correct.".to_string()
}
fn default_partially_correct() -> String {
    "Your answer is partially correct.".to_string()
}
fn default_incorrect() -> String {
    "Your answer is incorrect.".to_string()
}

impl Default for FeedbackDefaults {
    fn default() -> Self {
        Self {
            correct: default_correct(),
            partially_correct: default_partially_correct(),
            incorrect: default_incorrect(),
        }
    }
}

/// Which record and attachment store to open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// Process-local store; contents vanish on exit.
    Memory,
    /// JSON documents under a directory.
    File {
        #[serde(default = "default_store_path")]
        path: PathBuf,
    },
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./oumatrix-data")
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            path: default_store_path(),
        }
    }
}

/// Top-level oumatrix configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatrixConfig {
    #[serde(default)]
    pub defaults: MatrixDefaults,
    #[serde(default)]
    pub limits: ValidationLimits,
    #[serde(default)]
    pub feedback: FeedbackDefaults,
    #[serde(default)]
    pub store: StoreConfig,
}

impl MatrixConfig {
    /// Write the configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("failed to write config: {}", path.display()))
    }
}

/// Resolve `${VAR_NAME}` references from the environment.
///
/// Unset variables resolve to the empty string.
pub fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        let Some(end) = result[start..].find('}') else {
            break;
        };
        let var_name = &result[start + 2..start + end];
        let value = std::env::var(var_name).unwrap_or_default();
        result = format!("{}{}{}", &result[..start], value, &result[start + end + 1..]);
    }
    result
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `oumatrix.toml` in the current directory
/// 2. `~/.config/oumatrix/config.toml`
///
/// Environment overrides: `OUMATRIX_INPUT_MODE`, `OUMATRIX_GRADE_METHOD`,
/// `OUMATRIX_SHUFFLE_ANSWERS`.
pub fn load_config() -> Result<MatrixConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<MatrixConfig> {
    let config_path = match path {
        Some(p) if p.exists() => Some(p.to_path_buf()),
        Some(p) => anyhow::bail!("config file not found: {}", p.display()),
        None => default_config_path(),
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<MatrixConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => MatrixConfig::default(),
    };

    apply_env_overrides(&mut config)?;

    if let StoreConfig::File { path } = &mut config.store {
        *path = PathBuf::from(resolve_env_vars(&path.to_string_lossy()));
    }

    Ok(config)
}

fn default_config_path() -> Option<PathBuf> {
    let local = PathBuf::from("oumatrix.toml");
    if local.exists() {
        return Some(local);
    }
    dirs_path()
        .map(|home| home.join("config.toml"))
        .filter(|global| global.exists())
}

fn apply_env_overrides(config: &mut MatrixConfig) -> Result<()> {
    if let Ok(mode) = std::env::var("OUMATRIX_INPUT_MODE") {
        config.defaults.input_mode = mode
            .parse()
            .map_err(|e: String| anyhow::anyhow!("OUMATRIX_INPUT_MODE: {e}"))?;
    }
    if let Ok(method) = std::env::var("OUMATRIX_GRADE_METHOD") {
        config.defaults.grade_method = method
            .parse()
            .map_err(|e: String| anyhow::anyhow!("OUMATRIX_GRADE_METHOD: {e}"))?;
    }
    if let Ok(shuffle) = std::env::var("OUMATRIX_SHUFFLE_ANSWERS") {
        config.defaults.shuffle_answers = match shuffle.trim() {
            "1" | "true" | "yes" => true,
            "0" | "false" | "no" => false,
            other => anyhow::bail!("OUMATRIX_SHUFFLE_ANSWERS: expected a boolean, got '{other}'"),
        };
    }
    Ok(())
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("oumatrix"))
}
