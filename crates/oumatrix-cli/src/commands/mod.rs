//! Subcommand implementations.

pub mod delete;
pub mod export;
pub mod import;
pub mod init;
pub mod save;
pub mod show;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;

use oumatrix_core::config::load_config_from;
use oumatrix_core::validation::FieldError;
use oumatrix_core::{MatrixConfig, MatrixError};
use oumatrix_store::{open_store, OpenStore};

/// Load configuration and open the configured stores.
pub(crate) fn open(config_path: Option<&Path>) -> Result<(MatrixConfig, OpenStore)> {
    let config = load_config_from(config_path)?;
    match config_path {
        Some(path) => tracing::debug!("loaded configuration from {}", path.display()),
        None => tracing::debug!("loaded configuration from the default locations"),
    }
    let store = open_store(&config.store)?;
    Ok((config, store))
}

/// Where `--remember-defaults` writes the configuration.
pub(crate) fn config_target(config_path: Option<PathBuf>) -> PathBuf {
    config_path.unwrap_or_else(|| PathBuf::from("oumatrix.toml"))
}

pub(crate) fn print_field_errors(errors: &[FieldError]) {
    for e in errors {
        println!("  {} ERROR: {}", e.key, e.message());
    }
}

/// Print field errors of an invalid form and turn the error into a summary.
pub(crate) fn report(err: MatrixError) -> anyhow::Error {
    if let MatrixError::Invalid(errors) = &err {
        print_field_errors(errors);
    }
    err.into()
}
