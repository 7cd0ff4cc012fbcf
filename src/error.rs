use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Gene2TraitError {
    #[error("failed to parse {} (line {line}): {message}", .path.display())]
    InputParse {
        path: PathBuf,
        line: u64,
        message: String,
    },

    #[error("required column '{column}' not found in {}", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("no trait found for dataset key '{key}' in phenotype table")]
    TraitNotFound { key: String },

    #[error("gene catalog contains no usable genes")]
    EmptyGeneCatalog,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, Gene2TraitError>;
