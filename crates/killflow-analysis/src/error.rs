use killflow_core::IrError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error(transparent)]
    Ir(#[from] IrError),
    #[error("Block '{block}' of @{function} is not a loop header")]
    NotALoop { function: String, block: String },
    #[error("@{0} is a declaration and has no body to analyse")]
    Declaration(String),
    #[error("Failed to read configuration {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
