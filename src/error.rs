use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModwireError {
    #[error("No module file found for '{}'", from.display())]
    ModuleNotFound { from: PathBuf },

    #[error("Project validation failed: {0}")]
    ProjectValidation(String),

    #[error("Module transformation failed: {0}")]
    Transform(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModwireError>;
