// Error types for signgloss

use thiserror::Error;

/// Result type for signgloss operations
pub type Result<T> = std::result::Result<T, GlossError>;

/// Errors that escape the library as `Err`.
///
/// Per-request pipeline failures never show up here; they are reported through
/// [`crate::orchestration::ProcessingResult`]. Only startup conditions (dataset, configuration,
/// backend construction) propagate.
#[derive(Error, Debug)]
pub enum GlossError {
    #[error("Dataset load error: {0}")]
    DatasetLoad(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}
