//! Error types for bibmark-core.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for bibmark-core operations.
pub type Result<T> = std::result::Result<T, CitationError>;

/// Errors that can occur during citation processing.
///
/// Every variant is fatal to the run: a missing or misformatted citation is
/// a correctness defect in the published documentation, so failures surface
/// to the caller instead of being logged and suppressed.
#[derive(Error, Debug)]
pub enum CitationError {
    /// Neither a bibliography file nor a bibliography directory was
    /// configured. Raised before any document is processed.
    #[error("No bibliography source configured: set bib_file or bib_dir")]
    NoBibliography,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A bibliography file is not valid CSL-JSON.
    #[error("Failed to parse bibliography file '{}': {source}", path.display())]
    BibliographyParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    /// The configuration file is not valid YAML.
    #[error("Invalid configuration file '{}': {message}", path.display())]
    Config { path: PathBuf, message: String },

    /// A cited key is absent from the loaded bibliography.
    #[error("Citation key '{key}' not found in bibliography")]
    UnknownKey { key: String },

    /// A formatting backend could not produce output for its batch, or
    /// violated the one-citation-per-key contract.
    #[error("Formatting backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },
}
