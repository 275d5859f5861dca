//! Engine configuration.
//!
//! The configuration covers the collaborator boundaries: where the
//! bibliography comes from, which placeholder tokens to substitute, and
//! whether a style file (and therefore the style-driven backend) is in play.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CitationError, Result};

/// Default placeholder for "insert this document's new references here".
pub const DEFAULT_BIB_COMMAND: &str = "\\bibliography";

/// Default placeholder for "insert the entire cumulative bibliography here".
pub const DEFAULT_FULL_BIB_COMMAND: &str = "\\full_bibliography";

/// Configuration for a citation-processing run.
///
/// Placeholder commands are literal string tokens matched exactly in
/// document text, never patterns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CitationConfig {
    /// Path to a single CSL-JSON bibliography file.
    pub bib_file: Option<PathBuf>,

    /// Path to a directory of CSL-JSON bibliography files.
    /// Ignored when `bib_file` is set.
    pub bib_dir: Option<PathBuf>,

    /// Placeholder command for the per-document bibliography.
    pub bib_command: String,

    /// Placeholder command for the full cumulative bibliography.
    pub full_bib_command: String,

    /// Citation style file. When present the style-driven backend is
    /// selected; when absent the simple backend formats entries.
    pub style_file: Option<PathBuf>,

    /// External style processor binary. Defaults to `pandoc` when unset.
    pub style_processor: Option<PathBuf>,
}

impl Default for CitationConfig {
    fn default() -> Self {
        Self {
            bib_file: None,
            bib_dir: None,
            bib_command: DEFAULT_BIB_COMMAND.to_string(),
            full_bib_command: DEFAULT_FULL_BIB_COMMAND.to_string(),
            style_file: None,
            style_processor: None,
        }
    }
}

impl CitationConfig {
    /// Load configuration from a YAML file. Omitted keys take their
    /// defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        serde_yaml::from_str(&contents).map_err(|e| CitationError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CitationConfig::default();
        assert_eq!(config.bib_command, "\\bibliography");
        assert_eq!(config.full_bib_command, "\\full_bibliography");
        assert!(config.bib_file.is_none());
        assert!(config.style_file.is_none());
    }

    #[test]
    fn test_from_yaml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bibmark.yml");
        fs::write(&path, "bib_file: refs.json\nstyle_file: apa.csl\n").unwrap();

        let config = CitationConfig::from_file(&path).unwrap();
        assert_eq!(config.bib_file, Some(PathBuf::from("refs.json")));
        assert_eq!(config.style_file, Some(PathBuf::from("apa.csl")));
        // Omitted keys keep their defaults.
        assert_eq!(config.bib_command, DEFAULT_BIB_COMMAND);
        assert_eq!(config.full_bib_command, DEFAULT_FULL_BIB_COMMAND);
    }

    #[test]
    fn test_from_yaml_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yml");
        fs::write(&path, "bib_file: [unclosed").unwrap();

        match CitationConfig::from_file(&path) {
            Err(CitationError::Config { path: err_path, .. }) => assert_eq!(err_path, path),
            other => panic!("Expected Config error, got {:?}", other.is_ok()),
        }
    }
}
