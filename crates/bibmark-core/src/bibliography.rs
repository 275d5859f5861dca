//! CSL-JSON bibliography types and loading.
//!
//! References use the CSL-JSON schema: an array of objects with an `id`,
//! a `type`, and bibliographic variables. Only the fields the simple
//! renderer cares about are modeled directly; everything else is kept in a
//! flattened map so style-driven backends see the full record.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use hashlink::LinkedHashMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::CitationConfig;
use crate::error::{CitationError, Result};

/// A bibliographic reference in CSL-JSON format.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    /// Unique identifier for this reference.
    /// CSL-JSON allows both string and integer IDs, so we accept both.
    #[serde(deserialize_with = "deserialize_string_or_int", default)]
    pub id: String,

    /// Reference type (e.g. "book", "article-journal", "chapter").
    #[serde(rename = "type", default)]
    pub ref_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "container-title", skip_serializing_if = "Option::is_none")]
    pub container_title: Option<String>,
    #[serde(rename = "collection-title", skip_serializing_if = "Option::is_none")]
    pub collection_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edition: Option<StringOrNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<StringOrNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue: Option<StringOrNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    #[serde(rename = "DOI", skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(rename = "URL", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    // Name variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<Vec<Name>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub editor: Option<Vec<Name>>,

    // Date variables
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issued: Option<DateVariable>,

    // Other fields captured in a map for extensibility
    #[serde(flatten)]
    pub other: HashMap<String, serde_json::Value>,
}

impl Reference {
    /// Create an empty reference with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }
}

/// A string or number value (CSL allows both for some fields).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum StringOrNumber {
    String(String),
    Number(i64),
}

impl fmt::Display for StringOrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StringOrNumber::String(s) => write!(f, "{}", s),
            StringOrNumber::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A name in CSL-JSON format.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Name {
    /// Family name (surname).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,

    /// Given name (first name).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given: Option<String>,

    /// Literal name (for institutional names).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub literal: Option<String>,
}

impl Name {
    /// Display form: the literal if present, otherwise "Given Family".
    pub fn display(&self) -> String {
        if let Some(ref literal) = self.literal {
            return literal.clone();
        }
        match (&self.given, &self.family) {
            (Some(given), Some(family)) => format!("{} {}", given, family),
            (None, Some(family)) => family.clone(),
            (Some(given), None) => given.clone(),
            (None, None) => String::new(),
        }
    }
}

/// A date variable in CSL-JSON format (`{"date-parts": [[2018, 3, 1]]}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateVariable {
    #[serde(rename = "date-parts", default, skip_serializing_if = "Vec::is_empty")]
    pub date_parts: Vec<Vec<i32>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw: Option<String>,
}

impl DateVariable {
    /// The year of the first date, if any.
    pub fn year(&self) -> Option<i32> {
        self.date_parts.first().and_then(|parts| parts.first()).copied()
    }
}

/// Deserialize a value that can be either a string or an integer into a String.
/// CSL-JSON allows reference IDs to be either strings or integers.
fn deserialize_string_or_int<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: serde_json::Value = Deserialize::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        _ => Err(Error::custom("expected string or number for id")),
    }
}

/// The loaded bibliography database: canonical key → reference.
///
/// Read-only for the lifetime of a run once loaded.
#[derive(Debug, Clone, Default)]
pub struct Bibliography {
    entries: LinkedHashMap<String, Reference>,
}

impl Bibliography {
    /// Create an empty bibliography.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bibliography from already-parsed references.
    pub fn from_references(references: impl IntoIterator<Item = Reference>) -> Self {
        let mut bibliography = Self::new();
        for reference in references {
            bibliography.insert(reference);
        }
        bibliography
    }

    /// Load the bibliography configured in `config`.
    ///
    /// A configured `bib_file` takes precedence; otherwise every `*.json`
    /// file in `bib_dir` is loaded in sorted path order, later files
    /// overriding earlier ones for duplicate keys. Configuring neither is a
    /// fatal [`CitationError::NoBibliography`].
    pub fn load(config: &CitationConfig) -> Result<Self> {
        let mut files: Vec<PathBuf> = Vec::new();
        if let Some(file) = &config.bib_file {
            files.push(file.clone());
        } else if let Some(dir) = &config.bib_dir {
            for entry in fs::read_dir(dir)? {
                let path = entry?.path();
                if path.extension().is_some_and(|ext| ext == "json") {
                    files.push(path);
                }
            }
            files.sort();
        } else {
            return Err(CitationError::NoBibliography);
        }

        let mut bibliography = Self::new();
        for path in &files {
            bibliography.extend_from_file(path)?;
        }
        tracing::debug!(
            entries = bibliography.len(),
            files = files.len(),
            "Loaded bibliography"
        );
        Ok(bibliography)
    }

    fn extend_from_file(&mut self, path: &Path) -> Result<()> {
        let contents = fs::read_to_string(path)?;
        let references: Vec<Reference> =
            serde_json::from_str(&contents).map_err(|source| CitationError::BibliographyParse {
                path: path.to_path_buf(),
                source,
            })?;
        for reference in references {
            self.insert(reference);
        }
        Ok(())
    }

    /// Insert a reference under its id. A later insert for the same id
    /// replaces the earlier one (last loaded wins).
    pub fn insert(&mut self, reference: Reference) {
        self.entries.insert(reference.id.clone(), reference);
    }

    /// Look up a reference by canonical key.
    pub fn get(&self, key: &str) -> Option<&Reference> {
        self.entries.get(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
