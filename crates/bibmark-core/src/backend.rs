//! Formatting backends for citation rendering.
//!
//! A backend turns a batch of not-yet-seen bibliography entries into
//! rendered citation text, one entry per key. Two implementations share the
//! contract:
//!
//! - [`SimpleBackend`] formats each entry from its own fields, with no style
//!   knowledge.
//! - [`StyleBackend`] delegates to an external citation-style processor
//!   (pandoc by default) driven by a CSL style file.
//!
//! Selection happens once, at configuration time, via [`select_backend`].

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use hashlink::LinkedHashMap;

use crate::bibliography::{Name, Reference};
use crate::config::CitationConfig;
use crate::error::{CitationError, Result};

/// Default external style processor binary.
pub const DEFAULT_STYLE_PROCESSOR: &str = "pandoc";

/// A citation formatting strategy.
///
/// The resolver calls [`format_batch`](FormatBackend::format_batch) exactly
/// once per document, with only the keys the registry has never seen. That
/// lets a style-driven implementation apply bibliography-wide rules without
/// redoing work for repeat citations.
pub trait FormatBackend {
    /// Human-readable name for this backend. Used for logging and errors.
    fn name(&self) -> &str;

    /// Format a batch of unseen entries.
    ///
    /// Returns one `(key, citation)` pair per input key, in whatever order
    /// this backend chooses; the registry merges them in the returned order.
    /// Must cover every input key exactly once.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot produce output for the batch.
    /// Failures are propagated, never retried.
    fn format_batch(
        &self,
        entries: &LinkedHashMap<String, Reference>,
    ) -> Result<Vec<(String, String)>>;
}

/// Select the backend for a run: a configured `style_file` picks the
/// style-driven backend, otherwise the simple one.
pub fn select_backend(config: &CitationConfig) -> Box<dyn FormatBackend> {
    match &config.style_file {
        Some(style_file) => Box::new(StyleBackend::new(
            style_file.clone(),
            config.style_processor.clone(),
        )),
        None => Box::new(SimpleBackend),
    }
}

/// Formats entries from their own fields, independently of any style
/// definition. Deterministic; output order equals input iteration order.
pub struct SimpleBackend;

impl FormatBackend for SimpleBackend {
    fn name(&self) -> &str {
        "simple"
    }

    fn format_batch(
        &self,
        entries: &LinkedHashMap<String, Reference>,
    ) -> Result<Vec<(String, String)>> {
        Ok(entries
            .iter()
            .map(|(key, entry)| (key.clone(), format_reference(entry)))
            .collect())
    }
}

/// Render one reference from its fields: authors, *title*, container,
/// publisher, year, link. Missing fields are skipped.
pub fn format_reference(entry: &Reference) -> String {
    let mut parts: Vec<String> = Vec::new();

    let names = entry.author.as_ref().or(entry.editor.as_ref());
    if let Some(names) = names {
        let joined = join_names(names);
        if !joined.is_empty() {
            parts.push(joined);
        }
    }
    if let Some(title) = &entry.title {
        parts.push(format!("*{}*", title));
    }
    if let Some(container) = &entry.container_title {
        parts.push(container.clone());
    }
    if let Some(publisher) = &entry.publisher {
        parts.push(publisher.clone());
    }
    if let Some(year) = entry.issued.as_ref().and_then(|date| date.year()) {
        parts.push(year.to_string());
    }
    if let Some(url) = &entry.url {
        parts.push(format!("<{}>", url));
    } else if let Some(doi) = &entry.doi {
        parts.push(format!("<https://doi.org/{}>", doi));
    }

    let mut citation = parts.join(". ");
    if !citation.is_empty() && !citation.ends_with('>') {
        citation.push('.');
    }
    citation
}

fn join_names(names: &[Name]) -> String {
    let display: Vec<String> = names
        .iter()
        .map(Name::display)
        .filter(|name| !name.is_empty())
        .collect();
    match display.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [head @ .., last] => format!("{} and {}", head.join(", "), last),
    }
}

/// Delegates formatting to an external citation-style processor with a CSL
/// style-definition file.
///
/// Each entry is written as a one-element CSL-JSON bibliography to a
/// temporary file; the processor receives a minimal `nocite` document on
/// stdin and emits the formatted entry on stdout. Same entries and same
/// style file produce the same output across runs; no ordering guarantees
/// beyond that are assumed by callers.
pub struct StyleBackend {
    style_file: PathBuf,
    processor: PathBuf,
}

impl StyleBackend {
    /// Create a style-driven backend. `processor` defaults to
    /// [`DEFAULT_STYLE_PROCESSOR`] when `None`.
    pub fn new(style_file: PathBuf, processor: Option<PathBuf>) -> Self {
        Self {
            style_file,
            processor: processor.unwrap_or_else(|| PathBuf::from(DEFAULT_STYLE_PROCESSOR)),
        }
    }

    fn backend_error(&self, message: impl Into<String>) -> CitationError {
        CitationError::Backend {
            backend: self.name().to_string(),
            message: message.into(),
        }
    }

    fn format_entry(&self, key: &str, entry: &Reference) -> Result<String> {
        // One-entry CSL-JSON bibliography for the processor to draw from.
        let mut bib_file = tempfile::Builder::new()
            .prefix("bibmark-")
            .suffix(".json")
            .tempfile()?;
        serde_json::to_writer(bib_file.as_file_mut(), &[entry])
            .map_err(|e| self.backend_error(format!("failed to serialize entry '{}': {}", key, e)))?;
        bib_file.as_file_mut().flush()?;

        let mut child = Command::new(&self.processor)
            .arg("--citeproc")
            .arg("--csl")
            .arg(&self.style_file)
            .arg("--bibliography")
            .arg(bib_file.path())
            .args(["--from", "markdown", "--to", "markdown_strict"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit()) // Pass through processor stderr to user
            .spawn()
            .map_err(|e| {
                self.backend_error(format!(
                    "failed to spawn '{}': {}",
                    self.processor.display(),
                    e
                ))
            })?;

        {
            let stdin = child.stdin.as_mut().expect("Failed to get stdin handle");
            write!(stdin, "---\nnocite: \"@{}\"\n---\n", key)
                .map_err(|e| self.backend_error(format!("failed to write to stdin: {}", e)))?;
        }
        // stdin is dropped here, signaling EOF to the processor

        let output = child
            .wait_with_output()
            .map_err(|e| self.backend_error(format!("failed to wait for processor: {}", e)))?;

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            return Err(self.backend_error(format!(
                "'{}' exited with code {} while formatting '{}'",
                self.processor.display(),
                code,
                key
            )));
        }

        let text = String::from_utf8(output.stdout)
            .map_err(|_| self.backend_error("processor produced non-UTF-8 output"))?;
        Ok(collapse_entry(&text))
    }
}

impl FormatBackend for StyleBackend {
    fn name(&self) -> &str {
        "style"
    }

    fn format_batch(
        &self,
        entries: &LinkedHashMap<String, Reference>,
    ) -> Result<Vec<(String, String)>> {
        if !self.style_file.is_file() {
            return Err(self.backend_error(format!(
                "style file '{}' does not exist or is not readable",
                self.style_file.display()
            )));
        }

        let mut formatted = Vec::with_capacity(entries.len());
        for (key, entry) in entries {
            tracing::debug!(key = %key, "Formatting entry with style processor");
            formatted.push((key.clone(), self.format_entry(key, entry)?));
        }
        Ok(formatted)
    }
}

/// The processor emits the formatted entry as a small Markdown fragment,
/// possibly wrapped in a `:::` refs div; collapse it to a single line.
fn collapse_entry(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(":::"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bibliography::DateVariable;

    fn book(id: &str, title: &str, year: i32) -> Reference {
        Reference {
            id: id.to_string(),
            ref_type: "book".to_string(),
            title: Some(title.to_string()),
            author: Some(vec![
                Name {
                    family: Some("Pearl".to_string()),
                    given: Some("Judea".to_string()),
                    literal: None,
                },
                Name {
                    family: Some("Mackenzie".to_string()),
                    given: Some("Dana".to_string()),
                    literal: None,
                },
            ]),
            publisher: Some("Basic Books".to_string()),
            issued: Some(DateVariable {
                date_parts: vec![vec![year]],
                raw: None,
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_simple_format_full_entry() {
        let citation = format_reference(&book("PM18", "The Book of Why", 2018));
        assert_eq!(
            citation,
            "Judea Pearl and Dana Mackenzie. *The Book of Why*. Basic Books. 2018."
        );
    }

    #[test]
    fn test_simple_format_minimal_entry() {
        let citation = format_reference(&Reference {
            id: "x".to_string(),
            title: Some("Untitled Notes".to_string()),
            ..Default::default()
        });
        assert_eq!(citation, "*Untitled Notes*.");
    }

    #[test]
    fn test_simple_format_single_author_with_url() {
        let entry = Reference {
            id: "h94".to_string(),
            title: Some("Time Series Analysis".to_string()),
            author: Some(vec![Name {
                family: Some("Hamilton".to_string()),
                given: Some("James".to_string()),
                literal: None,
            }]),
            url: Some("https://example.org/tsa".to_string()),
            ..Default::default()
        };
        assert_eq!(
            format_reference(&entry),
            "James Hamilton. *Time Series Analysis*. <https://example.org/tsa>"
        );
    }

    #[test]
    fn test_simple_backend_preserves_input_order() {
        let mut entries = LinkedHashMap::new();
        entries.insert("b".to_string(), book("b", "Second", 2001));
        entries.insert("a".to_string(), book("a", "First", 2000));

        let formatted = SimpleBackend.format_batch(&entries).unwrap();
        let keys: Vec<&str> = formatted.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_simple_backend_deterministic() {
        let mut entries = LinkedHashMap::new();
        entries.insert("PM18".to_string(), book("PM18", "The Book of Why", 2018));

        let first = SimpleBackend.format_batch(&entries).unwrap();
        let second = SimpleBackend.format_batch(&entries).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_collapse_entry_strips_refs_div() {
        let raw = "::: {#refs}\nPearl, J. (2018). *The Book of\nWhy*. Basic Books.\n:::\n";
        assert_eq!(
            collapse_entry(raw),
            "Pearl, J. (2018). *The Book of Why*. Basic Books."
        );
    }

    #[test]
    fn test_style_backend_missing_style_file() {
        let backend = StyleBackend::new(PathBuf::from("/nonexistent/style.csl"), None);
        let mut entries = LinkedHashMap::new();
        entries.insert("PM18".to_string(), book("PM18", "The Book of Why", 2018));

        match backend.format_batch(&entries) {
            Err(CitationError::Backend { backend, message }) => {
                assert_eq!(backend, "style");
                assert!(message.contains("style file"), "Got: {}", message);
            }
            other => panic!("Expected Backend error, got {:?}", other.is_ok()),
        }
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn create_fake_processor(dir: &TempDir, script: &str) -> PathBuf {
            let path = dir.path().join("fake-processor.sh");
            fs::write(&path, script).unwrap();
            let mut perms = fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&path, perms).unwrap();
            path
        }

        fn create_style_file(dir: &TempDir) -> PathBuf {
            let path = dir.path().join("style.csl");
            fs::write(&path, "<style/>").unwrap();
            path
        }

        #[test]
        fn test_style_backend_formats_each_key() {
            let dir = TempDir::new().unwrap();
            let processor = create_fake_processor(
                &dir,
                "#!/bin/sh\ncat > /dev/null\necho \"styled entry\"\n",
            );
            let style = create_style_file(&dir);

            let backend = StyleBackend::new(style, Some(processor));
            let mut entries = LinkedHashMap::new();
            entries.insert("PM18".to_string(), book("PM18", "The Book of Why", 2018));
            entries.insert("Hamilton".to_string(), book("Hamilton", "Time Series Analysis", 1994));

            let formatted = backend.format_batch(&entries).unwrap();
            assert_eq!(formatted.len(), 2);
            assert_eq!(formatted[0], ("PM18".to_string(), "styled entry".to_string()));
            assert_eq!(
                formatted[1],
                ("Hamilton".to_string(), "styled entry".to_string())
            );
        }

        #[test]
        fn test_style_backend_nonzero_exit_propagates() {
            let dir = TempDir::new().unwrap();
            let processor = create_fake_processor(&dir, "#!/bin/sh\ncat > /dev/null\nexit 3\n");
            let style = create_style_file(&dir);

            let backend = StyleBackend::new(style, Some(processor));
            let mut entries = LinkedHashMap::new();
            entries.insert("PM18".to_string(), book("PM18", "The Book of Why", 2018));

            match backend.format_batch(&entries) {
                Err(CitationError::Backend { message, .. }) => {
                    assert!(message.contains("exited with code 3"), "Got: {}", message);
                }
                other => panic!("Expected Backend error, got {:?}", other.is_ok()),
            }
        }

        #[test]
        fn test_style_backend_missing_binary() {
            let dir = TempDir::new().unwrap();
            let style = create_style_file(&dir);

            let backend = StyleBackend::new(style, Some(PathBuf::from("/nonexistent/processor")));
            let mut entries = LinkedHashMap::new();
            entries.insert("PM18".to_string(), book("PM18", "The Book of Why", 2018));

            match backend.format_batch(&entries) {
                Err(CitationError::Backend { message, .. }) => {
                    assert!(message.contains("failed to spawn"), "Got: {}", message);
                }
                other => panic!("Expected Backend error, got {:?}", other.is_ok()),
            }
        }
    }
}
