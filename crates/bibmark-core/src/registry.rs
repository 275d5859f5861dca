//! Key resolution and the run-scoped citation registry.
//!
//! The registry is the only mutable state in the engine. It maps canonical
//! keys to rendered citations in insertion order; the Nth distinct key
//! resolved in a run receives display index N (1-based), permanently, even
//! when later documents cite it again. Entries are write-once: a key is
//! formatted by a backend at most once per run.

use hashlink::LinkedHashMap;

use crate::backend::FormatBackend;
use crate::bibliography::{Bibliography, Reference};
use crate::error::{CitationError, Result};
use crate::scanner::RawMarker;

/// A rendered citation with its permanent display index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedReference {
    /// 1-based display index, assigned on first resolution.
    pub index: usize,
    /// Rendered citation text.
    pub citation: String,
}

/// The unit handed to the text rewriter: one constituent key of one marker
/// occurrence, with its resolved index and citation text. A marker with k
/// keys yields k quads sharing the same marker text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationQuad {
    /// The marker substring exactly as it appears in the document.
    pub marker: String,
    /// The constituent canonical key.
    pub key: String,
    /// The key's display index.
    pub index: usize,
    /// The key's rendered citation text.
    pub citation: String,
}

/// The outcome of resolving one document's markers.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// One quad per constituent key, in left-to-right marker order and,
    /// within a compound marker, written key order.
    pub quads: Vec<CitationQuad>,
    /// Keys first registered by this resolution, in display-index order.
    /// These drive the document-local bibliography.
    pub new_keys: Vec<String>,
}

/// Insertion-ordered store of resolved citations for one run.
#[derive(Debug, Default)]
pub struct CitationRegistry {
    entries: LinkedHashMap<String, ResolvedReference>,
    next_index: usize,
}

impl CitationRegistry {
    /// Create an empty registry. One registry spans one build; it grows
    /// monotonically and is discarded at build end.
    pub fn new() -> Self {
        Self {
            entries: LinkedHashMap::new(),
            next_index: 1,
        }
    }

    /// Resolve one document's markers into citation quads.
    ///
    /// Keys not yet in the registry are looked up in `bibliography` (an
    /// unknown key is a hard error) and formatted by `backend` in a single
    /// batch call; the backend's output is merged in the order it was
    /// returned, each new key taking the next display index.
    pub fn resolve(
        &mut self,
        markers: &[RawMarker],
        bibliography: &Bibliography,
        backend: &dyn FormatBackend,
    ) -> Result<Resolution> {
        // Collect entries for keys unseen in this run, preserving
        // first-appearance order.
        let mut unseen: LinkedHashMap<String, Reference> = LinkedHashMap::new();
        for marker in markers {
            for key in marker.keys() {
                if self.entries.contains_key(&key) || unseen.contains_key(&key) {
                    continue;
                }
                let entry = bibliography
                    .get(&key)
                    .ok_or_else(|| CitationError::UnknownKey { key: key.clone() })?;
                unseen.insert(key, entry.clone());
            }
        }

        let mut new_keys = Vec::with_capacity(unseen.len());
        if !unseen.is_empty() {
            tracing::debug!(
                backend = backend.name(),
                count = unseen.len(),
                "Formatting unseen citation keys"
            );
            let formatted = backend.format_batch(&unseen)?;
            if formatted.len() != unseen.len() {
                return Err(CitationError::Backend {
                    backend: backend.name().to_string(),
                    message: format!(
                        "expected {} formatted entries, got {}",
                        unseen.len(),
                        formatted.len()
                    ),
                });
            }
            for (key, citation) in formatted {
                if !unseen.contains_key(&key) || self.entries.contains_key(&key) {
                    return Err(CitationError::Backend {
                        backend: backend.name().to_string(),
                        message: format!("backend returned unexpected or duplicate key '{}'", key),
                    });
                }
                let index = self.next_index;
                self.next_index += 1;
                self.entries
                    .insert(key.clone(), ResolvedReference { index, citation });
                new_keys.push(key);
            }
        }

        // Re-walk the markers to emit quads in the original order.
        let mut quads = Vec::new();
        for marker in markers {
            for key in marker.keys() {
                let resolved = self
                    .entries
                    .get(&key)
                    .ok_or_else(|| CitationError::UnknownKey { key: key.clone() })?;
                quads.push(CitationQuad {
                    marker: marker.text().to_string(),
                    key,
                    index: resolved.index,
                    citation: resolved.citation.clone(),
                });
            }
        }

        Ok(Resolution { quads, new_keys })
    }

    /// Look up a resolved reference by key.
    pub fn get(&self, key: &str) -> Option<&ResolvedReference> {
        self.entries.get(key)
    }

    /// Whether a key has been resolved in this run.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate resolved entries in display-index order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedReference)> {
        self.entries.iter()
    }

    /// Bibliography lines for the given keys, in index order, one
    /// `[^N]: citation` line per key. Keys absent from the registry are
    /// skipped.
    pub fn bibliography_for<'a>(&self, keys: impl IntoIterator<Item = &'a String>) -> String {
        let mut lines: Vec<(usize, String)> = keys
            .into_iter()
            .filter_map(|key| self.entries.get(key))
            .map(|resolved| (resolved.index, bibliography_line(resolved)))
            .collect();
        lines.sort_by_key(|(index, _)| *index);
        lines
            .into_iter()
            .map(|(_, line)| line)
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// The full cumulative bibliography for everything resolved so far in
    /// the run, in index order.
    pub fn full_bibliography(&self) -> String {
        self.entries
            .values()
            .map(bibliography_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One footnote-style bibliography definition, consumable by a downstream
/// Markdown renderer.
fn bibliography_line(resolved: &ResolvedReference) -> String {
    format!("[^{}]: {}", resolved.index, resolved.citation)
}
