//! Text rewriting: inline citations and bibliography placeholders.
//!
//! The rewriter replaces every citation marker with footnote-style inline
//! references (`[^N]`), then substitutes the two placeholder commands with
//! bibliography lists. All replacement is literal substring substitution —
//! the configured command tokens are matched exactly, never interpreted as
//! patterns, so tokens containing regex metacharacters need no escaping by
//! document authors.

use hashlink::LinkedHashMap;

use crate::config::CitationConfig;
use crate::registry::{CitationQuad, CitationRegistry};
use crate::scanner::RawMarker;

/// Rewrite one document.
///
/// Every occurrence of each marker substring is replaced with the same
/// inline reference text, the local-bibliography command with the entries
/// newly introduced by this document (`new_keys`), and the
/// full-bibliography command with the entire cumulative registry. A document
/// with no markers and no placeholder commands comes back unchanged.
/// Performs no disk I/O.
pub fn rewrite(
    text: &str,
    quads: &[CitationQuad],
    new_keys: &[String],
    registry: &CitationRegistry,
    config: &CitationConfig,
) -> String {
    let mut output = text.to_string();

    // Group quads by marker text, keeping first-appearance order. A marker
    // cited twice yields identical runs of quads; keep only the first run,
    // since the literal replacement below already covers every occurrence.
    let mut groups: LinkedHashMap<&str, Vec<&CitationQuad>> = LinkedHashMap::new();
    for quad in quads {
        let expected = RawMarker::new(quad.marker.clone()).keys().len();
        let group = groups.entry(quad.marker.as_str()).or_insert_with(Vec::new);
        if group.len() < expected {
            group.push(quad);
        }
    }

    for (marker, group) in &groups {
        let inline: String = group
            .iter()
            .map(|quad| format!("[^{}]", quad.index))
            .collect();
        output = output.replace(marker, &inline);
    }

    output = output.replace(&config.bib_command, &registry.bibliography_for(new_keys));
    output.replace(&config.full_bib_command, &registry.full_bibliography())
}
