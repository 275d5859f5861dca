//! Citation marker scanning.
//!
//! The scanner finds bracketed citation markers in raw document text:
//! `[@key]` for a single citation, `[@key1;@key2]` for a compound one.
//! Scanning is pure text work; it never consults the registry.

use once_cell::sync::Lazy;
use regex::Regex;

/// Matches a bracketed citation marker.
///
/// The group must open with `@` (after optional whitespace) and may not
/// contain brackets, so empty brackets and plain bracketed text never match,
/// and for nested groups like `[[@a]]` only the inner `[@a]` matches.
static MARKER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[\s*@[^\[\]]+\]").unwrap());

/// A citation marker exactly as it appears in source text.
///
/// The original substring is kept verbatim because it is the substitution
/// anchor during rewriting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMarker {
    text: String,
}

impl RawMarker {
    /// Create a marker from its source substring.
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// The exact substring as it appeared in the document.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The canonical keys cited by this marker, in written order.
    ///
    /// Splits on `;` and strips decoration (brackets, `@`, whitespace) from
    /// the marker and from each constituent token. Tokens that are empty
    /// after stripping (e.g. the trailing slot in `[@a;]`) are dropped.
    pub fn keys(&self) -> Vec<String> {
        self.text
            .trim()
            .trim_start_matches('[')
            .trim_end_matches(']')
            .split(';')
            .map(|token| token.trim().trim_start_matches('@').trim())
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Find every citation marker in `text`, left to right, non-overlapping.
///
/// Text containing no markers yields an empty vec; that is not an error.
pub fn find_markers(text: &str) -> Vec<RawMarker> {
    MARKER_RE
        .find_iter(text)
        .map(|m| RawMarker::new(m.as_str()))
        .collect()
}
