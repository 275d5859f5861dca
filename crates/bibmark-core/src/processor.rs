//! The run-scoped citation processing context.
//!
//! [`CitationProcessor`] ties the engine together: it owns the loaded
//! bibliography, the selected formatting backend, and the cumulative
//! registry, and processes documents one at a time. Numbering correctness
//! depends on strict sequential ordering, so a host that renders documents
//! on worker threads must serialize them through a single processor.

use tracing::debug;

use crate::backend::{FormatBackend, select_backend};
use crate::bibliography::Bibliography;
use crate::config::CitationConfig;
use crate::error::Result;
use crate::registry::CitationRegistry;
use crate::rewrite::rewrite;
use crate::scanner::find_markers;

/// Citation processor for one documentation build.
///
/// Create it once, before any document is processed; feed it every document
/// in build order; discard it when the build ends.
pub struct CitationProcessor {
    config: CitationConfig,
    bibliography: Bibliography,
    backend: Box<dyn FormatBackend>,
    registry: CitationRegistry,
}

impl CitationProcessor {
    /// Create a processor from configuration: loads the bibliography
    /// (failing fast when none is configured) and selects the backend.
    pub fn new(config: &CitationConfig) -> Result<Self> {
        let bibliography = Bibliography::load(config)?;
        let backend = select_backend(config);
        Ok(Self::from_parts(config.clone(), bibliography, backend))
    }

    /// Assemble a processor from already-built collaborators. Useful for
    /// hosts that load bibliographies themselves and for tests.
    pub fn from_parts(
        config: CitationConfig,
        bibliography: Bibliography,
        backend: Box<dyn FormatBackend>,
    ) -> Self {
        Self {
            config,
            bibliography,
            backend,
            registry: CitationRegistry::new(),
        }
    }

    /// The cumulative registry for this run.
    pub fn registry(&self) -> &CitationRegistry {
        &self.registry
    }

    /// The loaded bibliography database.
    pub fn bibliography(&self) -> &Bibliography {
        &self.bibliography
    }

    /// Process one document: scan its markers, resolve them against the
    /// registry, and return the rewritten text.
    pub fn process_document(&mut self, text: &str) -> Result<String> {
        let markers = find_markers(text);
        debug!(markers = markers.len(), "Scanned citation markers");

        let resolution = self
            .registry
            .resolve(&markers, &self.bibliography, self.backend.as_ref())?;

        Ok(rewrite(
            text,
            &resolution.quads,
            &resolution.new_keys,
            &self.registry,
            &self.config,
        ))
    }
}
