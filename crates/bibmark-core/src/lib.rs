//! Citation resolution engine for Markdown documentation pipelines.
//!
//! This crate resolves inline citation markers (`[@key]`, `[@key1;@key2]`)
//! embedded in Markdown source against a CSL-JSON bibliography, rewrites each
//! marker into a footnote-style reference, and assembles a deduplicated,
//! stably-numbered bibliography that accumulates across every document
//! processed in a run.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      CitationProcessor                          │
//! │            (run-scoped context, one per build)                  │
//! │   scan markers → resolve against registry → rewrite document    │
//! └──────┬──────────────────┬──────────────────────┬────────────────┘
//!        │                  │                      │
//!        ▼                  ▼                      ▼
//! ┌────────────┐   ┌─────────────────┐   ┌──────────────────────────┐
//! │  scanner   │   │ CitationRegistry│   │      FormatBackend       │
//! │ (pure text │   │ (insertion-     │   │  SimpleBackend, or       │
//! │  scanning) │   │  ordered, 1-    │   │  StyleBackend driving an │
//! │            │   │  based indices) │   │  external CSL processor) │
//! └────────────┘   └─────────────────┘   └──────────────────────────┘
//! ```
//!
//! The registry is the only mutable state: once a key is resolved it keeps
//! its display index for the rest of the run, and it is never handed to a
//! backend a second time. Documents must therefore be processed sequentially
//! through a single [`CitationProcessor`].
//!
//! # Example
//!
//! ```rust,ignore
//! use bibmark_core::{CitationConfig, CitationProcessor};
//!
//! let config = CitationConfig {
//!     bib_file: Some("references.json".into()),
//!     ..Default::default()
//! };
//! let mut processor = CitationProcessor::new(&config)?;
//!
//! for page in pages {
//!     let rewritten = processor.process_document(&page)?;
//!     // write rewritten output...
//! }
//! ```

pub mod backend;
pub mod bibliography;
pub mod config;
pub mod error;
pub mod processor;
pub mod registry;
pub mod rewrite;
pub mod scanner;

// Re-export main types
pub use backend::{FormatBackend, SimpleBackend, StyleBackend, select_backend};
pub use bibliography::{Bibliography, DateVariable, Name, Reference};
pub use config::CitationConfig;
pub use error::{CitationError, Result};
pub use processor::CitationProcessor;
pub use registry::{CitationQuad, CitationRegistry, Resolution, ResolvedReference};
pub use scanner::{RawMarker, find_markers};
