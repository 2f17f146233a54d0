//! # webpdf-forge – HTML, URL or asset → PDF, orchestrated
//!
//! This crate drives an external rendering engine and document exporter to
//! turn markup into a PDF, with a deadline, exactly-once result delivery and
//! deterministic engine teardown. The moving parts are:
//!
//! 1. **Configure** – chained setters on [`PdfBuilder`] ([`builder`])
//! 2. **Resolve** – inline markup, remote URL or bundled asset ([`resolver`])
//! 3. **Load & export** – the per-attempt state machine ([`generation`]),
//!    racing the [`deadline`]
//! 4. **Deliver** – listener callback and/or awaited result ([`completion`])
//! 5. **Clean up** – engine teardown on every path ([`session`])
//!
//! Collaborator contracts live in [`engine`]; [`command`] implements them
//! with external programs. A C-compatible FFI surface is exposed via the
//! [`ffi`] module.

pub mod builder;
pub mod command;
pub mod completion;
pub mod deadline;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod generation;
pub mod job;
pub mod page;
pub mod request;
pub mod resolver;
pub mod session;
pub mod templates;

// Re-exports for convenience
pub use builder::PdfBuilder;
pub use completion::{CompletionResult, PdfCallbackListener};
pub use engine::{
    DocumentExporter, EngineEvents, EngineFactory, ExportCallback, PrintService, RenderingEngine,
};
pub use error::GenerationError;
pub use page::{Margins, PageOrientation, PageSize, PrintAttributes};
pub use request::{default_save_path, ContentSource, GenerationRequest};
pub use resolver::{AssetStore, DirAssetStore, MemoryAssetStore, ResolvedContent};
