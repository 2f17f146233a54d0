//! Contracts for the external collaborators: the rendering engine, the
//! document exporter and the print service.
//!
//! Collaborators never call back into the state machine directly. They get
//! an [`EngineEvents`] or [`ExportCallback`] handle that posts a signal into
//! the attempt's mailbox, so a callback fired from any thread is marshalled
//! onto the attempt's event loop. Handles are cheap to clone; signals sent
//! after the attempt finished are dropped.

use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::page::PrintAttributes;
use crate::resolver::ResolvedContent;

/// The export handle type produced by a factory's engines.
pub type HandleOf<F> = <<F as EngineFactory>::Engine as RenderingEngine>::Handle;

/// Creates one engine instance per attempt.
pub trait EngineFactory: Send + Sync + 'static {
    type Engine: RenderingEngine;

    fn create(&self) -> Result<Self::Engine, String>;
}

/// A rendering engine instance. All methods are invoked from the attempt's
/// event loop; the engine reports progress through [`EngineEvents`].
pub trait RenderingEngine: Send + 'static {
    /// Single-use capability to turn the current page into paginated output.
    type Handle: Send + 'static;

    /// Begin loading. Completion is reported asynchronously through `events`.
    fn load(&mut self, content: ResolvedContent, events: EngineEvents) -> Result<(), String>;

    /// Acquire a fresh export handle for the rendered page.
    fn export_handle(&mut self, document_name: &str) -> Result<Self::Handle, String>;

    fn stop_loading(&mut self) -> Result<(), String>;

    /// Drop navigation history and cached resources.
    fn clear_history(&mut self) -> Result<(), String>;

    /// Navigate to an empty document.
    fn load_blank(&mut self) -> Result<(), String>;

    fn pause(&mut self) -> Result<(), String>;

    /// Detach from any container the engine is attached to.
    fn detach(&mut self) -> Result<(), String>;

    fn destroy(&mut self) -> Result<(), String>;
}

/// Writes an export handle to disk as a paginated document.
pub trait DocumentExporter<H>: Send + Sync {
    /// Export to `directory/file_name`, creating `directory` if needed.
    /// The outcome is reported through `done`.
    fn export(
        &self,
        handle: H,
        attributes: &PrintAttributes,
        directory: &Path,
        file_name: &str,
        done: ExportCallback,
    );
}

/// Optional handoff to a system print service. `attributes` are the ones the
/// document was exported with.
pub trait PrintService<H>: Send + Sync {
    fn print(
        &self,
        document_name: &str,
        handle: H,
        attributes: &PrintAttributes,
    ) -> Result<(), String>;
}

/// Signals that drive the state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Signal {
    RenderReady,
    RenderError(String),
    ExportSucceeded(PathBuf),
    ExportFailed(String),
}

/// Event sink handed to the rendering engine.
#[derive(Debug, Clone)]
pub struct EngineEvents {
    tx: mpsc::UnboundedSender<Signal>,
}

impl EngineEvents {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self { tx }
    }

    /// The page finished loading.
    pub fn render_ready(&self) {
        let _ = self.tx.send(Signal::RenderReady);
    }

    /// The main frame failed to load.
    pub fn render_error(&self, description: impl Into<String>) {
        let _ = self.tx.send(Signal::RenderError(description.into()));
    }
}

/// Completion sink handed to the document exporter.
#[derive(Debug, Clone)]
pub struct ExportCallback {
    tx: mpsc::UnboundedSender<Signal>,
}

impl ExportCallback {
    pub(crate) fn new(tx: mpsc::UnboundedSender<Signal>) -> Self {
        Self { tx }
    }

    pub fn success(&self, path: impl Into<PathBuf>) {
        let _ = self.tx.send(Signal::ExportSucceeded(path.into()));
    }

    pub fn failure(&self, message: impl Into<String>) {
        let _ = self.tx.send(Signal::ExportFailed(message.into()));
    }

    /// Resolves once the attempt stops listening: it reached a terminal state
    /// or was cancelled. Exporters race their work against this to stop
    /// writing output nobody will report.
    pub async fn cancelled(&self) {
        self.tx.closed().await;
    }

    /// Report a `Result` in one call.
    pub fn finish(&self, result: Result<PathBuf, String>) {
        match result {
            Ok(path) => self.success(path),
            Err(message) => self.failure(message),
        }
    }
}
