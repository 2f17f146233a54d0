//! The generation state machine.
//!
//! One [`Attempt`] runs as one task. It owns the rendering session, the
//! deadline and the completion bridge, and processes signals from its
//! mailbox in arrival order:
//!
//! ```text
//! Idle ──start──▶ Loading ──ready + settle──▶ Exporting ──export ok──▶ Completed
//!                    │                            │
//!                    └──error / timeout──▶ Failed ◀┘
//! ```
//!
//! Entering a terminal state is a single check-and-set on the task, so the
//! first of several racing signals wins and the rest are ignored.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::completion::{Completion, CompletionResult};
use crate::deadline::{sleep_until_or_pending, Deadline};
use crate::engine::{
    DocumentExporter, EngineEvents, EngineFactory, ExportCallback, HandleOf, PrintService, Signal,
};
use crate::error::GenerationError;
use crate::request::GenerationRequest;
use crate::resolver::{self, AssetStore};
use crate::session::RenderingSession;

/// Grace period between render-ready and export, letting scripts and late
/// layout settle.
pub const SETTLE_DELAY: Duration = Duration::from_millis(100);

/// Lifecycle of one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Loading,
    Exporting,
    Completed,
    Failed,
}

impl GenerationState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Transitions only move forward; terminal states are final.
    pub fn can_advance_to(self, next: GenerationState) -> bool {
        use GenerationState::*;
        matches!(
            (self, next),
            (Idle, Loading)
                | (Idle, Failed)
                | (Loading, Exporting)
                | (Loading, Failed)
                | (Exporting, Completed)
                | (Exporting, Failed)
        )
    }
}

impl fmt::Display for GenerationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Exporting => "exporting",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Collaborators shared by every attempt started from one builder.
pub(crate) struct Collaborators<F: EngineFactory> {
    pub factory: Arc<F>,
    pub exporter: Arc<dyn DocumentExporter<HandleOf<F>>>,
    pub printer: Option<Arc<dyn PrintService<HandleOf<F>>>>,
    pub assets: Arc<dyn AssetStore>,
}

impl<F: EngineFactory> Clone for Collaborators<F> {
    fn clone(&self) -> Self {
        Self {
            factory: self.factory.clone(),
            exporter: self.exporter.clone(),
            printer: self.printer.clone(),
            assets: self.assets.clone(),
        }
    }
}

pub(crate) struct Attempt<F: EngineFactory> {
    request: GenerationRequest,
    output_dir: PathBuf,
    collaborators: Collaborators<F>,
    state: GenerationState,
    session: RenderingSession<F::Engine>,
    deadline: Deadline,
    settle_at: Option<Instant>,
    completion: Completion,
    tx: mpsc::UnboundedSender<Signal>,
    rx: mpsc::UnboundedReceiver<Signal>,
}

impl<F: EngineFactory> Attempt<F> {
    pub(crate) fn new(
        request: GenerationRequest,
        output_dir: PathBuf,
        collaborators: Collaborators<F>,
        completion: Completion,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let deadline = Deadline::new(request.timeout());
        Self {
            request,
            output_dir,
            collaborators,
            state: GenerationState::Idle,
            session: RenderingSession::new(),
            deadline,
            settle_at: None,
            completion,
            tx,
            rx,
        }
    }

    /// Drive the attempt to a terminal state (or cancellation), then clean
    /// up.
    pub(crate) async fn run(mut self) {
        self.start();

        while !self.state.is_terminal() {
            let deadline_at = self.deadline.expires_at();
            let settle_at = self.settle_at;

            tokio::select! {
                biased;
                _ = self.completion.cancelled() => {
                    log::debug!(
                        "'{}': caller stopped waiting, disposing engine",
                        self.request.document_name
                    );
                    self.deadline.cancel();
                    break;
                }
                Some(signal) = self.rx.recv() => self.on_signal(signal),
                _ = sleep_until_or_pending(settle_at) => {
                    self.settle_at = None;
                    self.begin_export();
                }
                _ = sleep_until_or_pending(deadline_at) => {
                    if let Some(elapsed) = self.deadline.fire() {
                        self.fail(GenerationError::Timeout { elapsed });
                    }
                }
            }
        }

        self.session.release();
    }

    fn start(&mut self) {
        self.advance(GenerationState::Loading);
        self.deadline.arm();

        let content = match resolver::resolve(
            &self.request.source,
            self.collaborators.assets.as_ref(),
        ) {
            Ok(content) => content,
            Err(err) => return self.fail(err),
        };

        let engine = match self.collaborators.factory.create() {
            Ok(engine) => engine,
            Err(e) => {
                return self.fail(GenerationError::Engine(format!(
                    "failed to initialize rendering engine: {e}"
                )))
            }
        };
        self.session.attach(engine);

        log::debug!(
            "'{}': loading {} content",
            self.request.document_name,
            self.request.source.kind()
        );
        let events = EngineEvents::new(self.tx.clone());
        if let Err(e) = self.session.load(content, events) {
            self.fail(GenerationError::Engine(e));
        }
    }

    fn on_signal(&mut self, signal: Signal) {
        match (self.state, signal) {
            (GenerationState::Loading, Signal::RenderReady) => {
                if self.settle_at.is_none() {
                    self.settle_at = Some(Instant::now() + SETTLE_DELAY);
                }
            }
            (GenerationState::Loading, Signal::RenderError(description)) => {
                self.fail(GenerationError::Engine(description));
            }
            (GenerationState::Exporting, Signal::ExportSucceeded(path)) => self.succeed(path),
            (GenerationState::Exporting, Signal::ExportFailed(message)) => {
                self.fail(GenerationError::Export(message));
            }
            (state, signal) => {
                log::debug!(
                    "'{}': ignoring {signal:?} while {state}",
                    self.request.document_name
                );
            }
        }
    }

    fn begin_export(&mut self) {
        if self.state != GenerationState::Loading {
            return;
        }
        let handle = match self.session.export_handle(&self.request.document_name) {
            Ok(handle) => handle,
            Err(e) => {
                return self.fail(GenerationError::Engine(format!(
                    "failed to acquire export handle: {e}"
                )))
            }
        };
        self.advance(GenerationState::Exporting);

        let attributes = self.request.print_attributes();
        log::debug!(
            "'{}': exporting to {} ({} @ {} dpi)",
            self.request.document_name,
            self.output_dir.display(),
            attributes.media_size.id,
            attributes.resolution_dpi
        );
        self.collaborators.exporter.export(
            handle,
            &attributes,
            &self.output_dir,
            &self.request.document_name,
            ExportCallback::new(self.tx.clone()),
        );
    }

    fn succeed(&mut self, path: PathBuf) {
        if !self.finish(GenerationState::Completed) {
            return;
        }
        log::info!("Saved '{}'", path.display());
        self.completion.deliver(CompletionResult::Success(path));
        if self.request.print_after {
            self.hand_off_to_printer();
        }
    }

    fn fail(&mut self, err: GenerationError) {
        if !self.finish(GenerationState::Failed) {
            return;
        }
        log::debug!("'{}': {err}", self.request.document_name);
        self.completion.deliver(CompletionResult::Failure(err));
    }

    /// The terminal guard. Returns `true` only for the first caller.
    fn finish(&mut self, terminal: GenerationState) -> bool {
        if self.state.is_terminal() {
            return false;
        }
        self.deadline.cancel();
        self.settle_at = None;
        self.advance(terminal);
        true
    }

    fn advance(&mut self, next: GenerationState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        log::debug!(
            "'{}': {} -> {}",
            self.request.document_name,
            self.state,
            next
        );
        self.state = next;
    }

    /// Best effort: the document is already saved, so failures only get
    /// logged.
    fn hand_off_to_printer(&mut self) {
        let name = self.request.document_name.clone();
        let Some(printer) = self.collaborators.printer.clone() else {
            log::warn!("'{name}': printing requested but no print service is configured");
            return;
        };
        // The handle used for the file export is spent.
        match self.session.export_handle(&name) {
            Ok(handle) => {
                let attributes = self.request.print_attributes();
                if let Err(e) = printer.print(&name, handle, &attributes) {
                    log::warn!("'{name}': print handoff failed: {e}");
                }
            }
            Err(e) => log::warn!("'{name}': no export handle for printing: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::GenerationState::*;
    use super::*;

    #[test]
    fn transitions_only_move_forward() {
        assert!(Idle.can_advance_to(Loading));
        assert!(Loading.can_advance_to(Exporting));
        assert!(Loading.can_advance_to(Failed));
        assert!(Exporting.can_advance_to(Completed));
        assert!(Exporting.can_advance_to(Failed));

        assert!(!Loading.can_advance_to(Completed));
        assert!(!Exporting.can_advance_to(Loading));
        assert!(!Completed.can_advance_to(Failed));
        assert!(!Failed.can_advance_to(Completed));
    }

    #[test]
    fn only_completed_and_failed_are_terminal() {
        for state in [Idle, Loading, Exporting] {
            assert!(!state.is_terminal(), "{state} should not be terminal");
        }
        assert!(Completed.is_terminal());
        assert!(Failed.is_terminal());
    }
}
