//! Ownership of the rendering engine for one attempt, and its teardown.

use crate::engine::{EngineEvents, RenderingEngine};
use crate::resolver::ResolvedContent;

/// Exclusively owns at most one engine. [`release`](Self::release) tears it
/// down exactly once; dropping the session releases it too.
pub struct RenderingSession<E: RenderingEngine> {
    engine: Option<E>,
}

impl<E: RenderingEngine> RenderingSession<E> {
    pub fn new() -> Self {
        Self { engine: None }
    }

    pub fn attach(&mut self, engine: E) {
        // A session only ever hosts one engine.
        self.release();
        self.engine = Some(engine);
    }

    pub fn is_active(&self) -> bool {
        self.engine.is_some()
    }

    pub fn load(&mut self, content: ResolvedContent, events: EngineEvents) -> Result<(), String> {
        match self.engine.as_mut() {
            Some(engine) => engine.load(content, events),
            None => Err("no active rendering engine".to_string()),
        }
    }

    pub fn export_handle(&mut self, document_name: &str) -> Result<E::Handle, String> {
        match self.engine.as_mut() {
            Some(engine) => engine.export_handle(document_name),
            None => Err("no active rendering engine".to_string()),
        }
    }

    /// Tear down the engine. Every step runs even if an earlier one fails;
    /// failures are logged and discarded. Returns `false` when there was
    /// nothing to release.
    pub fn release(&mut self) -> bool {
        let Some(mut engine) = self.engine.take() else {
            return false;
        };

        let steps: [(&str, fn(&mut E) -> Result<(), String>); 6] = [
            ("stop loading", E::stop_loading),
            ("clear history", E::clear_history),
            ("load blank page", E::load_blank),
            ("pause", E::pause),
            ("detach", E::detach),
            ("destroy", E::destroy),
        ];
        for (name, step) in steps {
            if let Err(e) = step(&mut engine) {
                log::warn!("Engine cleanup step '{name}' failed: {e}");
            }
        }
        log::debug!("Rendering engine released");
        true
    }
}

impl<E: RenderingEngine> Default for RenderingSession<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: RenderingEngine> Drop for RenderingSession<E> {
    fn drop(&mut self) {
        self.release();
    }
}
