//! Error taxonomy for a generation attempt.

use std::time::Duration;

use thiserror::Error;

/// Why a generation attempt failed.
///
/// Everything except [`GenerationError::Configuration`] is produced after the
/// attempt has started and therefore passes through the terminal guard of the
/// state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    /// Rejected before any asynchronous work started.
    #[error("invalid configuration: {0}")]
    Configuration(&'static str),
    /// The bundled asset could not be read.
    #[error("failed to load asset file: {path} ({reason})")]
    AssetRead { path: String, reason: String },
    /// The rendering engine failed to start or reported a main-frame error.
    #[error("rendering engine error: {0}")]
    Engine(String),
    /// The document exporter did not produce a file.
    #[error("PDF export failed: {0}")]
    Export(String),
    /// The deadline elapsed before a terminal state was reached.
    #[error("PDF generation timed out after {}ms", .elapsed.as_millis())]
    Timeout { elapsed: Duration },
    /// The event loop went away before delivering a result.
    #[error("PDF generation was interrupted before completing")]
    Interrupted,
}

impl GenerationError {
    pub(crate) fn asset_read(path: &str, reason: impl ToString) -> Self {
        Self::AssetRead {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// `true` for the deadline failure, which callers usually treat like a
    /// cancellation rather than a hard error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}
