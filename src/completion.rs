//! Completion bridge: one terminal result, fanned out to a listener and an
//! awaiting future.

use std::future::pending;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::oneshot;

use crate::error::GenerationError;

/// Caller-supplied result listener.
pub trait PdfCallbackListener: Send + Sync {
    fn on_success(&self, file_path: &Path);
    fn on_failure(&self, message: &str);
}

/// Terminal outcome of one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionResult {
    Success(PathBuf),
    Failure(GenerationError),
}

impl CompletionResult {
    pub fn into_result(self) -> Result<PathBuf, GenerationError> {
        match self {
            Self::Success(path) => Ok(path),
            Self::Failure(err) => Err(err),
        }
    }
}

/// Delivers at most one [`CompletionResult`]: the listener first, then the
/// waiter.
pub(crate) struct Completion {
    listener: Option<Arc<dyn PdfCallbackListener>>,
    waiter: Option<oneshot::Sender<CompletionResult>>,
    delivered: bool,
}

impl Completion {
    pub(crate) fn new(
        listener: Option<Arc<dyn PdfCallbackListener>>,
        waiter: Option<oneshot::Sender<CompletionResult>>,
    ) -> Self {
        Self {
            listener,
            waiter,
            delivered: false,
        }
    }

    /// Returns `false` if a result was already delivered.
    pub(crate) fn deliver(&mut self, result: CompletionResult) -> bool {
        if self.delivered {
            return false;
        }
        self.delivered = true;

        if let Some(listener) = &self.listener {
            match &result {
                CompletionResult::Success(path) => listener.on_success(path),
                CompletionResult::Failure(err) => listener.on_failure(&err.to_string()),
            }
        }
        if let Some(waiter) = self.waiter.take() {
            // The caller may have stopped waiting; the listener already saw it.
            let _ = waiter.send(result);
        }
        true
    }

    /// Resolves once the awaiting side has been dropped. Never resolves for
    /// listener-only attempts.
    pub(crate) async fn cancelled(&mut self) {
        match self.waiter.as_mut() {
            Some(waiter) => waiter.closed().await,
            None => pending::<()>().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl PdfCallbackListener for Recorder {
        fn on_success(&self, file_path: &Path) {
            self.calls
                .lock()
                .unwrap()
                .push(format!("ok:{}", file_path.display()));
        }

        fn on_failure(&self, message: &str) {
            self.calls.lock().unwrap().push(format!("err:{message}"));
        }
    }

    #[test]
    fn delivers_once_to_listener_and_waiter() {
        let recorder = Arc::new(Recorder::default());
        let (tx, mut rx) = oneshot::channel();
        let mut completion = Completion::new(Some(recorder.clone()), Some(tx));

        assert!(completion.deliver(CompletionResult::Success("/out/a.pdf".into())));
        assert!(!completion.deliver(CompletionResult::Failure(GenerationError::Export(
            "late".into()
        ))));

        assert_eq!(*recorder.calls.lock().unwrap(), vec!["ok:/out/a.pdf".to_string()]);
        assert_eq!(
            rx.try_recv().unwrap(),
            CompletionResult::Success(PathBuf::from("/out/a.pdf"))
        );
    }

    #[test]
    fn listener_sees_failure_message() {
        let recorder = Arc::new(Recorder::default());
        let mut completion = Completion::new(Some(recorder.clone()), None);
        completion.deliver(CompletionResult::Failure(GenerationError::Engine(
            "boom".into(),
        )));
        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec!["err:rendering engine error: boom".to_string()]
        );
    }

    #[tokio::test]
    async fn cancelled_resolves_when_waiter_dropped() {
        let (tx, rx) = oneshot::channel();
        let mut completion = Completion::new(None, Some(tx));
        drop(rx);
        completion.cancelled().await;
        // Delivering after cancellation is harmless.
        assert!(completion.deliver(CompletionResult::Success("/x.pdf".into())));
    }

    #[test]
    fn into_result_maps_variants() {
        assert_eq!(
            CompletionResult::Success("/a.pdf".into()).into_result(),
            Ok(PathBuf::from("/a.pdf"))
        );
        assert!(CompletionResult::Failure(GenerationError::Interrupted)
            .into_result()
            .is_err());
    }
}
