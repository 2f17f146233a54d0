//! Scripted collaborators for driving the state machine in tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::sleep;

use webpdf_forge::{
    DocumentExporter, EngineEvents, EngineFactory, ExportCallback, PdfCallbackListener,
    PrintAttributes, PrintService, RenderingEngine, ResolvedContent,
};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// What the fake engine reports after `load`.
#[derive(Debug, Clone)]
pub enum EngineScript {
    ReadyAfter(Duration),
    ReadyTwiceAfter(Duration),
    ErrorAfter(Duration, &'static str),
    ErrorThenReady(Duration),
    Silent,
}

#[derive(Debug, Default)]
pub struct EngineLog {
    pub created: AtomicUsize,
    pub destroyed: AtomicUsize,
    pub handles: AtomicUsize,
    pub loaded: Mutex<Vec<ResolvedContent>>,
}

impl EngineLog {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> usize {
        self.destroyed.load(Ordering::SeqCst)
    }

    pub fn handles(&self) -> usize {
        self.handles.load(Ordering::SeqCst)
    }

    pub fn loaded(&self) -> Vec<ResolvedContent> {
        self.loaded.lock().unwrap().clone()
    }
}

pub struct FakeFactory {
    script: EngineScript,
    fail_init: bool,
    log: Arc<EngineLog>,
}

impl FakeFactory {
    pub fn new(script: EngineScript) -> Self {
        Self {
            script,
            fail_init: false,
            log: Arc::new(EngineLog::default()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_init: true,
            ..Self::new(EngineScript::Silent)
        }
    }

    pub fn log(&self) -> Arc<EngineLog> {
        self.log.clone()
    }
}

impl EngineFactory for FakeFactory {
    type Engine = FakeEngine;

    fn create(&self) -> Result<FakeEngine, String> {
        self.log.created.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err("GPU process crashed".to_string());
        }
        Ok(FakeEngine {
            script: self.script.clone(),
            log: self.log.clone(),
        })
    }
}

#[derive(Debug)]
pub struct FakeHandle {
    pub name: String,
    pub serial: usize,
}

pub struct FakeEngine {
    script: EngineScript,
    log: Arc<EngineLog>,
}

impl RenderingEngine for FakeEngine {
    type Handle = FakeHandle;

    fn load(&mut self, content: ResolvedContent, events: EngineEvents) -> Result<(), String> {
        self.log.loaded.lock().unwrap().push(content);
        let script = self.script.clone();
        tokio::spawn(async move {
            match script {
                EngineScript::ReadyAfter(d) => {
                    sleep(d).await;
                    events.render_ready();
                }
                EngineScript::ReadyTwiceAfter(d) => {
                    sleep(d).await;
                    events.render_ready();
                    events.render_ready();
                }
                EngineScript::ErrorAfter(d, message) => {
                    sleep(d).await;
                    events.render_error(message);
                }
                EngineScript::ErrorThenReady(d) => {
                    sleep(d).await;
                    events.render_error("net::ERR_ABORTED");
                    sleep(d).await;
                    events.render_ready();
                }
                EngineScript::Silent => {}
            }
        });
        Ok(())
    }

    fn export_handle(&mut self, document_name: &str) -> Result<FakeHandle, String> {
        let serial = self.log.handles.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(FakeHandle {
            name: document_name.to_string(),
            serial,
        })
    }

    fn stop_loading(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn clear_history(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn load_blank(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn pause(&mut self) -> Result<(), String> {
        Err("pause is not supported".to_string())
    }

    fn detach(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), String> {
        self.log.destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Exporter & printer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ExportScript {
    SucceedAfter(Duration),
    SucceedTwiceAfter(Duration),
    FailAfter(Duration, &'static str),
    /// Keep working until the attempt stops listening.
    UntilCancelled,
    Never,
}

pub struct FakeExporter {
    script: ExportScript,
    pub calls: Arc<AtomicUsize>,
    pub attributes: Arc<Mutex<Option<PrintAttributes>>>,
    pub abandoned: Arc<AtomicBool>,
}

impl FakeExporter {
    pub fn new(script: ExportScript) -> Self {
        Self {
            script,
            calls: Arc::new(AtomicUsize::new(0)),
            attributes: Arc::new(Mutex::new(None)),
            abandoned: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl DocumentExporter<FakeHandle> for FakeExporter {
    fn export(
        &self,
        _handle: FakeHandle,
        attributes: &PrintAttributes,
        directory: &Path,
        file_name: &str,
        done: ExportCallback,
    ) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.attributes.lock().unwrap() = Some(attributes.clone());
        let path = directory.join(file_name);
        let script = self.script.clone();
        let abandoned = self.abandoned.clone();
        tokio::spawn(async move {
            match script {
                ExportScript::SucceedAfter(d) => {
                    sleep(d).await;
                    done.success(path);
                }
                ExportScript::UntilCancelled => {
                    done.cancelled().await;
                    abandoned.store(true, Ordering::SeqCst);
                }
                ExportScript::SucceedTwiceAfter(d) => {
                    sleep(d).await;
                    done.success(path.clone());
                    done.success(path);
                }
                ExportScript::FailAfter(d, message) => {
                    sleep(d).await;
                    done.failure(message);
                }
                ExportScript::Never => {}
            }
        });
    }
}

#[derive(Default)]
pub struct FakePrinter {
    pub fail: bool,
    pub printed: Arc<Mutex<Vec<(String, usize)>>>,
    pub attributes: Arc<Mutex<Option<PrintAttributes>>>,
}

impl PrintService<FakeHandle> for FakePrinter {
    fn print(
        &self,
        document_name: &str,
        handle: FakeHandle,
        attributes: &PrintAttributes,
    ) -> Result<(), String> {
        self.printed
            .lock()
            .unwrap()
            .push((document_name.to_string(), handle.serial));
        *self.attributes.lock().unwrap() = Some(attributes.clone());
        if self.fail {
            Err("printer offline".to_string())
        } else {
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// Listener
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(PathBuf),
    Failure(String),
}

pub struct RecordingListener {
    pub outcomes: Arc<Mutex<Vec<Outcome>>>,
    tx: mpsc::UnboundedSender<Outcome>,
}

impl RecordingListener {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Outcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let listener = Self {
            outcomes: Arc::new(Mutex::new(Vec::new())),
            tx,
        };
        (listener, rx)
    }

    fn record(&self, outcome: Outcome) {
        self.outcomes.lock().unwrap().push(outcome.clone());
        let _ = self.tx.send(outcome);
    }
}

impl PdfCallbackListener for RecordingListener {
    fn on_success(&self, file_path: &Path) {
        self.record(Outcome::Success(file_path.to_path_buf()));
    }

    fn on_failure(&self, message: &str) {
        self.record(Outcome::Failure(message.to_string()));
    }
}

pub fn outcomes(shared: &Arc<Mutex<Vec<Outcome>>>) -> Vec<Outcome> {
    shared.lock().unwrap().clone()
}
