//! Chained configuration and the two entry points, [`PdfBuilder::create`]
//! and [`PdfBuilder::create_async`].
//!
//! ```rust,ignore
//! let path = PdfBuilder::new(StagingEngineFactory::default(), CommandExporter::default())
//!     .name("Invoice")
//!     .content("<h1>Invoice</h1>")
//!     .margins_mm(10.0, 10.0, 10.0, 10.0)
//!     .create_async()
//!     .await?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::completion::{Completion, CompletionResult, PdfCallbackListener};
use crate::engine::{DocumentExporter, EngineFactory, HandleOf, PrintService};
use crate::error::GenerationError;
use crate::generation::{Attempt, Collaborators};
use crate::page::{Margins, PageOrientation, PageSize, DEFAULT_DPI};
use crate::request::{
    default_cache_dir, normalize_document_name, ContentSource, GenerationRequest, DEFAULT_TIMEOUT,
};
use crate::resolver::{AssetStore, MemoryAssetStore};

/// Accumulates generation parameters. Setters only store values; validation
/// happens when an attempt is started. Every attempt snapshots the current
/// configuration, so a builder can be reconfigured and used again.
pub struct PdfBuilder<F: EngineFactory> {
    collaborators: Collaborators<F>,
    listener: Option<Arc<dyn PdfCallbackListener>>,
    runtime: Option<Handle>,
    document_name: String,
    base_url: Option<String>,
    source: Option<ContentSource>,
    print_after: bool,
    output_dir: Option<PathBuf>,
    cache_dir: PathBuf,
    page_size: PageSize,
    margins: Margins,
    orientation: PageOrientation,
    resolution_dpi: u32,
    timeout: Duration,
}

impl<F: EngineFactory> PdfBuilder<F> {
    pub fn new<X>(factory: F, exporter: X) -> Self
    where
        X: DocumentExporter<HandleOf<F>> + 'static,
    {
        Self {
            collaborators: Collaborators {
                factory: Arc::new(factory),
                exporter: Arc::new(exporter),
                printer: None,
                assets: Arc::new(MemoryAssetStore::new()),
            },
            listener: None,
            runtime: None,
            document_name: String::new(),
            base_url: None,
            source: None,
            print_after: false,
            output_dir: None,
            cache_dir: default_cache_dir(),
            page_size: PageSize::default(),
            margins: Margins::NONE,
            orientation: PageOrientation::Portrait,
            resolution_dpi: DEFAULT_DPI,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Output file name; `.pdf` is appended when missing.
    pub fn name(mut self, name: impl AsRef<str>) -> Self {
        self.document_name = normalize_document_name(name.as_ref());
        self
    }

    /// Base URL for relative references in inline markup. Ignored for remote
    /// pages; asset content always uses the asset store's base.
    pub fn base_url(mut self, base_url: Option<String>) -> Self {
        self.base_url = base_url;
        self
    }

    /// Render inline markup. Replaces any other content source.
    pub fn content(self, markup: impl Into<String>) -> Self {
        self.source(ContentSource::inline(markup))
    }

    /// Render a remote page. Replaces any other content source.
    pub fn url(self, url: impl Into<String>) -> Self {
        self.source(ContentSource::remote(url))
    }

    /// Render a file from the asset store. Replaces any other content source.
    pub fn asset_path(self, path: impl Into<String>) -> Self {
        self.source(ContentSource::asset(path))
    }

    pub fn source(mut self, source: ContentSource) -> Self {
        self.source = Some(source);
        self
    }

    /// Hand the saved document to the print service afterwards.
    pub fn print_after(mut self, print: bool) -> Self {
        self.print_after = print;
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Fallback directory when no output directory is set.
    pub fn cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    pub fn page_size(mut self, size: PageSize) -> Self {
        self.page_size = size;
        self
    }

    /// Minimum margins in millimetres.
    pub fn margins_mm(mut self, left: f32, top: f32, right: f32, bottom: f32) -> Self {
        self.margins = Margins::from_mm(left, top, right, bottom);
        self
    }

    pub fn margins(mut self, margins: Margins) -> Self {
        self.margins = margins;
        self
    }

    pub fn landscape(mut self, landscape: bool) -> Self {
        self.orientation = if landscape {
            PageOrientation::Landscape
        } else {
            PageOrientation::Portrait
        };
        self
    }

    pub fn resolution(mut self, dpi: u32) -> Self {
        self.resolution_dpi = dpi;
        self
    }

    /// Deadline for the whole attempt (default 30 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn listener(mut self, listener: impl PdfCallbackListener + 'static) -> Self {
        self.listener = Some(Arc::new(listener));
        self
    }

    pub fn shared_listener(mut self, listener: Arc<dyn PdfCallbackListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn assets(mut self, assets: impl AssetStore + 'static) -> Self {
        self.collaborators.assets = Arc::new(assets);
        self
    }

    pub fn print_service(mut self, printer: impl PrintService<HandleOf<F>> + 'static) -> Self {
        self.collaborators.printer = Some(Arc::new(printer));
        self
    }

    /// Runtime that hosts attempts started from threads without one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Snapshot and validate the current configuration.
    pub fn build_request(&self) -> Result<GenerationRequest, GenerationError> {
        if self.document_name.is_empty() {
            return Err(GenerationError::Configuration("name must not be empty"));
        }
        let source = match &self.source {
            Some(ContentSource::Inline { markup, base_url }) => ContentSource::Inline {
                markup: markup.clone(),
                base_url: base_url.clone().or_else(|| self.base_url.clone()),
            },
            Some(other) => other.clone(),
            None => return Err(GenerationError::Configuration("content source required")),
        };

        Ok(GenerationRequest {
            document_name: self.document_name.clone(),
            source,
            output_dir: self.output_dir.clone(),
            page_size: self.page_size.clone(),
            margins: self.margins,
            orientation: self.orientation,
            resolution_dpi: self.resolution_dpi,
            timeout_ms: self.timeout.as_millis() as u64,
            print_after: self.print_after,
        })
    }

    /// Start an attempt and return immediately. The outcome goes to the
    /// listener; configuration errors are reported before this returns.
    pub fn create(&self) {
        self.start(None);
    }

    /// Start an attempt and wait for its outcome. The listener, if any, is
    /// notified first. Dropping the returned future cancels the attempt and
    /// disposes its engine.
    pub async fn create_async(&self) -> Result<PathBuf, GenerationError> {
        let (tx, rx) = oneshot::channel();
        self.start(Some(tx));
        match rx.await {
            Ok(result) => result.into_result(),
            Err(_) => Err(GenerationError::Interrupted),
        }
    }

    fn start(&self, waiter: Option<oneshot::Sender<CompletionResult>>) {
        let mut completion = Completion::new(self.listener.clone(), waiter);

        let request = match self.build_request() {
            Ok(request) => request,
            Err(err) => {
                completion.deliver(CompletionResult::Failure(err));
                return;
            }
        };

        let Some(runtime) = self.runtime.clone().or_else(|| Handle::try_current().ok()) else {
            completion.deliver(CompletionResult::Failure(GenerationError::Engine(
                "no tokio runtime available to host the rendering engine".to_string(),
            )));
            return;
        };

        let output_dir = request.output_directory(&self.cache_dir);
        let attempt = Attempt::new(request, output_dir, self.collaborators.clone(), completion);
        runtime.spawn(attempt.run());
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::engine::{EngineEvents, ExportCallback, RenderingEngine};
    use crate::page::PrintAttributes;
    use crate::resolver::ResolvedContent;

    struct NullEngine;

    impl RenderingEngine for NullEngine {
        type Handle = ();

        fn load(&mut self, _: ResolvedContent, _: EngineEvents) -> Result<(), String> {
            Ok(())
        }

        fn export_handle(&mut self, _: &str) -> Result<(), String> {
            Ok(())
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
            Ok(())
        }

        fn detach(&mut self) -> Result<(), String> {
            Ok(())
        }

        fn destroy(&mut self) -> Result<(), String> {
            Ok(())
        }
    }

    struct NullFactory;

    impl EngineFactory for NullFactory {
        type Engine = NullEngine;

        fn create(&self) -> Result<NullEngine, String> {
            Ok(NullEngine)
        }
    }

    struct NullExporter;

    impl DocumentExporter<()> for NullExporter {
        fn export(&self, _: (), _: &PrintAttributes, _: &Path, _: &str, _: ExportCallback) {}
    }

    fn builder() -> PdfBuilder<NullFactory> {
        PdfBuilder::new(NullFactory, NullExporter)
    }

    #[test]
    fn empty_name_is_rejected() {
        let err = builder().content("<p/>").build_request().unwrap_err();
        assert_eq!(err, GenerationError::Configuration("name must not be empty"));
    }

    #[test]
    fn missing_source_is_rejected() {
        let err = builder().name("a").build_request().unwrap_err();
        assert_eq!(err, GenerationError::Configuration("content source required"));
    }

    #[test]
    fn last_content_setter_wins() {
        let request = builder()
            .name("a")
            .content("<p/>")
            .asset_path("t.html")
            .url("https://example.com")
            .build_request()
            .unwrap();
        assert_eq!(request.source, ContentSource::remote("https://example.com"));
    }

    #[test]
    fn base_url_applies_to_inline_markup_only() {
        let inline = builder()
            .name("a")
            .base_url(Some("https://cdn.example.com/".into()))
            .content("<img src=logo.png>")
            .build_request()
            .unwrap();
        assert_eq!(
            inline.source,
            ContentSource::Inline {
                markup: "<img src=logo.png>".into(),
                base_url: Some("https://cdn.example.com/".into()),
            }
        );

        let remote = builder()
            .name("a")
            .base_url(Some("https://cdn.example.com/".into()))
            .url("https://example.com")
            .build_request()
            .unwrap();
        assert_eq!(remote.source, ContentSource::remote("https://example.com"));
    }

    #[test]
    fn setters_fill_the_request() {
        let request = builder()
            .name("Report")
            .content("<p/>")
            .page_size(PageSize::na_letter())
            .landscape(true)
            .margins_mm(10.0, 10.0, 10.0, 10.0)
            .resolution(300)
            .timeout(Duration::from_secs(5))
            .print_after(true)
            .output_dir("/out")
            .build_request()
            .unwrap();

        assert_eq!(request.document_name, "Report.pdf");
        assert_eq!(request.orientation, PageOrientation::Landscape);
        assert_eq!(request.margins.left, 393);
        assert_eq!(request.resolution_dpi, 300);
        assert_eq!(request.timeout_ms, 5000);
        assert!(request.print_after);
        assert_eq!(request.output_dir.as_deref(), Some(Path::new("/out")));
    }

    #[test]
    fn defaults_match_documented_values() {
        let request = builder().name("a").content("x").build_request().unwrap();
        assert_eq!(request.resolution_dpi, 600);
        assert_eq!(request.timeout_ms, 30_000);
        assert_eq!(request.page_size, PageSize::iso_a4());
        assert_eq!(request.orientation, PageOrientation::Portrait);
        assert!(!request.print_after);
    }
}
