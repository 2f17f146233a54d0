//! JSON job description used by the CLI (`--job`) and the C API.
//!
//! ```json
//! {
//!   "name": "Invoice",
//!   "html": "<h1>Invoice</h1>",
//!   "output_dir": "out",
//!   "page_size": "letter",
//!   "landscape": false,
//!   "margins_mm": [10, 10, 10, 10],
//!   "dpi": 300,
//!   "timeout_ms": 20000
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::builder::PdfBuilder;
use crate::command::{CommandExporter, LpPrintService, StagingEngineFactory};
use crate::error::GenerationError;
use crate::page::{PageSize, DEFAULT_DPI};
use crate::request::{ContentSource, DEFAULT_TIMEOUT};
use crate::resolver::DirAssetStore;

/// One generation job. Exactly one of `html`, `url` and `asset` must be
/// set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JobOptions {
    pub name: String,
    pub html: Option<String>,
    pub url: Option<String>,
    pub asset: Option<String>,
    pub assets_dir: Option<PathBuf>,
    pub base_url: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub page_size: Option<String>,
    pub landscape: bool,
    pub margins_mm: Option<[f32; 4]>,
    pub dpi: u32,
    pub timeout_ms: u64,
    pub print: bool,
    /// Exporter program; falls back to `WEBPDF_EXPORTER`, then `wkhtmltopdf`.
    pub exporter: Option<String>,
}

impl Default for JobOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            html: None,
            url: None,
            asset: None,
            assets_dir: None,
            base_url: None,
            output_dir: None,
            page_size: None,
            landscape: false,
            margins_mm: None,
            dpi: DEFAULT_DPI,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            print: false,
            exporter: None,
        }
    }
}

impl JobOptions {
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| e.to_string())
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// The single content source this job names. `None` when no source is
    /// set; more than one is a configuration error.
    pub fn content_source(&self) -> Result<Option<ContentSource>, GenerationError> {
        let mut sources = [
            self.html.clone().map(ContentSource::inline),
            self.url.clone().map(ContentSource::remote),
            self.asset.clone().map(ContentSource::asset),
        ]
        .into_iter()
        .flatten();

        let source = sources.next();
        if sources.next().is_some() {
            return Err(GenerationError::Configuration(
                "ambiguous content source: set only one of html, url and asset",
            ));
        }
        Ok(source)
    }

    /// Build a command-backed [`PdfBuilder`] for this job.
    pub fn into_builder(self) -> Result<PdfBuilder<StagingEngineFactory>, GenerationError> {
        let source = self.content_source()?;
        let exporter = match &self.exporter {
            Some(program) => CommandExporter::with_program(program.clone()),
            None => CommandExporter::default(),
        };

        let mut builder = PdfBuilder::new(StagingEngineFactory::default(), exporter.clone())
            .name(&self.name)
            .base_url(self.base_url)
            .landscape(self.landscape)
            .resolution(self.dpi)
            .timeout(Duration::from_millis(self.timeout_ms))
            .print_after(self.print);

        if let Some(source) = source {
            builder = builder.source(source);
        }
        if let Some(dir) = self.assets_dir {
            builder = builder.assets(DirAssetStore::new(dir));
        }
        if let Some(dir) = self.output_dir {
            builder = builder.output_dir(dir);
        }
        if let Some(name) = self.page_size.as_deref() {
            let size = PageSize::from_name(name).ok_or(GenerationError::Configuration(
                "unknown page size (expected a3, a4, a5, letter or legal)",
            ))?;
            builder = builder.page_size(size);
        }
        if let Some([left, top, right, bottom]) = self.margins_mm {
            builder = builder.margins_mm(left, top, right, bottom);
        }
        if self.print {
            builder = builder.print_service(LpPrintService::new(exporter));
        }
        Ok(builder)
    }
}
