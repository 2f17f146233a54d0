//! A backend built from external programs.
//!
//! [`StagingEngine`] stages inline markup into a temporary `.html` file (or
//! keeps a remote URL) and reports render-ready straight away; the actual
//! rendering happens inside the HTML-to-PDF program run by
//! [`CommandExporter`] (`wkhtmltopdf` unless `WEBPDF_EXPORTER` or the
//! constructor says otherwise). [`LpPrintService`] renders a fresh handle to
//! a scratch PDF and queues it with `lp`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::engine::{
    DocumentExporter, EngineEvents, EngineFactory, ExportCallback, PrintService, RenderingEngine,
};
use crate::page::PrintAttributes;
use crate::resolver::ResolvedContent;

pub const DEFAULT_EXPORTER_PROGRAM: &str = "wkhtmltopdf";

/// Environment variable overriding the exporter program.
pub const EXPORTER_ENV: &str = "WEBPDF_EXPORTER";

pub const DEFAULT_PRINT_PROGRAM: &str = "lp";

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Creates [`StagingEngine`]s, optionally staging into a fixed directory.
#[derive(Debug, Clone, Default)]
pub struct StagingEngineFactory {
    staging_dir: Option<PathBuf>,
}

impl StagingEngineFactory {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: Some(dir.into()),
        }
    }
}

impl EngineFactory for StagingEngineFactory {
    type Engine = StagingEngine;

    fn create(&self) -> Result<StagingEngine, String> {
        if let Some(dir) = &self.staging_dir {
            std::fs::create_dir_all(dir)
                .map_err(|e| format!("cannot create staging dir {}: {e}", dir.display()))?;
        }
        Ok(StagingEngine {
            staging_dir: self.staging_dir.clone(),
            page: None,
            paused: false,
        })
    }
}

/// A loaded page: either a staged file or a remote URL.
#[derive(Debug, Clone)]
struct StagedPage {
    source: String,
    // Shared with export handles so the file outlives the engine while a
    // handle is still in use.
    file: Option<Arc<NamedTempFile>>,
}

/// Export handle produced by [`StagingEngine`].
#[derive(Debug, Clone)]
pub struct StagedDocument {
    pub name: String,
    page: StagedPage,
}

impl StagedDocument {
    /// Path or URL the exporter program should read.
    pub fn source(&self) -> &str {
        &self.page.source
    }

    pub fn is_staged_file(&self) -> bool {
        self.page.file.is_some()
    }
}

pub struct StagingEngine {
    staging_dir: Option<PathBuf>,
    page: Option<StagedPage>,
    paused: bool,
}

impl StagingEngine {
    fn stage(&self, html: &str) -> Result<StagedPage, String> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("webpdf-").suffix(".html");
        let mut file = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(|e| format!("cannot create staging file: {e}"))?;
        file.write_all(html.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| format!("cannot write staging file: {e}"))?;

        Ok(StagedPage {
            source: file.path().display().to_string(),
            file: Some(Arc::new(file)),
        })
    }
}

impl RenderingEngine for StagingEngine {
    type Handle = StagedDocument;

    fn load(&mut self, content: ResolvedContent, events: EngineEvents) -> Result<(), String> {
        if self.paused {
            return Err("engine is paused".to_string());
        }
        let page = match content {
            ResolvedContent::Markup { html, base_url, .. } => {
                let html = match base_url.as_deref() {
                    Some(base) => with_base_href(&html, base),
                    None => html,
                };
                self.stage(&html)?
            }
            ResolvedContent::Url(url) => StagedPage {
                source: url,
                file: None,
            },
        };
        log::debug!("Staged page at {}", page.source);
        self.page = Some(page);
        events.render_ready();
        Ok(())
    }

    fn export_handle(&mut self, document_name: &str) -> Result<StagedDocument, String> {
        match &self.page {
            Some(page) => Ok(StagedDocument {
                name: document_name.to_string(),
                page: page.clone(),
            }),
            None => Err("nothing has been loaded".to_string()),
        }
    }

    fn stop_loading(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn clear_history(&mut self) -> Result<(), String> {
        self.page = None;
        Ok(())
    }

    fn load_blank(&mut self) -> Result<(), String> {
        self.page = None;
        Ok(())
    }

    fn pause(&mut self) -> Result<(), String> {
        self.paused = true;
        Ok(())
    }

    fn detach(&mut self) -> Result<(), String> {
        Ok(())
    }

    fn destroy(&mut self) -> Result<(), String> {
        self.page = None;
        Ok(())
    }
}

/// Insert `<base href>` right after `<head ...>`, or in front of the markup
/// when there is no head element.
pub fn with_base_href(html: &str, base_url: &str) -> String {
    let tag = format!("<base href=\"{}\">", base_url.replace('"', "&quot;"));
    let lower = html.to_ascii_lowercase();
    let head_end = lower
        .match_indices("<head")
        .find(|(i, _)| {
            matches!(
                lower.as_bytes().get(i + 5),
                Some(b'>') | Some(b' ') | Some(b'\t') | Some(b'\n') | Some(b'\r')
            )
        })
        .and_then(|(i, _)| lower[i..].find('>').map(|j| i + j + 1));

    match head_end {
        Some(at) => format!("{}{}{}", &html[..at], tag, &html[at..]),
        None => format!("{tag}{html}"),
    }
}

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

/// Runs an external HTML-to-PDF program.
///
/// Arguments are a template; these placeholders are substituted:
/// `{input}`, `{output}`, `{dpi}`, `{width_mm}`, `{height_mm}`,
/// `{margin_left_mm}`, `{margin_top_mm}`, `{margin_right_mm}`,
/// `{margin_bottom_mm}`.
#[derive(Debug, Clone)]
pub struct CommandExporter {
    program: String,
    args: Vec<String>,
}

impl Default for CommandExporter {
    fn default() -> Self {
        let program =
            std::env::var(EXPORTER_ENV).unwrap_or_else(|_| DEFAULT_EXPORTER_PROGRAM.to_string());
        Self::with_program(program)
    }
}

impl CommandExporter {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `program` with the wkhtmltopdf-style argument template.
    pub fn with_program(program: impl Into<String>) -> Self {
        Self::new(program, default_args())
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn expand_args(&self, input: &str, output: &Path, attributes: &PrintAttributes) -> Vec<String> {
        let [left, top, right, bottom] = attributes.margins.to_mm();
        let values = [
            ("{input}", input.to_string()),
            ("{output}", output.display().to_string()),
            ("{dpi}", attributes.resolution_dpi.to_string()),
            ("{width_mm}", format_mm(attributes.media_size.width_mm())),
            ("{height_mm}", format_mm(attributes.media_size.height_mm())),
            ("{margin_left_mm}", format_mm(left)),
            ("{margin_top_mm}", format_mm(top)),
            ("{margin_right_mm}", format_mm(right)),
            ("{margin_bottom_mm}", format_mm(bottom)),
        ];
        self.args
            .iter()
            .map(|arg| {
                values
                    .iter()
                    .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
            })
            .collect()
    }

    /// Render `source` into `output`.
    pub async fn render(
        &self,
        source: &str,
        attributes: &PrintAttributes,
        output: &Path,
    ) -> Result<(), String> {
        let args = self.expand_args(source, output, attributes);
        log::debug!("Running {} {}", self.program, args.join(" "));

        let result = Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to run {}: {e}", self.program))?;

        let stderr = String::from_utf8_lossy(&result.stderr);
        if !result.status.success() {
            return Err(format!(
                "{} exited with {}: {}",
                self.program,
                result.status,
                stderr.trim()
            ));
        }
        if !stderr.trim().is_empty() {
            log::warn!("{}: {}", self.program, stderr.trim());
        }
        match tokio::fs::metadata(output).await {
            Ok(meta) if meta.len() > 0 => Ok(()),
            _ => Err("No pages were written to PDF".to_string()),
        }
    }

    async fn export_to(
        &self,
        handle: &StagedDocument,
        attributes: &PrintAttributes,
        directory: &Path,
        file_name: &str,
    ) -> Result<PathBuf, String> {
        tokio::fs::create_dir_all(directory).await.map_err(|e| {
            format!(
                "Failed to create output directory {}: {e}",
                directory.display()
            )
        })?;
        let target = directory.join(file_name);
        match tokio::fs::remove_file(&target).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("Failed to delete existing file {}: {e}", target.display()),
        }
        self.render(handle.source(), attributes, &target).await?;
        Ok(std::path::absolute(&target).unwrap_or(target))
    }
}

impl DocumentExporter<StagedDocument> for CommandExporter {
    fn export(
        &self,
        handle: StagedDocument,
        attributes: &PrintAttributes,
        directory: &Path,
        file_name: &str,
        done: ExportCallback,
    ) {
        let exporter = self.clone();
        let attributes = attributes.clone();
        let directory = directory.to_path_buf();
        let file_name = file_name.to_string();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                result = exporter.export_to(&handle, &attributes, &directory, &file_name) => {
                    done.finish(result);
                }
                _ = done.cancelled() => {
                    // Dropping the export kills the child process.
                    let target = directory.join(&file_name);
                    log::debug!(
                        "Abandoned export of {}, stopping {}",
                        target.display(),
                        exporter.program
                    );
                    if let Err(e) = tokio::fs::remove_file(&target).await {
                        if e.kind() != std::io::ErrorKind::NotFound {
                            log::warn!("Failed to delete partial file {}: {e}", target.display());
                        }
                    }
                }
            }
        });
    }
}

fn default_args() -> Vec<String> {
    [
        "--quiet",
        "--dpi",
        "{dpi}",
        "--page-width",
        "{width_mm}mm",
        "--page-height",
        "{height_mm}mm",
        "--margin-left",
        "{margin_left_mm}mm",
        "--margin-top",
        "{margin_top_mm}mm",
        "--margin-right",
        "{margin_right_mm}mm",
        "--margin-bottom",
        "{margin_bottom_mm}mm",
        "--enable-local-file-access",
        "{input}",
        "{output}",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn format_mm(mm: f32) -> String {
    format!("{mm:.2}")
}

// ---------------------------------------------------------------------------
// Print service
// ---------------------------------------------------------------------------

/// Queues documents with `lp`, re-rendered with the attributes of the
/// original export.
#[derive(Debug, Clone)]
pub struct LpPrintService {
    program: String,
    exporter: CommandExporter,
}

impl LpPrintService {
    pub fn new(exporter: CommandExporter) -> Self {
        Self {
            program: DEFAULT_PRINT_PROGRAM.to_string(),
            exporter,
        }
    }

    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    async fn print_now(
        &self,
        name: &str,
        handle: StagedDocument,
        attributes: &PrintAttributes,
    ) -> Result<(), String> {
        let scratch = tempfile::Builder::new()
            .prefix("webpdf-print-")
            .suffix(".pdf")
            .tempfile()
            .map_err(|e| format!("cannot create print scratch file: {e}"))?;
        self.exporter
            .render(handle.source(), attributes, scratch.path())
            .await?;

        let status = Command::new(&self.program)
            .arg("-t")
            .arg(name)
            .arg(scratch.path())
            .status()
            .await
            .map_err(|e| format!("failed to run {}: {e}", self.program))?;
        if status.success() {
            log::info!("Queued '{name}' for printing");
            Ok(())
        } else {
            Err(format!("{} exited with {status}", self.program))
        }
    }
}

impl Default for LpPrintService {
    fn default() -> Self {
        Self::new(CommandExporter::default())
    }
}

impl PrintService<StagedDocument> for LpPrintService {
    fn print(
        &self,
        document_name: &str,
        handle: StagedDocument,
        attributes: &PrintAttributes,
    ) -> Result<(), String> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| e.to_string())?;
        let service = self.clone();
        let name = document_name.to_string();
        let attributes = attributes.clone();
        runtime.spawn(async move {
            if let Err(e) = service.print_now(&name, handle, &attributes).await {
                log::warn!("Printing '{name}' failed: {e}");
            }
        });
        Ok(())
    }
}
