//! The immutable description of one generation attempt.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::page::{Margins, PageOrientation, PageSize, PrintAttributes, DEFAULT_DPI};

/// Default deadline for a whole attempt.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(30_000);

/// Extension appended to document names that lack it.
pub const PDF_EXTENSION: &str = ".pdf";

/// Subfolder used by [`default_save_path`] when none is given.
pub const DEFAULT_SAVE_SUBFOLDER: &str = "PDF";

/// Where the markup comes from. Exactly one source per request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentSource {
    /// Markup passed in directly, with an optional base URL for relative
    /// references.
    Inline {
        markup: String,
        base_url: Option<String>,
    },
    /// A page the engine navigates to itself.
    Remote { url: String },
    /// A file bundled in the asset store.
    Asset { path: String },
}

impl ContentSource {
    pub fn inline(markup: impl Into<String>) -> Self {
        Self::Inline {
            markup: markup.into(),
            base_url: None,
        }
    }

    pub fn remote(url: impl Into<String>) -> Self {
        Self::Remote { url: url.into() }
    }

    pub fn asset(path: impl Into<String>) -> Self {
        Self::Asset { path: path.into() }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Inline { .. } => "inline",
            Self::Remote { .. } => "remote",
            Self::Asset { .. } => "asset",
        }
    }
}

/// A validated request. Built by [`PdfBuilder`](crate::builder::PdfBuilder)
/// and owned by exactly one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// File name including the `.pdf` suffix.
    pub document_name: String,
    pub source: ContentSource,
    /// Target directory; `None` falls back to the cache directory.
    pub output_dir: Option<PathBuf>,
    pub page_size: PageSize,
    pub margins: Margins,
    pub orientation: PageOrientation,
    pub resolution_dpi: u32,
    pub timeout_ms: u64,
    pub print_after: bool,
}

impl GenerationRequest {
    pub fn new(document_name: impl AsRef<str>, source: ContentSource) -> Self {
        Self {
            document_name: normalize_document_name(document_name.as_ref()),
            source,
            output_dir: None,
            page_size: PageSize::default(),
            margins: Margins::NONE,
            orientation: PageOrientation::Portrait,
            resolution_dpi: DEFAULT_DPI,
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            print_after: false,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Attributes for the exporter, with orientation folded into the media
    /// size.
    pub fn print_attributes(&self) -> PrintAttributes {
        PrintAttributes {
            media_size: self.page_size.oriented(self.orientation),
            resolution_dpi: self.resolution_dpi,
            margins: self.margins,
        }
    }

    /// The directory the document is written to.
    pub fn output_directory(&self, cache_dir: &Path) -> PathBuf {
        match &self.output_dir {
            Some(dir) if !dir.as_os_str().is_empty() => dir.clone(),
            _ => cache_dir.to_path_buf(),
        }
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Append `.pdf` unless the name already ends with it (case-insensitive).
/// An empty name stays empty so validation can reject it.
pub fn normalize_document_name(name: &str) -> String {
    if name.is_empty() || name.to_ascii_lowercase().ends_with(PDF_EXTENSION) {
        name.to_string()
    } else {
        format!("{name}{PDF_EXTENSION}")
    }
}

/// Process-scoped fallback directory for documents without an explicit
/// output directory.
pub fn default_cache_dir() -> PathBuf {
    std::env::temp_dir().join("webpdf-forge")
}

/// `base/subfolder`, created if missing.
pub fn default_save_path(base: &Path, subfolder: &str) -> io::Result<PathBuf> {
    let subfolder = if subfolder.is_empty() {
        DEFAULT_SAVE_SUBFOLDER
    } else {
        subfolder
    };
    let dir = base.join(subfolder);
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_gain_pdf_suffix_once() {
        assert_eq!(normalize_document_name("Invoice"), "Invoice.pdf");
        assert_eq!(normalize_document_name("Invoice.pdf"), "Invoice.pdf");
        assert_eq!(normalize_document_name("SCAN.PDF"), "SCAN.PDF");
        assert_eq!(normalize_document_name(""), "");
    }

    #[test]
    fn print_attributes_apply_orientation() {
        let mut request = GenerationRequest::new("a", ContentSource::inline("<p/>"));
        request.orientation = PageOrientation::Landscape;
        let attrs = request.print_attributes();
        assert!(!attrs.media_size.is_portrait());
        assert_eq!(attrs.resolution_dpi, DEFAULT_DPI);
    }

    #[test]
    fn output_directory_falls_back_to_cache() {
        let mut request = GenerationRequest::new("a", ContentSource::remote("https://example.com"));
        let cache = Path::new("/tmp/cache");
        assert_eq!(request.output_directory(cache), cache);
        request.output_dir = Some(PathBuf::from("/out"));
        assert_eq!(request.output_directory(cache), Path::new("/out"));
    }

    #[test]
    fn default_save_path_creates_subfolder() {
        let base = tempfile::tempdir().unwrap();
        let dir = default_save_path(base.path(), "").unwrap();
        assert_eq!(dir, base.path().join("PDF"));
        assert!(dir.is_dir());

        let custom = default_save_path(base.path(), "reports").unwrap();
        assert!(custom.ends_with("reports"));
        assert!(custom.is_dir());
    }

    #[test]
    fn request_round_trips_through_json() {
        let request = GenerationRequest::new("doc", ContentSource::asset("a.html"));
        let json = request.to_json().unwrap();
        assert!(json.contains("\"kind\": \"asset\""));
        let back: GenerationRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
