//! Content source resolution: turns a [`ContentSource`] into the single
//! payload the rendering engine loads.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::GenerationError;
use crate::request::ContentSource;

pub const DEFAULT_MIME_TYPE: &str = "text/html";
pub const DEFAULT_ENCODING: &str = "utf-8";

/// What the engine is asked to load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedContent {
    /// Markup to load directly.
    Markup {
        html: String,
        base_url: Option<String>,
        mime_type: String,
        encoding: String,
    },
    /// A URL to navigate to.
    Url(String),
}

impl ResolvedContent {
    fn markup(html: String, base_url: Option<String>) -> Self {
        Self::Markup {
            html,
            base_url,
            mime_type: DEFAULT_MIME_TYPE.to_string(),
            encoding: DEFAULT_ENCODING.to_string(),
        }
    }
}

/// Read access to bundled resources.
pub trait AssetStore: Send + Sync {
    /// Read an asset as text.
    fn read(&self, path: &str) -> io::Result<String>;

    /// Base URL that relative references inside assets resolve against.
    fn base_url(&self) -> String;
}

/// Assets stored under a directory on disk.
#[derive(Debug, Clone)]
pub struct DirAssetStore {
    root: PathBuf,
}

impl DirAssetStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl AssetStore for DirAssetStore {
    fn read(&self, path: &str) -> io::Result<String> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "asset path must stay inside the asset root",
            ));
        }
        std::fs::read_to_string(self.root.join(relative))
    }

    fn base_url(&self) -> String {
        let root = std::path::absolute(&self.root).unwrap_or_else(|_| self.root.clone());
        let mut url = format!("file://{}", root.display());
        if !url.ends_with('/') {
            url.push('/');
        }
        url
    }
}

/// In-memory assets, keyed by path.
#[derive(Debug, Clone)]
pub struct MemoryAssetStore {
    files: HashMap<String, String>,
    base_url: String,
}

impl MemoryAssetStore {
    pub const DEFAULT_BASE_URL: &'static str = "asset:///";

    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn insert(mut self, path: impl Into<String>, contents: impl Into<String>) -> Self {
        self.files.insert(path.into(), contents.into());
        self
    }
}

impl Default for MemoryAssetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetStore for MemoryAssetStore {
    fn read(&self, path: &str) -> io::Result<String> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no such asset"))
    }

    fn base_url(&self) -> String {
        self.base_url.clone()
    }
}

/// Resolve a content source against the asset store.
///
/// Assets always resolve relative to the store's base URL, whatever base the
/// caller configured.
pub fn resolve(
    source: &ContentSource,
    assets: &dyn AssetStore,
) -> Result<ResolvedContent, GenerationError> {
    match source {
        ContentSource::Inline { markup, base_url } => {
            Ok(ResolvedContent::markup(markup.clone(), base_url.clone()))
        }
        ContentSource::Remote { url } => Ok(ResolvedContent::Url(url.clone())),
        ContentSource::Asset { path } => {
            let html = assets
                .read(path)
                .map_err(|e| GenerationError::asset_read(path, e))?;
            Ok(ResolvedContent::markup(html, Some(assets.base_url())))
        }
    }
}
