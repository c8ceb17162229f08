//
// cross_file/content_provider.rs
//
// File content access for the scanner and path resolution
//

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tower_lsp::lsp_types::Url;

/// Source of file contents. All I/O in the scanner and link resolution goes
/// through this trait.
#[async_trait]
pub trait FileSystemProvider: Send + Sync {
    async fn exists(&self, uri: &Url) -> bool;

    async fn read_to_string(&self, uri: &Url) -> Result<String>;
}

/// Reads from disk with `tokio::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskFileSystem;

#[async_trait]
impl FileSystemProvider for DiskFileSystem {
    async fn exists(&self, uri: &Url) -> bool {
        let Ok(path) = uri.to_file_path() else {
            return false;
        };
        tokio::fs::metadata(&path)
            .await
            .map(|meta| meta.is_file())
            .unwrap_or(false)
    }

    async fn read_to_string(&self, uri: &Url) -> Result<String> {
        let path = uri
            .to_file_path()
            .map_err(|_| anyhow!("not a file URI: {}", uri))?;
        tokio::fs::read_to_string(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))
    }
}

/// Open editor buffers take precedence over the wrapped provider. Never
/// returns disk content for an open document.
pub struct OpenDocumentsFirst<F> {
    open: Arc<RwLock<HashMap<Url, String>>>,
    fallback: F,
}

impl<F: FileSystemProvider> OpenDocumentsFirst<F> {
    pub fn new(open: Arc<RwLock<HashMap<Url, String>>>, fallback: F) -> Self {
        Self { open, fallback }
    }

    fn open_text(&self, uri: &Url) -> Option<String> {
        self.open.read().ok()?.get(uri).cloned()
    }
}

#[async_trait]
impl<F: FileSystemProvider> FileSystemProvider for OpenDocumentsFirst<F> {
    async fn exists(&self, uri: &Url) -> bool {
        self.open_text(uri).is_some() || self.fallback.exists(uri).await
    }

    async fn read_to_string(&self, uri: &Url) -> Result<String> {
        match self.open_text(uri) {
            Some(text) => Ok(text),
            None => self.fallback.read_to_string(uri).await,
        }
    }
}

/// In-memory file system keyed by URI.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: RwLock<HashMap<Url, String>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, uri: Url, text: impl Into<String>) {
        if let Ok(mut guard) = self.files.write() {
            guard.insert(uri, text.into());
        }
    }

    pub fn remove(&self, uri: &Url) {
        if let Ok(mut guard) = self.files.write() {
            guard.remove(uri);
        }
    }
}

#[async_trait]
impl FileSystemProvider for MemoryFileSystem {
    async fn exists(&self, uri: &Url) -> bool {
        self.files
            .read()
            .map(|guard| guard.contains_key(uri))
            .unwrap_or(false)
    }

    async fn read_to_string(&self, uri: &Url) -> Result<String> {
        self.files
            .read()
            .map_err(|_| anyhow!("file table poisoned"))?
            .get(uri)
            .cloned()
            .ok_or_else(|| anyhow!("no such file: {}", uri))
    }
}
