//
// cross_file/revalidation.rs
//
// Debounced diagnostics publishing: one pending task per document, newer
// edits cancel older ones, and published versions never go backwards.
//

use std::collections::HashMap;
use std::sync::RwLock;

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Url;

/// Tracks pending diagnostics work per file
#[derive(Debug, Default)]
pub struct DiagnosticsScheduler {
    pending: RwLock<HashMap<Url, CancellationToken>>,
}

impl DiagnosticsScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule work for `uri`, cancelling whatever was pending for it.
    pub fn schedule(&self, uri: Url) -> CancellationToken {
        let token = CancellationToken::new();
        if let Ok(mut pending) = self.pending.write() {
            if let Some(old) = pending.insert(uri, token.clone()) {
                old.cancel();
            }
        }
        token
    }

    /// Forget `uri` if `token` is still the pending one.
    pub fn complete(&self, uri: &Url, token: &CancellationToken) {
        if let Ok(mut pending) = self.pending.write() {
            let current = pending
                .get(uri)
                .map(|t| !t.is_cancelled() && !token.is_cancelled())
                .unwrap_or(false);
            if current {
                pending.remove(uri);
            }
        }
    }

    pub fn cancel(&self, uri: &Url) {
        if let Ok(mut pending) = self.pending.write() {
            if let Some(token) = pending.remove(uri) {
                token.cancel();
            }
        }
    }

    pub fn cancel_all(&self) {
        if let Ok(mut pending) = self.pending.write() {
            for (_, token) in pending.drain() {
                token.cancel();
            }
        }
    }

    pub fn is_pending(&self, uri: &Url) -> bool {
        self.pending
            .read()
            .map(|pending| pending.contains_key(uri))
            .unwrap_or(false)
    }
}

/// Monotonic publish gate keyed by document version
#[derive(Debug, Default)]
pub struct DiagnosticsGate {
    last_published: RwLock<HashMap<Url, i32>>,
}

impl DiagnosticsGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same-version republish is allowed since dependencies may have changed.
    pub fn can_publish(&self, uri: &Url, version: i32) -> bool {
        self.last_published
            .read()
            .map(|last| last.get(uri).map_or(true, |&prev| version >= prev))
            .unwrap_or(true)
    }

    pub fn record_publish(&self, uri: &Url, version: i32) {
        if let Ok(mut last) = self.last_published.write() {
            last.insert(uri.clone(), version);
        }
    }

    pub fn clear(&self, uri: &Url) {
        if let Ok(mut last) = self.last_published.write() {
            last.remove(uri);
        }
    }
}
