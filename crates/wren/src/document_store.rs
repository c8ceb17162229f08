//
// document_store.rs
//
// Session-wide cache of parsed documents keyed by URI
//

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tower_lsp::lsp_types::Url;

use crate::document::ScssDocument;

/// Authoritative map from URI to the latest parsed document.
///
/// Documents are stored behind `Arc` and replaced wholesale, so a caller
/// holding a document from an earlier `get` keeps a consistent snapshot
/// and can detect replacement with `Arc::ptr_eq`.
#[derive(Default)]
pub struct DocumentStore {
    inner: RwLock<HashMap<Url, Arc<ScssDocument>>>,
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

impl DocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uri: &Url) -> Option<Arc<ScssDocument>> {
        self.inner.read().ok()?.get(uri).cloned()
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.inner
            .read()
            .map(|guard| guard.contains_key(uri))
            .unwrap_or(false)
    }

    /// Store `doc` under `uri`, returning the handle that `get` will hand out.
    pub fn set(&self, uri: Url, doc: Arc<ScssDocument>) -> Arc<ScssDocument> {
        if let Ok(mut guard) = self.inner.write() {
            guard.insert(uri, Arc::clone(&doc));
        }
        doc
    }

    pub fn delete(&self, uri: &Url) -> Option<Arc<ScssDocument>> {
        self.inner.write().ok()?.remove(uri)
    }

    pub fn values(&self) -> Vec<Arc<ScssDocument>> {
        self.inner
            .read()
            .map(|guard| guard.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn keys(&self) -> Vec<Url> {
        self.inner
            .read()
            .map(|guard| guard.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.inner.read().map(|guard| guard.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.inner.write() {
            guard.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document(path: &str, text: &str) -> Arc<ScssDocument> {
        let uri = Url::parse(&format!("file:///ws/{}", path)).unwrap();
        Arc::new(ScssDocument::parse(uri, text.to_string(), |_| None))
    }

    #[test]
    fn test_get_returns_same_object() {
        let store = DocumentStore::new();
        let doc = document("a.scss", "$a: 1;");
        store.set(doc.uri.clone(), Arc::clone(&doc));
        let fetched = store.get(&doc.uri).unwrap();
        assert!(Arc::ptr_eq(&doc, &fetched));
    }

    #[test]
    fn test_replacement_leaves_old_snapshot_intact() {
        let store = DocumentStore::new();
        let old = document("a.scss", "$a: 1;");
        let uri = old.uri.clone();
        store.set(uri.clone(), Arc::clone(&old));
        store.set(uri.clone(), document("a.scss", "$b: 2;"));

        assert!(old.variables.contains_key("$a"));
        let current = store.get(&uri).unwrap();
        assert!(!Arc::ptr_eq(&old, &current));
        assert!(current.variables.contains_key("$b"));
    }

    #[test]
    fn test_delete_and_clear() {
        let store = DocumentStore::new();
        let a = document("a.scss", "");
        let b = document("b.scss", "");
        store.set(a.uri.clone(), Arc::clone(&a));
        store.set(b.uri.clone(), Arc::clone(&b));
        assert_eq!(store.len(), 2);
        assert_eq!(store.keys().len(), 2);

        assert!(store.delete(&a.uri).is_some());
        assert!(!store.contains(&a.uri));
        assert!(store.delete(&a.uri).is_none());

        store.clear();
        assert!(store.is_empty());
        assert!(store.values().is_empty());
    }
}
