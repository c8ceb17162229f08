//
// cross_file/scanner.rs
//
// Workspace scanner: discovers the documents reachable from a set of root
// files by following module links, and keeps the document store current
// on file changes and deletions.
//

use std::collections::HashSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tower_lsp::lsp_types::Url;

use super::config::WorkspaceConfig;
use super::content_provider::FileSystemProvider;
use super::path_resolve::{resolve_links, PathContext};
use super::types::LinkFilter;
use crate::document::{file_name_of, ScssDocument};
use crate::document_store::DocumentStore;
use crate::syntax::parse_stylesheet;

/// Counters for one scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    /// Documents parsed and stored
    pub parsed: usize,
    /// Documents already in the store
    pub cached: usize,
    /// Targets that no longer exist
    pub missing: usize,
    /// Targets that could not be read
    pub failed: usize,
    /// Set when the scan stopped on cancellation
    pub cancelled: bool,
}

pub struct WorkspaceScanner {
    store: Arc<DocumentStore>,
    fs: Arc<dyn FileSystemProvider>,
    config: WorkspaceConfig,
}

impl WorkspaceScanner {
    pub fn new(store: Arc<DocumentStore>, fs: Arc<dyn FileSystemProvider>, config: WorkspaceConfig) -> Self {
        Self { store, fs, config }
    }

    pub fn store(&self) -> &Arc<DocumentStore> {
        &self.store
    }

    /// Parse `text` as the contents of `uri`, resolving its links.
    pub async fn parse_document(&self, uri: &Url, text: String, workspace_root: Option<&Url>) -> ScssDocument {
        let tree = parse_stylesheet(&text);
        let ctx = PathContext::new(uri, workspace_root, &self.config.load_paths);
        let targets = resolve_links(self.fs.as_ref(), tree.links(), ctx.as_ref()).await;
        ScssDocument::new(uri.clone(), text, tree, &targets)
    }

    /// Populate the store from `files` and everything they link to.
    pub async fn scan(&self, files: &[Url], workspace_root: Option<&Url>) -> ScanStats {
        self.scan_cancellable(files, workspace_root, &CancellationToken::new())
            .await
    }

    /// Like `scan`, stopping early once `cancel` fires.
    ///
    /// Partials (`_name.scss`) are held back from the first pass over the roots
    /// so they are first reached through the index files that forward them;
    /// those still unknown afterwards are scanned as roots of their own.
    pub async fn scan_cancellable(
        &self,
        files: &[Url],
        workspace_root: Option<&Url>,
        cancel: &CancellationToken,
    ) -> ScanStats {
        let mut stats = ScanStats::default();
        let mut visited = HashSet::new();

        let (partials, entries): (Vec<&Url>, Vec<&Url>) =
            files.iter().partition(|uri| file_name_of(uri).starts_with('_'));

        for uri in entries.into_iter().chain(partials) {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                break;
            }
            self.parse_from(uri, workspace_root, cancel, &mut visited, &mut stats)
                .await;
        }

        log::info!(
            "Scan complete: {} parsed, {} cached, {} missing, {} failed, store holds {} documents{}",
            stats.parsed,
            stats.cached,
            stats.missing,
            stats.failed,
            self.store.len(),
            if stats.cancelled { " (cancelled)" } else { "" }
        );
        stats
    }

    /// Depth-first walk from `root` in link order. Already-stored documents
    /// are not re-parsed and not descended into again.
    async fn parse_from(
        &self,
        root: &Url,
        workspace_root: Option<&Url>,
        cancel: &CancellationToken,
        visited: &mut HashSet<Url>,
        stats: &mut ScanStats,
    ) {
        let mut stack = vec![(root.clone(), 0usize)];

        while let Some((uri, depth)) = stack.pop() {
            if cancel.is_cancelled() {
                stats.cancelled = true;
                return;
            }
            if !visited.insert(uri.clone()) {
                continue;
            }

            if !self.fs.exists(&uri).await {
                if self.store.delete(&uri).is_some() {
                    log::trace!("Evicted missing document {}", uri);
                }
                stats.missing += 1;
                continue;
            }
            if self.store.contains(&uri) {
                stats.cached += 1;
                continue;
            }

            let text = match self.fs.read_to_string(&uri).await {
                Ok(text) => text,
                Err(e) => {
                    log::warn!("Failed to read {}: {:#}", uri, e);
                    self.store.delete(&uri);
                    stats.failed += 1;
                    continue;
                }
            };
            let doc = Arc::new(self.parse_document(&uri, text, workspace_root).await);
            self.store.set(uri.clone(), Arc::clone(&doc));
            stats.parsed += 1;

            if !self.config.follow_links || depth > self.config.max_scan_depth {
                if self.config.follow_links && !doc.get_links(LinkFilter::ALL).is_empty() {
                    log::trace!("Depth limit {} reached at {}", self.config.max_scan_depth, uri);
                }
                continue;
            }

            // Reverse so the first link is explored first
            let children: Vec<Url> = doc
                .get_links(LinkFilter::ALL)
                .into_iter()
                .filter(|link| link.is_followable())
                .map(|link| link.target().clone())
                .filter(|target| *target != uri && !visited.contains(target))
                .collect();
            for child in children.into_iter().rev() {
                stack.push((child, depth + 1));
            }
        }
    }

    /// Re-parse a single document from new text and replace its entry. Only
    /// this document's own links are recomputed.
    pub async fn update(&self, uri: &Url, text: String, workspace_root: Option<&Url>) -> Arc<ScssDocument> {
        let doc = Arc::new(self.parse_document(uri, text, workspace_root).await);
        log::trace!("Updated document {}", uri);
        self.store.set(uri.clone(), doc)
    }

    /// Re-read a document from the file system and replace its entry,
    /// evicting it if it is gone.
    pub async fn refresh(&self, uri: &Url, workspace_root: Option<&Url>) -> Option<Arc<ScssDocument>> {
        match self.fs.read_to_string(uri).await {
            Ok(text) => Some(self.update(uri, text, workspace_root).await),
            Err(e) => {
                log::trace!("Evicting unreadable document {}: {:#}", uri, e);
                self.remove(uri);
                None
            }
        }
    }

    /// Evict a deleted document.
    pub fn remove(&self, uri: &Url) -> bool {
        self.store.delete(uri).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cross_file::content_provider::MemoryFileSystem;

    fn uri(path: &str) -> Url {
        Url::parse(&format!("file:///ws/{}", path)).unwrap()
    }

    fn setup(files: &[(&str, &str)]) -> (Arc<MemoryFileSystem>, WorkspaceScanner) {
        setup_with(files, WorkspaceConfig::default())
    }

    fn setup_with(files: &[(&str, &str)], config: WorkspaceConfig) -> (Arc<MemoryFileSystem>, WorkspaceScanner) {
        let fs = Arc::new(MemoryFileSystem::new());
        for (path, text) in files {
            fs.insert(uri(path), *text);
        }
        let scanner = WorkspaceScanner::new(Arc::new(DocumentStore::new()), fs.clone(), config);
        (fs, scanner)
    }

    #[tokio::test]
    async fn test_follows_links_from_root() {
        let (_, scanner) = setup(&[
            ("main.scss", "@use 'a';"),
            ("a.scss", "@forward 'b';"),
            ("_b.scss", "@import 'c';"),
            ("c.scss", "$c: 1;"),
            ("unrelated.scss", ""),
        ]);
        let stats = scanner.scan(&[uri("main.scss")], None).await;
        assert_eq!(stats.parsed, 4);
        let store = scanner.store();
        assert!(store.contains(&uri("_b.scss")));
        assert!(store.contains(&uri("c.scss")));
        assert!(!store.contains(&uri("unrelated.scss")));
    }

    #[tokio::test]
    async fn test_cycle_parses_each_document_once() {
        let (_, scanner) = setup(&[("a.scss", "@forward 'b';"), ("b.scss", "@forward 'a';")]);
        let stats = scanner.scan(&[uri("a.scss"), uri("b.scss")], None).await;
        assert_eq!(stats.parsed, 2);
        assert_eq!(scanner.store().len(), 2);
    }

    #[tokio::test]
    async fn test_rescan_keeps_identity() {
        let (_, scanner) = setup(&[("main.scss", "@use 'a';"), ("a.scss", "$x: 1;")]);
        let roots = [uri("main.scss"), uri("a.scss")];
        scanner.scan(&roots, None).await;
        let before = scanner.store().get(&uri("a.scss")).unwrap();
        let stats = scanner.scan(&roots, None).await;
        assert_eq!(stats.parsed, 0);
        let after = scanner.store().get(&uri("a.scss")).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let config = WorkspaceConfig {
            max_scan_depth: 1,
            ..WorkspaceConfig::default()
        };
        let (_, scanner) = setup_with(
            &[
                ("a.scss", "@use 'b';"),
                ("b.scss", "@use 'c';"),
                ("c.scss", "@use 'd';"),
                ("d.scss", ""),
            ],
            config,
        );
        scanner.scan(&[uri("a.scss")], None).await;
        assert!(scanner.store().contains(&uri("b.scss")));
        // A document at the limit is still followed
        assert!(scanner.store().contains(&uri("c.scss")));
        assert!(!scanner.store().contains(&uri("d.scss")));
    }

    #[tokio::test]
    async fn test_depth_limit_zero_reads_direct_links() {
        let config = WorkspaceConfig {
            max_scan_depth: 0,
            ..WorkspaceConfig::default()
        };
        let (_, scanner) = setup_with(&[("a.scss", "@use 'b';"), ("b.scss", "@use 'c';"), ("c.scss", "")], config);
        scanner.scan(&[uri("a.scss")], None).await;
        assert!(scanner.store().contains(&uri("b.scss")));
        assert!(!scanner.store().contains(&uri("c.scss")));
    }

    #[tokio::test]
    async fn test_follow_links_disabled() {
        let config = WorkspaceConfig {
            follow_links: false,
            ..WorkspaceConfig::default()
        };
        let (_, scanner) = setup_with(&[("a.scss", "@use 'b';"), ("b.scss", "")], config);
        scanner.scan(&[uri("a.scss")], None).await;
        assert_eq!(scanner.store().keys(), vec![uri("a.scss")]);
    }

    #[tokio::test]
    async fn test_missing_file_is_evicted() {
        let (fs, scanner) = setup(&[("a.scss", "$a: 1;")]);
        scanner.scan(&[uri("a.scss")], None).await;
        fs.remove(&uri("a.scss"));
        let stats = scanner.scan(&[uri("a.scss")], None).await;
        assert_eq!(stats.missing, 1);
        assert!(scanner.store().is_empty());
    }

    #[tokio::test]
    async fn test_partials_reached_through_index_first() {
        let (_, scanner) = setup(&[
            ("_orphan.scss", "$o: 1;"),
            ("_b.scss", "$b: 1;"),
            ("index.scss", "@forward 'b';"),
        ]);
        let stats = scanner
            .scan(&[uri("_b.scss"), uri("_orphan.scss"), uri("index.scss")], None)
            .await;
        assert_eq!(stats.parsed, 3);
        assert_eq!(stats.cached, 0);
        assert!(scanner.store().contains(&uri("_orphan.scss")));
    }

    #[tokio::test]
    async fn test_update_replaces_only_that_document() {
        let (_, scanner) = setup(&[("main.scss", "@use 'a';"), ("a.scss", "$x: 1;"), ("b.scss", "")]);
        scanner.scan(&[uri("main.scss")], None).await;
        let a = scanner.store().get(&uri("a.scss")).unwrap();

        let updated = scanner
            .update(&uri("main.scss"), "@use 'a';\n@use 'b';".to_string(), None)
            .await;
        assert_eq!(updated.uses.len(), 2);
        assert!(Arc::ptr_eq(&a, &scanner.store().get(&uri("a.scss")).unwrap()));
        // Newly linked documents wait for the next scan
        assert!(!scanner.store().contains(&uri("b.scss")));
    }

    #[tokio::test]
    async fn test_cancelled_scan_stops() {
        let (_, scanner) = setup(&[("a.scss", "")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stats = scanner
            .scan_cancellable(&[uri("a.scss")], None, &cancel)
            .await;
        assert!(stats.cancelled);
        assert!(scanner.store().is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_refresh() {
        let (fs, scanner) = setup(&[("a.scss", "$a: 1;")]);
        scanner.scan(&[uri("a.scss")], None).await;
        fs.insert(uri("a.scss"), "$b: 2;");
        let doc = scanner.refresh(&uri("a.scss"), None).await.unwrap();
        assert!(doc.variables.contains_key("$b"));
        assert!(scanner.remove(&uri("a.scss")));
        assert!(!scanner.remove(&uri("a.scss")));
    }
}
