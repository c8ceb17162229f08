//
// state.rs
//
// Server state: open editor buffers, the shared document store, workspace
// folders and configuration.
//

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, RwLock};

use globset::GlobSet;
use ropey::Rope;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};
use walkdir::WalkDir;

use crate::cross_file::{
    DiagnosticsGate, DiagnosticsScheduler, DiskFileSystem, FileSystemProvider, OpenDocumentsFirst,
    WorkspaceConfig, WorkspaceScanner,
};
use crate::document_store::DocumentStore;

/// An open editor buffer
pub struct Document {
    pub contents: Rope,
    pub version: Option<i32>,
    pub revision: u64,
}

impl Document {
    pub fn new(text: &str, version: Option<i32>) -> Self {
        Self {
            contents: Rope::from_str(text),
            version,
            revision: 0,
        }
    }

    /// Apply one incremental or full-text change. Positions are UTF-16.
    pub fn apply_change(&mut self, change: TextDocumentContentChangeEvent) {
        if let Some(range) = change.range {
            let start = self.char_index(range.start.line as usize, range.start.character as usize);
            let end = self.char_index(range.end.line as usize, range.end.character as usize);
            let (start, end) = (start.min(end), start.max(end));
            self.contents.remove(start..end);
            self.contents.insert(start, &change.text);
        } else {
            self.contents = Rope::from_str(&change.text);
        }
        self.revision += 1;
    }

    /// Char index of a UTF-16 position, clamped to the document.
    fn char_index(&self, line: usize, utf16_column: usize) -> usize {
        if line >= self.contents.len_lines() {
            return self.contents.len_chars();
        }
        let line_start = self.contents.line_to_char(line);
        let line_text = self.contents.line(line);
        let mut utf16 = 0;
        let mut chars = 0;
        for ch in line_text.chars() {
            if utf16 >= utf16_column || ch == '\n' || ch == '\r' {
                break;
            }
            utf16 += ch.len_utf16();
            chars += 1;
        }
        line_start + chars
    }

    pub fn text(&self) -> String {
        self.contents.to_string()
    }
}

/// Global LSP state
pub struct WorldState {
    pub documents: HashMap<Url, Document>,
    /// Text of open buffers, shared with the scanner's file-system view
    pub open_texts: Arc<RwLock<HashMap<Url, String>>>,
    pub store: Arc<DocumentStore>,
    pub workspace_folders: Vec<Url>,
    pub config: WorkspaceConfig,
    pub diagnostics_scheduler: DiagnosticsScheduler,
    pub diagnostics_gate: DiagnosticsGate,
}

impl Default for WorldState {
    fn default() -> Self {
        Self::new()
    }
}

impl WorldState {
    pub fn new() -> Self {
        Self {
            documents: HashMap::new(),
            open_texts: Arc::new(RwLock::new(HashMap::new())),
            store: Arc::new(DocumentStore::new()),
            workspace_folders: Vec::new(),
            config: WorkspaceConfig::default(),
            diagnostics_scheduler: DiagnosticsScheduler::new(),
            diagnostics_gate: DiagnosticsGate::new(),
        }
    }

    pub fn workspace_root(&self) -> Option<&Url> {
        self.workspace_folders.first()
    }

    /// Scanner over the shared store. Open buffers shadow disk content.
    pub fn scanner(&self) -> WorkspaceScanner {
        let fs: Arc<dyn FileSystemProvider> =
            Arc::new(OpenDocumentsFirst::new(Arc::clone(&self.open_texts), DiskFileSystem));
        WorkspaceScanner::new(Arc::clone(&self.store), fs, self.config.clone())
    }

    pub fn open_document(&mut self, uri: Url, text: &str, version: Option<i32>) {
        self.sync_open_text(&uri, Some(text.to_string()));
        self.documents.insert(uri, Document::new(text, version));
    }

    pub fn close_document(&mut self, uri: &Url) {
        self.documents.remove(uri);
        self.sync_open_text(uri, None);
    }

    pub fn apply_change(&mut self, uri: &Url, change: TextDocumentContentChangeEvent) {
        let text = match self.documents.get_mut(uri) {
            Some(doc) => {
                doc.apply_change(change);
                doc.text()
            }
            None => return,
        };
        self.sync_open_text(uri, Some(text));
    }

    pub fn get_document(&self, uri: &Url) -> Option<&Document> {
        self.documents.get(uri)
    }

    fn sync_open_text(&self, uri: &Url, text: Option<String>) {
        if let Ok(mut open) = self.open_texts.write() {
            match text {
                Some(text) => open.insert(uri.clone(), text),
                None => open.remove(uri),
            };
        }
    }
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("scss"))
        .unwrap_or(false)
}

/// Every `.scss` file under `folders`, minus paths matching `exclude`,
/// sorted for a stable scan order.
pub fn discover_root_files(folders: &[Url], exclude: &GlobSet) -> Vec<Url> {
    let mut files = Vec::new();
    for folder in folders {
        let Ok(root) = folder.to_file_path() else {
            log::warn!("Skipping non-file workspace folder {}", folder);
            continue;
        };
        log::info!("Discovering stylesheets under {}", root.display());
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !exclude.is_match(entry.path()));
        for entry in walker.filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() || !is_stylesheet(entry.path()) {
                continue;
            }
            if let Ok(uri) = Url::from_file_path(entry.path()) {
                files.push(uri);
            }
        }
    }
    files.sort_by(|a, b| a.as_str().cmp(b.as_str()));
    files.dedup();
    log::info!("Discovered {} stylesheets", files.len());
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::{Position, Range};

    fn change(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(Range::new(Position::new(start.0, start.1), Position::new(end.0, end.1))),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_incremental_change() {
        let mut doc = Document::new("$a: 1;\n$b: 2;\n", Some(1));
        doc.apply_change(change((1, 4), (1, 5), "20"));
        assert_eq!(doc.text(), "$a: 1;\n$b: 20;\n");
        assert_eq!(doc.revision, 1);
    }

    #[test]
    fn test_change_with_utf16_columns() {
        // "😀" is two UTF-16 units
        let mut doc = Document::new("$e: \"😀x\";", None);
        doc.apply_change(change((0, 7), (0, 8), "y"));
        assert_eq!(doc.text(), "$e: \"😀y\";");
    }

    #[test]
    fn test_full_sync() {
        let mut doc = Document::new("old", None);
        doc.apply_change(TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "new".to_string(),
        });
        assert_eq!(doc.text(), "new");
    }

    #[test]
    fn test_open_texts_follow_buffers() {
        let mut state = WorldState::new();
        let uri = Url::parse("file:///ws/a.scss").unwrap();
        state.open_document(uri.clone(), "$a: 1;", Some(1));
        state.apply_change(&uri, change((0, 4), (0, 5), "2"));
        assert_eq!(
            state.open_texts.read().unwrap().get(&uri).map(String::as_str),
            Some("$a: 2;")
        );
        state.close_document(&uri);
        assert!(state.open_texts.read().unwrap().is_empty());
    }

    #[test]
    fn test_discover_root_files_honours_exclude() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("node_modules/pkg")).unwrap();
        std::fs::write(root.join("src/main.scss"), "").unwrap();
        std::fs::write(root.join("src/_part.scss"), "").unwrap();
        std::fs::write(root.join("src/notes.css"), "").unwrap();
        std::fs::write(root.join("node_modules/pkg/_lib.scss"), "").unwrap();

        let folder = Url::from_directory_path(root).unwrap();
        let exclude = WorkspaceConfig::default().exclude_matcher().unwrap();
        let files = discover_root_files(&[folder], &exclude);
        let names: Vec<String> = files
            .iter()
            .map(|u| crate::document::file_name_of(u))
            .collect();
        assert_eq!(names, vec!["_part.scss", "main.scss"]);
    }
}
