//
// backend.rs
//
// LanguageServer implementation: document lifecycle, workspace scanning,
// and request dispatch to the handlers
//

use std::sync::Arc;
use std::time::Duration;

use globset::GlobSet;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tower_lsp::LanguageServer;
use tower_lsp::LspService;
use tower_lsp::Server;

use crate::cross_file::parse_workspace_config;
use crate::handlers;
use crate::state::{discover_root_files, WorldState};

/// Settings may arrive bare or nested under the server's name.
fn settings_section(value: &serde_json::Value) -> &serde_json::Value {
    value.get("wren").unwrap_or(value)
}

pub struct Backend {
    client: Client,
    state: Arc<RwLock<WorldState>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            state: Arc::new(RwLock::new(WorldState::new())),
        }
    }

    /// Discover and scan every stylesheet in the workspace. The state lock is
    /// only held long enough to snapshot folders and build the scanner.
    async fn scan_workspace(&self) {
        let (folders, config, scanner) = {
            let state = self.state.read().await;
            (state.workspace_folders.clone(), state.config.clone(), state.scanner())
        };
        if folders.is_empty() {
            log::info!("No workspace folders; skipping scan");
            return;
        }

        let exclude = match config.exclude_matcher() {
            Ok(exclude) => exclude,
            Err(err) => {
                log::warn!("Ignoring exclude patterns: {:#}", err);
                GlobSet::empty()
            }
        };
        let discover_folders = folders.clone();
        let files = match tokio::task::spawn_blocking(move || discover_root_files(&discover_folders, &exclude)).await {
            Ok(files) => files,
            Err(err) => {
                log::error!("Workspace discovery failed: {}", err);
                return;
            }
        };

        let stats = scanner.scan(&files, folders.first()).await;
        log::info!(
            "Workspace scan complete: {} parsed, {} cached, {} missing, {} failed",
            stats.parsed,
            stats.cached,
            stats.missing,
            stats.failed
        );
    }

    /// Reparse an edited buffer, then publish diagnostics after the debounce.
    async fn reparse_and_schedule(&self, uri: Url) {
        let (text, root, scanner, debounce_ms) = {
            let state = self.state.read().await;
            let Some(doc) = state.get_document(&uri) else {
                return;
            };
            (
                doc.text(),
                state.workspace_root().cloned(),
                state.scanner(),
                state.config.diagnostics_debounce_ms,
            )
        };
        scanner.update(&uri, text, root.as_ref()).await;

        let (token, trigger) = {
            let state = self.state.read().await;
            let trigger = state.get_document(&uri).map(|d| (d.version, d.revision));
            (state.diagnostics_scheduler.schedule(uri.clone()), trigger)
        };

        let state_arc = self.state.clone();
        let client = self.client.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => { return; }
                _ = tokio::time::sleep(Duration::from_millis(debounce_ms)) => {}
            }

            let (version, diagnostics) = {
                let state = state_arc.read().await;
                let current = state.get_document(&uri).map(|d| (d.version, d.revision));
                if current != trigger {
                    log::trace!("Skipping stale diagnostics for {}: revision changed", uri);
                    return;
                }
                let version = current.and_then(|(version, _)| version);
                if let Some(ver) = version {
                    if !state.diagnostics_gate.can_publish(&uri, ver) {
                        log::trace!("Skipping diagnostics for {}: monotonic gate (version={})", uri, ver);
                        return;
                    }
                }
                let diagnostics = handlers::diagnostics(&state, &uri, Some(&token));
                if token.is_cancelled() {
                    return;
                }
                if let Some(ver) = version {
                    state.diagnostics_gate.record_publish(&uri, ver);
                }
                state.diagnostics_scheduler.complete(&uri, &token);
                (version, diagnostics)
            };

            client.publish_diagnostics(uri, diagnostics, version).await;
        });
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!("Initializing wren");

        let mut state = self.state.write().await;

        if let Some(folders) = params.workspace_folders {
            for folder in folders {
                log::info!("Adding workspace folder: {}", folder.uri);
                state.workspace_folders.push(folder.uri);
            }
        } else if let Some(root_uri) = params.root_uri {
            log::info!("Adding root URI as workspace folder: {}", root_uri);
            state.workspace_folders.push(root_uri);
        }

        if let Some(options) = params.initialization_options.as_ref() {
            state.config = parse_workspace_config(settings_section(options));
        }

        drop(state);

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        ["$", "@", ".", "%", "\"", "'", "/"]
                            .iter()
                            .map(|c| c.to_string())
                            .collect(),
                    ),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                definition_provider: Some(OneOf::Left(true)),
                references_provider: Some(OneOf::Left(true)),
                document_symbol_provider: Some(OneOf::Left(true)),
                workspace_symbol_provider: Some(OneOf::Left(true)),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(false),
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: String::from("wren"),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("wren initialized");
        self.scan_workspace().await;
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("Shutting down wren");
        let state = self.state.read().await;
        state.diagnostics_scheduler.cancel_all();
        state.store.clear();
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        log::trace!("Opened {}", doc.uri);
        {
            let mut state = self.state.write().await;
            state.open_document(doc.uri.clone(), &doc.text, Some(doc.version));
        }
        self.reparse_and_schedule(doc.uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            let mut state = self.state.write().await;
            for change in params.content_changes {
                state.apply_change(&uri, change);
            }
            if let Some(doc) = state.documents.get_mut(&uri) {
                doc.version = Some(params.text_document.version);
            }
        }
        self.reparse_and_schedule(uri).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        log::trace!("Closed {}", uri);
        let (root, scanner) = {
            let mut state = self.state.write().await;
            state.diagnostics_scheduler.cancel(&uri);
            state.diagnostics_gate.clear(&uri);
            state.close_document(&uri);
            (state.workspace_root().cloned(), state.scanner())
        };

        // Fall back to what is on disk; the file may be gone
        if scanner.refresh(&uri, root.as_ref()).await.is_none() {
            scanner.remove(&uri);
        }
        self.client.publish_diagnostics(uri, Vec::new(), None).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        log::trace!("Configuration changed");
        let new_config = parse_workspace_config(settings_section(&params.settings));

        let rescan = {
            let mut state = self.state.write().await;
            let rescan = state.config.scan_settings_changed(&new_config);
            state.config = new_config;
            if rescan {
                state.store.clear();
            }
            rescan
        };

        if rescan {
            log::info!("Scan settings changed, rescanning workspace");
            self.scan_workspace().await;
            let open: Vec<Url> = self.state.read().await.documents.keys().cloned().collect();
            for uri in open {
                self.reparse_and_schedule(uri).await;
            }
        }
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        let (root, scanner, open) = {
            let state = self.state.read().await;
            let open: std::collections::HashSet<Url> = state.documents.keys().cloned().collect();
            (state.workspace_root().cloned(), state.scanner(), open)
        };

        for change in params.changes {
            // Open buffers are authoritative
            if open.contains(&change.uri) {
                continue;
            }
            match change.typ {
                FileChangeType::CREATED | FileChangeType::CHANGED => {
                    log::trace!("Refreshing {} from disk", change.uri);
                    scanner.refresh(&change.uri, root.as_ref()).await;
                }
                FileChangeType::DELETED => {
                    log::trace!("Removing {}", change.uri);
                    scanner.remove(&change.uri);
                }
                _ => {}
            }
        }
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let state = self.state.read().await;
        Ok(handlers::hover(
            &state,
            &params.text_document_position_params.text_document.uri,
            params.text_document_position_params.position,
        ))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let state = self.state.read().await;
        Ok(handlers::goto_definition(
            &state,
            &params.text_document_position_params.text_document.uri,
            params.text_document_position_params.position,
        ))
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let state = self.state.read().await;
        Ok(handlers::references(
            &state,
            &params.text_document_position.text_document.uri,
            params.text_document_position.position,
            params.context.include_declaration,
        ))
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let state = self.state.read().await;
        Ok(handlers::completion(
            &state,
            &params.text_document_position.text_document.uri,
            params.text_document_position.position,
        ))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let state = self.state.read().await;
        Ok(handlers::document_symbol(&state, &params.text_document.uri))
    }

    async fn symbol(
        &self,
        params: WorkspaceSymbolParams,
    ) -> Result<Option<Vec<SymbolInformation>>> {
        let state = self.state.read().await;
        Ok(Some(handlers::workspace_symbol(&state, &params.query)))
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let state = self.state.read().await;
        Ok(handlers::document_links(&state, &params.text_document.uri))
    }
}

pub async fn start_lsp() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new).finish();
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_section_accepts_nested_and_bare() {
        let nested = json!({ "wren": { "completion": { "suggestMixins": false } } });
        assert!(!parse_workspace_config(settings_section(&nested)).suggest_mixins);

        let bare = json!({ "completion": { "suggestMixins": false } });
        assert!(!parse_workspace_config(settings_section(&bare)).suggest_mixins);
    }
}
