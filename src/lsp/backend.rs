//! The tower-lsp server backend.
//!
//! Owns the open-document map and the assist processor, forwards file
//! events into the debounced change tracker, and drains ripe batches from a
//! background flush loop. Completion requests see either the previous
//! committed class graph or the next one, never a half-built state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{broadcast, RwLock};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::{
    CompletionOptions, CompletionParams, CompletionResponse, DidChangeTextDocumentParams,
    DidChangeWatchedFilesParams, DidCloseTextDocumentParams, DidOpenTextDocumentParams,
    FileChangeType, InitializeParams, InitializeResult, InitializedParams, MessageType,
    ServerCapabilities, ServerInfo, TextDocumentSyncCapability, TextDocumentSyncKind, Url,
};
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, warn};

use crate::completion::ContentAssistProcessor;
use crate::document::Document;
use crate::exml::facts::JsonFactScanner;
use crate::exml::project::ProjectModel;
use crate::exml::tracker::{ChangeKind, ChangeTracker};

const FLUSH_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Backend {
    client: Client,
    documents: Arc<RwLock<HashMap<Url, Document>>>,
    assist: Arc<RwLock<Option<ContentAssistProcessor>>>,
    tracker: ChangeTracker,
    watcher: Arc<Mutex<Option<RecommendedWatcher>>>,
    root_dir: Arc<RwLock<Option<PathBuf>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            client,
            documents: Arc::new(RwLock::new(HashMap::new())),
            assist: Arc::new(RwLock::new(None)),
            tracker: ChangeTracker::new(),
            watcher: Arc::new(Mutex::new(None)),
            root_dir: Arc::new(RwLock::new(None)),
            shutdown_tx,
        }
    }

    /// Background loop draining ripe change batches into the assist
    /// processor.
    fn spawn_flush_loop(&self) {
        let tracker = self.tracker.clone();
        let assist = Arc::clone(&self.assist);
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(FLUSH_POLL_INTERVAL);
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = interval.tick() => {
                        if !tracker.should_flush() {
                            continue;
                        }
                        let batch = tracker.drain();
                        if batch.is_empty() {
                            continue;
                        }
                        debug!(
                            added = batch.added.len(),
                            modified = batch.modified.len(),
                            deleted = batch.deleted.len(),
                            "applying change batch"
                        );
                        let mut guard = assist.write().await;
                        if let Some(processor) = guard.as_mut() {
                            processor.file_changed(&batch);
                        }
                    }
                }
            }
        });
    }

    fn start_watcher(&self, root: &PathBuf) {
        let tracker = self.tracker.clone();
        let watcher = notify::recommended_watcher(move |result: notify::Result<notify::Event>| {
            let Ok(event) = result else { return };
            let kind = match event.kind {
                notify::EventKind::Create(_) => ChangeKind::Added,
                notify::EventKind::Modify(_) => ChangeKind::Modified,
                notify::EventKind::Remove(_) => ChangeKind::Deleted,
                _ => return,
            };
            for path in event.paths {
                tracker.mark(path, kind);
            }
        });
        match watcher {
            Ok(mut watcher) => {
                if let Err(err) = watcher.watch(root, RecursiveMode::Recursive) {
                    warn!(%err, "failed to watch workspace root");
                    return;
                }
                *self.watcher.lock().expect("watcher mutex") = Some(watcher);
            }
            Err(err) => warn!(%err, "failed to create file watcher"),
        }
    }
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").finish_non_exhaustive()
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let root = params
            .root_uri
            .as_ref()
            .and_then(|uri| uri.to_file_path().ok());
        *self.root_dir.write().await = root;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(
                        [":", "<", "\"", "'", " ", ".", "/"]
                            .iter()
                            .map(|s| s.to_string())
                            .collect(),
                    ),
                    ..Default::default()
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "exml-language-server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        let Some(root) = self.root_dir.read().await.clone() else {
            info!("no workspace root; completion stays inert");
            return;
        };
        let Some(project) = ProjectModel::load(&root) else {
            info!(root = %root.display(), "not an EXML project");
            return;
        };
        let processor = ContentAssistProcessor::new(project, Box::new(JsonFactScanner));
        match processor {
            Some(processor) => {
                info!(root = %root.display(), "assist processor ready");
                *self.assist.write().await = Some(processor);
                self.start_watcher(&root);
                self.spawn_flush_loop();
                self.client
                    .log_message(MessageType::INFO, "EXML completion ready")
                    .await;
            }
            None => {
                warn!(root = %root.display(), "project selects an unknown UI dialect");
            }
        }
    }

    async fn shutdown(&self) -> Result<()> {
        let _ = self.shutdown_tx.send(());
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(%uri, version = params.text_document.version, "document opened");
        let document = Document::new(
            uri.clone(),
            params.text_document.text,
            params.text_document.version,
        );
        self.documents.write().await.insert(uri, document);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;
        let mut documents = self.documents.write().await;
        match documents.get_mut(&uri) {
            Some(document) => {
                document.apply_content_changes(&params.content_changes, version);
            }
            None => warn!(%uri, "change for unopened document"),
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(%uri, "document closed");
        self.documents.write().await.remove(&uri);
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        for change in params.changes {
            let Ok(path) = change.uri.to_file_path() else {
                continue;
            };
            let kind = if change.typ == FileChangeType::CREATED {
                ChangeKind::Added
            } else if change.typ == FileChangeType::CHANGED {
                ChangeKind::Modified
            } else if change.typ == FileChangeType::DELETED {
                ChangeKind::Deleted
            } else {
                continue;
            };
            self.tracker.mark(path, kind);
        }
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;

        let mut documents = self.documents.write().await;
        let Some(document) = documents.get_mut(&uri) else {
            return Ok(None);
        };
        let offset = document.offset_at(position);

        // Project-facing failures degrade to an empty list; never crash the
        // session over a completion request.
        let assist = self.assist.read().await;
        let items = match assist.as_ref() {
            Some(processor) => processor.compute_completion(document, offset),
            None => Vec::new(),
        };
        Ok(Some(CompletionResponse::Array(items)))
    }
}
