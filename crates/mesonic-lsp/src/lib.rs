#![doc = include_str!("../README.md")]

//! Language Server Protocol implementation for Meson build scripts.
//!
//! Parses `meson.build` documents on every change, publishes parse
//! diagnostics, and serves `textDocument/codeAction` requests from the
//! recognizers in [`code_actions`].

use std::collections::HashMap;
use std::sync::RwLock;

use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer};

use mesonic_syntax::ast::SyntaxTree;
use mesonic_syntax::errors::ParseError;

pub mod code_actions;
pub mod functions;
mod utils;

use code_actions::collect_code_actions;
use functions::ProjectIndex;
use utils::{apply_incremental_change, offset_to_range};

// ---------------------------------------------------------------------------
// Document state
// ---------------------------------------------------------------------------

struct DocumentState {
    source: String,
    #[allow(dead_code)]
    version: i32,
    /// Cached successful parse result.
    parsed: Option<SyntaxTree>,
}

// ---------------------------------------------------------------------------
// Backend
// ---------------------------------------------------------------------------

/// LSP backend implementation for `meson.build` files.
pub struct MesonicLspBackend {
    client: Client,
    documents: RwLock<HashMap<Url, DocumentState>>,
    index: ProjectIndex,
}

impl MesonicLspBackend {
    /// Construct a new backend bound to the given LSP client, with the
    /// builtin function index.
    pub fn new(client: Client) -> Self {
        Self {
            client,
            documents: RwLock::new(HashMap::new()),
            index: ProjectIndex::builtin(),
        }
    }

    /// Run diagnostics and cache the parse result.
    fn diagnose_and_cache(&self, uri: &Url, text: &str) -> Vec<Diagnostic> {
        let filename = uri
            .path_segments()
            .and_then(|mut s| s.next_back())
            .unwrap_or("meson.build");

        let mut diagnostics = Vec::new();

        match mesonic_syntax::parse(text, filename) {
            Ok(tree) => {
                for id in tree.error_nodes() {
                    let span = tree.span(id);
                    let message = match tree.kind(id) {
                        mesonic_syntax::ast::NodeKind::ErrorNode { message } => message.clone(),
                        _ => continue,
                    };
                    diagnostics.push(Diagnostic {
                        range: offset_to_range(text, span.start, span.end),
                        severity: Some(DiagnosticSeverity::ERROR),
                        source: Some("mesonic".into()),
                        code: Some(NumberOrString::String(
                            "mesonic::parse::error_node".into(),
                        )),
                        message,
                        ..Default::default()
                    });
                }
                if let Ok(mut docs) = self.documents.write() {
                    if let Some(state) = docs.get_mut(uri) {
                        state.parsed = Some(tree);
                    }
                }
            }
            Err(e) => {
                diagnostics.push(parse_error_diagnostic(&e, text));
                // Clear cached parse
                if let Ok(mut docs) = self.documents.write() {
                    if let Some(state) = docs.get_mut(uri) {
                        state.parsed = None;
                    }
                }
            }
        }

        diagnostics
    }
}

fn parse_error_diagnostic(err: &ParseError, text: &str) -> Diagnostic {
    let span = err.span();
    Diagnostic {
        range: offset_to_range(text, span.start, span.end),
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some("mesonic".into()),
        code: Some(NumberOrString::String("mesonic::parse::syntax".into())),
        message: format!("{err}"),
        ..Default::default()
    }
}

// ---------------------------------------------------------------------------
// LanguageServer implementation
// ---------------------------------------------------------------------------

#[tower_lsp::async_trait]
impl LanguageServer for MesonicLspBackend {
    async fn initialize(&self, _: InitializeParams) -> Result<InitializeResult> {
        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
                ..Default::default()
            },
            ..Default::default()
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        tracing::info!("mesonic-lsp initialized");
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let text = params.text_document.text.clone();
        let version = params.text_document.version;
        {
            let Ok(mut docs) = self.documents.write() else {
                return;
            };
            docs.insert(
                uri.clone(),
                DocumentState {
                    source: text.clone(),
                    version,
                    parsed: None,
                },
            );
        }
        let diags = self.diagnose_and_cache(&uri, &text);
        self.client.publish_diagnostics(uri, diags, None).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri.clone();
        let version = params.text_document.version;

        let text = {
            let Ok(mut docs) = self.documents.write() else {
                return;
            };
            let state = docs.entry(uri.clone()).or_insert_with(|| DocumentState {
                source: String::new(),
                version,
                parsed: None,
            });

            for change in &params.content_changes {
                if let Some(range) = change.range {
                    apply_incremental_change(&mut state.source, &range, &change.text);
                } else {
                    // Full replacement
                    state.source = change.text.clone();
                }
            }
            state.version = version;
            state.source.clone()
        };

        let diags = self.diagnose_and_cache(&uri, &text);
        self.client.publish_diagnostics(uri, diags, None).await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        {
            if let Ok(mut docs) = self.documents.write() {
                docs.remove(&uri);
            }
        }
        self.client.publish_diagnostics(uri, vec![], None).await;
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = &params.text_document.uri;

        let Ok(docs) = self.documents.read() else {
            return Ok(None);
        };
        let state = match docs.get(uri) {
            Some(s) => s,
            None => return Ok(None),
        };
        let tree = match &state.parsed {
            Some(t) => t,
            None => return Ok(None),
        };

        let actions = collect_code_actions(params.range, uri, &self.index, tree)
            .map_err(|e| tower_lsp::jsonrpc::Error::invalid_params(e.to_string()))?;

        if actions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(
                actions
                    .into_iter()
                    .map(CodeActionOrCommand::CodeAction)
                    .collect(),
            ))
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_error_diagnostic_carries_syntax_code() {
        let text = "x = ";
        let err = mesonic_syntax::parse(text, "meson.build").unwrap_err();
        let diag = parse_error_diagnostic(&err, text);
        assert_eq!(diag.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(
            diag.code,
            Some(NumberOrString::String("mesonic::parse::syntax".into()))
        );
        assert!(diag.message.starts_with("Syntax error:"));
    }

    #[test]
    fn advertised_capabilities_include_code_actions() {
        let caps = ServerCapabilities {
            text_document_sync: Some(TextDocumentSyncCapability::Kind(
                TextDocumentSyncKind::INCREMENTAL,
            )),
            code_action_provider: Some(CodeActionProviderCapability::Simple(true)),
            ..Default::default()
        };
        assert!(caps.code_action_provider.is_some());
        assert!(matches!(
            caps.text_document_sync,
            Some(TextDocumentSyncCapability::Kind(
                TextDocumentSyncKind::INCREMENTAL
            ))
        ));
    }
}
