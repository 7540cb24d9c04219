//! Typed queries over an open session.
//!
//! Every query degrades to an empty result: a timeout, a server error, a
//! missing capability or a closed document all produce `[]`/`None` so one bad
//! file never aborts a batch run.

use std::time::Duration;

use serde_json::Value;

use crate::documents::DocumentRegistry;
use crate::protocol;
use crate::session::Session;
use crate::types::{DocumentSymbolNode, Location, Position};

/// Borrowed view over a session and its open documents.
#[derive(Clone, Copy)]
pub struct QueryFacade<'a> {
    session: &'a Session,
    documents: &'a DocumentRegistry,
    timeout: Duration,
}

impl<'a> QueryFacade<'a> {
    #[must_use]
    pub fn new(session: &'a Session, documents: &'a DocumentRegistry) -> Self {
        Self {
            session,
            documents,
            timeout: session.options().request_timeout,
        }
    }

    /// Override the per-query timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Document outline via `textDocument/documentSymbol`.
    pub async fn outline(&self, uri: &str) -> Vec<DocumentSymbolNode> {
        if !self.session.capabilities().document_symbol {
            return Vec::new();
        }
        self.send(
            uri,
            "textDocument/documentSymbol",
            protocol::document_symbol_params(uri),
        )
        .await
        .map(protocol::parse_document_symbols)
        .unwrap_or_default()
    }

    /// Reference locations for the symbol at `position`.
    pub async fn references(
        &self,
        uri: &str,
        position: Position,
        include_declaration: bool,
    ) -> Vec<Location> {
        if !self.session.capabilities().references {
            return Vec::new();
        }
        self.send(
            uri,
            "textDocument/references",
            protocol::reference_params(uri, position, include_declaration),
        )
        .await
        .map(protocol::parse_locations)
        .unwrap_or_default()
    }

    /// Plain hover text at `position`, code fences stripped.
    pub async fn hover_text(&self, uri: &str, position: Position) -> Option<String> {
        if !self.session.capabilities().hover {
            return None;
        }
        let result = self
            .send(
                uri,
                "textDocument/hover",
                protocol::text_document_position_params(uri, position),
            )
            .await?;
        protocol::parse_hover_text(&result)
    }

    async fn send(&self, uri: &str, method: &str, params: Value) -> Option<Value> {
        if !self.documents.is_open(uri) {
            tracing::debug!(uri, method, "Skipping query for document that is not open");
            return None;
        }
        match self.session.request(method, Some(params), self.timeout).await {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::debug!(uri, method, "LSP query failed: {e}");
                None
            }
        }
    }
}
