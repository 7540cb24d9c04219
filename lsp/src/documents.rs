//! Open-document registry.
//!
//! Tracks which URIs the server has been told about so queries are only
//! issued against open documents and every open is eventually paired with a
//! close.

use std::collections::HashMap;

use crate::error::SessionError;
use crate::protocol;
use crate::session::Session;

/// Open URIs and the version last sent for each.
#[derive(Debug, Default)]
pub struct DocumentRegistry {
    open: HashMap<String, i32>,
}

impl DocumentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Send `didOpen` and record the document.
    ///
    /// Opening an already-open URI re-sends the text with the version bumped.
    pub fn open(
        &mut self,
        session: &Session,
        uri: &str,
        language_id: &str,
        text: String,
    ) -> Result<(), SessionError> {
        let version = self.open.get(uri).map_or(1, |version| version + 1);
        session.notify(
            "textDocument/didOpen",
            Some(protocol::did_open_params(uri, language_id, version, &text)),
        )?;
        tracing::debug!(uri, version, "Opened document");
        self.open.insert(uri.to_string(), version);
        Ok(())
    }

    /// Send `didClose` and forget the document. Unknown URIs are a no-op.
    pub fn close(&mut self, session: &Session, uri: &str) -> Result<(), SessionError> {
        if self.open.remove(uri).is_none() {
            return Ok(());
        }
        tracing::debug!(uri, "Closed document");
        session.notify(
            "textDocument/didClose",
            Some(protocol::did_close_params(uri)),
        )
    }

    #[must_use]
    pub fn is_open(&self, uri: &str) -> bool {
        self.open.contains_key(uri)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.open.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.open.is_empty()
    }

    /// URIs currently open, sorted.
    #[must_use]
    pub fn uris(&self) -> Vec<String> {
        let mut uris: Vec<String> = self.open.keys().cloned().collect();
        uris.sort();
        uris
    }
}
