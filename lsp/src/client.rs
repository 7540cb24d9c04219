//! Language client: the single handle an analysis run drives.
//!
//! Composes a [`Session`], its [`DocumentRegistry`] and the [`QueryFacade`]
//! with the capability record negotiated at startup.

use std::path::Path;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::documents::DocumentRegistry;
use crate::error::SessionError;
use crate::query::QueryFacade;
use crate::session::{Notification, Session};
use crate::types::{
    DocumentSymbolNode, Location, Position, ServerCapabilities, SessionOptions, SpawnSpec,
};

pub struct LanguageClient {
    session: Session,
    documents: DocumentRegistry,
}

impl LanguageClient {
    /// Spawn the server and complete the handshake.
    pub async fn start(spec: &SpawnSpec, options: SessionOptions) -> Result<Self, SessionError> {
        let session = Session::start(spec, options).await?;
        Ok(Self::from_session(session))
    }

    /// Handshake over an already-connected byte stream pair.
    pub async fn connect<R, W>(
        reader: R,
        writer: W,
        workspace_root: &Path,
        options: SessionOptions,
    ) -> Result<Self, SessionError>
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut session = Session::connect(reader, writer, options);
        session.handshake(workspace_root, None).await?;
        Ok(Self::from_session(session))
    }

    fn from_session(session: Session) -> Self {
        Self {
            session,
            documents: DocumentRegistry::new(),
        }
    }

    pub fn open(&mut self, uri: &str, language_id: &str, text: String) -> Result<(), SessionError> {
        self.documents.open(&self.session, uri, language_id, text)
    }

    pub fn close(&mut self, uri: &str) -> Result<(), SessionError> {
        self.documents.close(&self.session, uri)
    }

    #[must_use]
    pub fn is_open(&self, uri: &str) -> bool {
        self.documents.is_open(uri)
    }

    #[must_use]
    pub fn query(&self) -> QueryFacade<'_> {
        QueryFacade::new(&self.session, &self.documents)
    }

    pub async fn outline(&self, uri: &str) -> Vec<DocumentSymbolNode> {
        self.query().outline(uri).await
    }

    pub async fn references(
        &self,
        uri: &str,
        position: Position,
        include_declaration: bool,
    ) -> Vec<Location> {
        self.query()
            .references(uri, position, include_declaration)
            .await
    }

    pub async fn hover_text(&self, uri: &str, position: Position) -> Option<String> {
        self.query().hover_text(uri, position).await
    }

    pub fn on_notification<F>(&self, handler: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.session.on_notification(handler);
    }

    #[must_use]
    pub fn capabilities(&self) -> ServerCapabilities {
        self.session.capabilities()
    }

    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.session.has_exited()
    }

    /// Close every open document, then stop the session.
    pub async fn stop(mut self) {
        for uri in self.documents.uris() {
            if let Err(e) = self.documents.close(&self.session, &uri) {
                tracing::debug!(uri, "Failed to close document during stop: {e}");
            }
        }
        self.session.stop().await;
    }
}
