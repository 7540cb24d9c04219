//! LSP client: framed JSON-RPC over a child process's stdio.

pub mod codec;
pub mod protocol;
pub mod types;

mod client;
mod documents;
mod error;
mod query;
mod session;

pub use client::LanguageClient;
pub use documents::DocumentRegistry;
pub use error::SessionError;
pub use protocol::{Message, RequestId, ResponseError, file_uri_to_path, path_to_file_uri};
pub use query::QueryFacade;
pub use session::{Notification, Session};
pub use types::{
    DocumentSymbolNode, Location, Position, Range, ServerCapabilities, ServerConfig,
    SessionOptions, SpawnSpec, SymbolKind,
};
