//! Shared test utilities and fixtures
//!
//! An in-process fake language server speaking the framed protocol over
//! `tokio::io::duplex` pipes.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, DuplexStream, duplex};
use tokio::task::JoinHandle;

use sonar_lsp::codec::{FrameDecoder, FrameWriter};
use sonar_lsp::{LanguageClient, Message, RequestId, ResponseError, SessionOptions};

/// Raw end of a duplex connection, as seen by a server.
pub struct Peer {
    decoder: FrameDecoder,
    queued: VecDeque<Message>,
    reader: DuplexStream,
    writer: FrameWriter<DuplexStream>,
}

impl Peer {
    /// Next message from the client, or `None` once it hangs up.
    pub async fn next_message(&mut self) -> Option<Message> {
        let mut buf = [0u8; 8192];
        loop {
            if let Some(message) = self.queued.pop_front() {
                return Some(message);
            }
            let n = self.reader.read(&mut buf).await.ok()?;
            if n == 0 {
                return None;
            }
            self.queued.extend(self.decoder.feed(&buf[..n]));
        }
    }

    pub async fn send(&mut self, message: Message) {
        let _ = self.writer.write_message(&message).await;
    }

    pub async fn reply(&mut self, id: RequestId, result: Value) {
        self.send(Message::Response {
            id,
            outcome: Ok(result),
        })
        .await;
    }

    /// Answer `initialize` with `capabilities` and swallow `initialized`.
    pub async fn accept_handshake(&mut self, capabilities: Value) {
        let Some(Message::Request { id, method, .. }) = self.next_message().await else {
            panic!("expected initialize request");
        };
        assert_eq!(method, "initialize");
        self.reply(id, json!({ "capabilities": capabilities })).await;
        let Some(Message::Notification { method, .. }) = self.next_message().await else {
            panic!("expected initialized notification");
        };
        assert_eq!(method, "initialized");
    }
}

/// Client-side reader/writer halves plus the server's `Peer`.
pub fn pipes() -> (DuplexStream, DuplexStream, Peer) {
    let (client_read, server_write) = duplex(256 * 1024);
    let (server_read, client_write) = duplex(256 * 1024);
    let peer = Peer {
        decoder: FrameDecoder::new(),
        queued: VecDeque::new(),
        reader: server_read,
        writer: FrameWriter::new(server_write),
    };
    (client_read, client_write, peer)
}

pub fn fast_options() -> SessionOptions {
    SessionOptions {
        init_timeout: Duration::from_secs(5),
        request_timeout: Duration::from_secs(2),
        shutdown_grace: Duration::from_millis(200),
    }
}

/// Scripted answers keyed by document URI and position.
#[derive(Debug, Clone)]
pub struct Script {
    pub capabilities: Value,
    pub symbols: HashMap<String, Value>,
    pub references: HashMap<(String, u32, u32), Value>,
    pub hover: HashMap<(String, u32, u32), String>,
    /// Hang up after this many post-handshake requests.
    pub crash_after: Option<usize>,
    /// Publish one diagnostic per opened document.
    pub publish_diagnostics: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            capabilities: json!({
                "documentSymbolProvider": true,
                "referencesProvider": true,
                "hoverProvider": true,
            }),
            symbols: HashMap::new(),
            references: HashMap::new(),
            hover: HashMap::new(),
            crash_after: None,
            publish_diagnostics: false,
        }
    }
}

impl Script {
    pub fn symbols(&mut self, uri: &str, symbols: Vec<Value>) -> &mut Self {
        self.symbols.insert(uri.to_string(), Value::Array(symbols));
        self
    }

    pub fn references(&mut self, uri: &str, at: (u32, u32), locations: Vec<Value>) -> &mut Self {
        self.references
            .insert((uri.to_string(), at.0, at.1), Value::Array(locations));
        self
    }

    pub fn hover(&mut self, uri: &str, at: (u32, u32), text: &str) -> &mut Self {
        self.hover
            .insert((uri.to_string(), at.0, at.1), text.to_string());
        self
    }
}

/// What the fake server saw.
#[derive(Debug, Default, Clone)]
pub struct ServerLog {
    pub requests: Vec<String>,
    pub notifications: Vec<String>,
    pub opened: Vec<String>,
}

pub type SharedLog = Arc<Mutex<ServerLog>>;

/// Start a fake server and connect a client to it.
pub async fn start(script: Script, root: &Path) -> (LanguageClient, SharedLog, JoinHandle<()>) {
    let (reader, writer, peer) = pipes();
    let log = SharedLog::default();
    let server = tokio::spawn(serve(peer, script, Arc::clone(&log)));
    let client = LanguageClient::connect(reader, writer, root, fast_options())
        .await
        .unwrap();
    (client, log, server)
}

async fn serve(mut peer: Peer, script: Script, log: SharedLog) {
    peer.accept_handshake(script.capabilities.clone()).await;

    let mut served = 0usize;
    while let Some(message) = peer.next_message().await {
        match message {
            Message::Request { id, method, params } => {
                log.lock().unwrap().requests.push(method.clone());
                if method == "shutdown" {
                    peer.reply(id, Value::Null).await;
                    continue;
                }
                if script.crash_after.is_some_and(|limit| served >= limit) {
                    return;
                }
                served += 1;
                let params = params.unwrap_or(Value::Null);
                let outcome = answer(&script, &method, &params);
                peer.send(Message::Response { id, outcome }).await;
            }
            Message::Notification { method, params } => {
                log.lock().unwrap().notifications.push(method.clone());
                match method.as_str() {
                    "exit" => return,
                    "textDocument/didOpen" => {
                        let uri = params
                            .as_ref()
                            .and_then(|p| p["textDocument"]["uri"].as_str())
                            .unwrap_or_default()
                            .to_string();
                        log.lock().unwrap().opened.push(uri.clone());
                        if script.publish_diagnostics {
                            peer.send(Message::notification(
                                "textDocument/publishDiagnostics",
                                Some(json!({
                                    "uri": uri,
                                    "diagnostics": [{ "message": "fake", "range": range(0, 0, 0, 1) }],
                                })),
                            ))
                            .await;
                        }
                    }
                    _ => {}
                }
            }
            Message::Response { .. } => {}
        }
    }
}

fn answer(script: &Script, method: &str, params: &Value) -> Result<Value, ResponseError> {
    let uri = params["textDocument"]["uri"].as_str().unwrap_or_default().to_string();
    let at = || {
        (
            params["position"]["line"].as_u64().unwrap_or_default() as u32,
            params["position"]["character"].as_u64().unwrap_or_default() as u32,
        )
    };
    match method {
        "textDocument/documentSymbol" => Ok(script.symbols.get(&uri).cloned().unwrap_or(json!([]))),
        "textDocument/references" => {
            let (line, character) = at();
            Ok(script
                .references
                .get(&(uri, line, character))
                .cloned()
                .unwrap_or(json!([])))
        }
        "textDocument/hover" => {
            let (line, character) = at();
            Ok(script
                .hover
                .get(&(uri, line, character))
                .map_or(Value::Null, |text| {
                    json!({ "contents": { "kind": "markdown", "value": format!("```typescript\n{text}\n```") } })
                }))
        }
        other => Err(ResponseError {
            code: -32601,
            message: format!("Method not found: {other}"),
            data: None,
        }),
    }
}

pub fn range(start_line: u32, start_char: u32, end_line: u32, end_char: u32) -> Value {
    json!({
        "start": { "line": start_line, "character": start_char },
        "end": { "line": end_line, "character": end_char },
    })
}

/// A hierarchical `DocumentSymbol` spanning `line..=end_line` whose name
/// starts at `name_char` on `line`.
pub fn symbol(name: &str, kind: u64, line: u32, end_line: u32, name_char: u32) -> Value {
    json!({
        "name": name,
        "kind": kind,
        "range": range(line, 0, end_line, 1),
        "selectionRange": range(line, name_char, line, name_char + name.len() as u32),
        "children": [],
    })
}

pub fn location(uri: &str, line: u32, character: u32) -> Value {
    json!({ "uri": uri, "range": range(line, character, line, character + 1) })
}

/// LSP `SymbolKind` numbers used by the fixtures.
pub mod kind {
    pub const CLASS: u64 = 5;
    pub const METHOD: u64 = 6;
    pub const INTERFACE: u64 = 11;
    pub const FUNCTION: u64 = 12;
}

/// Write `files` under a fresh, canonicalized temporary project root.
pub fn project(files: &[(&str, &str)]) -> (tempfile::TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let root = fs::canonicalize(dir.path()).unwrap();
    for (name, text) in files {
        let path = root.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, text).unwrap();
    }
    (dir, root)
}

pub fn uri_of(root: &Path, name: &str) -> String {
    sonar_lsp::path_to_file_uri(&root.join(name))
        .unwrap()
        .to_string()
}
