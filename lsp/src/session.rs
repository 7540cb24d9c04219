//! Transport session: owns a child process and manages the LSP lifecycle.
//!
//! A reader task pumps the child's stdout through [`FrameDecoder`] and routes
//! each message: responses to the waiting caller (by id), notifications to the
//! registered handlers (in wire order), server requests to an automatic reply.
//! A writer task serializes outbound frames onto stdin.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError};
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::codec::{FrameDecoder, FrameWriter};
use crate::error::SessionError;
use crate::protocol::{self, METHOD_NOT_FOUND, Message, RequestId, ResponseError};
use crate::types::{ServerCapabilities, SessionOptions, SpawnSpec};

const READ_CHUNK_BYTES: usize = 16 * 1024;

/// An inbound notification delivered to handlers.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub method: String,
    pub params: Option<Value>,
}

type Waiter = oneshot::Sender<Result<Value, SessionError>>;

type Handler = Arc<dyn Fn(&Notification) + Send + Sync>;

type HandlerList = Arc<std::sync::Mutex<Vec<Handler>>>;

enum WriterCommand {
    Send(Message),
    Shutdown,
}

/// Outstanding requests plus the id counter.
///
/// Both live behind one lock so id allocation and registration are atomic
/// with respect to each other.
#[derive(Default)]
struct PendingRequests {
    next_id: i64,
    waiters: HashMap<i64, Waiter>,
    closed: bool,
}

impl PendingRequests {
    fn register(&mut self) -> Result<(i64, oneshot::Receiver<Result<Value, SessionError>>), SessionError> {
        if self.closed {
            return Err(SessionError::ProcessExited);
        }
        self.next_id += 1;
        let id = self.next_id;
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id, tx);
        Ok((id, rx))
    }

    /// Fail every outstanding request and refuse new ones.
    fn close(&mut self) {
        self.closed = true;
        for (_, waiter) in self.waiters.drain() {
            let _ = waiter.send(Err(SessionError::ProcessExited));
        }
    }
}

/// A live connection to a language server.
pub struct Session {
    child: Option<Child>,
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
    pending: Arc<Mutex<PendingRequests>>,
    handlers: HandlerList,
    exited: Arc<AtomicBool>,
    ready: bool,
    capabilities: ServerCapabilities,
    options: SessionOptions,
    reader_handle: JoinHandle<()>,
    writer_handle: JoinHandle<()>,
}

impl Session {
    /// Spawn the server described by `spec` and complete the handshake.
    pub async fn start(spec: &SpawnSpec, options: SessionOptions) -> Result<Self, SessionError> {
        let command = spec.server.command();
        let resolved_cmd =
            which::which(command).map_err(|e| SessionError::ProcessSpawnFailed {
                command: command.to_string(),
                reason: format!("not found in PATH: {e}"),
            })?;

        let mut cmd = Command::new(&resolved_cmd);
        cmd.args(spec.server.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if spec.workspace_root.is_dir() {
            cmd.current_dir(&spec.workspace_root);
        }

        let mut child = cmd.spawn().map_err(|e| SessionError::ProcessSpawnFailed {
            command: command.to_string(),
            reason: e.to_string(),
        })?;

        let (Some(stdout), Some(stdin)) = (child.stdout.take(), child.stdin.take()) else {
            return Err(SessionError::ProcessSpawnFailed {
                command: command.to_string(),
                reason: "child has no stdio pipes".to_string(),
            });
        };

        tracing::info!(command = %resolved_cmd.display(), "Spawned language server");

        let mut session = Self::connect(stdout, stdin, options);
        session.child = Some(child);
        session
            .handshake(
                &spec.workspace_root,
                spec.server.initialization_options.as_ref(),
            )
            .await?;
        Ok(session)
    }

    /// Wire a session over an arbitrary byte stream pair.
    ///
    /// The session is not ready until [`Session::handshake`] succeeds.
    pub fn connect<R, W>(reader: R, writer: W, options: SessionOptions) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending = Arc::new(Mutex::new(PendingRequests::default()));
        let handlers: HandlerList = Arc::new(std::sync::Mutex::new(Vec::new()));
        let exited = Arc::new(AtomicBool::new(false));

        let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<WriterCommand>();
        let writer_handle = tokio::spawn(async move {
            let mut writer = FrameWriter::new(writer);
            while let Some(cmd) = writer_rx.recv().await {
                match cmd {
                    WriterCommand::Send(message) => {
                        if let Err(e) = writer.write_message(&message).await {
                            tracing::warn!("LSP write error: {e}");
                            break;
                        }
                    }
                    WriterCommand::Shutdown => break,
                }
            }
        });

        let reader_handle = tokio::spawn(pump(
            reader,
            pending.clone(),
            handlers.clone(),
            writer_tx.clone(),
            exited.clone(),
        ));

        Self {
            child: None,
            writer_tx,
            pending,
            handlers,
            exited,
            ready: false,
            capabilities: ServerCapabilities::all(),
            options,
            reader_handle,
            writer_handle,
        }
    }

    /// Run the two-step handshake: `initialize` request, then `initialized`.
    pub async fn handshake(
        &mut self,
        workspace_root: &Path,
        initialization_options: Option<&Value>,
    ) -> Result<ServerCapabilities, SessionError> {
        let root_uri = protocol::path_to_file_uri(workspace_root)
            .map_err(|e| SessionError::HandshakeFailed(e.to_string()))?;

        let params = protocol::initialize_params(root_uri.as_str(), initialization_options);
        let result = self
            .call("initialize", Some(params), self.options.init_timeout)
            .await
            .map_err(|e| SessionError::HandshakeFailed(e.to_string()))?;

        self.capabilities = ServerCapabilities::from_initialize_result(&result);
        self.notify("initialized", Some(serde_json::json!({})))
            .map_err(|e| SessionError::HandshakeFailed(e.to_string()))?;
        self.ready = true;

        tracing::info!(capabilities = ?self.capabilities, "Language server initialized");
        Ok(self.capabilities)
    }

    /// Send a request and wait for its correlated response.
    ///
    /// May be called concurrently; responses are matched by id, not arrival
    /// order.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, SessionError> {
        if !self.ready {
            return Err(SessionError::NotStarted);
        }
        self.call(method, params, timeout).await
    }

    async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, SessionError> {
        let (id, rx) = self.pending.lock().await.register()?;

        let request = Message::request(id, method, params);
        if self.writer_tx.send(WriterCommand::Send(request)).is_err() {
            // Don't leak the pending entry if the writer is gone.
            self.pending.lock().await.waiters.remove(&id);
            return Err(SessionError::ProcessExited);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(outcome)) => outcome,
            // Waiter dropped without an answer: the pump is gone.
            Ok(Err(_)) => Err(SessionError::ProcessExited),
            Err(_) => {
                // Remove the entry so a late response is dropped as unknown.
                self.pending.lock().await.waiters.remove(&id);
                tracing::debug!(id, method, "LSP request timed out");
                Err(SessionError::Timeout {
                    method: method.to_string(),
                    timeout,
                })
            }
        }
    }

    /// Queue a notification. Never waits for the server.
    pub fn notify(&self, method: &str, params: Option<Value>) -> Result<(), SessionError> {
        self.writer_tx
            .send(WriterCommand::Send(Message::notification(method, params)))
            .map_err(|_| SessionError::ProcessExited)
    }

    /// Register a handler for inbound notifications.
    ///
    /// Handlers run on the reader task in arrival order and must not block.
    /// A panicking handler is logged and does not stop delivery.
    pub fn on_notification<F>(&self, handler: F)
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(handler));
    }

    #[must_use]
    pub fn capabilities(&self) -> ServerCapabilities {
        self.capabilities
    }

    #[must_use]
    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether the server's output stream has ended.
    #[must_use]
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::SeqCst)
    }

    /// Gracefully shut down the server. Consumes self.
    ///
    /// Sends `shutdown` and `exit`, waits up to the grace period for the
    /// process, then kills it.
    pub async fn stop(mut self) {
        let grace = self.options.shutdown_grace;
        if self.ready && !self.has_exited() {
            if let Err(e) = self.call("shutdown", None, grace).await {
                tracing::debug!("LSP shutdown request failed: {e}");
            }
            let _ = self.notify("exit", None);
        }

        let _ = self.writer_tx.send(WriterCommand::Shutdown);
        self.pending.lock().await.close();

        if let Some(mut child) = self.child.take() {
            match tokio::time::timeout(grace, child.wait()).await {
                Ok(_) => tracing::info!("Language server exited"),
                Err(_) => {
                    tracing::debug!("Language server didn't exit in time, killing");
                    if let Err(e) = child.kill().await {
                        tracing::debug!("Failed to kill language server: {e}");
                    }
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.reader_handle.abort();
        self.writer_handle.abort();
    }
}

async fn pump<R>(
    mut reader: R,
    pending: Arc<Mutex<PendingRequests>>,
    handlers: HandlerList,
    writer_tx: mpsc::UnboundedSender<WriterCommand>,
    exited: Arc<AtomicBool>,
) where
    R: AsyncRead + Unpin,
{
    let mut decoder = FrameDecoder::new();
    let mut chunk = vec![0u8; READ_CHUNK_BYTES];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => {
                tracing::info!("Language server closed stdout");
                break;
            }
            Ok(n) => {
                for message in decoder.feed(&chunk[..n]) {
                    dispatch(message, &pending, &handlers, &writer_tx).await;
                }
            }
            Err(e) => {
                tracing::warn!("LSP reader error: {e}");
                break;
            }
        }
    }

    exited.store(true, Ordering::SeqCst);
    pending.lock().await.close();
}

async fn dispatch(
    message: Message,
    pending: &Mutex<PendingRequests>,
    handlers: &HandlerList,
    writer_tx: &mpsc::UnboundedSender<WriterCommand>,
) {
    match message {
        Message::Response { id, outcome } => {
            let waiter = match id {
                RequestId::Int(id) => pending.lock().await.waiters.remove(&id),
                RequestId::Str(_) => None,
            };
            match waiter {
                Some(tx) => {
                    let _ = tx.send(outcome.map_err(|e| SessionError::RemoteError {
                        code: e.code,
                        message: e.message,
                    }));
                }
                None => tracing::trace!("Dropping response for unknown request id {id}"),
            }
        }
        Message::Request { id, method, params } => {
            tracing::debug!("LSP server sent request: {method}");
            let reply = Message::Response {
                id,
                outcome: server_request_outcome(&method, params.as_ref()),
            };
            let _ = writer_tx.send(WriterCommand::Send(reply));
        }
        Message::Notification { method, params } => {
            deliver(handlers, &Notification { method, params });
        }
    }
}

/// Many servers send registerCapability, workDoneProgress/create,
/// configuration, etc. We must respond or the server may block.
fn server_request_outcome(method: &str, params: Option<&Value>) -> Result<Value, ResponseError> {
    match method {
        "client/registerCapability"
        | "client/unregisterCapability"
        | "window/workDoneProgress/create"
        | "window/showMessageRequest" => Ok(Value::Null),
        "workspace/configuration" => {
            let items = params
                .and_then(|p| p.get("items"))
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            Ok(Value::Array(vec![Value::Null; items]))
        }
        _ => Err(ResponseError {
            code: METHOD_NOT_FOUND,
            message: format!("Method not found: {method}"),
            data: None,
        }),
    }
}

fn deliver(handlers: &HandlerList, notification: &Notification) {
    // Snapshot so a handler may register another handler without deadlocking.
    let snapshot: Vec<Handler> = handlers
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    for handler in snapshot {
        if catch_unwind(AssertUnwindSafe(|| handler(notification))).is_err() {
            tracing::warn!(
                method = %notification.method,
                "Notification handler panicked"
            );
        }
    }
}
