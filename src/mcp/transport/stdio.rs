//! Stdio transport for MCP child-process servers
//!
//! This module implements [`StdioTransport`], which spawns a child process
//! and talks to it over its stdin/stdout pipes using newline-delimited JSON
//! framing.
//!
//! # Protocol
//!
//! - Outbound messages are written to the child's stdin as a single JSON
//!   object followed by a newline (`\n`).
//! - Inbound messages are read from the child's stdout through a line codec
//!   bounded at [`MAX_LINE_BYTES`].
//! - The child's stderr is logged via `tracing::debug!` and never treated as
//!   an error condition.
//!
//! # Single-flight worker
//!
//! One background task owns both pipes. Callers enqueue a call on its
//! mailbox together with a reply channel; the worker allocates the next id,
//! writes the request line, reads exactly one reply line, verifies the echoed
//! id and sends the mapped result back. The worker always finishes an
//! exchange even when the caller has stopped waiting, so an abandoned call
//! never leaves an unread reply in the pipe.
//!
//! EOF, an oversized line, a read or write failure, or an id mismatch stops
//! the worker. Every later call fails immediately with a transport error
//! naming the original cause.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, LinesCodec, LinesCodecError};
use tracing::debug;

use crate::error::{McpilotError, Result};
use crate::mcp::transport::{Transport, TransportKind};
use crate::mcp::types::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Largest accepted line on the server's stdout, in bytes.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

const MAILBOX_CAPACITY: usize = 32;
const LOG_TARGET: &str = "mcpilot::mcp::transport::stdio";

/// Work item handed to the stdio worker.
enum Call {
    Request {
        method: String,
        params: Option<serde_json::Value>,
        reply: oneshot::Sender<Result<serde_json::Value>>,
    },
    Notify {
        method: String,
        params: Option<serde_json::Value>,
        reply: oneshot::Sender<Result<()>>,
    },
}

/// Why an exchange failed.
enum Fault {
    /// The exchange failed but the pipe is still in sync.
    Frame(String),
    /// The pipe is unusable; the worker stops.
    Fatal(String),
}

/// Terminal failure recorded by the worker, shared with callers.
#[derive(Debug, Clone, Default)]
struct WorkerState(Arc<Mutex<Option<String>>>);

impl WorkerState {
    fn failure(&self) -> Option<String> {
        match self.0.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Records the first terminal failure; later ones are ignored.
    fn fail(&self, reason: impl Into<String>) {
        let mut guard = match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.is_none() {
            *guard = Some(reason.into());
        }
    }
}

/// Stdio-based MCP transport that drives a child process.
///
/// # Examples
///
/// ```no_run
/// use std::collections::HashMap;
/// use mcpilot::mcp::transport::stdio::StdioTransport;
/// use mcpilot::mcp::transport::Transport;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let transport = StdioTransport::spawn(
///     "./pgedge-mcp-server".into(),
///     vec![],
///     HashMap::new(),
///     None,
/// )?;
/// let tools = transport.request("tools/list", None).await?;
/// println!("{}", tools);
/// transport.close().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StdioTransport {
    mailbox: mpsc::Sender<Call>,
    state: WorkerState,
    worker: JoinHandle<()>,
    child: tokio::sync::Mutex<Option<Child>>,
}

impl StdioTransport {
    /// Spawn a child process and wire up its stdio pipes.
    ///
    /// The child inherits the parent environment with `env` applied on top.
    /// Its stderr is drained by a background task and logged at debug level.
    /// The child is killed when the transport is dropped.
    ///
    /// # Arguments
    ///
    /// * `executable` - Path to the server executable
    /// * `args` - Command-line arguments passed to the executable
    /// * `env` - Extra environment variables for the child
    /// * `working_dir` - Optional working directory for the child
    ///
    /// # Errors
    ///
    /// Returns [`McpilotError::McpTransport`] if the process cannot be
    /// spawned or its pipes are unavailable.
    pub fn spawn(
        executable: PathBuf,
        args: Vec<String>,
        env: HashMap<String, String>,
        working_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let mut cmd = Command::new(&executable);
        cmd.args(&args)
            .envs(&env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|e| {
            McpilotError::McpTransport(format!(
                "failed to spawn MCP server `{}`: {}",
                executable.display(),
                e
            ))
        })?;

        let stdin = child.stdin.take().ok_or_else(|| {
            McpilotError::McpTransport("child stdin unavailable after spawn".into())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpilotError::McpTransport("child stdout unavailable after spawn".into())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            McpilotError::McpTransport("child stderr unavailable after spawn".into())
        })?;

        tokio::spawn(forward_stderr(stderr));

        debug!(
            target: LOG_TARGET,
            "spawned MCP server `{}` (pid {:?})",
            executable.display(),
            child.id()
        );

        Ok(Self::start(stdout, stdin, Some(child)))
    }

    /// Build a transport over arbitrary pipes without a child process.
    ///
    /// `reader` plays the role of the server's stdout and `writer` the role
    /// of its stdin. Must be called from within a Tokio runtime.
    pub fn from_pipes<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::start(reader, writer, None)
    }

    fn start<R, W>(reader: R, writer: W, child: Option<Child>) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (mailbox, inbox) = mpsc::channel(MAILBOX_CAPACITY);
        let state = WorkerState::default();
        let lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
        let worker = tokio::spawn(run_worker(lines, writer, inbox, state.clone()));

        Self {
            mailbox,
            state,
            worker,
            child: tokio::sync::Mutex::new(child),
        }
    }

    fn unavailable(&self) -> anyhow::Error {
        let reason = self
            .state
            .failure()
            .unwrap_or_else(|| "worker stopped".to_string());
        McpilotError::McpTransport(format!("stdio transport unavailable: {}", reason)).into()
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.state.failure().is_some() {
            return Err(self.unavailable());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Transport for StdioTransport {
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        self.ensure_alive()?;
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(Call::Request {
                method: method.to_string(),
                params,
                reply,
            })
            .await
            .map_err(|_| self.unavailable())?;
        response.await.map_err(|_| self.unavailable())?
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<()> {
        self.ensure_alive()?;
        let (reply, response) = oneshot::channel();
        self.mailbox
            .send(Call::Notify {
                method: method.to_string(),
                params,
                reply,
            })
            .await
            .map_err(|_| self.unavailable())?;
        response.await.map_err(|_| self.unavailable())?
    }

    /// Stops the worker, then kills the child and waits for it to exit.
    async fn close(&self) -> Result<()> {
        self.state.fail("transport closed");
        self.worker.abort();

        let mut child = self.child.lock().await;
        if let Some(mut child) = child.take() {
            if let Err(e) = child.kill().await {
                debug!(target: LOG_TARGET, "MCP server already gone: {}", e);
            }
        }
        Ok(())
    }

    fn kind(&self) -> TransportKind {
        TransportKind::Stdio
    }
}

impl Drop for StdioTransport {
    fn drop(&mut self) {
        // The child itself is reaped by `kill_on_drop`.
        self.worker.abort();
    }
}

async fn run_worker<R, W>(
    mut lines: FramedRead<R, LinesCodec>,
    mut writer: W,
    mut inbox: mpsc::Receiver<Call>,
    state: WorkerState,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut next_id: u64 = 0;

    while let Some(call) = inbox.recv().await {
        let alive = match call {
            Call::Notify {
                method,
                params,
                reply,
            } => {
                let outcome = match serde_json::to_string(&JsonRpcNotification::new(method, params))
                {
                    Ok(line) => write_line(&mut writer, &line)
                        .await
                        .map(Ok)
                        .map_err(Fault::Fatal),
                    Err(e) => Err(Fault::Frame(format!("failed to encode notification: {}", e))),
                };
                settle(reply, outcome, &state)
            }
            Call::Request {
                method,
                params,
                reply,
            } => {
                next_id += 1;
                let outcome = exchange(&mut lines, &mut writer, next_id, &method, params)
                    .await
                    .map(|response| response.into_result().map_err(anyhow::Error::from));
                settle(reply, outcome, &state)
            }
        };
        if !alive {
            break;
        }
    }

    debug!(target: LOG_TARGET, "stdio worker stopped");
}

/// Hands an outcome to its caller, who may have stopped waiting. Returns
/// false when the worker must stop.
fn settle<T>(
    reply: oneshot::Sender<Result<T>>,
    outcome: std::result::Result<Result<T>, Fault>,
    state: &WorkerState,
) -> bool {
    let (result, alive) = match outcome {
        Ok(result) => (result, true),
        Err(Fault::Frame(reason)) => (Err(McpilotError::McpTransport(reason).into()), true),
        Err(Fault::Fatal(reason)) => {
            state.fail(reason.clone());
            (Err(McpilotError::McpTransport(reason).into()), false)
        }
    };
    let _ = reply.send(result);
    alive
}

/// Writes one request and reads its reply.
async fn exchange<R, W>(
    lines: &mut FramedRead<R, LinesCodec>,
    writer: &mut W,
    id: u64,
    method: &str,
    params: Option<serde_json::Value>,
) -> std::result::Result<JsonRpcResponse, Fault>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))
        .map_err(|e| Fault::Frame(format!("failed to encode request: {}", e)))?;
    write_line(writer, &line).await.map_err(Fault::Fatal)?;
    debug!(target: LOG_TARGET, "-> {} (id {})", method, id);

    loop {
        let line = match lines.next().await {
            None => return Err(Fault::Fatal("unexpected EOF".to_string())),
            Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                return Err(Fault::Fatal(format!(
                    "response line exceeds {} bytes",
                    MAX_LINE_BYTES
                )))
            }
            Some(Err(LinesCodecError::Io(e))) => {
                return Err(Fault::Fatal(format!("failed to read response: {}", e)))
            }
            Some(Ok(line)) => line,
        };

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let value: serde_json::Value = serde_json::from_str(trimmed)
            .map_err(|e| Fault::Frame(format!("malformed response: {}", e)))?;

        // Server-initiated notifications carry a method and no id.
        if value.get("id").is_none() && value.get("method").is_some() {
            debug!(target: LOG_TARGET, "skipping server notification: {}", trimmed);
            continue;
        }

        let response: JsonRpcResponse = serde_json::from_value(value)
            .map_err(|e| Fault::Frame(format!("malformed response: {}", e)))?;

        if !response.answers(id) {
            let echoed = response
                .id
                .as_ref()
                .map(|v| v.to_string())
                .unwrap_or_else(|| "none".to_string());
            return Err(Fault::Fatal(format!(
                "response id {} does not match request id {}",
                echoed, id
            )));
        }

        debug!(target: LOG_TARGET, "<- {} (id {})", method, id);
        return Ok(response);
    }
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::result::Result<(), String>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(line.as_bytes())
        .await
        .map_err(|e| format!("failed to write request: {}", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| format!("failed to write request: {}", e))?;
    writer
        .flush()
        .await
        .map_err(|e| format!("failed to flush request: {}", e))
}

async fn forward_stderr(stderr: ChildStderr) {
    let mut lines = FramedRead::new(stderr, LinesCodec::new_with_max_length(MAX_LINE_BYTES));
    while let Some(line) = lines.next().await {
        if let Ok(line) = line {
            debug!(target: LOG_TARGET, "mcp server stderr: {}", line);
        }
    }
}
