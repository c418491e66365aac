use super::framing::{encode_frame, read_frame};
use super::json_rpc::{self, Envelope, Incoming, Reply, RpcError, id_key};
use super::{InboundMessage, Transport};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use uuid::Uuid;

type ResponseHandlers = Arc<Mutex<HashMap<String, oneshot::Sender<Reply>>>>;
type Writer = Arc<tokio::sync::Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// SocketTransport speaks JSON-RPC with the RSP server over a byte stream.
///
/// Responses are matched to pending requests through a handler map; every
/// other inbound message (notifications and server-to-client requests) is
/// forwarded, in arrival order, to the channel handed to [`SocketTransport::new`].
///
/// # Example
///
/// ```no_run
/// use rsp_runner::transport::{SocketTransport, Transport};
/// use rsp_runner::error::Result;
/// use std::time::Duration;
/// use tokio::sync::mpsc;
///
/// #[tokio::main]
/// async fn main() -> Result<()> {
///     let (inbound_tx, mut inbound_rx) = mpsc::unbounded_channel();
///     let transport =
///         SocketTransport::connect("localhost", 27511, Duration::from_secs(60), inbound_tx).await?;
///
///     let handles = transport
///         .send_request("server/getServerHandles", serde_json::Value::Null)
///         .await?;
///     println!("Known servers: {}", handles);
///
///     while let Some(message) = inbound_rx.recv().await {
///         println!("Inbound: {:?}", message);
///     }
///     Ok(())
/// }
/// ```
pub struct SocketTransport {
    /// Peer description, for logs
    peer: String,
    /// Write half of the connection
    writer: Writer,
    /// Response handlers
    response_handlers: ResponseHandlers,
    /// Task handle for reading frames
    reader_task: Mutex<Option<JoinHandle<()>>>,
    /// Set once the reader stops; no response can arrive after that
    closed: Arc<AtomicBool>,
    /// Per-request timeout
    request_timeout: Duration,
}

impl SocketTransport {
    /// Connects to the RSP server listening on `host:port`.
    #[tracing::instrument(skip(request_timeout, inbound))]
    pub async fn connect(
        host: &str,
        port: u16,
        request_timeout: Duration,
        inbound: mpsc::UnboundedSender<InboundMessage>,
    ) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await.map_err(|e| {
            Error::Transport(format!("Failed to connect to {}:{}: {}", host, port, e))
        })?;
        stream.set_nodelay(true)?;
        tracing::info!("Connected to RSP server");

        let (read_half, write_half) = stream.into_split();
        Ok(Self::new(
            format!("{}:{}", host, port),
            read_half,
            write_half,
            request_timeout,
            inbound,
        ))
    }

    /// Creates a transport over an arbitrary reader/writer pair.
    ///
    /// This spawns the background task that reads frames and dispatches them.
    pub fn new<R, W>(
        peer: String,
        reader: R,
        writer: W,
        request_timeout: Duration,
        inbound: mpsc::UnboundedSender<InboundMessage>,
    ) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let response_handlers: ResponseHandlers = Arc::new(Mutex::new(HashMap::new()));
        let handlers = Arc::clone(&response_handlers);
        let closed = Arc::new(AtomicBool::new(false));
        let reader_closed = Arc::clone(&closed);
        let task_peer = peer.clone();

        let reader_task = tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            loop {
                let body = match read_frame(&mut reader).await {
                    Ok(Some(body)) => body,
                    Ok(None) => {
                        tracing::info!(peer = %task_peer, "RSP connection closed");
                        break;
                    }
                    Err(e) => {
                        tracing::error!(peer = %task_peer, error = %e, "Failed to read frame");
                        break;
                    }
                };

                let envelope = match serde_json::from_slice::<Envelope>(&body) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping frame that is not JSON-RPC");
                        continue;
                    }
                };

                let message = match envelope.classify() {
                    Some(Incoming::Response { id, reply }) => {
                        let Some(key) = id_key(&id) else {
                            tracing::warn!(id = %id, "Response with unsupported id type");
                            continue;
                        };
                        let sender = handlers.lock().ok().and_then(|mut h| h.remove(&key));
                        match sender {
                            Some(sender) => {
                                let _ = sender.send(reply);
                            }
                            None => tracing::debug!(id = %key, "Response for unknown request"),
                        }
                        continue;
                    }
                    Some(Incoming::Notification { method, params }) => {
                        InboundMessage::Notification { method, params }
                    }
                    Some(Incoming::Request { id, method, params }) => {
                        InboundMessage::Request { id, method, params }
                    }
                    None => {
                        tracing::warn!("Skipping frame with neither id nor method");
                        continue;
                    }
                };
                if inbound.send(message).is_err() {
                    tracing::debug!("Inbound receiver dropped, discarding message");
                }
            }

            // Dropping the senders wakes every pending request with an error
            reader_closed.store(true, Ordering::SeqCst);
            if let Ok(mut pending) = handlers.lock() {
                pending.clear();
            }
        });

        let writer: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        Self {
            peer,
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            response_handlers,
            reader_task: Mutex::new(Some(reader_task)),
            closed,
            request_timeout,
        }
    }

    /// Gets the peer this transport talks to.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Whether the connection has ended, either at the peer or through
    /// [`SocketTransport::close`].
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn write_message<T: serde::Serialize>(&self, message: &T) -> Result<()> {
        let body = serde_json::to_vec(message)
            .map_err(|e| Error::Serialization(format!("Failed to serialize message: {}", e)))?;
        let frame = encode_frame(&body);

        let mut writer = self.writer.lock().await;
        writer
            .write_all(&frame)
            .await
            .map_err(|e| Error::Communication(format!("Failed to write frame: {}", e)))?;
        writer
            .flush()
            .await
            .map_err(|e| Error::Communication(format!("Failed to flush frame: {}", e)))?;
        Ok(())
    }

    fn forget_handler(&self, key: &str) {
        if let Ok(mut handlers) = self.response_handlers.lock() {
            handlers.remove(key);
        }
    }

    /// Closes the transport and cleans up resources.
    ///
    /// Pending requests are answered with a "Connection closed" error.
    pub async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        let task = self.reader_task.lock().ok().and_then(|mut t| t.take());
        if let Some(task) = task {
            task.abort();
            // Ignore errors from abort as it's expected
            let _ = task.await;
        }

        if let Ok(mut handlers) = self.response_handlers.lock() {
            for (_, sender) in handlers.drain() {
                let _ = sender.send(Err(RpcError::connection_closed()));
            }
        }

        let mut writer = self.writer.lock().await;
        let _ = writer.shutdown().await;
        Ok(())
    }
}

#[async_trait]
impl Transport for SocketTransport {
    async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        let id = Uuid::new_v4().to_string();
        let request = json_rpc::request(&id, method, params);

        let (sender, receiver) = oneshot::channel();
        {
            let mut handlers = self
                .response_handlers
                .lock()
                .map_err(|_| Error::Communication("Failed to lock response handlers".to_string()))?;
            // Checked under the lock so the reader cannot miss this handler
            if self.is_closed() {
                return Err(Error::Transport(format!(
                    "Connection to {} is closed, cannot send '{}'",
                    self.peer, method
                )));
            }
            handlers.insert(id.clone(), sender);
        }

        tracing::trace!(method = %method, id = %id, "Sending request");
        if let Err(e) = self.write_message(&request).await {
            self.forget_handler(&id);
            return Err(e);
        }

        let reply = match tokio::time::timeout(self.request_timeout, receiver).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                return Err(Error::Transport(format!(
                    "Connection closed while waiting for '{}'",
                    method
                )));
            }
            Err(_) => {
                self.forget_handler(&id);
                return Err(Error::Timeout(format!(
                    "No response to '{}' within {:?}",
                    method, self.request_timeout
                )));
            }
        };

        reply.map_err(|error| Error::JsonRpc(error.to_string()))
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<()> {
        self.write_message(&json_rpc::notification(method, params))
            .await
    }

    async fn send_response(&self, id: Value, result: Value) -> Result<()> {
        self.write_message(&json_rpc::response(id, result)).await
    }
}

impl Drop for SocketTransport {
    fn drop(&mut self) {
        if let Ok(mut task) = self.reader_task.lock() {
            if let Some(task) = task.take() {
                task.abort();
            }
        }
    }
}
