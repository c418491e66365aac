//! Transport layer for the RPC session with the RSP server.
//!
//! The [`Transport`] trait is the seam the rest of the crate depends on: it
//! sends requests, notifications and responses as raw JSON values. Inbound
//! traffic that is not a response (notifications and server-to-client
//! requests) is delivered as [`InboundMessage`]s on a channel, in arrival
//! order, for the dispatcher to apply.
//!
//! [`SocketTransport`] is the bundled implementation: JSON-RPC 2.0 with
//! `Content-Length` framing over TCP.
mod framing;
pub mod json_rpc;
mod socket;

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

pub use framing::{encode_frame, read_frame};
pub use json_rpc::{Envelope, Incoming, Reply, RpcError};
pub use socket::SocketTransport;

/// A message initiated by the RSP server.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// Fire-and-forget notification
    Notification { method: String, params: Value },
    /// Request expecting an answer through [`Transport::send_response`]
    Request {
        id: Value,
        method: String,
        params: Value,
    },
}

/// Message-oriented connection to the RSP server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and waits for its result.
    ///
    /// A JSON-RPC error response maps to [`crate::Error::JsonRpc`]; a
    /// missing response within the transport's timeout maps to
    /// [`crate::Error::Timeout`].
    async fn send_request(&self, method: &str, params: Value) -> Result<Value>;

    /// Sends a notification; no response is expected.
    async fn send_notification(&self, method: &str, params: Value) -> Result<()>;

    /// Answers a request the server sent us.
    async fn send_response(&self, id: Value, result: Value) -> Result<()>;
}
