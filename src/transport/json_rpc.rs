//! JSON-RPC 2.0 envelopes as the RSP server exchanges them.
//!
//! Incoming frames are parsed into one loose [`Envelope`] and then
//! classified, because the RSP server sends all three shapes (responses,
//! notifications and prompt requests) on the same connection.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::fmt;

/// JSON-RPC protocol version
pub const JSON_RPC_VERSION: &str = "2.0";

/// Error code given to pending requests when the connection goes away
pub const CONNECTION_CLOSED: i32 = -32099;

/// The `error` member of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn connection_closed() -> Self {
        Self::new(CONNECTION_CLOSED, "Connection closed")
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// What a request eventually resolves to.
pub type Reply = std::result::Result<Value, RpcError>;

/// Any frame body, before classification.
#[derive(Debug, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcError>,
}

/// A classified incoming message.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// Answer to one of our requests
    Response { id: Value, reply: Reply },
    /// Notification from the server
    Notification { method: String, params: Value },
    /// Request from the server that expects an answer
    Request {
        id: Value,
        method: String,
        params: Value,
    },
}

impl Envelope {
    /// Sorts the envelope into one of the three message shapes.
    ///
    /// A `method` makes it a request or a notification depending on the
    /// presence of an `id`. Without a `method` it must be a response; a
    /// missing `result` counts as `null` since RSP `void` methods answer
    /// that way. Returns `None` for frames that fit no shape.
    pub fn classify(self) -> Option<Incoming> {
        let params = self.params.unwrap_or(Value::Null);
        match (self.method, self.id) {
            (Some(method), Some(id)) if !id.is_null() => Some(Incoming::Request { id, method, params }),
            (Some(method), _) => Some(Incoming::Notification { method, params }),
            (None, Some(id)) => {
                let reply = match self.error {
                    Some(error) => Err(error),
                    None => Ok(self.result.unwrap_or(Value::Null)),
                };
                Some(Incoming::Response { id, reply })
            }
            (None, None) => None,
        }
    }
}

/// Builds a request body. `params` is left out when `null`.
pub fn request(id: &str, method: &str, params: Value) -> Value {
    let mut body = base();
    body.insert("id".to_string(), Value::from(id));
    body.insert("method".to_string(), Value::from(method));
    if !params.is_null() {
        body.insert("params".to_string(), params);
    }
    Value::Object(body)
}

/// Builds a notification body. `params` is left out when `null`.
pub fn notification(method: &str, params: Value) -> Value {
    let mut body = base();
    body.insert("method".to_string(), Value::from(method));
    if !params.is_null() {
        body.insert("params".to_string(), params);
    }
    Value::Object(body)
}

/// Builds a successful response body.
pub fn response(id: Value, result: Value) -> Value {
    json!({ "jsonrpc": JSON_RPC_VERSION, "id": id, "result": result })
}

fn base() -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("jsonrpc".to_string(), Value::from(JSON_RPC_VERSION));
    body
}

/// Render a request/response id as a map key.
pub(crate) fn id_key(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
