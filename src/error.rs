/// Error handling module for RSP Runner.
///
/// This module defines the error types used throughout the library.
/// Launch failures, transport failures and protocol failures each get their
/// own variant so callers can decide whether a full start cycle is worth retrying.
///
/// User cancellation and workflow validation failures are *not* errors; they
/// are reported through [`crate::workflow::WorkflowOutcome`].
///
/// # Example
///
/// ```
/// use rsp_runner::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::StartupTimeout(msg)) => println!("RSP server did not come up: {}", msg),
///         Err(Error::Protocol(msg)) => println!("RSP server refused the request: {}", msg),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use thiserror::Error;

/// Errors that can occur in the rsp-runner library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains invalid values.
    ///
    /// This error occurs when:
    /// - The base port is zero or the port search range overflows
    /// - A timeout is zero
    /// - The poll interval is not shorter than the startup timeout
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// A required runtime could not be located.
    ///
    /// This error occurs when:
    /// - No Java installation can be found
    /// - The RSP server launcher jar does not exist
    #[error("Failed to resolve runtime: {0}")]
    Resolution(String),

    /// No free TCP port was found within the bounded search.
    #[error("No free port available: {0}")]
    PortExhaustion(String),

    /// The backing server process did not open its port in time.
    ///
    /// The child process must be treated as failed; killing it is the
    /// caller's responsibility.
    #[error("Server startup timed out: {0}")]
    StartupTimeout(String),

    /// Error when starting, stopping, or talking to the backing server process.
    #[error("Server process error: {0}")]
    Process(String),

    /// Error in the JSON-RPC protocol.
    ///
    /// This error occurs when:
    /// - The server returns an error response
    /// - The method doesn't exist
    /// - Invalid parameters are provided
    #[error("JSON-RPC error: {0}")]
    JsonRpc(String),

    /// Error in the transport layer.
    ///
    /// This error occurs when:
    /// - The connection cannot be established
    /// - A frame is malformed
    /// - The connection is closed while a request is pending
    #[error("Transport error: {0}")]
    Transport(String),

    /// Error in communication with the RSP server.
    #[error("Communication error: {0}")]
    Communication(String),

    /// The RSP server answered with a non-ok status.
    ///
    /// Carries the status message. No local state is mutated when this
    /// is returned; the model only changes on notifications.
    #[error("RSP server error: {0}")]
    Protocol(String),

    /// Operation timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// A registry entry point was called with an invalid identity.
    #[error("Precondition violated: {0}")]
    Precondition(String),

    /// Requested server is not registered in the model.
    #[error("Server not found: {0}")]
    ServerNotFound(String),

    /// The session is not running.
    ///
    /// This error occurs when:
    /// - A command is issued before `start` or after `shutdown`
    #[error("Not running")]
    NotRunning,

    /// The session is already running.
    #[error("Already running")]
    AlreadyRunning,

    /// Error in serializing or deserializing data.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for rsp-runner operations.
///
/// This is a convenience type alias for `std::result::Result` with the `Error` type
/// from this module.
pub type Result<T> = std::result::Result<T, Error>;
