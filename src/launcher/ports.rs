//! Port allocation and reachability checks.
use crate::error::{Error, Result};
use std::net::TcpListener;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;

/// Check if a port is free by binding to it on the loopback interface.
/// The listener is dropped right away, which releases the port.
pub fn is_port_available(port: u16) -> bool {
    match TcpListener::bind(("127.0.0.1", port)) {
        Ok(listener) => listener.local_addr().is_ok(),
        Err(_) => false,
    }
}

/// Finds the first free port in `base_port..base_port + max_attempts`.
pub fn find_free_port(base_port: u16, max_attempts: u16) -> Result<u16> {
    for offset in 0..max_attempts {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        if is_port_available(port) {
            tracing::debug!(port = port, "Allocated port");
            return Ok(port);
        }
        tracing::debug!(port = port, "Port in use, trying next");
    }

    Err(Error::PortExhaustion(format!(
        "no free port in {} candidates starting at {}",
        max_attempts, base_port
    )))
}

/// Whether something accepts TCP connections on `host:port`.
pub async fn is_reachable(host: &str, port: u16) -> bool {
    TcpStream::connect((host, port)).await.is_ok()
}

/// Polls `host:port` every `poll_interval` until it accepts a connection.
pub async fn wait_for_port(
    host: &str,
    port: u16,
    timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let deadline = Instant::now() + timeout;
    loop {
        if is_reachable(host, port).await {
            tracing::debug!(host = %host, port = port, "Port is reachable");
            return Ok(());
        }
        if Instant::now() + poll_interval > deadline {
            return Err(Error::StartupTimeout(format!(
                "{}:{} not reachable after {:?}",
                host, port, timeout
            )));
        }
        tokio::time::sleep(poll_interval).await;
    }
}
