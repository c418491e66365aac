//! Launching the backing RSP server.
//!
//! [`ServerLauncher::start`] resolves a Java runtime and the server
//! distribution, picks a free port, spawns the server and waits until the
//! port accepts connections. There is no retry; on any error the caller
//! decides whether to try again.
pub mod ports;
mod process;
pub mod runtime;

pub use ports::{find_free_port, is_port_available, wait_for_port};
pub use process::RspServerProcess;
pub use runtime::{Runtime, SERVER_LOCATION_ENV};

use crate::config::LauncherConfig;
use crate::error::Result;
use std::sync::Arc;

/// Receives one line of backing process output, without the newline.
pub type LineSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Host the RSP server is reached on.
pub const LOCALHOST: &str = "localhost";

/// Where the session connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub host: String,
    pub port: u16,
}

/// A reachable RSP server together with its process.
pub struct LaunchedServer {
    pub info: ServerInfo,
    pub process: RspServerProcess,
}

/// Starts the backing RSP server.
pub struct ServerLauncher {
    config: LauncherConfig,
}

impl ServerLauncher {
    pub fn new(config: LauncherConfig) -> Self {
        Self { config }
    }

    /// Resolves the runtime from the environment and the configuration, then
    /// launches it.
    pub async fn start(&self, stdout_sink: LineSink, stderr_sink: LineSink) -> Result<LaunchedServer> {
        let runtime = Runtime::resolve(&self.config)?;
        self.start_with(&runtime, stdout_sink, stderr_sink).await
    }

    /// Launches an already resolved runtime.
    ///
    /// On a startup timeout the spawned process is dropped, which kills it.
    #[tracing::instrument(skip(self, stdout_sink, stderr_sink), fields(home = %runtime.server_home.display()))]
    pub async fn start_with(
        &self,
        runtime: &Runtime,
        stdout_sink: LineSink,
        stderr_sink: LineSink,
    ) -> Result<LaunchedServer> {
        let port = find_free_port(self.config.base_port, self.config.max_port_attempts)?;
        tracing::info!(port = port, "Starting RSP server");

        let mut process = RspServerProcess::spawn(
            runtime,
            &self.config.jvm_args,
            port,
            stdout_sink,
            stderr_sink,
        )?;
        process
            .wait_until_reachable(
                LOCALHOST,
                self.config.startup_timeout(),
                self.config.poll_interval(),
            )
            .await?;

        tracing::info!(port = port, "RSP server is accepting connections");
        Ok(LaunchedServer {
            info: ServerInfo {
                host: LOCALHOST.to_string(),
                port,
            },
            process,
        })
    }
}
