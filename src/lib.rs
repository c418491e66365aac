/*!
 # RSP Runner

 A Rust library for driving a Remote Server Protocol (RSP) server and the
 runtime servers it manages.

 ## Overview

 RSP Runner provides functionality to:
 - Launch the backing RSP server on a free port and wait until it is reachable
 - Talk to it with JSON-RPC over a `Content-Length` framed TCP connection
 - Mirror the state of every managed server from protocol notifications
 - Route each server's process output to its own output channel
 - Run the interactive workflows for creating servers, managing deployments
   and starting, stopping, restarting, removing and publishing servers

 The UI is not part of this crate. It plugs in through two traits:
 [`workflow::Prompter`] for asking the user things and
 [`explorer::OutputWindow`] for creating output channels. Tree views read the
 [`explorer::ServerExplorer`] and follow its refresh events.

 ## Basic Usage

 ```no_run
 use rsp_runner::explorer::InMemoryOutputWindow;
 use rsp_runner::workflow::{InputBoxOptions, OpenDialogOptions, Prompter};
 use rsp_runner::{Config, Result, RspRunner};
 use std::path::PathBuf;
 use std::sync::Arc;

 struct NoInput;

 #[async_trait::async_trait]
 impl Prompter for NoInput {
     async fn show_open_dialog(&self, _: &OpenDialogOptions) -> Option<Vec<PathBuf>> { None }
     async fn show_input_box(&self, _: &InputBoxOptions) -> Option<String> { None }
     async fn show_quick_pick(&self, _: &[String], _: &str) -> Option<String> { None }
     fn show_info(&self, message: &str) { println!("{}", message) }
     fn show_error(&self, message: &str) { eprintln!("{}", message) }
 }

 #[tokio::main]
 async fn main() -> Result<()> {
     let mut runner = RspRunner::new(
         Config::default(),
         Arc::new(InMemoryOutputWindow::new()),
         Arc::new(NoInput),
     );
     runner.start().await?;

     let explorer = runner.explorer()?;
     for server_id in rsp_runner::explorer::lock(&explorer)?.model().server_ids() {
         println!("{}", server_id);
     }

     runner.shutdown().await
 }
 ```
*/

pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod explorer;
pub mod launcher;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod workflow;

pub use client::{RspClient, RspEvent};
pub use config::Config;
pub use error::{Error, Result};
pub use explorer::{RefreshEvent, ServerExplorer, SharedExplorer};
pub use launcher::{LaunchedServer, ServerInfo, ServerLauncher};
pub use session::RspSession;
pub use workflow::{WorkflowEngine, WorkflowOutcome};

use explorer::{OutputChannel, OutputWindow};
use launcher::LineSink;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use transport::SocketTransport;
use workflow::Prompter;

/// Channel receiving the RSP server's standard output.
pub const SERVER_STDOUT_CHANNEL: &str = "RSP Server (stdout)";
/// Channel receiving the RSP server's standard error.
pub const SERVER_STDERR_CHANNEL: &str = "RSP Server (stderr)";

type SharedChannel = Arc<Mutex<Box<dyn OutputChannel>>>;

/// Owns the backing RSP server, the session with it and the workflows.
///
/// All public async methods are instrumented with `tracing` spans.
pub struct RspRunner {
    config: Config,
    window: Arc<dyn OutputWindow>,
    prompter: Arc<dyn Prompter>,
    server: Option<LaunchedServer>,
    session: Option<RspSession>,
    process_channels: Vec<SharedChannel>,
}

impl RspRunner {
    /// Create a runner from a configuration file path
    #[tracing::instrument(skip(path, window, prompter), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(
        path: impl AsRef<Path>,
        window: Arc<dyn OutputWindow>,
        prompter: Arc<dyn Prompter>,
    ) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path)?;
        Ok(Self::new(config, window, prompter))
    }

    pub fn new(config: Config, window: Arc<dyn OutputWindow>, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            config,
            window,
            prompter,
            server: None,
            session: None,
            process_channels: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Launches the RSP server and opens a session with it.
    #[tracing::instrument(skip(self))]
    pub async fn start(&mut self) -> Result<ServerInfo> {
        if self.session.is_some() || self.server.is_some() {
            return Err(Error::AlreadyRunning);
        }
        config::validate_config(&self.config)?;

        let stdout_sink = self.process_sink(SERVER_STDOUT_CHANNEL);
        let stderr_sink = self.process_sink(SERVER_STDERR_CHANNEL);
        let launcher = ServerLauncher::new(self.config.launcher.clone());
        let launched = match launcher.start(stdout_sink, stderr_sink).await {
            Ok(launched) => launched,
            Err(e) => {
                tracing::error!(error = %e, "Failed to launch RSP server");
                self.stop_process(Duration::ZERO).await;
                return Err(e);
            }
        };

        let info = launched.info.clone();
        self.server = Some(launched);
        if let Err(e) = self.attach(&info).await {
            tracing::error!(error = %e, "Failed to open session, stopping RSP server");
            self.stop_process(Duration::ZERO).await;
            return Err(e);
        }
        Ok(info)
    }

    /// Opens a session with an RSP server that is already listening.
    #[tracing::instrument(skip(self), fields(host = %info.host, port = info.port))]
    pub async fn attach(&mut self, info: &ServerInfo) -> Result<()> {
        if self.session.is_some() {
            return Err(Error::AlreadyRunning);
        }

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let transport = SocketTransport::connect(
            &info.host,
            info.port,
            self.config.session.request_timeout(),
            inbound_tx,
        )
        .await?;
        let session = RspSession::open(
            RspClient::new(transport),
            inbound_rx,
            Arc::clone(&self.window),
            Arc::clone(&self.prompter),
            &self.config,
        )
        .await?;
        self.session = Some(session);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.session.is_some()
    }

    /// Where the launched RSP server listens.
    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.server.as_ref().map(|server| &server.info)
    }

    pub fn explorer(&self) -> Result<SharedExplorer> {
        Ok(Arc::clone(self.session()?.explorer()))
    }

    pub fn workflows(&self) -> Result<&WorkflowEngine> {
        Ok(self.session()?.workflows())
    }

    fn session(&self) -> Result<&RspSession> {
        self.session.as_ref().ok_or(Error::NotRunning)
    }

    /// Shuts down the session and the RSP server. Safe to call repeatedly.
    ///
    /// The server gets `launcher.shutdownGraceMs` to exit after the shutdown
    /// notification; it is killed if it is still running after that.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&mut self) -> Result<()> {
        let mut result = Ok(());
        let mut grace = Duration::ZERO;
        if let Some(session) = self.session.take() {
            result = session.shutdown().await;
            if result.is_ok() {
                grace = self.config.launcher.shutdown_grace();
            }
        }
        self.stop_process(grace).await;
        result
    }

    async fn stop_process(&mut self, grace: Duration) {
        if let Some(mut server) = self.server.take() {
            if let Err(e) = server.process.stop(grace).await {
                tracing::warn!(error = %e, "Failed to stop RSP server process");
            }
        }
        for channel in self.process_channels.drain(..) {
            if let Ok(mut channel) = channel.lock() {
                channel.dispose();
            }
        }
    }

    fn process_sink(&mut self, name: &str) -> LineSink {
        let channel: SharedChannel = Arc::new(Mutex::new(self.window.create_channel(name)));
        self.process_channels.push(Arc::clone(&channel));
        Arc::new(move |line: &str| {
            if let Ok(mut channel) = channel.lock() {
                channel.append_line(line);
            }
        })
    }
}
