use crate::client::RspClient;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::explorer::{self, OutputWindow, ServerExplorer, SharedExplorer};
use crate::transport::InboundMessage;
use crate::workflow::{Prompter, WorkflowEngine};
use futures::future::try_join_all;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// A connected RPC session with a seeded state model.
///
/// Inbound messages that arrive while the model is being seeded stay queued
/// and are applied once the dispatcher starts.
pub struct RspSession {
    client: RspClient,
    explorer: SharedExplorer,
    workflows: WorkflowEngine,
    dispatcher: JoinHandle<()>,
    shut_down: AtomicBool,
}

impl RspSession {
    /// Seeds the model from the servers the RSP server already knows and
    /// starts dispatching `inbound`.
    #[tracing::instrument(skip_all)]
    pub async fn open(
        client: RspClient,
        inbound: mpsc::UnboundedReceiver<InboundMessage>,
        window: Arc<dyn OutputWindow>,
        prompter: Arc<dyn Prompter>,
        config: &Config,
    ) -> Result<Self> {
        let explorer =
            ServerExplorer::new(window, config.show_channel_on_server_output).into_shared();

        let handles = client.get_server_handles().await?;
        for handle in &handles {
            explorer::lock(&explorer)?.insert_server(handle.clone())?;
        }
        let states = try_join_all(handles.iter().map(|handle| client.get_server_state(handle))).await?;
        for state in states {
            explorer::lock(&explorer)?.update_server(state)?;
        }
        tracing::info!(servers = handles.len(), "Session opened");

        let workflows = WorkflowEngine::new(
            client.clone(),
            Arc::clone(&explorer),
            prompter,
            config.session.restart_timeout(),
        );
        let dispatcher =
            Dispatcher::new(Arc::clone(&explorer), workflows.clone(), inbound).spawn();

        Ok(Self {
            client,
            explorer,
            workflows,
            dispatcher,
            shut_down: AtomicBool::new(false),
        })
    }

    pub fn client(&self) -> &RspClient {
        &self.client
    }

    pub fn explorer(&self) -> &SharedExplorer {
        &self.explorer
    }

    pub fn workflows(&self) -> &WorkflowEngine {
        &self.workflows
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down.load(Ordering::SeqCst)
    }

    /// Asks the RSP server to shut down, stops dispatching and disposes
    /// every output channel. Only the first call does anything.
    pub async fn shutdown(&self) -> Result<()> {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            tracing::debug!("Session already shut down");
            return Ok(());
        }

        tracing::info!("Shutting down session");
        let result = self.client.shutdown_server().await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Failed to send shutdown notification");
        }

        self.dispatcher.abort();
        explorer::lock(&self.explorer)?.dispose();
        result
    }
}

impl Drop for RspSession {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}
