//! Inbound message dispatch.
//!
//! One [`Dispatcher`] task drains everything the RSP server sends on its own
//! initiative and applies it to the [`ServerExplorer`](crate::explorer::ServerExplorer)
//! in arrival order. It is the only writer of the state model.
use crate::client::RspEvent;
use crate::error::Result;
use crate::explorer::{self, SharedExplorer};
use crate::transport::InboundMessage;
use crate::workflow::WorkflowEngine;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub struct Dispatcher {
    explorer: SharedExplorer,
    workflows: WorkflowEngine,
    inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

impl Dispatcher {
    pub fn new(
        explorer: SharedExplorer,
        workflows: WorkflowEngine,
        inbound: mpsc::UnboundedReceiver<InboundMessage>,
    ) -> Self {
        Self {
            explorer,
            workflows,
            inbound,
        }
    }

    /// Runs the dispatch loop on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Runs until the transport drops its sender.
    pub async fn run(mut self) {
        tracing::debug!("Dispatcher started");
        while let Some(message) = self.inbound.recv().await {
            let event = match RspEvent::decode(message) {
                Ok(event) => event,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping undecodable inbound message");
                    continue;
                }
            };
            if let Err(e) = self.apply(event) {
                tracing::warn!(error = %e, "Failed to apply inbound event");
            }
        }
        tracing::debug!("Dispatcher stopped");
    }

    /// Applies one event to the explorer.
    ///
    /// String prompts are answered on a separate task so that state changes
    /// keep flowing while the user types.
    pub fn apply(&self, event: RspEvent) -> Result<()> {
        match event {
            RspEvent::ServerAdded(handle) => explorer::lock(&self.explorer)?.insert_server(handle),
            RspEvent::ServerRemoved(handle) => {
                explorer::lock(&self.explorer)?.remove_server(&handle)
            }
            RspEvent::ServerStateChanged(state) => {
                explorer::lock(&self.explorer)?.update_server(state)
            }
            RspEvent::ServerProcessOutput(output) => {
                explorer::lock(&self.explorer)?.add_server_output(&output.server.id, &output.text);
                Ok(())
            }
            RspEvent::StringPrompt { request_id, prompt } => {
                let workflows = self.workflows.clone();
                tokio::spawn(async move {
                    if let Err(e) = workflows.answer_string_prompt(request_id, &prompt).await {
                        tracing::warn!(error = %e, "Failed to answer string prompt");
                    }
                });
                Ok(())
            }
            RspEvent::Unhandled { method } => {
                tracing::debug!(method = %method, "Ignoring unhandled inbound message");
                Ok(())
            }
        }
    }
}
