//! Interactive, cancelable workflows.
//!
//! Every workflow collects all of its inputs before sending a mutating
//! request, so a dismissed dialog never leaves anything half done on the
//! RSP server. Workflows never touch the state model directly; the
//! notifications the RSP server sends in response do that.
//!
//! A workflow ends in one of three ways:
//!
//! - [`WorkflowOutcome::Completed`] with the server's answer
//! - [`WorkflowOutcome::Cancelled`] when the user dismissed a dialog
//! - [`WorkflowOutcome::Rejected`] when an input failed validation; the
//!   message has already been shown through [`Prompter::show_error`]
//!
//! Transport failures and non-ok statuses are returned as `Err`.
mod deployment;
pub mod dialog;
mod download;
mod lifecycle;
mod location;
pub mod prompt;

pub use dialog::{COMBINED_KIND, DeploymentKind, KIND_CHOICES};
pub use prompt::{InputBoxOptions, OpenDialogOptions, Prompter};

use crate::client::RspClient;
use crate::error::{Error, Result};
use crate::explorer::{self, SharedExplorer};
use crate::protocol::{ServerHandle, ServerState, StringPrompt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// How a workflow ended.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowOutcome<T> {
    Completed(T),
    Cancelled,
    Rejected(String),
}

impl<T> WorkflowOutcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, WorkflowOutcome::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, WorkflowOutcome::Cancelled)
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, WorkflowOutcome::Rejected(_))
    }

    /// The completed value, if any.
    pub fn completed(self) -> Option<T> {
        match self {
            WorkflowOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }
}

/// Unwraps a prompt answer or ends the workflow as cancelled.
macro_rules! or_cancel {
    ($answer:expr) => {
        match $answer {
            Some(value) => value,
            None => return Ok($crate::workflow::WorkflowOutcome::Cancelled),
        }
    };
}
pub(crate) use or_cancel;

/// Entry points for every user-driven command.
#[derive(Clone)]
pub struct WorkflowEngine {
    client: RspClient,
    explorer: SharedExplorer,
    prompter: Arc<dyn Prompter>,
    restart_timeout: Duration,
}

impl WorkflowEngine {
    pub fn new(
        client: RspClient,
        explorer: SharedExplorer,
        prompter: Arc<dyn Prompter>,
        restart_timeout: Duration,
    ) -> Self {
        Self {
            client,
            explorer,
            prompter,
            restart_timeout,
        }
    }

    pub fn client(&self) -> &RspClient {
        &self.client
    }

    pub fn prompter(&self) -> &Arc<dyn Prompter> {
        &self.prompter
    }

    /// Runs a command, showing any error to the user before returning it.
    pub async fn execute<T, F>(&self, command: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let result = command.await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Command failed");
            self.prompter.show_error(&e.to_string());
        }
        result
    }

    /// Answers a `client/promptString` request from the RSP server.
    ///
    /// A dismissed prompt is answered with an empty string.
    pub async fn answer_string_prompt(&self, request_id: Value, prompt: &StringPrompt) -> Result<()> {
        let options = InputBoxOptions {
            prompt: prompt.prompt.clone(),
            password: prompt.secret,
            ..InputBoxOptions::default()
        };
        let answer = self.prompter.show_input_box(&options).await.unwrap_or_default();
        self.client.answer_prompt(request_id, &answer).await
    }

    /// Shows `message` and ends the workflow as rejected.
    fn reject<T>(&self, message: impl Into<String>) -> WorkflowOutcome<T> {
        let message = message.into();
        tracing::debug!(reason = %message, "Workflow rejected");
        self.prompter.show_error(&message);
        WorkflowOutcome::Rejected(message)
    }

    fn handle(&self, server_id: &str) -> Result<ServerHandle> {
        explorer::lock(&self.explorer)?
            .model()
            .handle(server_id)
            .cloned()
            .ok_or_else(|| Error::ServerNotFound(server_id.to_string()))
    }

    fn state(&self, server_id: &str) -> Result<ServerState> {
        explorer::lock(&self.explorer)?
            .model()
            .state(server_id)
            .cloned()
            .ok_or_else(|| Error::ServerNotFound(server_id.to_string()))
    }

    fn is_registered(&self, server_id: &str) -> Result<bool> {
        Ok(explorer::lock(&self.explorer)?.model().contains(server_id))
    }
}
