use super::prompt;
use super::{WorkflowEngine, WorkflowOutcome, or_cancel};
use crate::client::check_status;
use crate::error::{Error, Result};
use crate::explorer;
use crate::protocol::{PublishServerRequest, RunMode, RunState, StartServerResponse, Status};
use tokio::sync::broadcast::error::RecvError;

const ALREADY_RUNNING: &str = "The server is already running.";
const ALREADY_STOPPED: &str = "The server is already stopped.";

fn is_running(state: RunState) -> bool {
    matches!(state, RunState::Started | RunState::Starting)
}

impl WorkflowEngine {
    /// Starts `server_id` in `mode`.
    #[tracing::instrument(skip(self))]
    pub async fn start_server(
        &self,
        server_id: &str,
        mode: RunMode,
    ) -> Result<WorkflowOutcome<StartServerResponse>> {
        let state = self.state(server_id)?;
        if is_running(state.state) {
            return Ok(self.reject(ALREADY_RUNNING));
        }

        let response = self.client.start_server(&state.server, mode).await?;
        check_status(&response.status)?;
        Ok(WorkflowOutcome::Completed(response))
    }

    /// Stops `server_id`.
    #[tracing::instrument(skip(self))]
    pub async fn stop_server(&self, server_id: &str, force: bool) -> Result<WorkflowOutcome<Status>> {
        let state = self.state(server_id)?;
        if !is_running(state.state) {
            return Ok(self.reject(ALREADY_STOPPED));
        }

        let status = self.client.stop_server(server_id, force).await?;
        check_status(&status)?;
        Ok(WorkflowOutcome::Completed(status))
    }

    /// Stops `server_id`, waits for it to report `Stopped`, and starts it
    /// again in the mode it was running in.
    #[tracing::instrument(skip(self))]
    pub async fn restart_server(
        &self,
        server_id: &str,
    ) -> Result<WorkflowOutcome<StartServerResponse>> {
        let state = self.state(server_id)?;
        if !is_running(state.state) {
            return Ok(self.reject(ALREADY_STOPPED));
        }
        let mode = state.run_mode;

        // Subscribe before stopping so the Stopped refresh cannot be missed
        let mut refreshes = explorer::lock(&self.explorer)?.subscribe();

        let status = self.client.stop_server(server_id, false).await?;
        check_status(&status)?;

        let wait_stopped = async {
            loop {
                if self.state(server_id)?.state == RunState::Stopped {
                    return Ok(());
                }
                match refreshes.recv().await {
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => {
                        return Err(Error::Communication(
                            "Server explorer closed during restart".to_string(),
                        ));
                    }
                }
            }
        };
        tokio::time::timeout(self.restart_timeout, wait_stopped)
            .await
            .map_err(|_| {
                Error::Timeout(format!(
                    "Server '{}' did not stop within {:?}",
                    server_id, self.restart_timeout
                ))
            })??;

        tracing::debug!(server_id = %server_id, mode = mode.as_str(), "Server stopped, starting again");
        let response = self.client.start_server(&state.server, mode).await?;
        check_status(&response.status)?;
        Ok(WorkflowOutcome::Completed(response))
    }

    /// Deletes a stopped server after confirmation.
    #[tracing::instrument(skip(self))]
    pub async fn remove_server(&self, server_id: &str) -> Result<WorkflowOutcome<Status>> {
        let state = self.state(server_id)?;
        if !matches!(state.state, RunState::Stopped | RunState::Unknown) {
            return Ok(self.reject("The server must be stopped before it can be removed."));
        }

        let question = format!("Remove server '{}'?", server_id);
        if !or_cancel!(prompt::confirm(self.prompter.as_ref(), &question).await) {
            return Ok(WorkflowOutcome::Cancelled);
        }

        let status = self.client.delete_server(&state.server).await?;
        check_status(&status)?;
        Ok(WorkflowOutcome::Completed(status))
    }

    /// Publishes the deployables of `server_id`; `kind` is one of
    /// [`crate::protocol::publish_kind`].
    #[tracing::instrument(skip(self))]
    pub async fn publish_server(&self, server_id: &str, kind: i32) -> Result<WorkflowOutcome<Status>> {
        let request = PublishServerRequest {
            server: self.handle(server_id)?,
            kind,
        };
        let status = self.client.publish(&request).await?;
        check_status(&status)?;
        Ok(WorkflowOutcome::Completed(status))
    }

    /// Shows the output channel of `server_id`. Does nothing if the server
    /// has not written any output.
    pub fn show_server_output(&self, server_id: &str) -> Result<()> {
        explorer::lock(&self.explorer)?.show_output(server_id);
        Ok(())
    }
}
