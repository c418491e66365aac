use super::location::attribute_value;
use super::prompt::{self, InputBoxOptions};
use super::{WorkflowEngine, WorkflowOutcome, or_cancel};
use crate::error::{Error, Result};
use crate::protocol::{DownloadSingleRuntimeRequest, Status, WorkflowResponse, WorkflowResponseItem};
use serde_json::Value;
use std::collections::BTreeMap;

/// Upper bound on question rounds before the download is given up.
const MAX_DOWNLOAD_STEPS: usize = 20;

impl WorkflowEngine {
    /// Downloads and installs a runtime offered by the RSP server.
    ///
    /// The RSP server drives this as a multi-step exchange: every answer
    /// that is neither ok, error nor cancel carries items to show or ask
    /// about, and the answers go back in the next request under the same
    /// request id. An ok status ends the download; the server then
    /// announces the new server through `client/serverAdded` if it created
    /// one.
    #[tracing::instrument(skip(self))]
    pub async fn download_runtime(&self) -> Result<WorkflowOutcome<WorkflowResponse>> {
        let runtimes = self.client.list_downloadable_runtimes().await?;
        if runtimes.is_empty() {
            return Ok(self.reject("No runtimes are available for download"));
        }

        let names: Vec<String> = runtimes.iter().map(|r| r.name.clone()).collect();
        let picked = or_cancel!(
            self.prompter
                .show_quick_pick(&names, "Please select the runtime to download")
                .await
        );
        let Some(runtime) = runtimes.into_iter().find(|r| r.name == picked) else {
            return Ok(self.reject(format!("Unknown runtime '{}'", picked)));
        };

        let mut request = DownloadSingleRuntimeRequest {
            request_id: None,
            download_runtime_id: runtime.id.clone(),
            data: BTreeMap::new(),
        };
        for step in 0..MAX_DOWNLOAD_STEPS {
            let response = self.client.download_runtime(&request).await?;
            tracing::debug!(
                step,
                severity = response.status.severity,
                items = response.items.len(),
                "Download step answered"
            );

            match response.status.severity {
                Status::OK => {
                    tracing::info!(runtime = %runtime.id, "Runtime downloaded");
                    self.prompter.show_info(&format!("Runtime '{}' downloaded", runtime.name));
                    return Ok(WorkflowOutcome::Completed(response));
                }
                Status::CANCEL => return Ok(WorkflowOutcome::Cancelled),
                severity if severity >= Status::ERROR => {
                    return Err(Error::Protocol(response.status.message.clone()));
                }
                _ => {}
            }

            let data = match self.answer_items(&response.items).await? {
                WorkflowOutcome::Completed(data) => data,
                WorkflowOutcome::Cancelled => return Ok(WorkflowOutcome::Cancelled),
                WorkflowOutcome::Rejected(message) => return Ok(WorkflowOutcome::Rejected(message)),
            };
            request.request_id = Some(response.request_id);
            request.data = data;
        }

        Err(Error::Protocol(format!(
            "Download of '{}' did not finish after {} steps",
            runtime.name, MAX_DOWNLOAD_STEPS
        )))
    }

    async fn answer_items(
        &self,
        items: &[WorkflowResponseItem],
    ) -> Result<WorkflowOutcome<BTreeMap<String, Value>>> {
        let mut data = BTreeMap::new();
        for item in items {
            let question = if item.label.is_empty() {
                item.id.clone()
            } else {
                item.label.clone()
            };
            let Some(details) = item.prompt.as_ref().filter(|p| p.response_type != "none") else {
                if !item.content.is_empty() {
                    self.prompter.show_info(&format!("{}\n{}", question, item.content));
                } else if !item.label.is_empty() {
                    self.prompter.show_info(&item.label);
                }
                continue;
            };

            let value = match details.response_type.as_str() {
                "bool" => {
                    if !item.content.is_empty() {
                        self.prompter.show_info(&item.content);
                    }
                    Value::Bool(or_cancel!(prompt::confirm(self.prompter.as_ref(), &question).await))
                }
                _ if !details.valid_responses.is_empty() => Value::String(or_cancel!(
                    self.prompter
                        .show_quick_pick(&details.valid_responses, &question)
                        .await
                )),
                response_type => {
                    let options = InputBoxOptions {
                        prompt: question,
                        placeholder: None,
                        value: None,
                        password: details.response_secret,
                    };
                    let text = or_cancel!(self.prompter.show_input_box(&options).await);
                    match attribute_value(response_type, &text) {
                        Ok(value) => value,
                        Err(message) => return Ok(self.reject(message)),
                    }
                }
            };
            data.insert(item.id.clone(), value);
        }
        Ok(WorkflowOutcome::Completed(data))
    }
}
