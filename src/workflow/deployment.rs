use super::dialog::{COMBINED_KIND, DeploymentKind, KIND_CHOICES, kind_choice_required};
use super::location::attribute_prompt;
use super::prompt;
use super::{WorkflowEngine, WorkflowOutcome, or_cancel};
use crate::client::check_status;
use crate::error::Result;
use crate::protocol::{DeployableReference, ServerDeployableReference, ServerHandle, Status};
use std::collections::BTreeMap;

impl WorkflowEngine {
    /// Picks an artifact and adds it as a deployable of `server_id`.
    #[tracing::instrument(skip(self))]
    pub async fn add_deployment(&self, server_id: &str) -> Result<WorkflowOutcome<Status>> {
        let handle = self.handle(server_id)?;

        let kind = if kind_choice_required() {
            let items: Vec<String> = KIND_CHOICES.iter().map(|kind| kind.to_string()).collect();
            let choice = or_cancel!(
                self.prompter
                    .show_quick_pick(&items, "Choose what to deploy (file or exploded)")
                    .await
            );
            DeploymentKind::parse(&choice)
        } else {
            DeploymentKind::parse(COMBINED_KIND)
        };

        let picked = or_cancel!(self.prompter.show_open_dialog(&kind.dialog_options()).await);
        let artifact = or_cancel!(picked.into_iter().next());
        let path = artifact.to_string_lossy().into_owned();

        let edit = or_cancel!(
            prompt::confirm(
                self.prompter.as_ref(),
                "Do you want to edit optional deployment parameters?",
            )
            .await
        );
        let options = if edit {
            Some(or_cancel!(self.collect_deployment_options(&handle).await?))
        } else {
            None
        };

        let request = ServerDeployableReference {
            server: handle,
            deployable_reference: DeployableReference {
                label: path.clone(),
                path,
                options,
            },
        };
        let status = self.client.add_deployable(&request).await?;
        check_status(&status)?;

        tracing::info!(server_id = %server_id, path = %request.deployable_reference.path, "Deployable added");
        self.prompter.show_info(&format!(
            "Added {} to server '{}'",
            request.deployable_reference.label, server_id
        ));
        Ok(WorkflowOutcome::Completed(status))
    }

    /// Removes a deployable from `server_id`.
    #[tracing::instrument(skip(self, reference), fields(path = %reference.path))]
    pub async fn remove_deployment(
        &self,
        server_id: &str,
        reference: &DeployableReference,
    ) -> Result<WorkflowOutcome<Status>> {
        let request = ServerDeployableReference {
            server: self.handle(server_id)?,
            deployable_reference: reference.clone(),
        };
        let status = self.client.remove_deployable(&request).await?;
        check_status(&status)?;
        Ok(WorkflowOutcome::Completed(status))
    }

    /// Prompts for each deployment option the server supports.
    ///
    /// `None` means a prompt was dismissed. Empty answers are left out.
    async fn collect_deployment_options(
        &self,
        handle: &ServerHandle,
    ) -> Result<Option<BTreeMap<String, String>>> {
        let available = self.client.list_deployment_options(handle).await?;
        let mut options = BTreeMap::new();
        for (key, attribute) in &available.attributes {
            let Some(text) = self
                .prompter
                .show_input_box(&attribute_prompt(key, attribute))
                .await
            else {
                return Ok(None);
            };
            if !text.trim().is_empty() {
                options.insert(key.clone(), text);
            }
        }
        Ok(Some(options))
    }
}
