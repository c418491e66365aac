use super::prompt::{self, InputBoxOptions, OpenDialogOptions};
use super::{WorkflowEngine, WorkflowOutcome, or_cancel};
use crate::client::check_status;
use crate::error::{Error, Result};
use crate::protocol::{
    Attribute, CreateServerResponse, SERVER_HOME_DIR, ServerAttributes, ServerType,
};
use serde_json::Value;
use std::collections::BTreeMap;

impl WorkflowEngine {
    /// Discovers a server installation in a folder and creates a server for it.
    ///
    /// The folder is picked, searched for server candidates, and the first
    /// candidate is named by the user. Required attributes are collected
    /// (the install directory is filled in from the candidate), optional
    /// attributes on request, and only then is `server/createServer` sent.
    #[tracing::instrument(skip(self))]
    pub async fn add_location(&self) -> Result<WorkflowOutcome<CreateServerResponse>> {
        let dialog = OpenDialogOptions {
            can_select_files: false,
            can_select_folders: true,
            can_select_many: false,
            open_label: "Select server location".to_string(),
        };
        let folders = or_cancel!(self.prompter.show_open_dialog(&dialog).await);
        let folder = or_cancel!(folders.into_iter().next());
        let path = folder.to_string_lossy().into_owned();

        let beans = self.client.find_server_beans(&path).await?;
        let Some(bean) = beans.into_iter().next() else {
            return Ok(self.reject(format!("No server detected at {}", path)));
        };
        if bean.server_adapter_type_id.trim().is_empty() {
            return Ok(self.reject("Invalid server adapter type"));
        }
        tracing::debug!(server_type = %bean.server_adapter_type_id, "Server detected");

        let name = match self.ask_server_name(Some(bean.name.clone())).await? {
            WorkflowOutcome::Completed(name) => name,
            WorkflowOutcome::Cancelled => return Ok(WorkflowOutcome::Cancelled),
            WorkflowOutcome::Rejected(message) => return Ok(WorkflowOutcome::Rejected(message)),
        };

        let server_type = ServerType {
            id: bean.server_adapter_type_id.clone(),
            visible_name: bean.name.clone(),
            description: String::new(),
        };
        let mut prefilled = BTreeMap::new();
        prefilled.insert(SERVER_HOME_DIR.to_string(), Value::String(bean.location.clone()));

        self.finish_create(name, &server_type, prefilled).await
    }

    /// Creates a server of a type picked from what the RSP server supports.
    ///
    /// Unlike [`WorkflowEngine::add_location`] nothing is discovered, so every
    /// required attribute, the install directory included, is asked for.
    #[tracing::instrument(skip(self))]
    pub async fn create_server(&self) -> Result<WorkflowOutcome<CreateServerResponse>> {
        let types = self.client.get_server_types().await?;
        if types.is_empty() {
            return Ok(self.reject("The RSP server does not support any server types"));
        }

        let names: Vec<String> = types.iter().map(|t| t.visible_name.clone()).collect();
        let picked = or_cancel!(
            self.prompter
                .show_quick_pick(&names, "Please select the server type")
                .await
        );
        let Some(server_type) = types.into_iter().find(|t| t.visible_name == picked) else {
            return Ok(self.reject(format!("Unknown server type '{}'", picked)));
        };

        let name = match self.ask_server_name(None).await? {
            WorkflowOutcome::Completed(name) => name,
            WorkflowOutcome::Cancelled => return Ok(WorkflowOutcome::Cancelled),
            WorkflowOutcome::Rejected(message) => return Ok(WorkflowOutcome::Rejected(message)),
        };

        self.finish_create(name, &server_type, BTreeMap::new()).await
    }

    async fn ask_server_name(&self, suggested: Option<String>) -> Result<WorkflowOutcome<String>> {
        let options = InputBoxOptions {
            prompt: "Please provide the server name".to_string(),
            placeholder: Some("Server name".to_string()),
            value: suggested.filter(|name| !name.is_empty()),
            password: false,
        };
        let name = or_cancel!(self.prompter.show_input_box(&options).await);
        if name.trim().is_empty() {
            return Ok(self.reject("Cannot set empty server name"));
        }
        if self.is_registered(&name)? {
            return Ok(self.reject("Cannot set duplicate server name"));
        }
        Ok(WorkflowOutcome::Completed(name))
    }

    async fn finish_create(
        &self,
        name: String,
        server_type: &ServerType,
        prefilled: BTreeMap<String, Value>,
    ) -> Result<WorkflowOutcome<CreateServerResponse>> {
        let attributes = match self.collect_attributes(server_type, prefilled).await? {
            WorkflowOutcome::Completed(attributes) => attributes,
            WorkflowOutcome::Cancelled => return Ok(WorkflowOutcome::Cancelled),
            WorkflowOutcome::Rejected(message) => return Ok(WorkflowOutcome::Rejected(message)),
        };

        let request = ServerAttributes {
            id: name,
            server_type: server_type.id.clone(),
            attributes,
        };
        let response = self.client.create_server(&request).await?;
        if !response.invalid_keys.is_empty() {
            return Err(Error::Protocol(format!(
                "Invalid server attributes: {}",
                response.invalid_keys.join(", ")
            )));
        }
        check_status(&response.status)?;

        tracing::info!(server_id = %request.id, server_type = %request.server_type, "Server created");
        self.prompter.show_info(&format!("Server '{}' created", request.id));
        Ok(WorkflowOutcome::Completed(response))
    }

    /// Asks for every attribute not in `prefilled`.
    async fn collect_attributes(
        &self,
        server_type: &ServerType,
        prefilled: BTreeMap<String, Value>,
    ) -> Result<WorkflowOutcome<BTreeMap<String, Value>>> {
        let mut values = prefilled;

        let required = self.client.get_required_attributes(server_type).await?;
        for (key, attribute) in &required.attributes {
            if values.contains_key(key) {
                continue;
            }
            let text = or_cancel!(self.prompter.show_input_box(&attribute_prompt(key, attribute)).await);
            if text.trim().is_empty() {
                return Ok(self.reject(format!("Required attribute '{}' cannot be empty", key)));
            }
            match attribute_value(&attribute.attr_type, &text) {
                Ok(value) => values.insert(key.clone(), value),
                Err(message) => return Ok(self.reject(message)),
            };
        }

        let optional = self.client.get_optional_attributes(server_type).await?;
        if optional.attributes.is_empty() {
            return Ok(WorkflowOutcome::Completed(values));
        }
        let edit = or_cancel!(
            prompt::confirm(self.prompter.as_ref(), "Do you want to set optional attributes?").await
        );
        if !edit {
            return Ok(WorkflowOutcome::Completed(values));
        }

        for (key, attribute) in &optional.attributes {
            let text = or_cancel!(self.prompter.show_input_box(&attribute_prompt(key, attribute)).await);
            if text.trim().is_empty() {
                continue;
            }
            match attribute_value(&attribute.attr_type, &text) {
                Ok(value) => values.insert(key.clone(), value),
                Err(message) => return Ok(self.reject(message)),
            };
        }
        Ok(WorkflowOutcome::Completed(values))
    }
}

/// Input box for one attribute, prefilled with its default.
pub(super) fn attribute_prompt(key: &str, attribute: &Attribute) -> InputBoxOptions {
    let prompt = if attribute.description.is_empty() {
        key.to_string()
    } else {
        attribute.description.clone()
    };
    InputBoxOptions {
        prompt,
        placeholder: Some(key.to_string()),
        value: attribute.default_val.as_ref().and_then(default_text),
        password: attribute.secret,
    }
}

fn default_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(default_text)
                .collect::<Vec<_>>()
                .join(","),
        ),
        other => Some(other.to_string()),
    }
}

/// Converts user input to the JSON value an attribute of `attr_type` expects.
pub(super) fn attribute_value(attr_type: &str, text: &str) -> std::result::Result<Value, String> {
    let trimmed = text.trim();
    match attr_type {
        "int" => trimmed
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| format!("'{}' is not a valid integer", trimmed)),
        "bool" => match trimmed.to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(format!("'{}' is not a valid boolean", trimmed)),
        },
        "list" => Ok(Value::Array(
            trimmed
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(Value::from)
                .collect(),
        )),
        _ => Ok(Value::String(text.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_values() {
        assert_eq!(attribute_value("int", " 42 ").unwrap(), json!(42));
        assert!(attribute_value("int", "forty").is_err());
        assert_eq!(attribute_value("bool", "TRUE").unwrap(), json!(true));
        assert!(attribute_value("bool", "yes").is_err());
        assert_eq!(attribute_value("list", "a, b,,c").unwrap(), json!(["a", "b", "c"]));
        assert_eq!(attribute_value("string", " keep ").unwrap(), json!(" keep "));
    }

    #[test]
    fn test_attribute_prompt_defaults() {
        let attribute = Attribute {
            attr_type: "int".to_string(),
            description: String::new(),
            default_val: Some(json!(8080)),
            secret: false,
        };
        let options = attribute_prompt("server.http.port", &attribute);
        assert_eq!(options.prompt, "server.http.port");
        assert_eq!(options.value.as_deref(), Some("8080"));

        let secret = Attribute {
            attr_type: "string".to_string(),
            description: "Admin password".to_string(),
            default_val: None,
            secret: true,
        };
        let options = attribute_prompt("server.password", &secret);
        assert_eq!(options.prompt, "Admin password");
        assert!(options.password);
        assert!(options.value.is_none());
    }
}
