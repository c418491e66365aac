/// Client module for talking to the RSP server.
///
/// This module provides [`RspClient`], the typed facade over a [`Transport`].
/// It turns the raw JSON exchanged on the wire into the protocol types of
/// [`crate::protocol`], and decodes inbound traffic into [`RspEvent`]s.
///
/// The client is transport-agnostic; tests drive it with a mocked transport.
use crate::error::{Error, Result};
use crate::protocol::{
    Attributes, CreateServerResponse, DiscoveryPath, DownloadRuntimeDescription,
    DownloadSingleRuntimeRequest, LaunchParameters, ListDownloadRuntimeResponse,
    PublishServerRequest, RunMode, ServerAttributes, ServerBean, ServerDeployableReference,
    ServerHandle, ServerProcessOutput, ServerState, ServerType, StartServerResponse, Status,
    StopServerAttributes, StringPrompt, WorkflowResponse,
};
use crate::transport::{InboundMessage, Transport};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// RSP method names.
pub mod methods {
    pub const GET_SERVER_HANDLES: &str = "server/getServerHandles";
    pub const GET_SERVER_STATE: &str = "server/getServerState";
    pub const FIND_SERVER_BEANS: &str = "server/findServerBeans";
    pub const CREATE_SERVER: &str = "server/createServer";
    pub const GET_SERVER_TYPES: &str = "server/getServerTypes";
    pub const LIST_DOWNLOADABLE_RUNTIMES: &str = "server/listDownloadableRuntimes";
    pub const DOWNLOAD_RUNTIME: &str = "server/downloadRuntime";
    pub const GET_REQUIRED_ATTRIBUTES: &str = "server/getRequiredAttributes";
    pub const GET_OPTIONAL_ATTRIBUTES: &str = "server/getOptionalAttributes";
    pub const START_SERVER: &str = "server/startServerAsync";
    pub const STOP_SERVER: &str = "server/stopServerAsync";
    pub const DELETE_SERVER: &str = "server/deleteServer";
    pub const ADD_DEPLOYABLE: &str = "server/addDeployable";
    pub const REMOVE_DEPLOYABLE: &str = "server/removeDeployable";
    pub const LIST_DEPLOYMENT_OPTIONS: &str = "server/listDeploymentOptions";
    pub const PUBLISH: &str = "server/publish";
    pub const SHUTDOWN: &str = "server/shutdown";

    pub const SERVER_ADDED: &str = "client/serverAdded";
    pub const SERVER_REMOVED: &str = "client/serverRemoved";
    pub const SERVER_STATE_CHANGED: &str = "client/serverStateChanged";
    pub const SERVER_PROCESS_OUTPUT: &str = "client/serverProcessOutputAppended";
    pub const PROMPT_STRING: &str = "client/promptString";
}

/// An inbound protocol event, decoded.
#[derive(Debug, Clone, PartialEq)]
pub enum RspEvent {
    /// A server was created
    ServerAdded(ServerHandle),
    /// A server was deleted
    ServerRemoved(ServerHandle),
    /// Full state snapshot of a server
    ServerStateChanged(ServerState),
    /// Text written by a managed server process
    ServerProcessOutput(ServerProcessOutput),
    /// The server asks the user for a string; answer with the request id
    StringPrompt { request_id: Value, prompt: StringPrompt },
    /// A method this client does not handle
    Unhandled { method: String },
}

impl RspEvent {
    /// Decodes an inbound message.
    pub fn decode(message: InboundMessage) -> Result<Self> {
        match message {
            InboundMessage::Notification { method, params } => match method.as_str() {
                methods::SERVER_ADDED => Ok(RspEvent::ServerAdded(from_params(&method, params)?)),
                methods::SERVER_REMOVED => {
                    Ok(RspEvent::ServerRemoved(from_params(&method, params)?))
                }
                methods::SERVER_STATE_CHANGED => {
                    Ok(RspEvent::ServerStateChanged(from_params(&method, params)?))
                }
                methods::SERVER_PROCESS_OUTPUT => {
                    Ok(RspEvent::ServerProcessOutput(from_params(&method, params)?))
                }
                _ => Ok(RspEvent::Unhandled { method }),
            },
            InboundMessage::Request { id, method, params } => match method.as_str() {
                methods::PROMPT_STRING => Ok(RspEvent::StringPrompt {
                    request_id: id,
                    prompt: from_params(&method, params)?,
                }),
                _ => Ok(RspEvent::Unhandled { method }),
            },
        }
    }
}

fn from_params<T: DeserializeOwned>(method: &str, params: Value) -> Result<T> {
    serde_json::from_value(params).map_err(|e| {
        Error::Serialization(format!("Failed to decode '{}' payload: {}", method, e))
    })
}

/// Turns a non-ok status into [`Error::Protocol`].
pub fn check_status(status: &Status) -> Result<()> {
    if status.is_ok() {
        Ok(())
    } else {
        Err(Error::Protocol(status.message.clone()))
    }
}

/// A typed client for the RSP server.
///
/// # Examples
///
/// ```no_run
/// use rsp_runner::client::RspClient;
/// use rsp_runner::transport::SocketTransport;
/// use rsp_runner::error::Result;
/// use std::time::Duration;
/// use tokio::sync::mpsc;
///
/// # async fn example() -> Result<()> {
/// let (inbound_tx, _inbound_rx) = mpsc::unbounded_channel();
/// let transport =
///     SocketTransport::connect("localhost", 27511, Duration::from_secs(60), inbound_tx).await?;
/// let client = RspClient::new(transport);
///
/// for handle in client.get_server_handles().await? {
///     println!("{} ({})", handle.id, handle.server_type.visible_name);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RspClient {
    transport: Arc<dyn Transport>,
}

impl RspClient {
    /// Creates a new client over the given transport.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
        }
    }

    /// Creates a client sharing an existing transport.
    pub fn from_shared(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Underlying transport.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    async fn request<P, R>(&self, method: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let params = serde_json::to_value(params).map_err(|e| {
            Error::Serialization(format!("Failed to serialize '{}' params: {}", method, e))
        })?;
        let result = self.transport.send_request(method, params).await?;
        serde_json::from_value(result).map_err(|e| {
            Error::Serialization(format!("Failed to deserialize '{}' result: {}", method, e))
        })
    }

    /// Lists the servers the RSP server already knows about.
    pub async fn get_server_handles(&self) -> Result<Vec<ServerHandle>> {
        let handles: Option<Vec<ServerHandle>> =
            self.request(methods::GET_SERVER_HANDLES, &Value::Null).await?;
        Ok(handles.unwrap_or_default())
    }

    /// Fetches the current state snapshot of one server.
    pub async fn get_server_state(&self, handle: &ServerHandle) -> Result<ServerState> {
        self.request(methods::GET_SERVER_STATE, handle).await
    }

    /// Looks for server installations at `path`.
    pub async fn find_server_beans(&self, path: &str) -> Result<Vec<ServerBean>> {
        let discovery = DiscoveryPath {
            filepath: path.to_string(),
        };
        let beans: Option<Vec<ServerBean>> =
            self.request(methods::FIND_SERVER_BEANS, &discovery).await?;
        Ok(beans.unwrap_or_default())
    }

    /// Asks the RSP server to create a server.
    pub async fn create_server(&self, attributes: &ServerAttributes) -> Result<CreateServerResponse> {
        self.request(methods::CREATE_SERVER, attributes).await
    }

    /// Server types the RSP server can create.
    pub async fn get_server_types(&self) -> Result<Vec<ServerType>> {
        let types: Option<Vec<ServerType>> =
            self.request(methods::GET_SERVER_TYPES, &Value::Null).await?;
        Ok(types.unwrap_or_default())
    }

    /// Runtimes the RSP server offers to download.
    pub async fn list_downloadable_runtimes(&self) -> Result<Vec<DownloadRuntimeDescription>> {
        let list: Option<ListDownloadRuntimeResponse> = self
            .request(methods::LIST_DOWNLOADABLE_RUNTIMES, &Value::Null)
            .await?;
        Ok(list.map(|list| list.runtimes).unwrap_or_default())
    }

    /// Sends one step of a runtime download.
    pub async fn download_runtime(
        &self,
        request: &DownloadSingleRuntimeRequest,
    ) -> Result<WorkflowResponse> {
        self.request(methods::DOWNLOAD_RUNTIME, request).await
    }

    /// Attributes that must be supplied when creating a server of `server_type`.
    pub async fn get_required_attributes(&self, server_type: &ServerType) -> Result<Attributes> {
        let attributes: Option<Attributes> = self
            .request(methods::GET_REQUIRED_ATTRIBUTES, server_type)
            .await?;
        Ok(attributes.unwrap_or_default())
    }

    /// Attributes that may be supplied when creating a server of `server_type`.
    pub async fn get_optional_attributes(&self, server_type: &ServerType) -> Result<Attributes> {
        let attributes: Option<Attributes> = self
            .request(methods::GET_OPTIONAL_ATTRIBUTES, server_type)
            .await?;
        Ok(attributes.unwrap_or_default())
    }

    /// Starts a server in the given mode.
    pub async fn start_server(
        &self,
        handle: &ServerHandle,
        mode: RunMode,
    ) -> Result<StartServerResponse> {
        let params = LaunchParameters {
            mode: mode.as_str().to_string(),
            params: ServerAttributes {
                id: handle.id.clone(),
                server_type: handle.server_type.id.clone(),
                attributes: BTreeMap::new(),
            },
        };
        self.request(methods::START_SERVER, &params).await
    }

    /// Stops a server.
    pub async fn stop_server(&self, id: &str, force: bool) -> Result<Status> {
        let params = StopServerAttributes {
            id: id.to_string(),
            force,
        };
        self.request(methods::STOP_SERVER, &params).await
    }

    /// Deletes a server.
    pub async fn delete_server(&self, handle: &ServerHandle) -> Result<Status> {
        self.request(methods::DELETE_SERVER, handle).await
    }

    /// Adds a deployable to a server.
    pub async fn add_deployable(&self, reference: &ServerDeployableReference) -> Result<Status> {
        self.request(methods::ADD_DEPLOYABLE, reference).await
    }

    /// Removes a deployable from a server.
    pub async fn remove_deployable(&self, reference: &ServerDeployableReference) -> Result<Status> {
        self.request(methods::REMOVE_DEPLOYABLE, reference).await
    }

    /// Deployment options the server understands.
    pub async fn list_deployment_options(&self, handle: &ServerHandle) -> Result<Attributes> {
        let attributes: Option<Attributes> = self
            .request(methods::LIST_DEPLOYMENT_OPTIONS, handle)
            .await?;
        Ok(attributes.unwrap_or_default())
    }

    /// Publishes a server's deployables.
    pub async fn publish(&self, request: &PublishServerRequest) -> Result<Status> {
        self.request(methods::PUBLISH, request).await
    }

    /// Answers a `client/promptString` request.
    pub async fn answer_prompt(&self, request_id: Value, answer: &str) -> Result<()> {
        self.transport
            .send_response(request_id, Value::String(answer.to_string()))
            .await
    }

    /// Tells the RSP server to shut itself down.
    pub async fn shutdown_server(&self) -> Result<()> {
        self.transport
            .send_notification(methods::SHUTDOWN, Value::Null)
            .await
    }
}
