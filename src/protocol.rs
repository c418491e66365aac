//! Remote Server Protocol data types.
//!
//! These mirror the JSON shapes exchanged with the RSP server (camelCase
//! field names, integer run/publish states). They are plain data; the state
//! model decides what to do with them.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Attribute key the RSP server uses for a server's install directory.
pub const SERVER_HOME_DIR: &str = "server.home.dir";

/// Lifecycle state shared by servers and deployables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum RunState {
    #[default]
    Unknown,
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl RunState {
    /// Display name, also used as the tree item context value.
    pub fn as_str(&self) -> &'static str {
        match self {
            RunState::Unknown => "Unknown",
            RunState::Starting => "Starting",
            RunState::Started => "Started",
            RunState::Stopping => "Stopping",
            RunState::Stopped => "Stopped",
        }
    }
}

impl TryFrom<i32> for RunState {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(RunState::Unknown),
            1 => Ok(RunState::Starting),
            2 => Ok(RunState::Started),
            3 => Ok(RunState::Stopping),
            4 => Ok(RunState::Stopped),
            other => Err(format!("invalid run state {}", other)),
        }
    }
}

impl From<RunState> for i32 {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Unknown => 0,
            RunState::Starting => 1,
            RunState::Started => 2,
            RunState::Stopping => 3,
            RunState::Stopped => 4,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Publish state codes used by the RSP server.
pub mod publish_state {
    pub const NONE: i32 = 1;
    pub const INCREMENTAL: i32 = 2;
    pub const FULL: i32 = 3;
    pub const ADD: i32 = 4;
    pub const REMOVE: i32 = 5;
    pub const UNKNOWN: i32 = 6;

    /// Human readable name of a publish state code.
    pub fn label(code: i32) -> &'static str {
        match code {
            NONE => "Synchronized",
            INCREMENTAL => "Publish Required",
            FULL => "Full Publish Required",
            ADD => "Ready to Publish",
            REMOVE => "Ready to Remove",
            _ => "Unknown",
        }
    }
}

/// Publish request kinds.
pub mod publish_kind {
    pub const INCREMENTAL: i32 = 1;
    pub const FULL: i32 = 2;
    pub const CLEAN: i32 = 3;
    pub const AUTO: i32 = 4;
}

/// Mode a server is started in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Run,
    Debug,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Run => "run",
            RunMode::Debug => "debug",
        }
    }
}

/// Descriptor of a server adapter kind. Supplied by the RSP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerType {
    pub id: String,
    pub visible_name: String,
    #[serde(default)]
    pub description: String,
}

/// Identifies a managed server instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerHandle {
    pub id: String,
    #[serde(rename = "type")]
    pub server_type: ServerType,
}

/// Reference to a deployable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployableReference {
    pub label: String,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<BTreeMap<String, String>>,
}

/// State of one deployable on a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployableState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerHandle>,
    pub reference: DeployableReference,
    pub state: RunState,
    pub publish_state: i32,
}

/// Full state snapshot of a server, as carried by `client/serverStateChanged`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerState {
    pub server: ServerHandle,
    pub state: RunState,
    #[serde(default)]
    pub publish_state: i32,
    #[serde(default)]
    pub run_mode: RunMode,
    #[serde(default)]
    pub deployable_states: Vec<DeployableState>,
}

impl ServerState {
    /// Initial state of a freshly inserted server.
    pub fn initial(server: ServerHandle) -> Self {
        Self {
            server,
            state: RunState::Unknown,
            publish_state: 0,
            run_mode: RunMode::Run,
            deployable_states: Vec::new(),
        }
    }
}

/// Output stream a process output line came from.
pub mod stream_type {
    pub const STDOUT: i32 = 1;
    pub const STDERR: i32 = 2;
}

/// Text appended by a managed server process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProcessOutput {
    pub server: ServerHandle,
    #[serde(default)]
    pub process_id: String,
    #[serde(default)]
    pub stream_type: i32,
    pub text: String,
}

/// A server candidate discovered at a filesystem location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerBean {
    pub location: String,
    pub type_category: String,
    pub specific_type: String,
    pub name: String,
    pub version: String,
    pub full_version: String,
    pub server_adapter_type_id: String,
}

/// Request body for `server/findServerBeans`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryPath {
    pub filepath: String,
}

/// Request body for `server/createServer`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerAttributes {
    pub id: String,
    pub server_type: String,
    pub attributes: BTreeMap<String, serde_json::Value>,
}

/// Result status of an RSP request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Status {
    pub severity: i32,
    pub plugin: String,
    pub code: i32,
    pub message: String,
    pub trace: String,
    pub ok: bool,
}

impl Status {
    pub const OK: i32 = 0;
    pub const INFO: i32 = 1;
    pub const WARNING: i32 = 2;
    /// Severity values at or above this are failures.
    pub const ERROR: i32 = 4;
    /// The user or the server gave up on the request.
    pub const CANCEL: i32 = 8;

    pub fn is_ok(&self) -> bool {
        self.ok || self.severity == 0
    }

    /// Convenience constructor for a successful status.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ok: true,
            ..Self::default()
        }
    }

    /// Convenience constructor for a failed status.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            severity: Self::ERROR,
            message: message.into(),
            ok: false,
            ..Self::default()
        }
    }
}

/// Response to `server/createServer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServerResponse {
    pub status: Status,
    #[serde(default)]
    pub invalid_keys: Vec<String>,
}

/// Descriptor of one server or deployment attribute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Attribute {
    #[serde(rename = "type")]
    pub attr_type: String,
    pub description: String,
    pub default_val: Option<serde_json::Value>,
    pub secret: bool,
}

/// A keyed set of attribute descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Attributes {
    pub attributes: BTreeMap<String, Attribute>,
}

/// Request body for `server/startServerAsync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaunchParameters {
    pub mode: String,
    pub params: ServerAttributes,
}

/// Response to `server/startServerAsync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartServerResponse {
    pub status: Status,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

/// Request body for `server/stopServerAsync`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StopServerAttributes {
    pub id: String,
    pub force: bool,
}

/// Request body for deployable add/remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerDeployableReference {
    pub server: ServerHandle,
    #[serde(rename = "deployableReference")]
    pub deployable_reference: DeployableReference,
}

/// Request body for `server/publish`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishServerRequest {
    pub server: ServerHandle,
    pub kind: i32,
}

/// A string the RSP server asks the user for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StringPrompt {
    pub id: i32,
    pub code: i32,
    pub prompt: String,
    pub secret: bool,
}

/// A runtime the RSP server can download and install.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct DownloadRuntimeDescription {
    pub id: String,
    pub name: String,
    pub version: String,
    pub url: String,
    #[serde(rename = "licenseURL")]
    pub license_url: String,
    pub installation_method: String,
    pub size: String,
    pub properties: BTreeMap<String, String>,
}

/// Response to `server/listDownloadableRuntimes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ListDownloadRuntimeResponse {
    pub runtimes: Vec<DownloadRuntimeDescription>,
}

/// One step of `server/downloadRuntime`.
///
/// The first request carries no `requestId`; later ones echo the id from
/// the previous [`WorkflowResponse`] along with the answers in `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadSingleRuntimeRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<i64>,
    pub download_runtime_id: String,
    #[serde(default)]
    pub data: BTreeMap<String, serde_json::Value>,
}

/// Input the server wants for one workflow item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowPromptDetails {
    /// `none`, `bool`, `int` or `string`
    pub response_type: String,
    pub response_secret: bool,
    pub valid_responses: Vec<String>,
}

/// Something to show, and maybe ask, during a multi-step workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowResponseItem {
    pub id: String,
    pub item_type: String,
    pub label: String,
    pub content: String,
    pub prompt: Option<WorkflowPromptDetails>,
    pub properties: BTreeMap<String, String>,
}

/// Answer to one step of a multi-step workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct WorkflowResponse {
    pub status: Status,
    pub request_id: i64,
    pub items: Vec<WorkflowResponseItem>,
}
