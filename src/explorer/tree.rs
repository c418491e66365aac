//! Read surface for the tree-style UI.
use crate::protocol::{DeployableState, ServerHandle, ServerState, publish_state};

/// A node of the servers tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    /// A managed server
    Server(ServerHandle),
    /// A deployable of `server`, as of the last state snapshot
    Deployable {
        server: ServerHandle,
        state: DeployableState,
    },
}

impl TreeNode {
    /// Id of the server the node belongs to.
    pub fn server_id(&self) -> &str {
        match self {
            TreeNode::Server(handle) => &handle.id,
            TreeNode::Deployable { server, .. } => &server.id,
        }
    }
}

/// How a node is initially displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collapsible {
    None,
    Collapsed,
    Expanded,
}

/// What the UI renders for a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeItem {
    pub label: String,
    /// Drives which commands the UI offers, e.g. `"Stopped"`.
    pub context_value: String,
    pub collapsible: Collapsible,
}

impl TreeItem {
    pub(crate) fn for_server(state: &ServerState) -> Self {
        Self {
            label: format!(
                "{} ({}) ({})",
                state.server.id,
                state.state,
                publish_state::label(state.publish_state)
            ),
            context_value: state.state.as_str().to_string(),
            collapsible: Collapsible::Expanded,
        }
    }

    pub(crate) fn for_deployable(state: &DeployableState) -> Self {
        Self {
            label: format!(
                "{} ({}) ({})",
                state.reference.label,
                state.state,
                publish_state::label(state.publish_state)
            ),
            context_value: state.state.as_str().to_string(),
            collapsible: Collapsible::None,
        }
    }
}
