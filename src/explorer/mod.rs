//! Client-side mirror of the servers managed by the RSP server.
//!
//! The [`ServerExplorer`] owns the [`ServerModel`] and the
//! [`OutputMultiplexer`] and is the single writer of both. Mutations only
//! arrive through its entry points, which the dispatcher calls for every
//! inbound notification in arrival order. Observers read the tree through
//! [`ServerExplorer::get_children`] / [`ServerExplorer::get_tree_item`] after
//! each [`RefreshEvent`].
//!
//! # Example
//!
//! ```
//! use rsp_runner::explorer::{InMemoryOutputWindow, RefreshEvent, ServerExplorer};
//! use rsp_runner::protocol::{RunState, ServerHandle, ServerState, ServerType};
//! use std::sync::Arc;
//!
//! let mut explorer = ServerExplorer::new(Arc::new(InMemoryOutputWindow::new()), false);
//! let mut refreshes = explorer.subscribe();
//!
//! let handle = ServerHandle {
//!     id: "s1".to_string(),
//!     server_type: ServerType {
//!         id: "org.jboss.ide.eclipse.as.wildfly".to_string(),
//!         visible_name: "WildFly".to_string(),
//!         description: String::new(),
//!     },
//! };
//! explorer.insert_server(handle.clone()).unwrap();
//! assert_eq!(refreshes.try_recv().unwrap(), RefreshEvent::All);
//!
//! let mut state = ServerState::initial(handle);
//! state.state = RunState::Stopped;
//! explorer.update_server(state).unwrap();
//!
//! let children = explorer.get_children(None);
//! let item = explorer.get_tree_item(&children[0]).unwrap();
//! assert_eq!(item.context_value, "Stopped");
//! ```
pub mod model;
pub mod output;
pub mod tree;

pub use model::ServerModel;
pub use output::{
    ChannelRecord, InMemoryOutputWindow, OutputChannel, OutputMultiplexer, OutputWindow,
    server_channel_name,
};
pub use tree::{Collapsible, TreeItem, TreeNode};

use crate::error::{Error, Result};
use crate::protocol::{RunState, ServerHandle, ServerState};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Capacity of the refresh broadcast channel.
const REFRESH_CAPACITY: usize = 256;

/// Change notification for tree observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshEvent {
    /// The whole tree is invalid
    All,
    /// Only the subtree of this server changed
    Server(String),
}

/// Explorer shared between the dispatcher and the workflows.
pub type SharedExplorer = Arc<Mutex<ServerExplorer>>;

/// Locks a shared explorer.
pub fn lock(explorer: &SharedExplorer) -> Result<MutexGuard<'_, ServerExplorer>> {
    explorer
        .lock()
        .map_err(|_| Error::Other("Failed to lock server explorer".to_string()))
}

/// State model plus output channels of every managed server.
pub struct ServerExplorer {
    model: ServerModel,
    outputs: OutputMultiplexer,
    refresh_tx: broadcast::Sender<RefreshEvent>,
}

impl ServerExplorer {
    /// Creates an empty explorer.
    ///
    /// `show_on_output` brings a server's channel to the foreground whenever
    /// output arrives for it.
    pub fn new(window: Arc<dyn OutputWindow>, show_on_output: bool) -> Self {
        let (refresh_tx, _) = broadcast::channel(REFRESH_CAPACITY);
        Self {
            model: ServerModel::new(),
            outputs: OutputMultiplexer::new(window, show_on_output),
            refresh_tx,
        }
    }

    /// Wraps the explorer for sharing.
    pub fn into_shared(self) -> SharedExplorer {
        Arc::new(Mutex::new(self))
    }

    /// Subscribes to refresh events.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.refresh_tx.subscribe()
    }

    /// Read access to the registry.
    pub fn model(&self) -> &ServerModel {
        &self.model
    }

    pub fn has_output_channel(&self, server_id: &str) -> bool {
        self.outputs.has_channel(server_id)
    }

    /// Registers a server. Inserting a known id is a no-op.
    pub fn insert_server(&mut self, handle: ServerHandle) -> Result<()> {
        require_id(&handle.id)?;
        let server_id = handle.id.clone();
        if self.model.insert(handle) {
            tracing::info!(server_id = %server_id, "Server added");
            self.refresh(None);
        } else {
            tracing::debug!(server_id = %server_id, "Ignoring duplicate server");
        }
        Ok(())
    }

    /// Applies a full state snapshot.
    ///
    /// Snapshots for servers that are not registered are dropped; they are
    /// expected when a removal races with in-flight notifications. A
    /// snapshot in the `Starting` state clears the server's output channel.
    pub fn update_server(&mut self, state: ServerState) -> Result<()> {
        require_id(&state.server.id)?;
        let server_id = state.server.id.clone();
        let run_state = state.state;

        if !self.model.update(state) {
            tracing::debug!(server_id = %server_id, "Dropping state change for unknown server");
            return Ok(());
        }

        tracing::debug!(server_id = %server_id, state = %run_state, "Server state changed");
        if run_state == RunState::Starting && self.outputs.clear(&server_id) {
            tracing::debug!(server_id = %server_id, "Cleared output of restarting server");
        }
        self.refresh(Some(&server_id));
        Ok(())
    }

    /// Unregisters a server and disposes its output channel.
    pub fn remove_server(&mut self, handle: &ServerHandle) -> Result<()> {
        require_id(&handle.id)?;
        if self.model.remove(&handle.id).is_none() {
            tracing::debug!(server_id = %handle.id, "Ignoring removal of unknown server");
            return Ok(());
        }

        self.outputs.dispose(&handle.id);
        tracing::info!(server_id = %handle.id, "Server removed");
        self.refresh(None);
        Ok(())
    }

    /// Routes process output of a registered server to its channel.
    ///
    /// Output for unknown servers is dropped so that late output never
    /// brings back the channel of a removed server.
    pub fn add_server_output(&mut self, server_id: &str, text: &str) {
        if !self.model.contains(server_id) {
            tracing::debug!(server_id = %server_id, "Dropping output for unknown server");
            return;
        }
        self.outputs.append(server_id, text);
    }

    /// Shows the output channel of a server, if it has one.
    pub fn show_output(&mut self, server_id: &str) {
        if !self.outputs.show(server_id) {
            tracing::debug!(server_id = %server_id, "No output to show");
        }
    }

    /// Children of `parent`: servers at the root, deployables below a server.
    pub fn get_children(&self, parent: Option<&TreeNode>) -> Vec<TreeNode> {
        match parent {
            None => self
                .model
                .handles()
                .iter()
                .cloned()
                .map(TreeNode::Server)
                .collect(),
            Some(TreeNode::Server(handle)) => self
                .model
                .state(&handle.id)
                .map(|state| {
                    state
                        .deployable_states
                        .iter()
                        .map(|deployable| TreeNode::Deployable {
                            server: handle.clone(),
                            state: deployable.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
            Some(TreeNode::Deployable { .. }) => Vec::new(),
        }
    }

    /// Display data for a node; `None` if its server is gone.
    pub fn get_tree_item(&self, node: &TreeNode) -> Option<TreeItem> {
        match node {
            TreeNode::Server(handle) => self.model.state(&handle.id).map(TreeItem::for_server),
            TreeNode::Deployable { server, state } => self
                .model
                .contains(&server.id)
                .then(|| TreeItem::for_deployable(state)),
        }
    }

    /// Tells observers that the tree, or one server's subtree, changed.
    pub fn refresh(&self, scope: Option<&str>) {
        let event = match scope {
            Some(server_id) => RefreshEvent::Server(server_id.to_string()),
            None => RefreshEvent::All,
        };
        // No subscribers is fine
        let _ = self.refresh_tx.send(event);
    }

    /// Disposes every output channel. Used at teardown.
    pub fn dispose(&mut self) {
        self.outputs.dispose_all();
    }
}

fn require_id(server_id: &str) -> Result<()> {
    if server_id.trim().is_empty() {
        return Err(Error::Precondition(
            "Server handle with an empty id".to_string(),
        ));
    }
    Ok(())
}
