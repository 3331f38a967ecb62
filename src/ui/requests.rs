//! Dispatching API requests and applying their results.
//!
//! User actions never call the server directly. They queue an [`ApiCall`];
//! [`DashboardApp::handle_pending_operations`] spawns queued calls at the start of
//! the next frame (tokio on native, the browser event loop on wasm) and drains
//! finished [`ApiOutcome`]s from the channel. Outcomes are applied on the UI
//! thread by [`DashboardApp::apply_outcome`], which is also what tests call.

use super::state::{ConnectionStatus, DashboardApp, GroupForm, NodeForm};
use crate::api::{ApiClient, ApiError, HistoricalQuery};
use crate::history;
use crate::layout::apply_layout;
use crate::notice::Severity;
use crate::poller::{reconcile, ValueReading};
use crate::types::*;
use eframe::egui;

/// A request waiting to be sent.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    /// Fetch nodes, groups and layouts
    LoadConfig,
    /// Create or update a node
    SaveNode(NodeRequest),
    /// Delete a node
    DeleteNode(NodeId),
    /// Create or update a group
    SaveGroup(GroupRequest),
    /// Delete a group
    DeleteGroup(GroupId),
    /// Replace the dashboard layout
    SaveLayout(Layout),
    /// Replace the SCADA elements
    SaveScadaLayout(Vec<ScadaElement>),
    /// Store the SCADA elements without one element, then drop it locally
    DeleteScadaElement {
        /// Element being removed
        element_id: String,
        /// Elements that remain
        remaining: Vec<ScadaElement>,
    },
    /// Write a value to a node's tag
    WriteValue {
        /// Node written to
        node_id: NodeId,
        /// Tag of the node
        ua_id: String,
        /// Request body
        write: ValueWrite,
        /// Value to restore when the write fails
        revert: Option<NodeValue>,
    },
    /// Read the current value of several nodes
    PollValues {
        /// Poller generation the tick belongs to
        generation: u64,
        /// `(node id, tag)` pairs to read
        targets: Vec<(NodeId, String)>,
    },
    /// Fetch historical samples
    Historical {
        /// Query parameters
        query: HistoricalQuery,
        /// Label used when samples carry no name
        fallback_label: String,
    },
    /// Store the OPC UA endpoint URL
    SetEndpoint(String),
    /// Connect the server to the OPC UA endpoint
    Connect(String),
    /// Disconnect the server from the OPC UA endpoint
    Disconnect(String),
}

impl ApiCall {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            ApiCall::LoadConfig => "config load".into(),
            ApiCall::SaveNode(r) => format!("node save ({})", r.name),
            ApiCall::DeleteNode(id) => format!("node delete ({id})"),
            ApiCall::SaveGroup(r) => format!("group save ({})", r.title),
            ApiCall::DeleteGroup(id) => format!("group delete ({id})"),
            ApiCall::SaveLayout(l) => format!("layout save ({} entries)", l.len()),
            ApiCall::SaveScadaLayout(e) => format!("SCADA layout save ({} elements)", e.len()),
            ApiCall::DeleteScadaElement { element_id, .. } => format!("SCADA element delete ({element_id})"),
            ApiCall::WriteValue { ua_id, .. } => format!("value write ({ua_id})"),
            ApiCall::PollValues { generation, targets } => {
                format!("value poll ({} nodes, generation {generation})", targets.len())
            }
            ApiCall::Historical { query, .. } => format!("historical query ({})", query.node_id),
            ApiCall::SetEndpoint(url) => format!("endpoint save ({url})"),
            ApiCall::Connect(url) => format!("connect ({url})"),
            ApiCall::Disconnect(url) => format!("disconnect ({url})"),
        }
    }

    /// Performs the request.
    pub async fn execute(self, client: ApiClient) -> ApiOutcome {
        match self {
            ApiCall::LoadConfig => ApiOutcome::ConfigLoaded(client.fetch_config().await),
            ApiCall::SaveNode(request) => ApiOutcome::NodeSaved {
                updated: request.id.is_some(),
                result: client.save_node(&request).await,
            },
            ApiCall::DeleteNode(id) => {
                let result = client.delete_node(&id).await;
                ApiOutcome::NodeDeleted { id, result }
            }
            ApiCall::SaveGroup(request) => ApiOutcome::GroupSaved {
                updated: request.id.is_some(),
                result: client.save_group(&request).await,
            },
            ApiCall::DeleteGroup(id) => {
                let result = client.delete_group(&id).await;
                ApiOutcome::GroupDeleted { id, result }
            }
            ApiCall::SaveLayout(layout) => ApiOutcome::LayoutSaved(client.save_layout(&layout).await),
            ApiCall::SaveScadaLayout(elements) => {
                ApiOutcome::ScadaLayoutSaved(client.save_scada_layout(&elements).await)
            }
            ApiCall::DeleteScadaElement { element_id, remaining } => {
                let result = client.save_scada_layout(&remaining).await;
                ApiOutcome::ScadaElementDeleted { element_id, result }
            }
            ApiCall::WriteValue {
                node_id,
                ua_id,
                write,
                revert,
            } => {
                let result = client.write_value(&ua_id, &write).await;
                ApiOutcome::ValueWritten { node_id, revert, result }
            }
            ApiCall::PollValues { generation, targets } => {
                let reads = targets.into_iter().map(|(id, ua_id)| {
                    let client = client.clone();
                    async move {
                        let reading = ValueReading::from(client.read_value(&ua_id).await);
                        (id, reading)
                    }
                });
                let readings = futures::future::join_all(reads).await;
                ApiOutcome::ValuesPolled { generation, readings }
            }
            ApiCall::Historical { query, fallback_label } => ApiOutcome::HistoricalLoaded {
                fallback_label,
                result: client.historical_data(&query).await,
            },
            ApiCall::SetEndpoint(url) => ApiOutcome::EndpointSaved(client.set_endpoint(&url).await),
            ApiCall::Connect(url) => ApiOutcome::Connected(client.connect(&url).await),
            ApiCall::Disconnect(url) => ApiOutcome::Disconnected(client.disconnect(&url).await),
        }
    }
}

/// A finished request, sent back to the UI thread.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiOutcome {
    /// Result of [`ApiCall::LoadConfig`]
    ConfigLoaded(Result<AppConfig, ApiError>),
    /// Result of [`ApiCall::SaveNode`]
    NodeSaved {
        /// Whether an existing node was updated
        updated: bool,
        /// Node record returned by the server
        result: Result<Node, ApiError>,
    },
    /// Result of [`ApiCall::DeleteNode`]
    NodeDeleted {
        /// Node that was deleted
        id: NodeId,
        /// Server reply
        result: Result<MessageResponse, ApiError>,
    },
    /// Result of [`ApiCall::SaveGroup`]
    GroupSaved {
        /// Whether an existing group was updated
        updated: bool,
        /// Group record returned by the server
        result: Result<Group, ApiError>,
    },
    /// Result of [`ApiCall::DeleteGroup`]
    GroupDeleted {
        /// Group that was deleted
        id: GroupId,
        /// Server reply
        result: Result<MessageResponse, ApiError>,
    },
    /// Result of [`ApiCall::SaveLayout`]
    LayoutSaved(Result<MessageResponse, ApiError>),
    /// Result of [`ApiCall::SaveScadaLayout`]
    ScadaLayoutSaved(Result<MessageResponse, ApiError>),
    /// Result of [`ApiCall::DeleteScadaElement`]
    ScadaElementDeleted {
        /// Element that was removed
        element_id: String,
        /// Server reply
        result: Result<MessageResponse, ApiError>,
    },
    /// Result of [`ApiCall::WriteValue`]
    ValueWritten {
        /// Node written to
        node_id: NodeId,
        /// Value to restore on failure
        revert: Option<NodeValue>,
        /// Server reply
        result: Result<MessageResponse, ApiError>,
    },
    /// Result of [`ApiCall::PollValues`]
    ValuesPolled {
        /// Poller generation the tick belongs to
        generation: u64,
        /// One reading per requested node
        readings: Vec<(NodeId, ValueReading)>,
    },
    /// Result of [`ApiCall::Historical`]
    HistoricalLoaded {
        /// Label used when samples carry no name
        fallback_label: String,
        /// Samples returned by the server
        result: Result<Vec<HistoricalSample>, ApiError>,
    },
    /// Result of [`ApiCall::SetEndpoint`]
    EndpointSaved(Result<MessageResponse, ApiError>),
    /// Result of [`ApiCall::Connect`]
    Connected(Result<MessageResponse, ApiError>),
    /// Result of [`ApiCall::Disconnect`]
    Disconnected(Result<MessageResponse, ApiError>),
}

/// Status message shown when a connection request produced no usable reply.
pub const CONNECTION_FAILURE_MESSAGE: &str = "Network error or server response issue.";

impl DashboardApp {
    /// Applies finished requests and dispatches queued ones.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The egui context, cloned into tasks so they can request a repaint
    pub fn handle_pending_operations(&mut self, ctx: &egui::Context) {
        while let Ok(outcome) = self.requests.receiver.try_recv() {
            self.apply_outcome(outcome);
        }

        if self.requests.outbox.is_empty() {
            return;
        }
        let client = self.api_client();
        for call in std::mem::take(&mut self.requests.outbox) {
            log::debug!("Dispatching {}", call.describe());
            let sender = self.requests.sender.clone();
            let client = client.clone();
            let ctx = ctx.clone();
            let task = async move {
                let outcome = call.execute(client).await;
                // The receiver only goes away when the app is shutting down
                let _ = sender.send(outcome);
                ctx.request_repaint();
            };

            #[cfg(not(target_arch = "wasm32"))]
            {
                tokio::spawn(task);
            }

            #[cfg(target_arch = "wasm32")]
            {
                wasm_bindgen_futures::spawn_local(task);
            }
        }
    }

    /// Shows a failed request once as an error notice and returns the value on success.
    pub fn surface<T>(&mut self, result: Result<T, ApiError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) => {
                self.notice.show(format!("Error: {err}"), Severity::Error, self.now);
                None
            }
        }
    }

    fn success(&mut self, message: impl Into<String>) {
        self.notice.show(message, Severity::Success, self.now);
    }

    /// Applies one finished request to the app state.
    pub fn apply_outcome(&mut self, outcome: ApiOutcome) {
        match outcome {
            ApiOutcome::ConfigLoaded(result) => {
                if let Some(config) = self.surface(result) {
                    self.load_config(config);
                }
            }
            ApiOutcome::NodeSaved { updated, result } => {
                self.node_form.pending = false;
                let Some(node) = self.surface(result) else {
                    return;
                };
                let verb = if updated { "updated" } else { "added" };
                let message = format!("Node \"{}\" {verb} successfully!", node.name);
                self.merge_node(node);
                self.node_form = NodeForm::default();
                self.success(message);
            }
            ApiOutcome::NodeDeleted { id, result } => {
                if self.surface(result).is_some() {
                    self.nodes.retain(|n| n.id != id);
                    self.layout.remove(&id);
                    self.live.forget(&id);
                    self.control_rects.remove(&id);
                    self.success("Node deleted successfully!");
                }
            }
            ApiOutcome::GroupSaved { updated, result } => {
                self.group_form.pending = false;
                let Some(group) = self.surface(result) else {
                    return;
                };
                let verb = if updated { "updated" } else { "added" };
                let message = format!("Group \"{}\" {verb} successfully!", group.title);
                self.merge_group(group);
                self.group_form = GroupForm::default();
                self.success(message);
            }
            ApiOutcome::GroupDeleted { id, result } => {
                if self.surface(result).is_some() {
                    self.groups.retain(|g| g.id != id);
                    for node in self.nodes.iter_mut().filter(|n| n.group_id.as_deref() == Some(id.as_str())) {
                        node.group_id = None;
                    }
                    self.layout.remove(&id);
                    self.control_rects.remove(&id);
                    self.success("Group deleted successfully!");
                    self.queue(ApiCall::LoadConfig);
                }
            }
            ApiOutcome::LayoutSaved(result) => {
                if self.surface(result).is_some() {
                    self.success("Layout saved successfully!");
                }
            }
            ApiOutcome::ScadaLayoutSaved(result) => {
                if self.surface(result).is_some() {
                    self.success("SCADA layout saved successfully!");
                }
            }
            ApiOutcome::ScadaElementDeleted { element_id, result } => {
                if self.surface(result).is_some() {
                    self.scada_elements.retain(|e| e.id != element_id);
                    self.control_rects.remove(&element_id);
                    self.live.text_buffers.retain(|k, _| k.element_id != element_id);
                    self.success("Element removed successfully!");
                }
            }
            ApiOutcome::ValueWritten { node_id, revert, result } => match result {
                Ok(_) => log::info!("Value written to node {node_id}"),
                Err(err) => {
                    if let (Some(previous), Some(node)) =
                        (revert, self.nodes.iter_mut().find(|n| n.id == node_id))
                    {
                        node.value = Some(previous);
                    }
                    self.surface::<()>(Err(err));
                }
            },
            ApiOutcome::ValuesPolled { generation, readings } => {
                if self.poller.accept(generation) {
                    let updated = reconcile(&mut self.nodes, &mut self.live, readings);
                    log::trace!("Poll generation {generation} updated {updated} nodes");
                }
            }
            ApiOutcome::HistoricalLoaded { fallback_label, result } => {
                self.historical.loading = false;
                let Some(samples) = self.surface(result) else {
                    self.historical.series = None;
                    return;
                };
                self.historical.series = history::build_series(&samples, &fallback_label);
                if self.historical.series.is_none() {
                    self.notice.show(
                        "No historical data available for the selected node and time range.",
                        Severity::Info,
                        self.now,
                    );
                }
            }
            ApiOutcome::EndpointSaved(result) => {
                if let Some(reply) = self.surface(result) {
                    let message = reply.message.unwrap_or_else(|| "OPC UA endpoint saved.".into());
                    self.success(message);
                }
            }
            ApiOutcome::Connected(result) => {
                self.apply_connection_reply(result, "Successfully connected", ConnectionStatus::Connected);
            }
            ApiOutcome::Disconnected(result) => {
                self.apply_connection_reply(result, "Disconnected", ConnectionStatus::Disconnected);
            }
        }
    }

    /// Replaces all server-owned records with a freshly loaded configuration.
    fn load_config(&mut self, config: AppConfig) {
        let AppConfig {
            opcua_endpoint,
            mut nodes,
            mut groups,
            layout,
            scada_layout,
        } = config;
        apply_layout(&mut nodes, &mut groups, &layout);
        log::info!(
            "Loaded {} nodes, {} groups, {} SCADA elements",
            nodes.len(),
            groups.len(),
            scada_layout.len()
        );
        self.nodes = nodes;
        self.groups = groups;
        self.layout = layout;
        self.scada_elements = scada_layout;
        if let Some(id) = self.drag.active_id() {
            let exists = self.nodes.iter().any(|n| n.id == id)
                || self.groups.iter().any(|g| g.id == id)
                || self.scada_elements.iter().any(|e| e.id == id);
            if !exists {
                log::debug!("Cancelling drag of {id}: element no longer exists");
                self.drag.cancel();
            }
        }
        self.live.status.retain(|id, _| self.nodes.iter().any(|n| &n.id == id));
        if let Some(endpoint) = opcua_endpoint {
            if self.configure.endpoint_url.trim().is_empty() {
                self.configure.endpoint_url = endpoint;
            }
        }
        self.config_loaded = true;
    }

    /// Merges a saved node into the list: fields of an existing record are
    /// replaced but its position and live value are kept.
    fn merge_node(&mut self, saved: Node) {
        match self.nodes.iter_mut().find(|n| n.id == saved.id) {
            Some(existing) => {
                existing.name = saved.name;
                existing.node_type = saved.node_type;
                existing.node_ua_id = saved.node_ua_id;
                existing.unit = saved.unit;
                existing.group_id = saved.group_id;
                existing.size = saved.size;
            }
            None => {
                let mut node = saved;
                if let Some(entry) = self.layout.get(&node.id) {
                    node.x = entry.x;
                    node.y = entry.y;
                }
                self.nodes.push(node);
            }
        }
    }

    fn merge_group(&mut self, saved: Group) {
        match self.groups.iter_mut().find(|g| g.id == saved.id) {
            Some(existing) => {
                existing.title = saved.title;
                existing.size = saved.size;
            }
            None => self.groups.push(saved),
        }
    }

    fn apply_connection_reply(
        &mut self,
        result: Result<MessageResponse, ApiError>,
        success_marker: &str,
        success_status: ConnectionStatus,
    ) {
        let Some(reply) = self.surface(result) else {
            self.configure.status = ConnectionStatus::Failed(CONNECTION_FAILURE_MESSAGE.into());
            return;
        };
        match reply.message {
            Some(message) if message.contains(success_marker) => {
                self.configure.status = success_status;
                self.success(message);
            }
            other => {
                let reason = other
                    .or(reply.error)
                    .unwrap_or_else(|| CONNECTION_FAILURE_MESSAGE.to_string());
                self.configure.status = ConnectionStatus::Failed(reason.clone());
                self.notice.show(format!("Error: {reason}"), Severity::Error, self.now);
            }
        }
    }
}
