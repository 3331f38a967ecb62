//! Application state management structures.
//!
//! Everything the UI thread owns lives in [`DashboardApp`]: the records loaded
//! from the server, the in-progress drag, live value bookkeeping, open forms and
//! the queue of requests waiting to be dispatched. Only user preferences and
//! client configuration are persisted; the rest is reloaded from the server.

use super::requests::{ApiCall, ApiOutcome};
use crate::api::ApiClient;
use crate::constants::*;
use crate::drag::DragController;
use crate::history::HistoricalSeries;
use crate::notice::Notice;
use crate::poller::{LiveValues, Poller};
use crate::settings::Settings;
use crate::types::*;
use eframe::egui;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::Duration;

/// Top-level pages of the application.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum View {
    /// Node and group cards on a draggable canvas
    #[default]
    Dashboard,
    /// Supervisory display with palette elements
    Scada,
    /// Historical chart of one node
    Historical,
    /// OPC UA endpoint configuration
    Configure,
}

impl View {
    /// All views, in toolbar order.
    pub const ALL: [View; 4] = [View::Dashboard, View::Scada, View::Historical, View::Configure];

    /// Toolbar label.
    pub fn label(&self) -> &'static str {
        match self {
            View::Dashboard => "Dashboard",
            View::Scada => "SCADA",
            View::Historical => "Historical",
            View::Configure => "Configure",
        }
    }

    /// Whether the view shows live values.
    pub fn polls_values(&self) -> bool {
        matches!(self, View::Dashboard | View::Scada)
    }
}

/// Server connection and timing preferences.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the dashboard server; empty means same origin
    pub base_url: String,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
    /// Live value refresh interval on the dashboard, in seconds
    pub dashboard_poll_secs: f64,
    /// Live value refresh interval on the SCADA view, in seconds
    pub scada_poll_secs: f64,
    /// Snap dragged elements to the grid
    pub snap_to_grid: bool,
    /// Save the layout after every committed drag
    pub auto_save_layout: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: if cfg!(target_arch = "wasm32") {
                String::new()
            } else {
                DEFAULT_BASE_URL.to_string()
            },
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            dashboard_poll_secs: DASHBOARD_POLL_INTERVAL_SECS,
            scada_poll_secs: SCADA_POLL_INTERVAL_SECS,
            snap_to_grid: false,
            auto_save_layout: false,
        }
    }
}

impl ClientConfig {
    /// Poll interval for `view`.
    pub fn poll_interval(&self, view: View) -> f64 {
        match view {
            View::Scada => self.scada_poll_secs,
            _ => self.dashboard_poll_secs,
        }
    }
}

/// Add/Edit node form.
#[derive(Debug, Clone, Default)]
pub struct NodeForm {
    /// Whether the form window is shown
    pub open: bool,
    /// Node being edited; `None` when adding
    pub editing: Option<NodeId>,
    /// Display name
    pub name: String,
    /// Display/control kind
    pub node_type: NodeType,
    /// Preset card size
    pub size: ElementSize,
    /// External tag reference
    pub node_ua_id: String,
    /// Engineering unit
    pub unit: String,
    /// Group membership
    pub group_id: Option<GroupId>,
    /// A save request is outstanding
    pub pending: bool,
}

impl NodeForm {
    /// Form prefilled with an existing node.
    pub fn edit(node: &Node) -> Self {
        Self {
            open: true,
            editing: Some(node.id.clone()),
            name: node.name.clone(),
            node_type: node.node_type,
            size: node.size,
            node_ua_id: node.node_ua_id.clone(),
            unit: node.unit.clone().unwrap_or_default(),
            group_id: node.group_id.clone(),
            pending: false,
        }
    }

    /// Request body for the current form contents.
    pub fn to_request(&self) -> NodeRequest {
        let unit = self.unit.trim();
        NodeRequest {
            id: self.editing.clone(),
            name: self.name.trim().to_string(),
            node_type: self.node_type,
            node_ua_id: self.node_ua_id.trim().to_string(),
            size: self.size,
            group_id: self.group_id.clone(),
            unit: (!unit.is_empty()).then(|| unit.to_string()),
        }
    }
}

/// Add/Edit group form.
#[derive(Debug, Clone, Default)]
pub struct GroupForm {
    /// Whether the form window is shown
    pub open: bool,
    /// Group being edited; `None` when adding
    pub editing: Option<GroupId>,
    /// Section heading
    pub title: String,
    /// Preset section size
    pub size: ElementSize,
    /// A save request is outstanding
    pub pending: bool,
}

impl GroupForm {
    /// Form prefilled with an existing group.
    pub fn edit(group: &Group) -> Self {
        Self {
            open: true,
            editing: Some(group.id.clone()),
            title: group.title.clone(),
            size: group.size,
            pending: false,
        }
    }

    /// Request body for the current form contents.
    pub fn to_request(&self) -> GroupRequest {
        GroupRequest {
            id: self.editing.clone(),
            title: self.title.trim().to_string(),
            size: self.size,
        }
    }
}

/// SCADA palette selection.
#[derive(Debug, Clone, Default)]
pub struct ScadaPalette {
    /// Node the next element will be bound to
    pub node_id: Option<NodeId>,
    /// Widget kind of the next element
    pub element_type: ScadaElementType,
}

/// Destructive actions awaiting confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingConfirm {
    /// Delete a node
    DeleteNode(NodeId),
    /// Delete a group (member nodes are kept)
    DeleteGroup(GroupId),
    /// Delete a SCADA element
    DeleteScadaElement(String),
}

/// Historical page state.
#[derive(Debug, Clone, Default)]
pub struct HistoricalState {
    /// Node to chart
    pub node_id: Option<NodeId>,
    /// Start date, `YYYY-MM-DD`
    pub start_date: String,
    /// End date, `YYYY-MM-DD`
    pub end_date: String,
    /// Series currently charted
    pub series: Option<HistoricalSeries>,
    /// A query is outstanding
    pub loading: bool,
}

/// State of the OPC UA server connection as last reported.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Nothing attempted this session
    #[default]
    Unknown,
    /// Connect request outstanding
    Connecting,
    /// Server reported a successful connection
    Connected,
    /// Connect or disconnect failed
    Failed(String),
    /// Disconnect request outstanding
    Disconnecting,
    /// Server reported the connection closed
    Disconnected,
}

/// Configure page state.
#[derive(Debug, Clone, Default)]
pub struct ConfigureState {
    /// OPC UA endpoint URL being edited
    pub endpoint_url: String,
    /// Last known connection status
    pub status: ConnectionStatus,
    /// Server base URL being edited
    pub base_url_edit: String,
}

/// Request queue and result channel shared with spawned tasks.
pub struct RequestState {
    /// Calls queued this frame, dispatched at the start of the next one
    pub outbox: Vec<ApiCall>,
    /// Sender cloned into every spawned request
    pub sender: Sender<ApiOutcome>,
    /// Receiver drained once per frame
    pub receiver: Receiver<ApiOutcome>,
}

impl Default for RequestState {
    fn default() -> Self {
        let (sender, receiver) = channel();
        Self {
            outbox: Vec::new(),
            sender,
            receiver,
        }
    }
}

/// The main application structure.
///
/// Implements `eframe::App`; see `ui/mod.rs` for the frame loop.
#[derive(Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardApp {
    /// Appearance preferences
    pub settings: Settings,
    /// Server connection and timing preferences
    pub config: ClientConfig,
    /// Page currently shown
    pub view: View,
    /// Configured nodes
    #[serde(skip)]
    pub nodes: Vec<Node>,
    /// Configured groups
    #[serde(skip)]
    pub groups: Vec<Group>,
    /// Layout as last loaded or saved
    #[serde(skip)]
    pub layout: Layout,
    /// SCADA elements
    #[serde(skip)]
    pub scada_elements: Vec<ScadaElement>,
    /// Whether the configuration has been loaded at least once
    #[serde(skip)]
    pub config_loaded: bool,
    /// Transient notice banner
    #[serde(skip)]
    pub notice: Notice,
    /// Active canvas drag
    #[serde(skip)]
    pub drag: DragController,
    /// Interactive control rectangles per element, from the last frame (canvas coordinates)
    #[serde(skip)]
    pub control_rects: HashMap<String, Vec<egui::Rect>>,
    /// Size of the canvas as last laid out
    #[serde(skip)]
    pub canvas_size: egui::Vec2,
    /// Live value refresh loop
    #[serde(skip)]
    pub poller: Poller,
    /// Read status, text buffers and focus of value controls
    #[serde(skip)]
    pub live: LiveValues,
    /// Outstanding requests
    #[serde(skip)]
    pub requests: RequestState,
    /// Client used to dispatch requests; rebuilt when the base URL changes
    #[serde(skip)]
    pub client: Option<ApiClient>,
    /// Add/Edit node form
    #[serde(skip)]
    pub node_form: NodeForm,
    /// Add/Edit group form
    #[serde(skip)]
    pub group_form: GroupForm,
    /// SCADA palette
    #[serde(skip)]
    pub scada_palette: ScadaPalette,
    /// Pending destructive action
    #[serde(skip)]
    pub pending_confirm: Option<PendingConfirm>,
    /// Historical page
    #[serde(skip)]
    pub historical: HistoricalState,
    /// Configure page
    #[serde(skip)]
    pub configure: ConfigureState,
    /// Whether the settings window is shown
    #[serde(skip)]
    pub show_settings: bool,
    /// Settings last applied to the egui context
    #[serde(skip)]
    pub applied_settings: Option<Settings>,
    /// Input clock of the current frame, in seconds
    #[serde(skip)]
    pub now: f64,
}

impl Default for DashboardApp {
    fn default() -> Self {
        let config = ClientConfig::default();
        let (start_date, end_date) = crate::history::default_date_range_utc();
        Self {
            settings: Settings::default(),
            poller: Poller::new(config.dashboard_poll_secs),
            drag: DragController::new(config.snap_to_grid.then_some(GRID_SIZE)),
            configure: ConfigureState {
                base_url_edit: config.base_url.clone(),
                ..ConfigureState::default()
            },
            config,
            view: View::Dashboard,
            nodes: Vec::new(),
            groups: Vec::new(),
            layout: Layout::new(),
            scada_elements: Vec::new(),
            config_loaded: false,
            notice: Notice::default(),
            control_rects: HashMap::new(),
            canvas_size: egui::Vec2::ZERO,
            live: LiveValues::default(),
            requests: RequestState::default(),
            client: None,
            node_form: NodeForm::default(),
            group_form: GroupForm::default(),
            scada_palette: ScadaPalette::default(),
            pending_confirm: None,
            historical: HistoricalState {
                start_date,
                end_date,
                ..HistoricalState::default()
            },
            show_settings: false,
            applied_settings: None,
            now: 0.0,
        }
    }
}

impl DashboardApp {
    /// Creates the app, restoring persisted preferences and queueing the initial load.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let mut app = cc
            .storage
            .and_then(|storage| storage.get_string(APP_STATE_KEY))
            .and_then(|json| match Self::from_json(&json) {
                Ok(app) => Some(app),
                Err(err) => {
                    log::warn!("Failed to restore app state, using defaults: {err}");
                    None
                }
            })
            .unwrap_or_default();
        app.restore_runtime();
        app.apply_settings(&cc.egui_ctx);
        app.queue(ApiCall::LoadConfig);
        app
    }

    /// Serializes the persisted part of the application state to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Deserializes application state from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Re-derives runtime fields from persisted preferences after a restore.
    pub fn restore_runtime(&mut self) {
        self.settings = std::mem::take(&mut self.settings).sanitized();
        if !self.config.dashboard_poll_secs.is_finite() || self.config.dashboard_poll_secs <= 0.0 {
            self.config.dashboard_poll_secs = DASHBOARD_POLL_INTERVAL_SECS;
        }
        if !self.config.scada_poll_secs.is_finite() || self.config.scada_poll_secs <= 0.0 {
            self.config.scada_poll_secs = SCADA_POLL_INTERVAL_SECS;
        }
        if self.config.request_timeout_secs == 0 {
            self.config.request_timeout_secs = DEFAULT_REQUEST_TIMEOUT_SECS;
        }
        self.poller = Poller::new(self.config.poll_interval(self.view));
        self.drag = DragController::new(self.config.snap_to_grid.then_some(GRID_SIZE));
        self.configure.base_url_edit = self.config.base_url.clone();
        self.client = None;
        self.applied_settings = None;
    }

    /// Pushes the settings into the egui context when they changed since the last frame.
    pub fn apply_settings(&mut self, ctx: &egui::Context) {
        if self.applied_settings.as_ref() != Some(&self.settings) {
            self.settings.apply(ctx);
            self.applied_settings = Some(self.settings.clone());
        }
    }

    /// Queues a request for dispatch at the start of the next frame.
    pub fn queue(&mut self, call: ApiCall) {
        log::debug!("Queueing {}", call.describe());
        self.requests.outbox.push(call);
    }

    /// Client for the configured server, rebuilt when the base URL or timeout changes.
    pub fn api_client(&mut self) -> ApiClient {
        let timeout = Duration::from_secs(self.config.request_timeout_secs);
        match &self.client {
            Some(client)
                if client.base_url() == self.config.base_url.trim_end_matches('/')
                    && client.timeout() == timeout =>
            {
                client.clone()
            }
            _ => {
                let client = ApiClient::new(&self.config.base_url, timeout);
                self.client = Some(client.clone());
                client
            }
        }
    }

    /// Switches pages; the poller restarts for the new page on the next frame.
    pub fn switch_view(&mut self, view: View) {
        if self.view == view {
            return;
        }
        log::info!("Switching to {} view", view.label());
        self.drag.cancel();
        self.poller.stop();
        self.live.focused = None;
        self.view = view;
    }

    /// Node by id.
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Nodes assigned to group `id`.
    pub fn group_members(&self, id: &str) -> impl Iterator<Item = &Node> + '_ {
        let id = id.to_string();
        self.nodes.iter().filter(move |n| n.group_id.as_deref() == Some(id.as_str()))
    }
}
