//! Live value polling.
//!
//! [`Poller`] is the cancellable timer: the page controller asks it every frame
//! whether a tick is due, runs the reads, and hands the results back tagged with
//! the generation they were started under. Restarting or stopping bumps the
//! generation, so results from an abandoned loop are dropped and there is never
//! more than one loop per page. [`reconcile`] merges a tick's readings into the
//! node records without touching anything the user is editing.

use crate::api::ApiError;
use crate::types::*;
use std::collections::{HashMap, HashSet};

/// Identifies an input control bound to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControlKey {
    /// Element the control lives on (node id on the dashboard, SCADA element id)
    pub element_id: String,
    /// Node whose value the control edits
    pub node_id: NodeId,
}

impl ControlKey {
    /// Key for the control on a dashboard node card.
    pub fn node(node_id: &str) -> Self {
        Self {
            element_id: node_id.to_string(),
            node_id: node_id.to_string(),
        }
    }

    /// Key for the control on a SCADA element.
    pub fn scada(element: &ScadaElement) -> Self {
        Self {
            element_id: element.id.clone(),
            node_id: element.node_id.clone(),
        }
    }
}

/// Result of reading one node during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueReading {
    /// The server returned a value (possibly null)
    Value(Option<NodeValue>),
    /// The server answered with an error
    Failed(String),
    /// The server could not be reached
    Offline(String),
}

impl From<Result<Option<NodeValue>, ApiError>> for ValueReading {
    fn from(result: Result<Option<NodeValue>, ApiError>) -> Self {
        match result {
            Ok(value) => ValueReading::Value(value),
            Err(e) if e.is_offline() => ValueReading::Offline(e.to_string()),
            Err(e) => ValueReading::Failed(e.to_string()),
        }
    }
}

/// Health of the last read of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadStatus {
    /// Last read succeeded
    Live,
    /// Last read was rejected by the server
    Error(String),
    /// Last read could not reach the server
    Offline(String),
}

/// Per-node display state kept next to the node records.
#[derive(Debug, Default)]
pub struct LiveValues {
    /// Outcome of the most recent read per node
    pub status: HashMap<NodeId, ReadStatus>,
    /// Text currently shown in setpoint inputs; missing means "show the node value"
    pub text_buffers: HashMap<ControlKey, String>,
    /// Control holding keyboard focus this frame
    pub focused: Option<ControlKey>,
}

impl LiveValues {
    /// Forgets everything known about `node_id`.
    pub fn forget(&mut self, node_id: &str) {
        self.status.remove(node_id);
        self.text_buffers.retain(|key, _| key.node_id != node_id);
        if self.focused.as_ref().is_some_and(|k| k.node_id == node_id) {
            self.focused = None;
        }
    }
}

/// Merges one tick's readings into `nodes`.
///
/// A node whose control currently has focus is skipped entirely. Readings for
/// nodes that have disappeared since the tick started are ignored. Returns the
/// number of nodes updated.
pub fn reconcile(nodes: &mut [Node], live: &mut LiveValues, readings: Vec<(NodeId, ValueReading)>) -> usize {
    let held = live.focused.as_ref().map(|k| k.node_id.clone());
    let mut updated = HashSet::new();

    for (id, reading) in readings {
        if held.as_deref() == Some(id.as_str()) {
            log::trace!("Skipping value update for {id}: input has focus");
            continue;
        }
        let Some(node) = nodes.iter_mut().find(|n| n.id == id) else {
            continue;
        };
        let status = match reading {
            ValueReading::Value(value) => {
                node.value = value;
                ReadStatus::Live
            }
            ValueReading::Failed(msg) => {
                log::error!("Error reading node {}: {msg}", node.node_ua_id);
                ReadStatus::Error(msg)
            }
            ValueReading::Offline(msg) => {
                log::error!("Network error reading node {}: {msg}", node.node_ua_id);
                ReadStatus::Offline(msg)
            }
        };
        live.status.insert(id.clone(), status);
        updated.insert(id);
    }

    live.text_buffers.retain(|key, _| !updated.contains(&key.node_id));
    updated.len()
}

/// Fixed-interval tick source with an explicit start/stop lifecycle.
#[derive(Debug)]
pub struct Poller {
    interval: f64,
    generation: u64,
    running: bool,
    in_flight: bool,
    next_due: f64,
}

impl Poller {
    /// Creates a stopped poller ticking every `interval` seconds once started.
    pub fn new(interval: f64) -> Self {
        Self {
            interval,
            generation: 0,
            running: false,
            in_flight: false,
            next_due: 0.0,
        }
    }

    /// Starts a fresh loop, cancelling any previous one. The first tick is due immediately.
    pub fn start(&mut self, now: f64) -> u64 {
        self.generation += 1;
        self.running = true;
        self.in_flight = false;
        self.next_due = now;
        log::debug!("Polling started (generation {}, every {}s)", self.generation, self.interval);
        self.generation
    }

    /// Stops the loop; results still in flight will be discarded.
    pub fn stop(&mut self) {
        if self.running {
            log::debug!("Polling stopped (generation {})", self.generation);
        }
        self.generation += 1;
        self.running = false;
        self.in_flight = false;
    }

    /// Changes the interval; takes effect from the next scheduled tick.
    pub fn set_interval(&mut self, interval: f64) {
        self.interval = interval.max(0.1);
    }

    /// Seconds between ticks.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Whether the loop is running.
    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Generation of the current loop.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Claims the next tick if it is due. Ticks never overlap: a new one only
    /// becomes due after the previous one has been accepted.
    pub fn poll_due(&mut self, now: f64) -> Option<u64> {
        if !self.running || self.in_flight || now < self.next_due {
            return None;
        }
        self.in_flight = true;
        self.next_due = now + self.interval;
        Some(self.generation)
    }

    /// Accepts the results of a tick. Returns `false` for results of a cancelled loop.
    pub fn accept(&mut self, generation: u64) -> bool {
        if !self.running || generation != self.generation {
            log::debug!("Discarding poll results from generation {generation}");
            return false;
        }
        self.in_flight = false;
        true
    }

    /// Seconds until the next tick is due, for scheduling a repaint.
    pub fn time_until_due(&self, now: f64) -> Option<f64> {
        if !self.running || self.in_flight {
            return None;
        }
        Some((self.next_due - now).max(0.0))
    }
}
