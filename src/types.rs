//! Core data types shared by the API client, the canvas and the views.
//!
//! Every record here mirrors the JSON the dashboard server exchanges. Request
//! bodies are separate structs so that optional fields are explicit and can be
//! validated once before they leave the client.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a configured node.
pub type NodeId = String;

/// Opaque identifier of a group.
pub type GroupId = String;

/// Kind of display/control a node renders as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    /// Value display with a free-text setpoint input
    #[default]
    Text,
    /// Boolean toggle
    Switch,
    /// Numeric value display
    Gauge,
    /// Value display, charted on the historical view
    Chart,
}

impl NodeType {
    /// All node types, in the order they are offered in forms.
    pub const ALL: [NodeType; 4] = [
        NodeType::Text,
        NodeType::Switch,
        NodeType::Gauge,
        NodeType::Chart,
    ];

    /// Wire name of the type.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Text => "text",
            NodeType::Switch => "switch",
            NodeType::Gauge => "gauge",
            NodeType::Chart => "chart",
        }
    }
}

/// Preset size of a card or group section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ElementSize {
    /// Compact card
    Small,
    /// Default card
    #[default]
    Medium,
    /// Wide card
    Large,
}

impl ElementSize {
    /// All sizes, in the order they are offered in forms.
    pub const ALL: [ElementSize; 3] = [ElementSize::Small, ElementSize::Medium, ElementSize::Large];

    /// Wire name of the size.
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementSize::Small => "small",
            ElementSize::Medium => "medium",
            ElementSize::Large => "large",
        }
    }

    /// Card dimensions (width, height) of a node with this size.
    pub fn node_dimensions(&self) -> (f32, f32) {
        match self {
            ElementSize::Small => (150.0, 100.0),
            ElementSize::Medium => (200.0, 120.0),
            ElementSize::Large => (250.0, 150.0),
        }
    }

    /// Section dimensions (width, height) of a group with this size.
    pub fn group_dimensions(&self) -> (f32, f32) {
        match self {
            ElementSize::Small => (250.0, 180.0),
            ElementSize::Medium => (350.0, 250.0),
            ElementSize::Large => (450.0, 320.0),
        }
    }
}

/// A dynamically typed tag value as reported by the server.
///
/// The server stringifies most reads (`"True"`, `"42.5"`), but writes and older
/// configs carry real booleans and numbers, so all three are accepted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum NodeValue {
    /// Boolean value
    Bool(bool),
    /// Numeric value
    Number(f64),
    /// Textual value
    Text(String),
}

impl NodeValue {
    /// Whether a switch bound to this value should show as checked.
    pub fn is_truthy(&self) -> bool {
        match self {
            NodeValue::Bool(b) => *b,
            NodeValue::Text(s) => s.eq_ignore_ascii_case("true"),
            NodeValue::Number(_) => false,
        }
    }

    /// Numeric interpretation of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            NodeValue::Number(n) => Some(*n),
            NodeValue::Text(s) => s.trim().parse().ok(),
            NodeValue::Bool(_) => None,
        }
    }
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeValue::Bool(true) => write!(f, "True"),
            NodeValue::Bool(false) => write!(f, "False"),
            NodeValue::Number(n) => write!(f, "{n}"),
            NodeValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// A configured point mapped to one external tag.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Node {
    /// Unique identifier of this node
    pub id: NodeId,
    /// Display name
    pub name: String,
    /// Display/control kind
    #[serde(rename = "type", default)]
    pub node_type: NodeType,
    /// External tag reference passed through to the backend
    pub node_ua_id: String,
    /// Optional engineering unit appended to the displayed value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    /// Last known value
    #[serde(default)]
    pub value: Option<NodeValue>,
    /// Group this node is shown in, if any
    #[serde(rename = "groupId", default)]
    pub group_id: Option<GroupId>,
    /// Canvas x coordinate of the top-left corner
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub x: f32,
    /// Canvas y coordinate of the top-left corner
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub y: f32,
    /// Preset card size
    #[serde(default)]
    pub size: ElementSize,
}

/// A visual container on the dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Group {
    /// Unique identifier of this group
    pub id: GroupId,
    /// Section heading
    pub title: String,
    /// Preset section size
    #[serde(default)]
    pub size: ElementSize,
    /// Canvas x coordinate of the top-left corner
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub x: f32,
    /// Canvas y coordinate of the top-left corner
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub y: f32,
}

/// Saved position (and optionally size) of one dashboard element.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LayoutEntry {
    /// Canvas x coordinate
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub x: f32,
    /// Canvas y coordinate
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub y: f32,
    /// Preset size at the time of saving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<ElementSize>,
}

/// Sparse map of element id to saved position.
pub type Layout = BTreeMap<String, LayoutEntry>;

/// Reads a canvas coordinate; `null` and non-finite numbers become `0`.
fn deserialize_coordinate<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(value.filter(|v| v.is_finite()).map_or(0.0, |v| v as f32))
}

/// Reads the saved layout entry by entry.
///
/// Entries that cannot be read are skipped, like stale ids, so one damaged
/// entry never rejects the whole configuration.
pub fn deserialize_layout<'de, D>(deserializer: D) -> Result<Layout, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => return Ok(Layout::new()),
        other => {
            log::warn!("Ignoring layout that is not an object: {other}");
            return Ok(Layout::new());
        }
    };
    let layout = raw
        .into_iter()
        .filter_map(|(id, entry)| match serde_json::from_value::<LayoutEntry>(entry) {
            Ok(entry) => Some((id, entry)),
            Err(e) => {
                log::warn!("Skipping unreadable layout entry {id}: {e}");
                None
            }
        })
        .collect();
    Ok(layout)
}

/// Kind of widget a SCADA element renders as.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum ScadaElementType {
    /// Plain value readout
    #[default]
    ValueDisplay,
    /// Value readout with a level bar
    Gauge,
    /// Boolean toggle
    Switch,
    /// Text setpoint input
    TextInput,
}

impl ScadaElementType {
    /// All element types, in palette order.
    pub const ALL: [ScadaElementType; 4] = [
        ScadaElementType::ValueDisplay,
        ScadaElementType::Gauge,
        ScadaElementType::Switch,
        ScadaElementType::TextInput,
    ];

    /// Human readable label for the palette.
    pub fn label(&self) -> &'static str {
        match self {
            ScadaElementType::ValueDisplay => "Value display",
            ScadaElementType::Gauge => "Gauge",
            ScadaElementType::Switch => "Switch",
            ScadaElementType::TextInput => "Text input",
        }
    }
}

/// A node's representation on the supervisory display surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScadaElement {
    /// Unique identifier of this element
    pub id: String,
    /// Node backing this element
    pub node_id: NodeId,
    /// Widget kind
    #[serde(default)]
    pub element_type: ScadaElementType,
    /// Canvas x coordinate of the top-left corner
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub x: f32,
    /// Canvas y coordinate of the top-left corner
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    pub y: f32,
    /// Tag of the backing node at the time the element was placed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ua_id: Option<String>,
    /// Name of the backing node at the time the element was placed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    /// Optional caption overriding the node name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl ScadaElement {
    /// Places a new element for `node` at the canvas origin.
    pub fn new(node: &Node, element_type: ScadaElementType) -> Self {
        Self {
            id: format!("scada-{}", Uuid::new_v4()),
            node_id: node.id.clone(),
            element_type,
            x: 0.0,
            y: 0.0,
            node_ua_id: Some(node.node_ua_id.clone()),
            node_name: Some(node.name.clone()),
            label: None,
        }
    }

    /// Caption shown above the widget.
    pub fn caption(&self) -> &str {
        self.label
            .as_deref()
            .or(self.node_name.as_deref())
            .unwrap_or(&self.node_id)
    }
}

/// Entry of the legacy map-shaped SCADA layout, keyed by node id.
#[derive(Deserialize)]
struct LegacyScadaEntry {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    node_id: Option<NodeId>,
    #[serde(default)]
    element_type: ScadaElementType,
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    x: f32,
    #[serde(default, deserialize_with = "deserialize_coordinate")]
    y: f32,
    #[serde(default)]
    node_ua_id: Option<String>,
    #[serde(default)]
    node_name: Option<String>,
    #[serde(default)]
    label: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScadaLayoutRepr {
    List(Vec<ScadaElement>),
    Legacy(BTreeMap<String, serde_json::Value>),
    Missing(()),
}

/// Accepts the SCADA layout either as an element array or as the legacy map.
///
/// Legacy entries that cannot be read as an element are skipped.
pub fn deserialize_scada_layout<'de, D>(deserializer: D) -> Result<Vec<ScadaElement>, D::Error>
where
    D: Deserializer<'de>,
{
    let elements = match ScadaLayoutRepr::deserialize(deserializer)? {
        ScadaLayoutRepr::List(list) => list,
        ScadaLayoutRepr::Missing(()) => Vec::new(),
        ScadaLayoutRepr::Legacy(map) => map
            .into_iter()
            .filter_map(|(key, raw)| {
                let entry: LegacyScadaEntry = match serde_json::from_value(raw) {
                    Ok(entry) => entry,
                    Err(e) => {
                        log::warn!("Skipping unreadable SCADA layout entry {key}: {e}");
                        return None;
                    }
                };
                Some(ScadaElement {
                    id: entry.id.unwrap_or_else(|| key.clone()),
                    node_id: entry.node_id.unwrap_or(key),
                    element_type: entry.element_type,
                    x: entry.x,
                    y: entry.y,
                    node_ua_id: entry.node_ua_id,
                    node_name: entry.node_name,
                    label: entry.label,
                })
            })
            .collect(),
    };
    Ok(elements)
}

/// Full configuration returned by `GET /api/config`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// Configured OPC UA endpoint, if the server reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opcua_endpoint: Option<String>,
    /// All configured nodes
    #[serde(default)]
    pub nodes: Vec<Node>,
    /// All configured groups
    #[serde(default)]
    pub groups: Vec<Group>,
    /// Saved dashboard layout
    #[serde(default, deserialize_with = "deserialize_layout")]
    pub layout: Layout,
    /// Saved SCADA elements
    #[serde(default, deserialize_with = "deserialize_scada_layout")]
    pub scada_layout: Vec<ScadaElement>,
}

/// Body of `POST /api/nodes`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NodeRequest {
    /// Present when updating an existing node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<NodeId>,
    /// Display name
    pub name: String,
    /// Display/control kind
    #[serde(rename = "type")]
    pub node_type: NodeType,
    /// External tag reference
    pub node_ua_id: String,
    /// Preset card size
    pub size: ElementSize,
    /// Group membership; `null` unassigns
    #[serde(rename = "groupId")]
    pub group_id: Option<GroupId>,
    /// Engineering unit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
}

/// Body of `POST /api/groups`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupRequest {
    /// Present when updating an existing group
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<GroupId>,
    /// Section heading
    pub title: String,
    /// Preset section size
    pub size: ElementSize,
}

/// Body of `POST /api/node_value/{ua_id}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValueWrite {
    /// Value to write
    pub value: NodeValue,
    /// Type of the node the write originates from
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

/// Response of `GET /api/node_value/{ua_id}`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ValueReadResponse {
    /// Tag that was read
    #[serde(default)]
    pub node_ua_id: Option<String>,
    /// Current value
    #[serde(default)]
    pub value: Option<NodeValue>,
}

/// Body of the endpoint lifecycle requests.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EndpointRequest {
    /// OPC UA endpoint URL
    pub url: String,
}

/// Generic `{message}` / `{error}` reply.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct MessageResponse {
    /// Success message
    #[serde(default)]
    pub message: Option<String>,
    /// Error message
    #[serde(default)]
    pub error: Option<String>,
}

/// One historical reading of a node.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HistoricalSample {
    /// ISO-8601 timestamp of the reading
    pub timestamp: String,
    /// Recorded value
    #[serde(default)]
    pub value: Option<NodeValue>,
    /// Name of the node, when the server includes it
    #[serde(default)]
    pub node_name: Option<String>,
    /// Tag of the node, when the server includes it
    #[serde(default)]
    pub node_ua_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn node_deserializes_with_server_field_names() {
        let node: Node = serde_json::from_value(json!({
            "id": "n1",
            "name": "Pump",
            "type": "switch",
            "node_ua_id": "ns=2;s=Pump",
            "groupId": "g1",
            "value": "True",
            "x": 50,
            "y": 75
        }))
        .unwrap();
        assert_eq!(node.node_type, NodeType::Switch);
        assert_eq!(node.group_id.as_deref(), Some("g1"));
        assert_eq!((node.x, node.y), (50.0, 75.0));
        assert_eq!(node.size, ElementSize::Medium);
        assert!(node.value.unwrap().is_truthy());
    }

    #[test]
    fn node_value_accepts_bool_number_and_text() {
        let values: Vec<NodeValue> = serde_json::from_value(json!([true, 3.5, "hello"])).unwrap();
        assert_eq!(values[0], NodeValue::Bool(true));
        assert_eq!(values[1], NodeValue::Number(3.5));
        assert_eq!(values[2], NodeValue::Text("hello".into()));
        assert_eq!(values[0].to_string(), "True");
        assert_eq!(NodeValue::Text(" 7.25 ".into()).as_f64(), Some(7.25));
        assert!(!NodeValue::Text("False".into()).is_truthy());
    }

    #[test]
    fn config_accepts_scada_layout_as_array() {
        let config: AppConfig = serde_json::from_value(json!({
            "nodes": [],
            "groups": [],
            "layout": {},
            "scada_layout": [
                {"id": "scada-1", "node_id": "n1", "element_type": "text_input", "x": 10, "y": 20}
            ]
        }))
        .unwrap();
        assert_eq!(config.scada_layout.len(), 1);
        assert_eq!(config.scada_layout[0].element_type, ScadaElementType::TextInput);
    }

    #[test]
    fn config_accepts_legacy_scada_map_and_empty_object() {
        let config: AppConfig = serde_json::from_value(json!({
            "scada_layout": {
                "n1": {"x": 5, "y": 6},
                "n2": "garbage"
            }
        }))
        .unwrap();
        assert_eq!(config.scada_layout.len(), 1);
        assert_eq!(config.scada_layout[0].id, "n1");
        assert_eq!(config.scada_layout[0].node_id, "n1");
        assert_eq!(config.scada_layout[0].element_type, ScadaElementType::ValueDisplay);

        let empty: AppConfig = serde_json::from_value(json!({"scada_layout": {}})).unwrap();
        assert!(empty.scada_layout.is_empty());
    }

    #[test]
    fn config_survives_damaged_layout_entries() {
        let config: AppConfig = serde_json::from_value(json!({
            "nodes": [
                {"id": "n1", "name": "Level", "type": "gauge", "node_ua_id": "ns=2;s=Level", "x": null, "y": 40}
            ],
            "layout": {
                "n1": {"x": 120, "y": 80, "size": "large"},
                "gone": {"x": null, "y": null},
                "broken": {"x": "left", "y": 3},
                "noise": 7
            }
        }))
        .unwrap();
        assert_eq!(config.nodes.len(), 1);
        assert_eq!((config.nodes[0].x, config.nodes[0].y), (0.0, 40.0));
        assert_eq!(config.layout.len(), 2);
        assert_eq!(config.layout["n1"].size, Some(ElementSize::Large));
        assert_eq!((config.layout["gone"].x, config.layout["gone"].y), (0.0, 0.0));
        assert!(!config.layout.contains_key("broken"));
        assert!(!config.layout.contains_key("noise"));

        let no_layout: AppConfig = serde_json::from_value(json!({"layout": null})).unwrap();
        assert!(no_layout.layout.is_empty());
    }

    #[test]
    fn node_request_serializes_null_group_and_omits_missing_id() {
        let request = NodeRequest {
            id: None,
            name: "Temp".into(),
            node_type: NodeType::Gauge,
            node_ua_id: "ns=2;i=7".into(),
            size: ElementSize::Small,
            group_id: None,
            unit: Some("°C".into()),
        };
        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("id").is_none());
        assert_eq!(body["groupId"], serde_json::Value::Null);
        assert_eq!(body["type"], "gauge");
        assert_eq!(body["size"], "small");
    }

    #[test]
    fn scada_element_ids_are_unique_and_prefixed() {
        let node = Node {
            id: "n1".into(),
            name: "Valve".into(),
            node_type: NodeType::Switch,
            node_ua_id: "ns=2;s=Valve".into(),
            unit: None,
            value: None,
            group_id: None,
            x: 0.0,
            y: 0.0,
            size: ElementSize::Medium,
        };
        let a = ScadaElement::new(&node, ScadaElementType::Switch);
        let b = ScadaElement::new(&node, ScadaElementType::Switch);
        assert!(a.id.starts_with("scada-"));
        assert_ne!(a.id, b.id);
        assert_eq!(a.caption(), "Valve");
    }
}
