//! Rendering of canvas elements and the notice overlay.
//!
//! Cards are painted directly onto the canvas at their laid-out rectangle and
//! then filled with a child `Ui` for their labels and controls. Every control's
//! rectangle is recorded so that a press on it never starts a drag.

use super::requests::ApiCall;
use super::state::{DashboardApp, GroupForm, NodeForm, PendingConfirm};
use crate::constants::*;
use crate::notice::{NoticePhase, Severity};
use crate::poller::{ControlKey, ReadStatus};
use crate::settings::ColorRole;
use crate::types::*;
use eframe::egui;

/// Formats a value for display: `"value unit"`, or `N/A` when there is none.
pub fn format_value(value: Option<&NodeValue>, unit: Option<&str>) -> String {
    match (value, unit.map(str::trim).filter(|u| !u.is_empty())) {
        (None, _) => "N/A".to_string(),
        (Some(v), Some(unit)) => format!("{v} {unit}"),
        (Some(v), None) => v.to_string(),
    }
}

/// Turns typed setpoint text into the value written to the server.
pub fn parse_setpoint(node_type: NodeType, text: &str) -> NodeValue {
    let text = text.trim();
    match node_type {
        NodeType::Text => NodeValue::Text(text.to_string()),
        _ => text
            .parse::<f64>()
            .map(NodeValue::Number)
            .unwrap_or_else(|_| NodeValue::Text(text.to_string())),
    }
}

impl DashboardApp {
    /// Text and optional color of a node's value readout.
    pub fn value_text(&self, node: &Node) -> (String, Option<egui::Color32>) {
        match self.live.status.get(&node.id) {
            Some(ReadStatus::Error(_)) => ("Error".into(), Some(egui::Color32::from_rgb(0xdc, 0x26, 0x26))),
            Some(ReadStatus::Offline(_)) => ("Offline".into(), Some(egui::Color32::GRAY)),
            _ => (format_value(node.value.as_ref(), node.unit.as_deref()), None),
        }
    }

    /// Remembers `rect` (screen coordinates) as an interactive control of element `id`.
    fn record_control(&mut self, id: &str, rect: egui::Rect, origin: egui::Pos2) {
        self.control_rects
            .entry(id.to_string())
            .or_default()
            .push(rect.translate(-origin.to_vec2()));
    }

    fn paint_card(&self, ui: &egui::Ui, rect: egui::Rect, id: &str, fill: egui::Color32) {
        let stroke = if self.drag.active_id() == Some(id) {
            egui::Stroke::new(2.0, self.settings.color(ColorRole::Primary))
        } else {
            ui.visuals().widgets.noninteractive.bg_stroke
        };
        let painter = ui.painter();
        if self.drag.active_id() == Some(id) {
            painter.rect_filled(
                rect.translate(egui::vec2(3.0, 3.0)),
                CARD_CORNER_RADIUS,
                egui::Color32::from_black_alpha(40),
            );
        }
        painter.rect_filled(rect, CARD_CORNER_RADIUS, fill);
        painter.rect_stroke(rect, CARD_CORNER_RADIUS, stroke, egui::StrokeKind::Inside);
    }

    /// Draws a node card.
    pub fn draw_node_card(
        &mut self,
        ui: &mut egui::Ui,
        rect: egui::Rect,
        origin: egui::Pos2,
        id: &str,
        focused: &mut Option<ControlKey>,
    ) {
        let Some(node) = self.node(id).cloned() else {
            return;
        };
        self.paint_card(ui, rect, id, self.settings.card_fill());

        let body = ui.interact(rect, ui.id().with(("node_card", id)), egui::Sense::click());
        body.context_menu(|ui| {
            if ui.button("Edit").clicked() {
                self.node_form = NodeForm::edit(&node);
                ui.close();
            }
            if ui.button("Delete").clicked() {
                self.pending_confirm = Some(PendingConfirm::DeleteNode(node.id.clone()));
                ui.close();
            }
        });

        let builder = egui::UiBuilder::new()
            .max_rect(rect.shrink(CARD_PADDING))
            .id_salt(("node", id))
            .layout(egui::Layout::top_down(egui::Align::Min));
        ui.scope_builder(builder, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(&node.name).strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let delete = ui.small_button("✖").on_hover_text("Delete node");
                    self.record_control(id, delete.rect, origin);
                    if delete.clicked() {
                        self.pending_confirm = Some(PendingConfirm::DeleteNode(node.id.clone()));
                    }
                });
            });
            ui.label(egui::RichText::new(node.node_type.as_str()).small().weak());

            let (text, color) = self.value_text(&node);
            let mut value = egui::RichText::new(text).size(self.settings.font_size * 1.25);
            if let Some(color) = color {
                value = value.color(color);
            }
            ui.label(value);

            match node.node_type {
                NodeType::Switch => self.draw_switch(ui, &node, id, origin),
                kind => self.draw_setpoint_input(ui, &node, ControlKey::node(id), kind, origin, focused),
            }
        });
    }

    /// Draws a group section with its member list.
    pub fn draw_group_card(&mut self, ui: &mut egui::Ui, rect: egui::Rect, origin: egui::Pos2, id: &str) {
        let Some(group) = self.groups.iter().find(|g| g.id == id).cloned() else {
            return;
        };
        let fill = self.settings.color(ColorRole::Primary).gamma_multiply(0.08);
        self.paint_card(ui, rect, id, fill);

        let body = ui.interact(rect, ui.id().with(("group_card", id)), egui::Sense::click());
        body.context_menu(|ui| {
            if ui.button("Edit").clicked() {
                self.group_form = GroupForm::edit(&group);
                ui.close();
            }
            if ui.button("Delete").clicked() {
                self.pending_confirm = Some(PendingConfirm::DeleteGroup(group.id.clone()));
                ui.close();
            }
        });

        let members: Vec<String> = self.group_members(id).map(|n| n.name.clone()).collect();
        let builder = egui::UiBuilder::new()
            .max_rect(rect.shrink(CARD_PADDING))
            .id_salt(("group", id))
            .layout(egui::Layout::top_down(egui::Align::Min));
        ui.scope_builder(builder, |ui| {
            ui.horizontal(|ui| {
                ui.heading(&group.title);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let delete = ui.small_button("✖").on_hover_text("Delete group");
                    self.record_control(id, delete.rect, origin);
                    if delete.clicked() {
                        self.pending_confirm = Some(PendingConfirm::DeleteGroup(group.id.clone()));
                    }
                    let edit = ui.small_button("✏").on_hover_text("Edit group");
                    self.record_control(id, edit.rect, origin);
                    if edit.clicked() {
                        self.group_form = GroupForm::edit(&group);
                    }
                });
            });
            ui.separator();
            if members.is_empty() {
                ui.label(egui::RichText::new("No nodes in this group").italics().weak());
            }
            for name in &members {
                ui.label(format!("• {name}"));
            }
        });
    }

    /// Draws a SCADA element.
    pub fn draw_scada_element(
        &mut self,
        ui: &mut egui::Ui,
        rect: egui::Rect,
        origin: egui::Pos2,
        id: &str,
        focused: &mut Option<ControlKey>,
    ) {
        let Some(element) = self.scada_elements.iter().find(|e| e.id == id).cloned() else {
            return;
        };
        let node = self.node(&element.node_id).cloned();
        self.paint_card(ui, rect, id, self.settings.card_fill());

        let builder = egui::UiBuilder::new()
            .max_rect(rect.shrink(CARD_PADDING))
            .id_salt(("scada", id))
            .layout(egui::Layout::top_down(egui::Align::Min));
        ui.scope_builder(builder, |ui| {
            ui.horizontal(|ui| {
                ui.label(egui::RichText::new(element.caption()).strong());
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let delete = ui.small_button("✖").on_hover_text("Remove element");
                    self.record_control(id, delete.rect, origin);
                    if delete.clicked() {
                        self.pending_confirm = Some(PendingConfirm::DeleteScadaElement(element.id.clone()));
                    }
                });
            });

            let Some(node) = node else {
                ui.label(egui::RichText::new("Node not found").italics().weak());
                return;
            };
            let (text, color) = self.value_text(&node);
            let mut value = egui::RichText::new(text).size(self.settings.font_size * 1.25);
            if let Some(color) = color {
                value = value.color(color);
            }

            match element.element_type {
                ScadaElementType::ValueDisplay => {
                    ui.label(value);
                }
                ScadaElementType::Gauge => {
                    ui.label(value);
                    let level = node.value.as_ref().and_then(NodeValue::as_f64).unwrap_or(0.0);
                    let fraction = (level / 100.0).clamp(0.0, 1.0) as f32;
                    ui.add(
                        egui::ProgressBar::new(fraction)
                            .fill(self.settings.color(ColorRole::Secondary))
                            .desired_height(10.0),
                    );
                }
                ScadaElementType::Switch => {
                    self.draw_switch(ui, &node, id, origin);
                }
                ScadaElementType::TextInput => {
                    ui.label(value);
                    let key = ControlKey::scada(&element);
                    self.draw_setpoint_input(ui, &node, key, NodeType::Text, origin, focused);
                }
            }
        });
    }

    fn draw_switch(&mut self, ui: &mut egui::Ui, node: &Node, element_id: &str, origin: egui::Pos2) {
        let mut on = node.value.as_ref().is_some_and(NodeValue::is_truthy);
        let label = if on { "On" } else { "Off" };
        let response = ui.checkbox(&mut on, label);
        self.record_control(element_id, response.rect, origin);
        if response.changed() {
            self.toggle_switch(&node.id, on);
        }
    }

    fn draw_setpoint_input(
        &mut self,
        ui: &mut egui::Ui,
        node: &Node,
        key: ControlKey,
        write_type: NodeType,
        origin: egui::Pos2,
        focused: &mut Option<ControlKey>,
    ) {
        let current = node.value.as_ref().map(ToString::to_string).unwrap_or_default();
        let mut text = self
            .live
            .text_buffers
            .get(&key)
            .cloned()
            .unwrap_or_else(|| current.clone());
        let response = ui.add(
            egui::TextEdit::singleline(&mut text)
                .hint_text("Set value")
                .desired_width(f32::INFINITY),
        );
        self.record_control(&key.element_id, response.rect, origin);

        if response.changed() {
            self.live.text_buffers.insert(key.clone(), text.clone());
        }
        if response.has_focus() {
            *focused = Some(key.clone());
        }
        if response.lost_focus() {
            self.live.text_buffers.remove(&key);
            let cancelled = ui.input(|i| i.key_pressed(egui::Key::Escape));
            if !cancelled && !text.trim().is_empty() && text != current {
                self.write_setpoint(&node.id, &text, write_type);
            }
        }
    }

    /// Flips a switch: the new state shows immediately and reverts if the write fails.
    ///
    /// The write is always typed as a switch, whatever kind of node backs it.
    pub fn toggle_switch(&mut self, node_id: &str, on: bool) {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) else {
            return;
        };
        node.value = Some(NodeValue::Bool(on));
        let call = ApiCall::WriteValue {
            node_id: node.id.clone(),
            ua_id: node.node_ua_id.clone(),
            write: ValueWrite {
                value: NodeValue::Bool(on),
                node_type: NodeType::Switch,
            },
            revert: Some(NodeValue::Bool(!on)),
        };
        self.queue(call);
    }

    /// Writes a typed setpoint; the local value is kept even if the write fails.
    ///
    /// `write_type` is the kind of control the text came from: the node's own
    /// type on a dashboard card, text for a SCADA text input.
    pub fn write_setpoint(&mut self, node_id: &str, text: &str, write_type: NodeType) {
        let Some(node) = self.nodes.iter_mut().find(|n| n.id == node_id) else {
            return;
        };
        let value = parse_setpoint(write_type, text);
        node.value = Some(value.clone());
        let call = ApiCall::WriteValue {
            node_id: node.id.clone(),
            ua_id: node.node_ua_id.clone(),
            write: ValueWrite {
                value,
                node_type: write_type,
            },
            revert: None,
        };
        self.queue(call);
    }

    /// Paints the notice banner at the top right.
    pub fn draw_notice(&mut self, ctx: &egui::Context) {
        let opacity = match self.notice.phase(self.now) {
            NoticePhase::Visible => 1.0,
            NoticePhase::Hiding(opacity) => opacity,
            NoticePhase::Hidden => return,
        };
        let (Some(message), Some(severity)) = (self.notice.message(), self.notice.severity()) else {
            return;
        };
        let fill = match severity {
            Severity::Success => self.settings.color(ColorRole::Secondary),
            Severity::Error => egui::Color32::from_rgb(0xef, 0x44, 0x44),
            Severity::Info => self.settings.color(ColorRole::Primary),
        };
        let message = message.to_string();
        egui::Area::new(egui::Id::new("transient_notice"))
            .order(egui::Order::Foreground)
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-16.0, 48.0))
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::new()
                    .fill(fill.gamma_multiply(opacity))
                    .corner_radius(6.0)
                    .inner_margin(egui::Margin::symmetric(14, 10))
                    .show(ui, |ui| {
                        ui.label(egui::RichText::new(message).color(egui::Color32::WHITE.gamma_multiply(opacity)));
                    });
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_format_with_unit_or_placeholder() {
        assert_eq!(format_value(None, Some("°C")), "N/A");
        assert_eq!(format_value(Some(&NodeValue::Number(21.5)), Some("°C")), "21.5 °C");
        assert_eq!(format_value(Some(&NodeValue::Text("OK".into())), Some(" ")), "OK");
        assert_eq!(format_value(Some(&NodeValue::Bool(true)), None), "True");
    }

    #[test]
    fn setpoints_are_numeric_for_gauges_only_when_parseable() {
        assert_eq!(parse_setpoint(NodeType::Gauge, " 42 "), NodeValue::Number(42.0));
        assert_eq!(parse_setpoint(NodeType::Gauge, "high"), NodeValue::Text("high".into()));
        assert_eq!(parse_setpoint(NodeType::Text, "42"), NodeValue::Text("42".into()));
    }

    #[test]
    fn read_failures_replace_the_value() {
        let mut app = DashboardApp::default();
        let node = Node {
            id: "n1".into(),
            name: "Temp".into(),
            node_type: NodeType::Gauge,
            node_ua_id: "ns=2;s=Temp".into(),
            unit: Some("°C".into()),
            value: Some(NodeValue::Number(20.0)),
            group_id: None,
            x: 0.0,
            y: 0.0,
            size: ElementSize::Medium,
        };
        assert_eq!(app.value_text(&node).0, "20 °C");
        app.live.status.insert("n1".into(), ReadStatus::Offline("refused".into()));
        assert_eq!(app.value_text(&node).0, "Offline");
        app.live.status.insert("n1".into(), ReadStatus::Error("bad".into()));
        assert_eq!(app.value_text(&node).0, "Error");
    }
}
