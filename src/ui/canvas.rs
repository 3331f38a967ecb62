//! Canvas interaction: hit testing, dragging and committing positions.
//!
//! Both the dashboard and the SCADA view lay elements out on an absolutely
//! positioned canvas. Element positions are canvas coordinates (relative to the
//! canvas' top-left corner); this module converts pointer positions and feeds
//! them to the [`DragController`](crate::drag::DragController).

use super::requests::ApiCall;
use super::state::{DashboardApp, View};
use crate::constants::*;
use crate::drag::{DragOutcome, PointerTarget};
use crate::layout::{capture_layout, merge_scada_positions, PlacedElement};
use crate::notice::Severity;
use eframe::egui;

/// What a canvas item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Dashboard group section
    Group,
    /// Dashboard node card
    Node,
    /// SCADA element
    Scada,
}

/// One draggable element as laid out this frame.
#[derive(Debug, Clone, PartialEq)]
pub struct CanvasItem {
    /// Element id
    pub id: String,
    /// Kind of record behind the element
    pub kind: ItemKind,
    /// Top-left corner in canvas coordinates, as rendered
    pub pos: egui::Pos2,
    /// Rendered size
    pub size: egui::Vec2,
    /// Z-order, raised while dragged
    pub z: u32,
}

impl CanvasItem {
    /// Rectangle in canvas coordinates.
    pub fn rect(&self) -> egui::Rect {
        egui::Rect::from_min_size(self.pos, self.size)
    }
}

impl DashboardApp {
    /// Items on the canvas of `view`, in paint order (bottom first).
    pub fn canvas_items(&self, view: View) -> Vec<CanvasItem> {
        let mut items: Vec<CanvasItem> = match view {
            View::Dashboard => {
                let groups = self.groups.iter().map(|g| {
                    let (w, h) = g.size.group_dimensions();
                    CanvasItem {
                        id: g.id.clone(),
                        kind: ItemKind::Group,
                        pos: self.drag.live_position(&g.id).unwrap_or(egui::pos2(g.x, g.y)),
                        size: egui::vec2(w, h),
                        z: self.drag.z_order(&g.id, GROUP_BASE_Z),
                    }
                });
                let nodes = self.nodes.iter().map(|n| {
                    let (w, h) = n.size.node_dimensions();
                    CanvasItem {
                        id: n.id.clone(),
                        kind: ItemKind::Node,
                        pos: self.drag.live_position(&n.id).unwrap_or(egui::pos2(n.x, n.y)),
                        size: egui::vec2(w, h),
                        z: self.drag.z_order(&n.id, CARD_BASE_Z),
                    }
                });
                groups.chain(nodes).collect()
            }
            View::Scada => self
                .scada_elements
                .iter()
                .map(|e| CanvasItem {
                    id: e.id.clone(),
                    kind: ItemKind::Scada,
                    pos: self.drag.live_position(&e.id).unwrap_or(egui::pos2(e.x, e.y)),
                    size: egui::vec2(SCADA_ELEMENT_SIZE.0, SCADA_ELEMENT_SIZE.1),
                    z: self.drag.z_order(&e.id, CARD_BASE_Z),
                })
                .collect(),
            View::Historical | View::Configure => Vec::new(),
        };
        // Stable: equal z keeps record order
        items.sort_by_key(|item| item.z);
        items
    }

    /// Topmost item under `pos` (canvas coordinates).
    pub fn item_at<'a>(items: &'a [CanvasItem], pos: egui::Pos2) -> Option<&'a CanvasItem> {
        items.iter().rev().find(|item| item.rect().contains(pos))
    }

    /// Whether `pos` (canvas coordinates) lies on an interactive control of element `id`.
    pub fn pointer_target(&self, id: &str, pos: egui::Pos2) -> PointerTarget {
        let on_control = self
            .control_rects
            .get(id)
            .is_some_and(|rects| rects.iter().any(|r| r.contains(pos)));
        if on_control {
            PointerTarget::Control
        } else {
            PointerTarget::Body
        }
    }

    /// Handles pointer input for dragging canvas items.
    ///
    /// # Arguments
    ///
    /// * `ui` - The canvas UI
    /// * `response` - Response of the allocated canvas
    /// * `items` - Items as laid out this frame
    pub fn handle_canvas_dragging(&mut self, ui: &egui::Ui, response: &egui::Response, items: &[CanvasItem]) {
        let origin = response.rect.min;
        let bounds = response.rect.size();
        let (pressed, released, pointer) = ui.input(|i| {
            (
                i.pointer.primary_pressed(),
                i.pointer.primary_released(),
                i.pointer.interact_pos(),
            )
        });

        if pressed && !self.drag.is_active() {
            if let Some(screen_pos) = pointer.filter(|p| self.pointer_reaches_canvas(ui, response, *p)) {
                let canvas_pos = (screen_pos - origin).to_pos2();
                if let Some(item) = Self::item_at(items, canvas_pos) {
                    let target = self.pointer_target(&item.id, canvas_pos);
                    self.drag.begin(&item.id, canvas_pos, item.pos, item.size, target);
                }
            }
        }

        if self.drag.is_active() {
            if let Some(screen_pos) = pointer {
                self.drag.update((screen_pos - origin).to_pos2(), bounds);
            }
        }

        if released {
            if let Some(outcome) = self.drag.end() {
                self.commit_drag(outcome);
            }
        }
    }

    /// Whether a press at `pos` reaches the canvas rather than a window above it.
    fn pointer_reaches_canvas(&self, ui: &egui::Ui, response: &egui::Response, pos: egui::Pos2) -> bool {
        if !response.rect.contains(pos) {
            return false;
        }
        match ui.ctx().layer_id_at(pos) {
            Some(layer) => layer == ui.layer_id(),
            None => true,
        }
    }

    /// Writes a finished drag into the element's record.
    pub fn commit_drag(&mut self, outcome: DragOutcome) {
        let DragOutcome { id, to, .. } = outcome;
        let kind = if let Some(node) = self.nodes.iter_mut().find(|n| n.id == id) {
            node.x = to.x;
            node.y = to.y;
            ItemKind::Node
        } else if let Some(group) = self.groups.iter_mut().find(|g| g.id == id) {
            group.x = to.x;
            group.y = to.y;
            ItemKind::Group
        } else if let Some(element) = self.scada_elements.iter_mut().find(|e| e.id == id) {
            element.x = to.x;
            element.y = to.y;
            ItemKind::Scada
        } else {
            log::warn!("Dropped element {id} no longer exists");
            return;
        };
        log::debug!("Moved {id} to ({}, {})", to.x, to.y);

        if self.config.auto_save_layout {
            match kind {
                ItemKind::Scada => self.save_scada_layout(),
                ItemKind::Node | ItemKind::Group => self.save_layout(),
            }
        }
    }

    /// Elements of `view` at the position they are currently rendered at.
    pub fn placed_elements(&self, view: View) -> Vec<PlacedElement> {
        self.canvas_items(view)
            .into_iter()
            .map(|item| {
                let size = match item.kind {
                    ItemKind::Node => self.node(&item.id).map(|n| n.size),
                    ItemKind::Group => self.groups.iter().find(|g| g.id == item.id).map(|g| g.size),
                    ItemKind::Scada => None,
                };
                PlacedElement {
                    id: item.id,
                    pos: item.pos,
                    size,
                }
            })
            .collect()
    }

    /// Queues a save of the dashboard layout as currently rendered.
    pub fn save_layout(&mut self) {
        let layout = capture_layout(self.placed_elements(View::Dashboard));
        if layout.is_empty() {
            self.notice.show("Nothing to save: the dashboard is empty.", Severity::Info, self.now);
            return;
        }
        self.layout = layout.clone();
        self.queue(ApiCall::SaveLayout(layout));
    }

    /// Queues a save of the SCADA elements with their rendered positions.
    pub fn save_scada_layout(&mut self) {
        let merged = merge_scada_positions(&self.scada_elements, &self.placed_elements(View::Scada));
        self.queue(ApiCall::SaveScadaLayout(merged));
    }
}
