//! User interface for the dashboard client.
//!
//! # Module Organization
//!
//! - `state` - Application state structures and the main DashboardApp
//! - `requests` - Queued API calls, async dispatch and applying results
//! - `canvas` - Hit testing, dragging and layout saving on the canvases
//! - `rendering` - Cards, SCADA elements and the notice banner
//! - `dialogs` - Node/group forms, delete confirmation and the settings window
//! - `pages` - Historical chart and connection configuration pages

mod canvas;
mod dialogs;
mod pages;
mod rendering;
mod requests;
mod state;

pub use requests::{ApiCall, ApiOutcome};
pub use state::{DashboardApp, View};

use self::canvas::ItemKind;
use self::state::{GroupForm, NodeForm};
use crate::constants::*;
use crate::notice::Severity;
use crate::poller::ControlKey;
use crate::types::*;
use eframe::egui;
use std::time::Duration;

impl eframe::App for DashboardApp {
    /// Persist preferences between restarts.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        match self.to_json() {
            Ok(json) => storage.set_string(APP_STATE_KEY, json),
            Err(err) => log::error!("Failed to serialize app state: {err}"),
        }
    }

    /// Main update function called by egui for each frame.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.now = ctx.input(|i| i.time);
        self.apply_settings(ctx);

        // Apply finished requests, then send the ones queued last frame
        self.handle_pending_operations(ctx);
        self.tick_poller();

        egui::TopBottomPanel::top("top_toolbar").show(ctx, |ui| {
            self.draw_toolbar(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.view {
            View::Dashboard | View::Scada => self.draw_canvas(ui),
            View::Historical => self.draw_historical_page(ui),
            View::Configure => self.draw_configure_page(ui),
        });

        self.draw_node_form(ctx);
        self.draw_group_form(ctx);
        self.draw_confirm_dialog(ctx);
        self.draw_settings_window(ctx);

        self.notice.tick(self.now);
        self.draw_notice(ctx);
        self.schedule_repaint(ctx);
    }
}

impl DashboardApp {
    /// Starts the poller for pollable views and queues a read when a tick is due.
    pub fn tick_poller(&mut self) {
        if !self.view.polls_values() || !self.config_loaded {
            return;
        }
        if !self.poller.is_running() {
            self.poller.set_interval(self.config.poll_interval(self.view));
            self.poller.start(self.now);
        }
        let Some(generation) = self.poller.poll_due(self.now) else {
            return;
        };
        let targets = self.poll_targets();
        if targets.is_empty() {
            self.poller.accept(generation);
            return;
        }
        self.queue(ApiCall::PollValues { generation, targets });
    }

    /// `(node id, tag)` of every node rendered on the current view.
    pub fn poll_targets(&self) -> Vec<(NodeId, String)> {
        let ids: Vec<&str> = match self.view {
            View::Dashboard => self.nodes.iter().map(|n| n.id.as_str()).collect(),
            View::Scada => {
                let mut ids: Vec<&str> = Vec::new();
                for element in &self.scada_elements {
                    if !ids.contains(&element.node_id.as_str()) {
                        ids.push(&element.node_id);
                    }
                }
                ids
            }
            View::Historical | View::Configure => Vec::new(),
        };
        ids.into_iter()
            .filter_map(|id| self.node(id))
            .filter(|n| !n.node_ua_id.trim().is_empty())
            .map(|n| (n.id.clone(), n.node_ua_id.clone()))
            .collect()
    }

    fn schedule_repaint(&self, ctx: &egui::Context) {
        let waits = [self.poller.time_until_due(self.now), self.notice.next_change_in(self.now)];
        if let Some(wait) = waits.into_iter().flatten().reduce(f64::min) {
            ctx.request_repaint_after(Duration::from_secs_f64(wait.max(0.0)));
        }
    }

    fn draw_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal_wrapped(|ui| {
            for view in View::ALL {
                if ui.selectable_label(self.view == view, view.label()).clicked() {
                    self.switch_view(view);
                }
            }

            ui.separator();

            match self.view {
                View::Dashboard => self.draw_dashboard_actions(ui),
                View::Scada => self.draw_scada_palette(ui),
                View::Historical => self.draw_historical_controls(ui),
                View::Configure => {}
            }

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("⚙ Settings").clicked() {
                    self.show_settings = true;
                }
                if ui.button("⟳ Reload").on_hover_text("Reload configuration from the server").clicked() {
                    self.queue(ApiCall::LoadConfig);
                }
            });
        });
    }

    fn draw_dashboard_actions(&mut self, ui: &mut egui::Ui) {
        if ui.button("Add Node").clicked() {
            self.node_form = NodeForm {
                open: true,
                ..NodeForm::default()
            };
        }
        if ui.button("Add Group").clicked() {
            self.group_form = GroupForm {
                open: true,
                ..GroupForm::default()
            };
        }
        if ui.button("Save Layout").clicked() {
            self.save_layout();
        }
        self.draw_canvas_options(ui);
    }

    fn draw_canvas_options(&mut self, ui: &mut egui::Ui) {
        if ui.checkbox(&mut self.config.snap_to_grid, "Snap to grid").changed() {
            self.drag.snap = self.config.snap_to_grid.then_some(GRID_SIZE);
        }
        ui.checkbox(&mut self.config.auto_save_layout, "Auto-save layout");
    }

    fn draw_scada_palette(&mut self, ui: &mut egui::Ui) {
        let selected_name = self
            .scada_palette
            .node_id
            .as_deref()
            .and_then(|id| self.node(id))
            .map(|n| n.name.clone())
            .unwrap_or_else(|| "Select node".into());
        egui::ComboBox::from_id_salt("scada_node")
            .selected_text(selected_name)
            .show_ui(ui, |ui| {
                for node in &self.nodes {
                    ui.selectable_value(&mut self.scada_palette.node_id, Some(node.id.clone()), &node.name);
                }
            });
        egui::ComboBox::from_id_salt("scada_element_type")
            .selected_text(self.scada_palette.element_type.label())
            .show_ui(ui, |ui| {
                for kind in ScadaElementType::ALL {
                    ui.selectable_value(&mut self.scada_palette.element_type, kind, kind.label());
                }
            });
        if ui.button("Add Element").clicked() {
            self.add_scada_element();
        }
        if ui.button("Save SCADA Layout").clicked() {
            self.save_scada_layout();
        }
        self.draw_canvas_options(ui);
    }

    /// Places a new element for the palette's node and stores the SCADA layout.
    pub fn add_scada_element(&mut self) {
        let Some(node) = self.scada_palette.node_id.as_deref().and_then(|id| self.node(id)) else {
            self.notice.show("Please select a node first.", Severity::Info, self.now);
            return;
        };
        let mut element = ScadaElement::new(node, self.scada_palette.element_type);
        // Cascade new elements so they do not stack exactly
        let step = (self.scada_elements.len() % 10) as f32 * GRID_SIZE;
        element.x = step;
        element.y = step;
        log::info!("Adding SCADA element {} for node {}", element.id, element.node_id);
        self.scada_elements.push(element);
        self.save_scada_layout();
    }

    /// Draws the canvas of the current view and handles dragging on it.
    fn draw_canvas(&mut self, ui: &mut egui::Ui) {
        let (response, painter) = ui.allocate_painter(ui.available_size(), egui::Sense::hover());
        let origin = response.rect.min;
        self.canvas_size = response.rect.size();

        if self.drag.snap.is_some() {
            let grid_color = ui.visuals().widgets.noninteractive.bg_stroke.color.gamma_multiply(0.4);
            let mut x = response.rect.left();
            while x <= response.rect.right() {
                let mut y = response.rect.top();
                while y <= response.rect.bottom() {
                    painter.circle_filled(egui::pos2(x, y), 1.0, grid_color);
                    y += GRID_SIZE;
                }
                x += GRID_SIZE;
            }
        }

        let items = self.canvas_items(self.view);
        self.handle_canvas_dragging(ui, &response, &items);
        // Lay out again so the dragged element renders at its new position this frame
        let items = self.canvas_items(self.view);

        self.control_rects.clear();
        let mut focused: Option<ControlKey> = None;
        for item in &items {
            let rect = item.rect().translate(origin.to_vec2());
            match item.kind {
                ItemKind::Group => self.draw_group_card(ui, rect, origin, &item.id),
                ItemKind::Node => self.draw_node_card(ui, rect, origin, &item.id, &mut focused),
                ItemKind::Scada => self.draw_scada_element(ui, rect, origin, &item.id, &mut focused),
            }
        }
        self.live.focused = focused;

        if items.is_empty() {
            let message = match self.view {
                View::Scada => "No SCADA elements yet. Pick a node and an element type, then press \"Add Element\".",
                _ if !self.config_loaded => "Loading configuration…",
                _ => "No nodes or groups configured yet. Use \"Add Node\" or \"Add Group\" to get started.",
            };
            painter.text(
                response.rect.center(),
                egui::Align2::CENTER_CENTER,
                message,
                egui::TextStyle::Body.resolve(ui.style()),
                ui.visuals().weak_text_color(),
            );
        }
    }
}

#[cfg(test)]
mod tests;
