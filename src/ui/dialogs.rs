//! Modal windows: node and group forms, delete confirmation and settings.

use super::requests::ApiCall;
use super::state::{DashboardApp, GroupForm, NodeForm, PendingConfirm};
use crate::constants::GRID_SIZE;
use crate::settings::{ColorRole, Settings, MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::types::*;
use eframe::egui;

fn modal(title: &str) -> egui::Window<'static> {
    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, egui::vec2(0.0, 0.0))
}

impl DashboardApp {
    /// Sends the node form; the form stays open until the server accepts it.
    pub fn submit_node_form(&mut self) {
        if self.node_form.pending {
            return;
        }
        self.node_form.pending = true;
        let request = self.node_form.to_request();
        self.queue(ApiCall::SaveNode(request));
    }

    /// Sends the group form; the form stays open until the server accepts it.
    pub fn submit_group_form(&mut self) {
        if self.group_form.pending {
            return;
        }
        self.group_form.pending = true;
        let request = self.group_form.to_request();
        self.queue(ApiCall::SaveGroup(request));
    }

    /// Carries out the pending destructive action.
    pub fn confirm_pending(&mut self) {
        let Some(action) = self.pending_confirm.take() else {
            return;
        };
        match action {
            PendingConfirm::DeleteNode(id) => self.queue(ApiCall::DeleteNode(id)),
            PendingConfirm::DeleteGroup(id) => self.queue(ApiCall::DeleteGroup(id)),
            PendingConfirm::DeleteScadaElement(element_id) => {
                let remaining: Vec<ScadaElement> = crate::layout::merge_scada_positions(
                    &self.scada_elements,
                    &self.placed_elements(super::View::Scada),
                )
                .into_iter()
                .filter(|e| e.id != element_id)
                .collect();
                self.queue(ApiCall::DeleteScadaElement { element_id, remaining });
            }
        }
    }

    pub(super) fn draw_node_form(&mut self, ctx: &egui::Context) {
        if !self.node_form.open {
            return;
        }
        let title = if self.node_form.editing.is_some() { "Edit Node" } else { "Add Node" };
        let groups = self.groups.clone();
        let mut submit = false;
        let mut cancel = false;
        modal(title).show(ctx, |ui| {
            let form = &mut self.node_form;
            egui::Grid::new("node_form_grid").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
                ui.label("Name");
                ui.text_edit_singleline(&mut form.name);
                ui.end_row();

                ui.label("Type");
                egui::ComboBox::from_id_salt("node_form_type")
                    .selected_text(form.node_type.as_str())
                    .show_ui(ui, |ui| {
                        for kind in NodeType::ALL {
                            ui.selectable_value(&mut form.node_type, kind, kind.as_str());
                        }
                    });
                ui.end_row();

                ui.label("Size");
                egui::ComboBox::from_id_salt("node_form_size")
                    .selected_text(form.size.as_str())
                    .show_ui(ui, |ui| {
                        for size in ElementSize::ALL {
                            ui.selectable_value(&mut form.size, size, size.as_str());
                        }
                    });
                ui.end_row();

                ui.label("OPC UA node id");
                ui.add(egui::TextEdit::singleline(&mut form.node_ua_id).hint_text("ns=2;s=Tag"));
                ui.end_row();

                ui.label("Unit");
                ui.add(egui::TextEdit::singleline(&mut form.unit).hint_text("optional"));
                ui.end_row();

                ui.label("Group");
                let group_title = form
                    .group_id
                    .as_deref()
                    .and_then(|id| groups.iter().find(|g| g.id == id))
                    .map(|g| g.title.clone())
                    .unwrap_or_else(|| "None".into());
                egui::ComboBox::from_id_salt("node_form_group")
                    .selected_text(group_title)
                    .show_ui(ui, |ui| {
                        ui.selectable_value(&mut form.group_id, None, "None");
                        for group in &groups {
                            ui.selectable_value(&mut form.group_id, Some(group.id.clone()), &group.title);
                        }
                    });
                ui.end_row();
            });

            ui.separator();
            ui.horizontal(|ui| {
                let label = if form.pending { "Saving…" } else { "Save" };
                if ui.add_enabled(!form.pending, egui::Button::new(label)).clicked() {
                    submit = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

        if submit {
            self.submit_node_form();
        }
        if cancel {
            self.node_form = NodeForm::default();
        }
    }

    pub(super) fn draw_group_form(&mut self, ctx: &egui::Context) {
        if !self.group_form.open {
            return;
        }
        let title = if self.group_form.editing.is_some() { "Edit Group" } else { "Add Group" };
        let mut submit = false;
        let mut cancel = false;
        modal(title).show(ctx, |ui| {
            let form = &mut self.group_form;
            egui::Grid::new("group_form_grid").num_columns(2).spacing([12.0, 8.0]).show(ui, |ui| {
                ui.label("Title");
                ui.text_edit_singleline(&mut form.title);
                ui.end_row();

                ui.label("Size");
                egui::ComboBox::from_id_salt("group_form_size")
                    .selected_text(form.size.as_str())
                    .show_ui(ui, |ui| {
                        for size in ElementSize::ALL {
                            ui.selectable_value(&mut form.size, size, size.as_str());
                        }
                    });
                ui.end_row();
            });

            ui.separator();
            ui.horizontal(|ui| {
                let label = if form.pending { "Saving…" } else { "Save" };
                if ui.add_enabled(!form.pending, egui::Button::new(label)).clicked() {
                    submit = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
            });
        });

        if submit {
            self.submit_group_form();
        }
        if cancel {
            self.group_form = GroupForm::default();
        }
    }

    pub(super) fn draw_confirm_dialog(&mut self, ctx: &egui::Context) {
        let Some(action) = self.pending_confirm.clone() else {
            return;
        };
        let question = match &action {
            PendingConfirm::DeleteNode(id) => {
                let name = self.node(id).map(|n| n.name.as_str()).unwrap_or(id);
                format!("Are you sure you want to delete node \"{name}\"?")
            }
            PendingConfirm::DeleteGroup(id) => {
                let title = self
                    .groups
                    .iter()
                    .find(|g| &g.id == id)
                    .map(|g| g.title.as_str())
                    .unwrap_or(id);
                format!("Are you sure you want to delete group \"{title}\"? Its nodes will be kept.")
            }
            PendingConfirm::DeleteScadaElement(_) => "Remove this element from the SCADA view?".to_string(),
        };

        let mut confirmed = false;
        let mut cancelled = false;
        modal("Confirm").show(ctx, |ui| {
            ui.label(question);
            ui.horizontal(|ui| {
                if ui.button("Delete").clicked() {
                    confirmed = true;
                }
                if ui.button("Cancel").clicked() {
                    cancelled = true;
                }
            });
        });

        if confirmed {
            self.confirm_pending();
        } else if cancelled {
            self.pending_confirm = None;
        }
    }

    pub(super) fn draw_settings_window(&mut self, ctx: &egui::Context) {
        if !self.show_settings {
            return;
        }
        let mut open = true;
        let mut snap_changed = false;
        egui::Window::new("Settings")
            .open(&mut open)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.heading("Appearance");
                ui.add(
                    egui::Slider::new(&mut self.settings.font_size, MIN_FONT_SIZE..=MAX_FONT_SIZE)
                        .text("Font size")
                        .suffix(" px"),
                );
                ui.checkbox(&mut self.settings.dark_mode, "Dark mode");
                egui::Grid::new("settings_colors").num_columns(2).show(ui, |ui| {
                    for role in ColorRole::ALL {
                        ui.label(role.label());
                        let mut color = self.settings.color(role);
                        if egui::color_picker::color_edit_button_srgba(
                            ui,
                            &mut color,
                            egui::color_picker::Alpha::Opaque,
                        )
                        .changed()
                        {
                            self.settings.set_color(role, color);
                        }
                        ui.end_row();
                    }
                });

                ui.separator();
                ui.heading("Server");
                ui.add(
                    egui::DragValue::new(&mut self.config.dashboard_poll_secs)
                        .range(0.5..=60.0)
                        .speed(0.1)
                        .prefix("Dashboard refresh: ")
                        .suffix(" s"),
                );
                ui.add(
                    egui::DragValue::new(&mut self.config.scada_poll_secs)
                        .range(0.5..=60.0)
                        .speed(0.1)
                        .prefix("SCADA refresh: ")
                        .suffix(" s"),
                );
                ui.add(
                    egui::DragValue::new(&mut self.config.request_timeout_secs)
                        .range(1..=120)
                        .prefix("Request timeout: ")
                        .suffix(" s"),
                );
                snap_changed = ui.checkbox(&mut self.config.snap_to_grid, "Snap to grid").changed();
                ui.checkbox(&mut self.config.auto_save_layout, "Auto-save layout after dragging");

                ui.separator();
                if ui.button("Reset appearance").clicked() {
                    self.settings = Settings::default();
                }
            });

        if snap_changed {
            self.drag.snap = self.config.snap_to_grid.then_some(GRID_SIZE);
        }
        // Interval edits take effect from the next tick
        let interval = self.config.poll_interval(self.view);
        if (self.poller.interval() - interval).abs() > f64::EPSILON {
            self.poller.set_interval(interval);
        }
        self.show_settings = open;
    }
}
