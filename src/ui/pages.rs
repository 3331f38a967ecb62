//! Historical chart and connection configuration pages.

use super::requests::ApiCall;
use super::state::{ConnectionStatus, DashboardApp};
use crate::history;
use crate::notice::Severity;
use eframe::egui;
use egui_plot::{Legend, Line, Plot, PlotPoints};

impl DashboardApp {
    /// Queues the historical query for the selected node and dates.
    pub fn load_history(&mut self) {
        let Some(node) = self.historical.node_id.as_deref().and_then(|id| self.node(id)) else {
            self.notice.show("Please select a node.", Severity::Info, self.now);
            return;
        };
        let fallback_label = node.name.clone();
        let node_id = node.id.clone();
        match history::build_query(&node_id, &self.historical.start_date, &self.historical.end_date) {
            Ok(query) => {
                self.historical.loading = true;
                self.queue(ApiCall::Historical { query, fallback_label });
            }
            Err(message) => self.notice.show(format!("Error: {message}"), Severity::Error, self.now),
        }
    }

    pub(super) fn draw_historical_controls(&mut self, ui: &mut egui::Ui) {
        let selected = self
            .historical
            .node_id
            .as_deref()
            .and_then(|id| self.node(id))
            .map(|n| n.name.clone())
            .unwrap_or_else(|| "Select node".into());
        egui::ComboBox::from_id_salt("historical_node")
            .selected_text(selected)
            .show_ui(ui, |ui| {
                for node in &self.nodes {
                    ui.selectable_value(&mut self.historical.node_id, Some(node.id.clone()), &node.name);
                }
            });
        ui.label("From");
        ui.add(
            egui::TextEdit::singleline(&mut self.historical.start_date)
                .desired_width(90.0)
                .hint_text("YYYY-MM-DD"),
        );
        ui.label("To");
        ui.add(
            egui::TextEdit::singleline(&mut self.historical.end_date)
                .desired_width(90.0)
                .hint_text("YYYY-MM-DD"),
        );
        let label = if self.historical.loading { "Loading…" } else { "Load Data" };
        if ui.add_enabled(!self.historical.loading, egui::Button::new(label)).clicked() {
            self.load_history();
        }
    }

    pub(super) fn draw_historical_page(&mut self, ui: &mut egui::Ui) {
        let Some(series) = &self.historical.series else {
            ui.centered_and_justified(|ui| {
                ui.weak("Select a node and a date range, then press \"Load Data\".");
            });
            return;
        };
        let origin = series.origin.format("%Y-%m-%d %H:%M:%S").to_string();
        ui.label(format!("{} points, seconds since {origin} UTC", series.point_count()));
        Plot::new("historical_plot")
            .legend(Legend::default())
            .x_axis_label("Time (s)")
            .y_axis_label("Value")
            .show(ui, |plot_ui| {
                for segment in &series.segments {
                    let points: PlotPoints = segment.iter().copied().collect();
                    plot_ui.line(Line::new(series.label.clone(), points));
                }
            });
    }

    /// Sends one of the endpoint requests, refusing an empty URL.
    pub fn send_endpoint_request(&mut self, make: fn(String) -> ApiCall) {
        let url = self.configure.endpoint_url.trim().to_string();
        if url.is_empty() {
            self.notice.show("Please enter an OPC UA endpoint URL.", Severity::Info, self.now);
            return;
        }
        let call = make(url);
        match &call {
            ApiCall::Connect(_) => self.configure.status = ConnectionStatus::Connecting,
            ApiCall::Disconnect(_) => self.configure.status = ConnectionStatus::Disconnecting,
            _ => {}
        }
        self.queue(call);
    }

    /// Points the client at a different server and reloads the configuration.
    pub fn apply_base_url(&mut self) {
        let url = self.configure.base_url_edit.trim().trim_end_matches('/').to_string();
        if url == self.config.base_url {
            return;
        }
        log::info!("Switching server base URL to {url:?}");
        self.config.base_url = url;
        self.client = None;
        self.poller.stop();
        self.config_loaded = false;
        self.queue(ApiCall::LoadConfig);
    }

    pub(super) fn draw_configure_page(&mut self, ui: &mut egui::Ui) {
        ui.heading("Server");
        ui.horizontal(|ui| {
            ui.label("Dashboard server URL");
            let response = ui.add(
                egui::TextEdit::singleline(&mut self.configure.base_url_edit)
                    .hint_text("same origin")
                    .desired_width(280.0),
            );
            let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Apply").clicked() || submitted {
                self.apply_base_url();
            }
        });

        ui.add_space(12.0);
        ui.heading("OPC UA connection");
        ui.horizontal(|ui| {
            ui.label("Endpoint URL");
            ui.add(
                egui::TextEdit::singleline(&mut self.configure.endpoint_url)
                    .hint_text("opc.tcp://host:4840")
                    .desired_width(280.0),
            );
        });
        ui.horizontal(|ui| {
            if ui.button("Save Endpoint").clicked() {
                self.send_endpoint_request(ApiCall::SetEndpoint);
            }
            if ui.button("Connect").clicked() {
                self.send_endpoint_request(ApiCall::Connect);
            }
            if ui.button("Disconnect").clicked() {
                self.send_endpoint_request(ApiCall::Disconnect);
            }
        });

        let (text, color) = match &self.configure.status {
            ConnectionStatus::Unknown => ("Status unknown".to_string(), ui.visuals().weak_text_color()),
            ConnectionStatus::Connecting => ("Connecting…".to_string(), ui.visuals().text_color()),
            ConnectionStatus::Connected => ("Connected".to_string(), egui::Color32::from_rgb(0x10, 0xb9, 0x81)),
            ConnectionStatus::Disconnecting => ("Disconnecting…".to_string(), ui.visuals().text_color()),
            ConnectionStatus::Disconnected => ("Disconnected".to_string(), ui.visuals().weak_text_color()),
            ConnectionStatus::Failed(reason) => (format!("Failed: {reason}"), ui.visuals().error_fg_color),
        };
        ui.add_space(8.0);
        ui.label(egui::RichText::new(text).color(color));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::*;

    fn app_with_node() -> DashboardApp {
        let mut app = DashboardApp::default();
        app.nodes.push(Node {
            id: "n1".into(),
            name: "Level".into(),
            node_type: NodeType::Chart,
            node_ua_id: "ns=2;s=Level".into(),
            unit: None,
            value: None,
            group_id: None,
            x: 0.0,
            y: 0.0,
            size: ElementSize::Medium,
        });
        app
    }

    #[test]
    fn history_query_needs_a_node_and_valid_dates() {
        let mut app = app_with_node();
        app.load_history();
        assert!(app.requests.outbox.is_empty());
        assert_eq!(app.notice.severity(), Some(Severity::Info));

        app.historical.node_id = Some("n1".into());
        app.historical.start_date = "2026-10-15".into();
        app.historical.end_date = "yesterday".into();
        app.load_history();
        assert!(app.requests.outbox.is_empty());
        assert_eq!(app.notice.severity(), Some(Severity::Error));

        app.historical.end_date = "2026-10-16".into();
        app.load_history();
        assert!(app.historical.loading);
        match app.requests.outbox.last() {
            Some(ApiCall::Historical { query, fallback_label }) => {
                assert_eq!(
                    query.path(),
                    "/api/historical_data?node_id=n1&start_time=2026-10-15T00%3A00%3A00&end_time=2026-10-16T23%3A59%3A59"
                );
                assert_eq!(fallback_label, "Level");
            }
            other => panic!("expected a historical query, got {other:?}"),
        }
    }

    #[test]
    fn empty_endpoint_is_not_sent() {
        let mut app = DashboardApp::default();
        app.configure.endpoint_url = "   ".into();
        app.send_endpoint_request(ApiCall::Connect);
        assert!(app.requests.outbox.is_empty());
        assert_eq!(app.configure.status, ConnectionStatus::Unknown);

        app.configure.endpoint_url = "opc.tcp://plc:4840".into();
        app.send_endpoint_request(ApiCall::Connect);
        assert_eq!(app.configure.status, ConnectionStatus::Connecting);
        assert_eq!(
            app.requests.outbox.last(),
            Some(&ApiCall::Connect("opc.tcp://plc:4840".into()))
        );
    }

    #[test]
    fn changing_base_url_reloads_config() {
        let mut app = DashboardApp::default();
        app.config_loaded = true;
        app.configure.base_url_edit = "http://10.0.0.5:5000/".into();
        app.apply_base_url();
        assert_eq!(app.config.base_url, "http://10.0.0.5:5000");
        assert!(!app.config_loaded);
        assert_eq!(app.requests.outbox.last(), Some(&ApiCall::LoadConfig));
        assert_eq!(app.api_client().base_url(), "http://10.0.0.5:5000");
    }
}
