use super::*;
use crate::api::ApiError;
use crate::poller::ValueReading;
use eframe::egui;

fn screen() -> egui::Rect {
    egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1200.0, 800.0))
}

/// Run a single headless egui frame on `ctx` with the provided input events, drawing the canvas.
fn run_canvas_frame(ctx: &egui::Context, app: &mut DashboardApp, events: Vec<egui::Event>) {
    let mut raw = egui::RawInput::default();
    raw.screen_rect = Some(screen());
    raw.events = events;
    let _ = ctx.run(raw, |ctx| {
        ctx.set_visuals(egui::Visuals::dark());
        egui::CentralPanel::default().show(ctx, |ui| {
            app.draw_canvas(ui);
        });
    });
}

fn press(pos: egui::Pos2, pressed: bool) -> egui::Event {
    egui::Event::PointerButton {
        pos,
        button: egui::PointerButton::Primary,
        pressed,
        modifiers: egui::Modifiers::NONE,
    }
}

fn node(id: &str, node_type: NodeType, x: f32, y: f32) -> Node {
    Node {
        id: id.into(),
        name: format!("Node {id}"),
        node_type,
        node_ua_id: format!("ns=2;s={id}"),
        unit: None,
        value: None,
        group_id: None,
        x,
        y,
        size: ElementSize::Medium,
    }
}

fn loaded_app(nodes: Vec<Node>) -> DashboardApp {
    let mut app = DashboardApp::default();
    app.nodes = nodes;
    app.config_loaded = true;
    app
}

#[test]
fn dragging_a_card_moves_it_by_the_pointer_delta() {
    let mut app = loaded_app(vec![node("n1", NodeType::Gauge, 100.0, 100.0)]);
    let ctx = egui::Context::default();

    // First frame: lay out and hover the card body, below the title row
    let start = egui::pos2(140.0, 140.0);
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(start)]);

    // Second frame: press starts the drag
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(start), press(start, true)]);
    assert_eq!(app.drag.active_id(), Some("n1"));

    // Third frame: move while held
    let end = start + egui::vec2(60.0, 40.0);
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(end)]);
    // The record only changes on release
    assert_eq!((app.nodes[0].x, app.nodes[0].y), (100.0, 100.0));

    // Fourth frame: release commits
    run_canvas_frame(&ctx, &mut app, vec![press(end, false)]);
    assert!(!app.drag.is_active());
    assert_eq!((app.nodes[0].x, app.nodes[0].y), (160.0, 140.0));
    // Auto-save is off by default
    assert!(app.requests.outbox.is_empty());
}

#[test]
fn drop_with_auto_save_queues_the_layout() {
    let mut app = loaded_app(vec![node("n1", NodeType::Text, 0.0, 0.0)]);
    app.config.auto_save_layout = true;
    let ctx = egui::Context::default();

    let start = egui::pos2(40.0, 40.0);
    let end = start + egui::vec2(100.0, 0.0);
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(start)]);
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(start), press(start, true)]);
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(end)]);
    run_canvas_frame(&ctx, &mut app, vec![press(end, false)]);

    match app.requests.outbox.last() {
        Some(ApiCall::SaveLayout(layout)) => {
            let entry = layout.get("n1").expect("dragged node is in the layout");
            assert_eq!((entry.x, entry.y), (100.0, 0.0));
        }
        other => panic!("expected a layout save, got {other:?}"),
    }
}

#[test]
fn pressing_a_control_does_not_start_a_drag() {
    let mut app = loaded_app(vec![node("sw", NodeType::Switch, 50.0, 50.0)]);
    let ctx = egui::Context::default();

    run_canvas_frame(&ctx, &mut app, vec![]);
    let toggle = app
        .control_rects
        .get("sw")
        .and_then(|rects| rects.last().copied())
        .expect("switch control rect recorded");

    // Control rects are canvas coordinates; find the canvas origin from the first frame
    let margin = egui::Frame::central_panel(&ctx.style()).inner_margin;
    let origin = egui::pos2(margin.left as f32, margin.top as f32);
    let at = toggle.center() + origin.to_vec2();

    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(at)]);
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(at), press(at, true)]);
    assert!(!app.drag.is_active());

    let away = at + egui::vec2(80.0, 60.0);
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(away)]);
    run_canvas_frame(&ctx, &mut app, vec![press(away, false)]);
    assert_eq!((app.nodes[0].x, app.nodes[0].y), (50.0, 50.0));
}

#[test]
fn empty_canvas_renders_without_items() {
    let mut app = DashboardApp::default();
    let ctx = egui::Context::default();
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(egui::pos2(10.0, 10.0))]);
    run_canvas_frame(&ctx, &mut app, vec![press(egui::pos2(10.0, 10.0), true)]);
    assert!(app.control_rects.is_empty());
    assert!(!app.drag.is_active());
}

#[test]
fn rejected_node_save_keeps_the_form_open() {
    let mut app = loaded_app(vec![]);
    app.node_form = NodeForm {
        open: true,
        name: "Pump".into(),
        node_ua_id: "ns=2;s=Pump".into(),
        ..NodeForm::default()
    };
    app.submit_node_form();
    assert!(app.node_form.pending);
    assert!(matches!(app.requests.outbox.last(), Some(ApiCall::SaveNode(r)) if r.name == "Pump"));

    app.apply_outcome(ApiOutcome::NodeSaved {
        updated: false,
        result: Err(ApiError::Http {
            status: 500,
            message: "db locked".into(),
        }),
    });

    assert!(app.nodes.is_empty());
    assert!(app.node_form.open);
    assert!(!app.node_form.pending);
    assert_eq!(app.node_form.name, "Pump");
    assert!(app.notice.message().is_some_and(|m| m.contains("db locked")));
    assert_eq!(app.notice.severity(), Some(Severity::Error));
}

#[test]
fn accepted_node_save_closes_the_form() {
    let mut app = loaded_app(vec![]);
    app.node_form = NodeForm {
        open: true,
        name: "Pump".into(),
        ..NodeForm::default()
    };
    app.submit_node_form();
    app.apply_outcome(ApiOutcome::NodeSaved {
        updated: false,
        result: Ok(node("p1", NodeType::Switch, 0.0, 0.0)),
    });
    assert_eq!(app.nodes.len(), 1);
    assert!(!app.node_form.open);
    assert_eq!(app.notice.message(), Some("Node \"Node p1\" added successfully!"));
}

#[test]
fn switch_shows_new_state_and_reverts_when_the_write_fails() {
    let mut app = loaded_app(vec![node("sw", NodeType::Switch, 0.0, 0.0)]);
    app.nodes[0].value = Some(NodeValue::Bool(false));

    app.toggle_switch("sw", true);
    assert_eq!(app.nodes[0].value, Some(NodeValue::Bool(true)));
    let revert = match app.requests.outbox.last() {
        Some(ApiCall::WriteValue { write, revert, .. }) => {
            assert_eq!(write.value, NodeValue::Bool(true));
            revert.clone()
        }
        other => panic!("expected a write, got {other:?}"),
    };

    app.apply_outcome(ApiOutcome::ValueWritten {
        node_id: "sw".into(),
        revert,
        result: Err(ApiError::Transport("connection refused".into())),
    });
    assert_eq!(app.nodes[0].value, Some(NodeValue::Bool(false)));
    assert_eq!(app.notice.severity(), Some(Severity::Error));
}

#[test]
fn failed_setpoint_write_keeps_the_typed_value() {
    let mut app = loaded_app(vec![node("g", NodeType::Gauge, 0.0, 0.0)]);
    app.write_setpoint("g", "42.5", NodeType::Gauge);
    assert_eq!(app.nodes[0].value, Some(NodeValue::Number(42.5)));
    app.apply_outcome(ApiOutcome::ValueWritten {
        node_id: "g".into(),
        revert: None,
        result: Err(ApiError::Timeout),
    });
    assert_eq!(app.nodes[0].value, Some(NodeValue::Number(42.5)));
}

#[test]
fn scada_switch_writes_a_boolean_whatever_the_node_type() {
    let mut app = loaded_app(vec![node("t", NodeType::Text, 0.0, 0.0)]);
    let text_node = app.nodes[0].clone();
    let mut element = ScadaElement::new(&text_node, ScadaElementType::Switch);
    element.x = 100.0;
    element.y = 100.0;
    let element_id = element.id.clone();
    app.scada_elements.push(element);
    app.switch_view(View::Scada);
    let ctx = egui::Context::default();

    run_canvas_frame(&ctx, &mut app, vec![]);
    let toggle = app
        .control_rects
        .get(&element_id)
        .and_then(|rects| rects.last().copied())
        .expect("switch control rect recorded");
    let margin = egui::Frame::central_panel(&ctx.style()).inner_margin;
    let at = toggle.center() + egui::vec2(margin.left as f32, margin.top as f32);

    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(at)]);
    run_canvas_frame(&ctx, &mut app, vec![egui::Event::PointerMoved(at), press(at, true)]);
    run_canvas_frame(&ctx, &mut app, vec![press(at, false)]);

    match app.requests.outbox.last() {
        Some(ApiCall::WriteValue { write, .. }) => {
            assert_eq!(
                serde_json::to_value(write).expect("serialize"),
                serde_json::json!({"value": true, "type": "switch"})
            );
        }
        other => panic!("expected a write, got {other:?}"),
    }
    assert_eq!(app.nodes[0].value, Some(NodeValue::Bool(true)));
}

#[test]
fn scada_text_input_writes_text_to_a_switch_node() {
    let mut app = loaded_app(vec![node("sw", NodeType::Switch, 0.0, 0.0)]);
    app.write_setpoint("sw", "False", NodeType::Text);
    match app.requests.outbox.last() {
        Some(ApiCall::WriteValue { write, .. }) => {
            assert_eq!(
                serde_json::to_value(write).expect("serialize"),
                serde_json::json!({"value": "False", "type": "text"})
            );
        }
        other => panic!("expected a write, got {other:?}"),
    }

    // A dashboard card writes with the node's own type
    let mut app = loaded_app(vec![node("g", NodeType::Gauge, 0.0, 0.0)]);
    app.write_setpoint("g", "7", NodeType::Gauge);
    assert!(matches!(
        app.requests.outbox.last(),
        Some(ApiCall::WriteValue { write, .. })
            if write.node_type == NodeType::Gauge && write.value == NodeValue::Number(7.0)
    ));
}

#[test]
fn deleting_a_group_unassigns_its_nodes() {
    let mut member = node("n1", NodeType::Text, 0.0, 0.0);
    member.group_id = Some("g1".into());
    let mut app = loaded_app(vec![member, node("n2", NodeType::Text, 0.0, 0.0)]);
    app.groups.push(Group {
        id: "g1".into(),
        title: "Tank".into(),
        size: ElementSize::Medium,
        x: 0.0,
        y: 0.0,
    });

    app.pending_confirm = Some(state::PendingConfirm::DeleteGroup("g1".into()));
    app.confirm_pending();
    assert_eq!(app.requests.outbox.last(), Some(&ApiCall::DeleteGroup("g1".into())));

    app.apply_outcome(ApiOutcome::GroupDeleted {
        id: "g1".into(),
        result: Ok(MessageResponse::default()),
    });
    assert!(app.groups.is_empty());
    assert_eq!(app.nodes.len(), 2);
    assert!(app.nodes.iter().all(|n| n.group_id.is_none()));
    assert_eq!(app.group_members("g1").count(), 0);
}

#[test]
fn focused_node_is_not_overwritten_by_polling() {
    let mut app = loaded_app(vec![
        node("a", NodeType::Gauge, 0.0, 0.0),
        node("b", NodeType::Gauge, 200.0, 0.0),
    ]);
    app.tick_poller();
    let generation = match app.requests.outbox.last() {
        Some(ApiCall::PollValues { generation, targets }) => {
            assert_eq!(targets.len(), 2);
            *generation
        }
        other => panic!("expected a poll, got {other:?}"),
    };
    app.live.focused = Some(ControlKey::node("a"));

    app.apply_outcome(ApiOutcome::ValuesPolled {
        generation,
        readings: vec![
            ("a".into(), ValueReading::Value(Some(NodeValue::Number(1.0)))),
            ("b".into(), ValueReading::Value(Some(NodeValue::Number(2.0)))),
        ],
    });
    assert_eq!(app.nodes[0].value, None);
    assert_eq!(app.nodes[1].value, Some(NodeValue::Number(2.0)));

    // The next tick is only due after the interval
    app.requests.outbox.clear();
    app.now = 1.0;
    app.tick_poller();
    assert!(app.requests.outbox.is_empty());
    app.now = 2.5;
    app.tick_poller();
    assert!(matches!(app.requests.outbox.last(), Some(ApiCall::PollValues { .. })));
}

#[test]
fn leaving_the_view_discards_results_in_flight() {
    let mut app = loaded_app(vec![node("a", NodeType::Gauge, 0.0, 0.0)]);
    app.tick_poller();
    let Some(ApiCall::PollValues { generation, .. }) = app.requests.outbox.last().cloned() else {
        panic!("expected a poll");
    };

    app.switch_view(View::Historical);
    app.apply_outcome(ApiOutcome::ValuesPolled {
        generation,
        readings: vec![("a".into(), ValueReading::Value(Some(NodeValue::Number(9.0))))],
    });
    assert_eq!(app.nodes[0].value, None);
    assert!(!app.poller.is_running());
}

#[test]
fn scada_view_polls_each_bound_node_once() {
    let mut app = loaded_app(vec![node("a", NodeType::Gauge, 0.0, 0.0), node("b", NodeType::Text, 0.0, 0.0)]);
    let a = app.nodes[0].clone();
    app.scada_elements = vec![
        ScadaElement::new(&a, ScadaElementType::Gauge),
        ScadaElement::new(&a, ScadaElementType::ValueDisplay),
    ];
    app.switch_view(View::Scada);
    assert_eq!(app.poll_targets(), vec![("a".to_string(), "ns=2;s=a".to_string())]);
}

#[test]
fn adding_a_scada_element_needs_a_node() {
    let mut app = loaded_app(vec![node("a", NodeType::Switch, 0.0, 0.0)]);
    app.add_scada_element();
    assert!(app.scada_elements.is_empty());
    assert_eq!(app.notice.message(), Some("Please select a node first."));

    app.scada_palette.node_id = Some("a".into());
    app.scada_palette.element_type = ScadaElementType::Switch;
    app.add_scada_element();
    assert_eq!(app.scada_elements.len(), 1);
    assert!(matches!(
        app.requests.outbox.last(),
        Some(ApiCall::SaveScadaLayout(elements)) if elements.len() == 1 && elements[0].node_id == "a"
    ));
}
