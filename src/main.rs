#[cfg(not(target_arch = "wasm32"))]
fn main() -> Result<(), eframe::Error> {
    // Set up logging; RUST_LOG=opcua_dashboard=debug shows polling and drag events
    env_logger::init();

    // Run the dashboard application
    opcua_dashboard::run_app()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    use eframe::wasm_bindgen::JsCast as _;
    use opcua_dashboard::DashboardApp;

    eframe::WebLogger::init(log::LevelFilter::Info).ok();

    wasm_bindgen_futures::spawn_local(async {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            log::error!("No document to attach the dashboard to");
            return;
        };
        let canvas = match document
            .get_element_by_id("the_canvas_id")
            .map(|element| element.dyn_into::<web_sys::HtmlCanvasElement>())
        {
            Some(Ok(canvas)) => canvas,
            _ => {
                log::error!("Element \"the_canvas_id\" is missing or not a canvas");
                return;
            }
        };

        let result = eframe::WebRunner::new()
            .start(
                canvas,
                eframe::WebOptions::default(),
                Box::new(|cc| Ok(Box::new(DashboardApp::new(cc)))),
            )
            .await;
        if let Err(err) = result {
            log::error!("Failed to start the dashboard: {err:?}");
        }
    });
}
