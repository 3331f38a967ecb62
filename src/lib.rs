//! # OPC UA Dashboard
//!
//! A client for an OPC UA dashboard server: a draggable canvas of live node
//! cards and groups, a supervisory (SCADA) view, a historical chart and a page
//! for managing the server's OPC UA connection.
//!
//! ## Features
//! - Node and group management (add, edit, delete)
//! - Live value polling with write-back through switches and setpoints
//! - Drag-and-drop layout with optional grid snapping, saved to the server
//! - Historical data charts over a date range
//! - Appearance settings persisted between restarts

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod api;
mod constants;
pub mod drag;
pub mod history;
pub mod layout;
pub mod notice;
pub mod poller;
pub mod settings;
mod types;
mod ui;

// Re-export public types and functions
pub use types::*;
pub use ui::{ApiCall, ApiOutcome, DashboardApp, View};

/// Title of the native window.
pub const APP_NAME: &str = "OPC UA Dashboard";

/// Runs the dashboard application with default settings.
///
/// Requests are spawned on a Tokio runtime that lives as long as the window.
///
/// # Returns
///
/// Returns `Ok(())` if the application runs successfully, or an `eframe::Error` if
/// initialization fails.
///
/// # Example
///
/// ```no_run
/// use opcua_dashboard::run_app;
///
/// fn main() -> Result<(), eframe::Error> {
///     run_app()
/// }
/// ```
#[cfg(not(target_arch = "wasm32"))]
pub fn run_app() -> Result<(), eframe::Error> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| eframe::Error::AppCreation(Box::new(err)))?;
    let _guard = runtime.enter();

    let options = eframe::NativeOptions::default();
    eframe::run_native(
        APP_NAME,
        options,
        Box::new(|cc| Ok(Box::new(DashboardApp::new(cc)))),
    )
}
