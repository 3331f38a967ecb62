//! Shared application-wide constants.
//! Centralizes tweakable values used across rendering, dragging and polling.

// Canvas
/// Grid cell size in canvas units used for snapping dragged elements.
pub const GRID_SIZE: f32 = 25.0;
/// Z-order of group sections while they are not dragged.
pub const GROUP_BASE_Z: u32 = 0;
/// Z-order of node cards and SCADA elements while they are not dragged.
pub const CARD_BASE_Z: u32 = 10;
/// Z-order of the element currently being dragged.
pub const ACTIVE_DRAG_Z: u32 = 100;
/// Corner radius of cards and group sections (in screen pixels).
pub const CARD_CORNER_RADIUS: f32 = 8.0;
/// Inner padding of cards.
pub const CARD_PADDING: f32 = 8.0;
/// Size of a SCADA element on the supervisory canvas.
pub const SCADA_ELEMENT_SIZE: (f32, f32) = (150.0, 100.0);

// Transient notice
/// How long a notice stays fully visible, in seconds.
pub const NOTICE_VISIBLE_SECS: f64 = 3.0;
/// Length of the hide transition after the visible window, in seconds.
pub const NOTICE_FADE_SECS: f64 = 0.3;

// Networking
/// Default server base URL for native builds. Web builds talk to their own origin.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
/// Default per-request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
/// Default live value polling interval on the dashboard, in seconds.
pub const DASHBOARD_POLL_INTERVAL_SECS: f64 = 2.0;
/// Default live value polling interval on the SCADA view, in seconds.
pub const SCADA_POLL_INTERVAL_SECS: f64 = 2.0;

// Persistence
/// Storage key under which the app state is persisted.
pub const APP_STATE_KEY: &str = "app_state";
