//! Pointer-driven dragging of canvas elements.
//!
//! The controller only deals in canvas coordinates: the top-left corner of the
//! dragged element and the pointer position, both relative to the canvas origin.
//! It never touches element records itself; the caller renders
//! [`DragController::live_position`] while a drag is active and commits the
//! [`DragOutcome`] on release.

use crate::constants::ACTIVE_DRAG_Z;
use eframe::egui;

/// What the pointer went down on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// The body of a draggable element
    Body,
    /// An interactive child (input, select, button, toggle, delete control)
    Control,
}

/// Finished drag that moved an element.
#[derive(Debug, Clone, PartialEq)]
pub struct DragOutcome {
    /// Id of the dragged element
    pub id: String,
    /// Top-left corner before the drag
    pub from: egui::Pos2,
    /// Top-left corner after the drag
    pub to: egui::Pos2,
}

#[derive(Debug, Clone, PartialEq)]
struct ActiveDrag {
    id: String,
    origin: egui::Pos2,
    grab_offset: egui::Vec2,
    size: egui::Vec2,
    current: egui::Pos2,
}

/// Tracks the single active drag on a canvas.
#[derive(Debug, Default)]
pub struct DragController {
    active: Option<ActiveDrag>,
    /// Grid spacing to snap to, if snapping is enabled
    pub snap: Option<f32>,
}

impl DragController {
    /// Creates a controller, snapping to `snap` when given.
    pub fn new(snap: Option<f32>) -> Self {
        Self { active: None, snap }
    }

    /// Starts dragging element `id` whose top-left is `element_pos`.
    ///
    /// Returns `false` when the press landed on a control or another drag is
    /// already running.
    pub fn begin(
        &mut self,
        id: &str,
        pointer: egui::Pos2,
        element_pos: egui::Pos2,
        size: egui::Vec2,
        target: PointerTarget,
    ) -> bool {
        if target == PointerTarget::Control || self.active.is_some() {
            return false;
        }
        log::debug!("Drag start on {id} at {element_pos:?}");
        self.active = Some(ActiveDrag {
            id: id.to_string(),
            origin: element_pos,
            grab_offset: pointer - element_pos,
            size,
            current: element_pos,
        });
        true
    }

    /// Moves the active element to follow `pointer`, kept inside `bounds`.
    ///
    /// Returns the new top-left corner, or `None` when nothing is dragged.
    pub fn update(&mut self, pointer: egui::Pos2, bounds: egui::Vec2) -> Option<egui::Pos2> {
        let snap = self.snap;
        let drag = self.active.as_mut()?;
        let mut pos = pointer - drag.grab_offset;
        if let Some(grid) = snap {
            pos = snap_to_grid(pos, grid);
        }
        pos = clamp_to_bounds(pos, drag.size, bounds);
        drag.current = pos;
        Some(pos)
    }

    /// Ends the active drag.
    ///
    /// Returns the outcome only when the element actually moved, so a plain
    /// click never produces a position update.
    pub fn end(&mut self) -> Option<DragOutcome> {
        let drag = self.active.take()?;
        if drag.current == drag.origin {
            return None;
        }
        log::debug!("Drag end on {} at {:?}", drag.id, drag.current);
        Some(DragOutcome {
            id: drag.id,
            from: drag.origin,
            to: drag.current,
        })
    }

    /// Abandons the active drag without producing an outcome.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Whether any drag is running.
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Id of the element being dragged.
    pub fn active_id(&self) -> Option<&str> {
        self.active.as_ref().map(|d| d.id.as_str())
    }

    /// Position to render element `id` at while it is dragged.
    pub fn live_position(&self, id: &str) -> Option<egui::Pos2> {
        self.active
            .as_ref()
            .filter(|d| d.id == id)
            .map(|d| d.current)
    }

    /// Z-order of element `id`: raised while it is dragged, `base` otherwise.
    pub fn z_order(&self, id: &str, base: u32) -> u32 {
        if self.active_id() == Some(id) {
            ACTIVE_DRAG_Z
        } else {
            base
        }
    }
}

/// Snaps a position to the nearest grid point.
pub fn snap_to_grid(pos: egui::Pos2, grid: f32) -> egui::Pos2 {
    egui::pos2((pos.x / grid).round() * grid, (pos.y / grid).round() * grid)
}

/// Keeps an element of `size` fully inside a parent of `bounds`, anchored at the origin.
pub fn clamp_to_bounds(pos: egui::Pos2, size: egui::Vec2, bounds: egui::Vec2) -> egui::Pos2 {
    let max_x = (bounds.x - size.x).max(0.0);
    let max_y = (bounds.y - size.y).max(0.0);
    egui::pos2(pos.x.clamp(0.0, max_x), pos.y.clamp(0.0, max_y))
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: egui::Vec2 = egui::vec2(1000.0, 800.0);
    const SIZE: egui::Vec2 = egui::vec2(200.0, 120.0);

    #[test]
    fn drag_moves_element_by_pointer_delta() {
        let mut drag = DragController::new(None);
        let start = egui::pos2(100.0, 50.0);
        assert!(drag.begin("n1", egui::pos2(130.0, 60.0), start, SIZE, PointerTarget::Body));
        drag.update(egui::pos2(150.0, 100.0), BOUNDS);
        let outcome = drag.end().unwrap();
        assert_eq!(outcome.id, "n1");
        assert_eq!(outcome.from, start);
        assert_eq!(outcome.to, egui::pos2(120.0, 90.0));
        assert!(!drag.is_active());
    }

    #[test]
    fn zero_delta_drag_is_a_no_op() {
        let mut drag = DragController::new(Some(25.0));
        let start = egui::pos2(50.0, 75.0);
        assert!(drag.begin("n1", egui::pos2(60.0, 80.0), start, SIZE, PointerTarget::Body));
        assert_eq!(drag.end(), None);

        // Moving away and back also nets out to nothing
        assert!(drag.begin("n1", egui::pos2(60.0, 80.0), start, SIZE, PointerTarget::Body));
        drag.update(egui::pos2(160.0, 180.0), BOUNDS);
        drag.update(egui::pos2(60.0, 80.0), BOUNDS);
        assert_eq!(drag.end(), None);
    }

    #[test]
    fn presses_on_controls_never_start_a_drag() {
        let mut drag = DragController::new(None);
        assert!(!drag.begin("n1", egui::pos2(5.0, 5.0), egui::Pos2::ZERO, SIZE, PointerTarget::Control));
        assert!(!drag.is_active());
        assert_eq!(drag.update(egui::pos2(50.0, 50.0), BOUNDS), None);
    }

    #[test]
    fn only_one_drag_at_a_time() {
        let mut drag = DragController::new(None);
        assert!(drag.begin("a", egui::pos2(10.0, 10.0), egui::Pos2::ZERO, SIZE, PointerTarget::Body));
        assert!(!drag.begin("b", egui::pos2(400.0, 400.0), egui::pos2(390.0, 390.0), SIZE, PointerTarget::Body));
        assert_eq!(drag.active_id(), Some("a"));
        assert_eq!(drag.live_position("b"), None);
    }

    #[test]
    fn snapping_and_clamping_apply_while_moving() {
        let mut drag = DragController::new(Some(25.0));
        assert!(drag.begin("g1", egui::pos2(0.0, 0.0), egui::Pos2::ZERO, SIZE, PointerTarget::Body));
        assert_eq!(drag.update(egui::pos2(37.0, 61.0), BOUNDS), Some(egui::pos2(25.0, 50.0)));
        // Past the right/bottom edge the element stays fully inside
        assert_eq!(drag.update(egui::pos2(5000.0, 5000.0), BOUNDS), Some(egui::pos2(800.0, 680.0)));
        // Past the origin it stops at zero
        assert_eq!(drag.update(egui::pos2(-300.0, -10.0), BOUNDS), Some(egui::pos2(0.0, 0.0)));
    }

    #[test]
    fn dragged_element_is_raised_and_restored() {
        let mut drag = DragController::new(None);
        assert_eq!(drag.z_order("n1", 10), 10);
        drag.begin("n1", egui::Pos2::ZERO, egui::Pos2::ZERO, SIZE, PointerTarget::Body);
        assert_eq!(drag.z_order("n1", 10), ACTIVE_DRAG_Z);
        assert_eq!(drag.z_order("n2", 10), 10);
        drag.cancel();
        assert_eq!(drag.z_order("n1", 10), 10);
    }

    #[test]
    fn clamp_handles_elements_larger_than_parent() {
        let pos = clamp_to_bounds(egui::pos2(40.0, 40.0), egui::vec2(500.0, 500.0), egui::vec2(300.0, 300.0));
        assert_eq!(pos, egui::Pos2::ZERO);
    }
}
