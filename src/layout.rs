//! Saving and restoring element positions.

use crate::types::*;
use eframe::egui;

/// One element as it currently appears on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedElement {
    /// Element id (node or group id)
    pub id: String,
    /// Top-left corner as rendered
    pub pos: egui::Pos2,
    /// Preset size, if the element has one
    pub size: Option<ElementSize>,
}

/// Builds the layout map from the positions the elements are rendered at.
pub fn capture_layout<I>(elements: I) -> Layout
where
    I: IntoIterator<Item = PlacedElement>,
{
    elements
        .into_iter()
        .map(|el| {
            (
                el.id,
                LayoutEntry {
                    x: el.pos.x,
                    y: el.pos.y,
                    size: el.size,
                },
            )
        })
        .collect()
}

/// Overlays saved positions onto nodes and groups.
///
/// Elements without an entry keep the position their record carries. Entries
/// whose id matches no element are ignored. Returns how many were ignored.
pub fn apply_layout(nodes: &mut [Node], groups: &mut [Group], layout: &Layout) -> usize {
    let mut used = 0;
    for node in nodes.iter_mut() {
        if let Some(entry) = layout.get(&node.id) {
            node.x = entry.x;
            node.y = entry.y;
            if let Some(size) = entry.size {
                node.size = size;
            }
            used += 1;
        }
    }
    for group in groups.iter_mut() {
        if let Some(entry) = layout.get(&group.id) {
            group.x = entry.x;
            group.y = entry.y;
            if let Some(size) = entry.size {
                group.size = size;
            }
            used += 1;
        }
    }
    let stale = layout.len().saturating_sub(used);
    if stale > 0 {
        log::debug!("Ignoring {stale} layout entries for elements that no longer exist");
    }
    stale
}

/// Writes rendered positions back into SCADA element records.
pub fn merge_scada_positions(elements: &[ScadaElement], placed: &[PlacedElement]) -> Vec<ScadaElement> {
    elements
        .iter()
        .map(|element| {
            let mut element = element.clone();
            if let Some(p) = placed.iter().find(|p| p.id == element.id) {
                element.x = p.pos.x;
                element.y = p.pos.y;
            }
            element
        })
        .collect()
}
