//! User appearance settings.
//!
//! Persisted with the rest of the app state. Values that are missing or cannot
//! be used (unparseable colors, font sizes outside the slider range) fall back
//! to the defaults when read, so a damaged store never breaks the UI.

use eframe::egui;
use serde::{Deserialize, Serialize};

/// Smallest font size offered by the settings slider.
pub const MIN_FONT_SIZE: f32 = 10.0;
/// Largest font size offered by the settings slider.
pub const MAX_FONT_SIZE: f32 = 24.0;

const DEFAULT_FONT_SIZE: f32 = 16.0;
const DEFAULT_PRIMARY: &str = "#2563eb";
const DEFAULT_SECONDARY: &str = "#10b981";
const DEFAULT_TEXT: &str = "#1f2937";
const DEFAULT_BG: &str = "#f3f4f6";
const DEFAULT_CARD_BG: &str = "#ffffff";

/// Colors the user can pick in the settings window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorRole {
    /// Accent for buttons, selections and switches
    Primary,
    /// Secondary accent (success notices, gauge bars)
    Secondary,
    /// Body text in light mode
    Text,
    /// Page background in light mode
    Background,
    /// Card background in light mode
    CardBackground,
}

impl ColorRole {
    /// All roles, in the order they appear in the settings window.
    pub const ALL: [ColorRole; 5] = [
        ColorRole::Primary,
        ColorRole::Secondary,
        ColorRole::Text,
        ColorRole::Background,
        ColorRole::CardBackground,
    ];

    /// Label shown next to the color picker.
    pub fn label(&self) -> &'static str {
        match self {
            ColorRole::Primary => "Primary color",
            ColorRole::Secondary => "Secondary color",
            ColorRole::Text => "Text color",
            ColorRole::Background => "Background color",
            ColorRole::CardBackground => "Card background",
        }
    }

    fn default_hex(&self) -> &'static str {
        match self {
            ColorRole::Primary => DEFAULT_PRIMARY,
            ColorRole::Secondary => DEFAULT_SECONDARY,
            ColorRole::Text => DEFAULT_TEXT,
            ColorRole::Background => DEFAULT_BG,
            ColorRole::CardBackground => DEFAULT_CARD_BG,
        }
    }
}

/// Appearance preferences, stored as `#rrggbb` strings like the web client did.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    /// Base font size in points
    #[serde(deserialize_with = "lenient")]
    pub font_size: f32,
    /// Whether dark visuals are used
    #[serde(deserialize_with = "lenient")]
    pub dark_mode: bool,
    /// Accent color
    #[serde(deserialize_with = "lenient")]
    pub primary_color: String,
    /// Secondary accent color
    #[serde(deserialize_with = "lenient")]
    pub secondary_color: String,
    /// Text color (light mode)
    #[serde(deserialize_with = "lenient")]
    pub text_color: String,
    /// Page background (light mode)
    #[serde(deserialize_with = "lenient")]
    pub bg_color: String,
    /// Card background (light mode)
    #[serde(deserialize_with = "lenient")]
    pub card_bg_color: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            font_size: DEFAULT_FONT_SIZE,
            dark_mode: false,
            primary_color: DEFAULT_PRIMARY.into(),
            secondary_color: DEFAULT_SECONDARY.into(),
            text_color: DEFAULT_TEXT.into(),
            bg_color: DEFAULT_BG.into(),
            card_bg_color: DEFAULT_CARD_BG.into(),
        }
    }
}

/// Accepts a field of the wrong JSON type as its type's default instead of
/// failing the whole settings object. `sanitized` then repairs the value.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: serde::de::DeserializeOwned + Default,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).unwrap_or_default())
}

impl Settings {
    /// Returns a copy with every unusable value replaced by its default.
    pub fn sanitized(mut self) -> Self {
        if !self.font_size.is_finite() || !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&self.font_size) {
            log::warn!("Ignoring stored font size {}", self.font_size);
            self.font_size = DEFAULT_FONT_SIZE;
        }
        for role in ColorRole::ALL {
            let hex = self.hex_mut(role);
            if egui::Color32::from_hex(hex).is_err() {
                log::warn!("Ignoring stored {} {hex:?}", role.label());
                *hex = role.default_hex().to_string();
            }
        }
        self
    }

    fn hex(&self, role: ColorRole) -> &str {
        match role {
            ColorRole::Primary => &self.primary_color,
            ColorRole::Secondary => &self.secondary_color,
            ColorRole::Text => &self.text_color,
            ColorRole::Background => &self.bg_color,
            ColorRole::CardBackground => &self.card_bg_color,
        }
    }

    fn hex_mut(&mut self, role: ColorRole) -> &mut String {
        match role {
            ColorRole::Primary => &mut self.primary_color,
            ColorRole::Secondary => &mut self.secondary_color,
            ColorRole::Text => &mut self.text_color,
            ColorRole::Background => &mut self.bg_color,
            ColorRole::CardBackground => &mut self.card_bg_color,
        }
    }

    /// Color for `role`, falling back to the default when the stored value is unusable.
    pub fn color(&self, role: ColorRole) -> egui::Color32 {
        egui::Color32::from_hex(self.hex(role))
            .or_else(|_| egui::Color32::from_hex(role.default_hex()))
            .unwrap_or(egui::Color32::GRAY)
    }

    /// Stores `color` for `role` as `#rrggbb`.
    pub fn set_color(&mut self, role: ColorRole, color: egui::Color32) {
        *self.hex_mut(role) = format!("#{:02x}{:02x}{:02x}", color.r(), color.g(), color.b());
    }

    /// Fill used for node cards and SCADA elements.
    pub fn card_fill(&self) -> egui::Color32 {
        if self.dark_mode {
            egui::Visuals::dark().faint_bg_color
        } else {
            self.color(ColorRole::CardBackground)
        }
    }

    /// Visuals reflecting the current settings.
    pub fn visuals(&self) -> egui::Visuals {
        let primary = self.color(ColorRole::Primary);
        let mut visuals = if self.dark_mode {
            egui::Visuals::dark()
        } else {
            let mut light = egui::Visuals::light();
            light.panel_fill = self.color(ColorRole::Background);
            light.window_fill = self.color(ColorRole::CardBackground);
            light.override_text_color = Some(self.color(ColorRole::Text));
            light
        };
        visuals.selection.bg_fill = primary;
        visuals.hyperlink_color = primary;
        visuals.widgets.hovered.bg_stroke.color = primary;
        visuals
    }

    /// Applies visuals and font size to `ctx`.
    pub fn apply(&self, ctx: &egui::Context) {
        ctx.set_visuals(self.visuals());
        let size = self.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        ctx.style_mut(|style| {
            use egui::{FontId, TextStyle};
            style.text_styles.insert(TextStyle::Body, FontId::proportional(size));
            style.text_styles.insert(TextStyle::Button, FontId::proportional(size));
            style.text_styles.insert(TextStyle::Monospace, FontId::monospace(size));
            style.text_styles.insert(TextStyle::Small, FontId::proportional(size * 0.75));
            style.text_styles.insert(TextStyle::Heading, FontId::proportional(size * 1.4));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_stock_theme() {
        let s = Settings::default();
        assert_eq!(s.font_size, 16.0);
        assert!(!s.dark_mode);
        assert_eq!(s.color(ColorRole::Primary), egui::Color32::from_rgb(0x25, 0x63, 0xeb));
        assert_eq!(s.color(ColorRole::CardBackground), egui::Color32::WHITE);
    }

    #[test]
    fn stored_keys_are_camel_case() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["fontSize"], 16.0);
        assert_eq!(json["cardBgColor"], "#ffffff");
    }

    #[test]
    fn malformed_values_fall_back_to_defaults() {
        let stored = serde_json::json!({
            "fontSize": "huge",
            "darkMode": true,
            "primaryColor": "not-a-color",
            "textColor": 42
        });
        let s: Settings = serde_json::from_value(stored).unwrap();
        let s = s.sanitized();
        assert_eq!(s.font_size, 16.0);
        assert!(s.dark_mode);
        assert_eq!(s.primary_color, "#2563eb");
        assert_eq!(s.text_color, "#1f2937");
        assert_eq!(s.secondary_color, "#10b981");
    }

    #[test]
    fn out_of_range_font_size_is_reset() {
        let s = Settings { font_size: 40.0, ..Settings::default() }.sanitized();
        assert_eq!(s.font_size, 16.0);
        let s = Settings { font_size: 12.0, ..Settings::default() }.sanitized();
        assert_eq!(s.font_size, 12.0);
    }

    #[test]
    fn set_color_stores_hex() {
        let mut s = Settings::default();
        s.set_color(ColorRole::Secondary, egui::Color32::from_rgb(1, 2, 255));
        assert_eq!(s.secondary_color, "#0102ff");
        assert_eq!(s.color(ColorRole::Secondary), egui::Color32::from_rgb(1, 2, 255));
    }

    #[test]
    fn light_visuals_use_custom_background() {
        let s = Settings {
            bg_color: "#000000".into(),
            ..Settings::default()
        };
        assert_eq!(s.visuals().panel_fill, egui::Color32::BLACK);
        let dark = Settings { dark_mode: true, ..s };
        assert!(dark.visuals().dark_mode);
    }
}
