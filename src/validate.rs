//! Theme normalization against the preset registry.

use crate::models::ThemeConfig;
use crate::presets::{self, DEFAULT_CORNER_STYLE, DEFAULT_DEPTH_STYLE, DEFAULT_FONT};
use tracing::warn;

/// Coerces font, corner style and depth style to registry members and
/// recomputes the derived CSS values. Idempotent.
pub fn normalize(mut theme: ThemeConfig) -> ThemeConfig {
    theme.font_choice = match presets::find_font(&theme.font_choice) {
        Some(font) => font.name.to_string(),
        None => {
            warn!(
                "Invalid font '{}' replaced with '{}'",
                theme.font_choice, DEFAULT_FONT
            );
            DEFAULT_FONT.to_string()
        }
    };

    theme.corner_style = match presets::find_corner_style(&theme.corner_style) {
        Some(preset) => preset.key.to_string(),
        None => {
            warn!(
                "Invalid corner style '{}' replaced with '{}'",
                theme.corner_style, DEFAULT_CORNER_STYLE
            );
            DEFAULT_CORNER_STYLE.to_string()
        }
    };

    theme.depth_style = match presets::find_depth_style(&theme.depth_style) {
        Some(preset) => preset.key.to_string(),
        None => {
            warn!(
                "Invalid depth style '{}' replaced with '{}'",
                theme.depth_style, DEFAULT_DEPTH_STYLE
            );
            DEFAULT_DEPTH_STYLE.to_string()
        }
    };

    theme.corner_style_value = presets::resolve_corner_style(&theme.corner_style).to_string();
    theme.depth_style_value = presets::resolve_depth_style(&theme.depth_style).to_string();
    theme
}
