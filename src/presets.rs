//! Preset registry
//!
//! Fixed tables mapping human style labels to the CSS values the overlay
//! renders with. Everything here is immutable `static` data.

use serde::Serialize;

pub const DEFAULT_FONT: &str = "System UI";
pub const DEFAULT_CORNER_STYLE: &str = "subtle";
pub const DEFAULT_DEPTH_STYLE: &str = "soft";

/// Key whose value `resolve_corner_style` falls back to.
pub const CORNER_FALLBACK_KEY: &str = "none";
/// Key whose value `resolve_depth_style` falls back to.
pub const DEPTH_FALLBACK_KEY: &str = "soft";

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Font {
    pub name: &'static str,
    pub value: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    pub custom: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StylePreset {
    pub key: &'static str,
    pub label: &'static str,
    pub value: &'static str,
}

const fn font(
    name: &'static str,
    value: &'static str,
    description: Option<&'static str>,
    custom: bool,
) -> Font {
    Font {
        name,
        value,
        description,
        custom,
    }
}

const fn preset(key: &'static str, label: &'static str, value: &'static str) -> StylePreset {
    StylePreset { key, label, value }
}

pub static FONTS: &[Font] = &[
    font(
        "Atkinson Hyperlegible",
        "'Atkinson Hyperlegible', sans-serif",
        Some("Designed for high legibility and reading clarity, especially at small sizes."),
        true,
    ),
    font(
        "Tektur",
        "'Tektur', sans-serif",
        Some("Modern and slightly angular typeface with a technical/sci-fi aesthetic."),
        true,
    ),
    font(
        "MedievalSharp",
        "'MedievalSharp', cursive",
        Some("Evokes a medieval/fantasy atmosphere with calligraphic details."),
        true,
    ),
    font(
        "Press Start 2P",
        "'Press Start 2P', cursive",
        Some("Pixelated retro gaming font that resembles 8-bit text."),
        true,
    ),
    font(
        "Jacquard",
        "'Jacquard', monospace",
        Some("Pixelated font with retro fantasy vibes based on Victorian needlepoint."),
        true,
    ),
    // Sans-serif
    font(
        "System UI",
        "system-ui, -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif",
        None,
        false,
    ),
    font(
        "Arial",
        "Arial, sans-serif",
        Some("Classic sans-serif font with good readability."),
        false,
    ),
    font(
        "Helvetica",
        "Helvetica, Arial, sans-serif",
        Some("Clean modern sans-serif font widely used in design."),
        false,
    ),
    font(
        "Verdana",
        "Verdana, Geneva, sans-serif",
        Some("Sans-serif designed for good readability on screens."),
        false,
    ),
    font(
        "Tahoma",
        "Tahoma, Geneva, sans-serif",
        Some("Compact sans-serif with good readability at small sizes."),
        false,
    ),
    font(
        "Trebuchet MS",
        "'Trebuchet MS', sans-serif",
        Some("Humanist sans-serif with distinctive character shapes."),
        false,
    ),
    font(
        "Calibri",
        "Calibri, sans-serif",
        Some("Modern sans-serif with rounded details and good readability."),
        false,
    ),
    // Serif
    font(
        "Times New Roman",
        "'Times New Roman', Times, serif",
        Some("Classic serif font with traditional letterforms."),
        false,
    ),
    font(
        "Georgia",
        "Georgia, serif",
        Some("Elegant serif font designed for screen readability."),
        false,
    ),
    font(
        "Palatino",
        "'Palatino Linotype', 'Book Antiqua', Palatino, serif",
        Some("Elegant serif based on Renaissance letterforms."),
        false,
    ),
    font(
        "EB Garamond",
        "'EB Garamond', Garamond, Baskerville, 'Baskerville Old Face', serif",
        Some("Classical serif with elegant proportions."),
        true,
    ),
    // Monospace
    font(
        "Courier New",
        "'Courier New', Courier, monospace",
        Some("Classic monospaced font resembling typewriter text."),
        false,
    ),
    font(
        "Consolas",
        "'Consolas', monaco, monospace",
        Some("Modern monospaced font designed for coding."),
        false,
    ),
    font(
        "Lucida Console",
        "'Lucida Console', Monaco, monospace",
        Some("Clear monospace font with good readability."),
        false,
    ),
    // Display
    font(
        "Impact",
        "'Impact', Haettenschweiler, sans-serif",
        Some("Bold condensed sans-serif font, often used for headlines."),
        false,
    ),
    font(
        "Comic Sans MS",
        "'Comic Sans MS', cursive",
        Some("Casual script-like font with a friendly appearance."),
        false,
    ),
    font(
        "Arial Black",
        "'Arial Black', Gadget, sans-serif",
        Some("Extra bold version of Arial for strong emphasis."),
        false,
    ),
];

pub static CORNER_STYLES: &[StylePreset] = &[
    preset("none", "None", "0px"),
    preset("subtle", "Subtle", "4px"),
    preset("rounded", "Rounded", "12px"),
    preset("pill", "Pill", "9999px"),
];

pub static DEPTH_STYLES: &[StylePreset] = &[
    preset("none", "None", "none"),
    preset("soft", "Soft", "0 2px 8px rgba(0, 0, 0, 0.25)"),
    preset("simple3d", "Simple 3D", "3px 3px 0 rgba(0, 0, 0, 0.6)"),
    preset("intense3d", "Intense 3D", "2px 2px 0 rgba(0, 0, 0, 0.8), 6px 6px 0 rgba(0, 0, 0, 0.5)"),
    preset("sharp", "Sharp", "4px 4px 0 rgba(0, 0, 0, 1)"),
];

/// Registry snapshot served to callers so they don't duplicate the tables.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Presets {
    pub fonts: &'static [Font],
    pub corner_styles: &'static [StylePreset],
    pub depth_styles: &'static [StylePreset],
}

pub fn all() -> Presets {
    Presets {
        fonts: FONTS,
        corner_styles: CORNER_STYLES,
        depth_styles: DEPTH_STYLES,
    }
}

/// Lookup key: lowercase with spaces, dashes and underscores dropped, so
/// "Simple 3D", "simple-3d" and "simple3d" all land on the same preset.
fn lookup_key(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

fn find_preset(table: &'static [StylePreset], name: &str) -> Option<&'static StylePreset> {
    let key = lookup_key(name);
    if key.is_empty() {
        return None;
    }
    table
        .iter()
        .find(|p| p.key == key || lookup_key(p.label) == key)
}

pub fn find_font(name: &str) -> Option<&'static Font> {
    let wanted = name.trim();
    FONTS.iter().find(|f| f.name.eq_ignore_ascii_case(wanted))
}

pub fn find_corner_style(name: &str) -> Option<&'static StylePreset> {
    find_preset(CORNER_STYLES, name)
}

pub fn find_depth_style(name: &str) -> Option<&'static StylePreset> {
    find_preset(DEPTH_STYLES, name)
}

fn value_of(table: &'static [StylePreset], key: &str) -> &'static str {
    table
        .iter()
        .find(|p| p.key == key)
        .map(|p| p.value)
        .unwrap_or_default()
}

/// CSS `border-radius` for a corner style name, or the "none" value.
pub fn resolve_corner_style(name: &str) -> &'static str {
    find_corner_style(name)
        .map(|p| p.value)
        .unwrap_or_else(|| value_of(CORNER_STYLES, CORNER_FALLBACK_KEY))
}

/// CSS `box-shadow` for a depth style name, or the "soft" value.
pub fn resolve_depth_style(name: &str) -> &'static str {
    find_depth_style(name)
        .map(|p| p.value)
        .unwrap_or_else(|| value_of(DEPTH_STYLES, DEPTH_FALLBACK_KEY))
}

/// `'Name', 'Name', ...` list used inside prompt templates.
pub fn quoted_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names
        .map(|n| format!("'{}'", n))
        .collect::<Vec<_>>()
        .join(", ")
}
