use crate::models::{OutputMode, ThemeConfig};
use crate::presets::{self, CORNER_STYLES, DEPTH_STYLES, FONTS};

pub const THEME: &str = include_str!("../data/prompts/theme.txt");
pub const THEME_IMAGE_SECTION: &str = include_str!("../data/prompts/theme_image_section.txt");
pub const BACKGROUND_IMAGE: &str = include_str!("../data/prompts/background_image.txt");

/// Replace `{{key}}` placeholders in a template string in one pass.
/// Substituted values are never rescanned, and unknown placeholders are
/// left as written.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        result.push_str(&rest[..open]);
        let after_open = &rest[open + 2..];
        let Some(close) = after_open.find("}}") else {
            rest = &rest[open..];
            break;
        };
        let key = &after_open[..close];
        match vars.iter().find(|(name, _)| *name == key) {
            Some((_, value)) => result.push_str(value),
            None => {
                result.push_str("{{");
                result.push_str(key);
                result.push_str("}}");
            }
        }
        rest = &after_open[close + 2..];
    }
    result.push_str(rest);
    result
}

/// Prompt for the structured phase: the attempt prefix, the caller's idea,
/// and the option lists the answer must choose from.
pub fn theme_prompt(prefix: &str, creative_prompt: &str, output_mode: OutputMode) -> String {
    let fonts = presets::quoted_names(FONTS.iter().map(|f| f.name));
    let corner_styles = presets::quoted_names(CORNER_STYLES.iter().map(|p| p.key));
    let depth_styles = presets::quoted_names(DEPTH_STYLES.iter().map(|p| p.key));
    let image_section = match output_mode {
        OutputMode::WithImage => THEME_IMAGE_SECTION,
        OutputMode::ColorOnly => "",
    };

    render(
        THEME,
        &[
            ("prefix", prefix),
            ("prompt", creative_prompt),
            ("fonts", &fonts),
            ("corner_styles", &corner_styles),
            ("depth_styles", &depth_styles),
            ("image_section", image_section),
        ],
    )
}

/// Prompt for the image phase, keyed off the directive extracted in the
/// structured phase (falling back to the theme description).
pub fn background_prompt(creative_prompt: &str, theme: &ThemeConfig) -> String {
    let directive = theme
        .image_directive
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .unwrap_or(&theme.description);

    render(
        BACKGROUND_IMAGE,
        &[
            ("prompt", creative_prompt),
            ("directive", directive),
            ("background_color", &theme.background_color),
        ],
    )
}
