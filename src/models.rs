//! Data models and structures
//!
//! Defines the request, theme, upstream output and outcome types passed
//! between the extractor, normalizer, orchestrator and HTTP layer.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

const EXCERPT_CHARS: usize = 200;

/// Alternate spellings of theme fields, paired with the name serde reads.
const THEME_FIELD_ALIASES: &[(&str, &str)] = &[
    ("name", "theme_name"),
    ("accent_color", "username_color"),
    ("font_choice", "font_family"),
    ("image_prompt", "image_directive"),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    WithImage,
    ColorOnly,
}

/// One inbound request for a single attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    #[serde(rename = "prompt", default, deserialize_with = "lenient_string")]
    pub creative_prompt: String,
    #[serde(default)]
    pub attempt: u32,
    #[serde(default)]
    pub output_mode: OutputMode,
    #[serde(default, alias = "partial_theme", deserialize_with = "optional_theme")]
    pub prior_result: Option<ThemeConfig>,
}

impl GenerationRequest {
    pub fn new(creative_prompt: impl Into<String>) -> Self {
        Self {
            creative_prompt: creative_prompt.into(),
            attempt: 0,
            output_mode: OutputMode::default(),
            prior_result: None,
        }
    }

    pub fn with_attempt(mut self, attempt: u32) -> Self {
        self.attempt = attempt;
        self
    }

    pub fn with_output_mode(mut self, output_mode: OutputMode) -> Self {
        self.output_mode = output_mode;
        self
    }

    pub fn with_prior_result(mut self, prior_result: ThemeConfig) -> Self {
        self.prior_result = Some(prior_result);
        self
    }
}

/// Accepts strings, numbers, booleans or null where a string is expected.
/// Models occasionally emit `null` or bare numbers for optional fields.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    })
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_string(deserializer)?;
    Ok(Some(value).filter(|s| !s.trim().is_empty()))
}

fn optional_theme<'de, D>(deserializer: D) -> Result<Option<ThemeConfig>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        Value::Object(object) => ThemeConfig::from_json_object(object)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom("invalid theme object")),
        other => Err(serde::de::Error::custom(format!(
            "expected a theme object, got {}",
            other
        ))),
    }
}

/// The theme being assembled. Field names on the wire follow what the
/// overlay client already consumes (`theme_name`, `font_family`, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThemeConfig {
    #[serde(rename = "theme_name", alias = "name")]
    pub name: String,
    pub background_color: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub border_color: String,
    pub text_color: String,
    #[serde(
        default,
        rename = "username_color",
        alias = "accent_color",
        deserialize_with = "lenient_string"
    )]
    pub accent_color: String,
    #[serde(
        default,
        rename = "font_family",
        alias = "font_choice",
        deserialize_with = "lenient_string"
    )]
    pub font_choice: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub corner_style: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub depth_style: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub corner_style_value: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub depth_style_value: String,
    #[serde(
        default,
        alias = "image_prompt",
        deserialize_with = "lenient_optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub image_directive: Option<String>,
}

impl ThemeConfig {
    /// Deserializes a theme object that may spell a field both ways. The
    /// primary name wins unless it is blank.
    pub fn from_json_object(mut object: Map<String, Value>) -> Option<Self> {
        for (alias, primary) in THEME_FIELD_ALIASES {
            let Some(value) = object.remove(*alias) else {
                continue;
            };
            let primary_blank = match object.get(*primary) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.trim().is_empty(),
                Some(_) => false,
            };
            if primary_blank {
                object.insert(primary.to_string(), value);
            }
        }
        serde_json::from_value(Value::Object(object)).ok()
    }
}

/// Base64 inline binary payload, either straight from the model output or
/// surfaced to the caller as the background image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackgroundAsset {
    #[serde(rename = "mimeType")]
    pub media_type: String,
    #[serde(rename = "data")]
    pub payload: String,
}

impl BackgroundAsset {
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionReason {
    Normal,
    PolicyBlock,
    Other(String),
}

impl std::fmt::Display for CompletionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompletionReason::Normal => write!(f, "normal"),
            CompletionReason::PolicyBlock => write!(f, "policy_block"),
            CompletionReason::Other(reason) => write!(f, "{}", reason),
        }
    }
}

/// What the gateway hands back for one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RawModelOutput {
    pub text_parts: Vec<String>,
    pub binary_parts: Vec<BackgroundAsset>,
    pub completion_reason: CompletionReason,
}

impl RawModelOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text_parts: vec![text.into()],
            binary_parts: Vec::new(),
            completion_reason: CompletionReason::Normal,
        }
    }

    pub fn policy_block() -> Self {
        Self {
            text_parts: Vec::new(),
            binary_parts: Vec::new(),
            completion_reason: CompletionReason::PolicyBlock,
        }
    }

    pub fn with_binary(
        mut self,
        media_type: impl Into<String>,
        payload: impl Into<String>,
    ) -> Self {
        self.binary_parts.push(BackgroundAsset {
            media_type: media_type.into(),
            payload: payload.into(),
        });
        self
    }

    pub fn has_text(&self) -> bool {
        self.text_parts.iter().any(|t| !t.trim().is_empty())
    }

    pub fn has_image(&self) -> bool {
        self.binary_parts.iter().any(BackgroundAsset::is_image)
    }

    pub fn first_image(&self) -> Option<&BackgroundAsset> {
        self.binary_parts.iter().find(|b| b.is_image())
    }

    pub fn text_excerpt(&self) -> Option<String> {
        self.text_parts
            .iter()
            .find(|t| !t.trim().is_empty())
            .map(|t| t.chars().take(EXCERPT_CHARS).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    MissingPrompt,
    PolicyBlocked,
    UnparseableResponse,
    UpstreamTransportError,
    ServiceNotReady,
}

impl ErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::InvalidRequest => "Request body is not a valid theme request",
            ErrorKind::MissingPrompt => "Prompt is required",
            ErrorKind::PolicyBlocked => "The model declined to generate a theme for this prompt",
            ErrorKind::UnparseableResponse => "Could not parse theme data from model response",
            ErrorKind::UpstreamTransportError => "Failed to generate theme",
            ErrorKind::ServiceNotReady => "Theme generation is not available",
        }
    }
}

/// Context attached to terminal failures so operators can tell extraction
/// bugs from upstream misbehavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub attempt: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_reason: Option<String>,
    pub has_text: bool,
    pub has_image: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl Diagnostic {
    pub fn for_attempt(attempt: u32) -> Self {
        Self {
            attempt,
            ..Self::default()
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn from_output(attempt: u32, output: &RawModelOutput) -> Self {
        Self {
            attempt,
            completion_reason: Some(output.completion_reason.to_string()),
            has_text: output.has_text(),
            has_image: output.has_image(),
            text_excerpt: output.text_excerpt(),
            details: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Final {
        theme: ThemeConfig,
        asset: Option<BackgroundAsset>,
        image_unavailable: bool,
    },
    Retry {
        next_attempt: u32,
        partial_theme: Option<ThemeConfig>,
        reason: String,
    },
    Failure {
        kind: ErrorKind,
        diagnostic: Diagnostic,
    },
}

/// A missing `.env` is fine; one that fails to parse is not.
fn load_dotenv(result: dotenvy::Result<std::path::PathBuf>) -> crate::Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(err.into()),
    }
}

// Configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub upstream_timeout: Duration,
    pub image_phase: bool,
    pub environment: String,
}

impl Config {
    pub fn from_env() -> crate::Result<Self> {
        load_dotenv(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> crate::Result<Self> {
        let upstream_timeout_secs = match lookup("UPSTREAM_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                crate::Error::Config(format!("UPSTREAM_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            None => 60,
        };
        if upstream_timeout_secs == 0 {
            return Err(crate::Error::Config(
                "UPSTREAM_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        let image_phase = match lookup("THEME_IMAGE_PHASE") {
            Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    return Err(crate::Error::Config(format!(
                        "THEME_IMAGE_PHASE must be a boolean: {}",
                        raw
                    )))
                }
            },
            None => true,
        };

        Ok(Self {
            gemini_api_key: lookup("GEMINI_API_KEY").filter(|k| !k.trim().is_empty()),
            gemini_model: lookup("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.0-flash-exp".to_string()),
            upstream_timeout: Duration::from_secs(upstream_timeout_secs),
            image_phase,
            environment: lookup("APP_ENV").unwrap_or_else(|| "development".to_string()),
        })
    }
}
