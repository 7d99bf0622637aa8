use super::client::GeminiHttpClient;
use super::types::{Content, GenerateContentResponse, Part};
use crate::ai::{mime, Modality, UpstreamGateway};
use crate::models::{BackgroundAsset, CompletionReason, RawModelOutput};
use crate::scheduler::SamplingParameters;
use crate::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

const MAX_OUTPUT_TOKENS: u32 = 1024;

/// Finish reasons Gemini uses when it refuses or cuts off on policy grounds.
const POLICY_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
    "IMAGE_PROHIBITED_CONTENT",
    "IMAGE_RECITATION",
];

#[derive(Debug, Serialize)]
struct ThemeRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: ThemeGenerationConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThemeGenerationConfig {
    temperature: f32,
    top_k: u32,
    top_p: f32,
    seed: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    response_modalities: Vec<String>,
}

/// Gemini-backed [`UpstreamGateway`].
pub struct GeminiThemeClient {
    http: GeminiHttpClient,
}

impl GeminiThemeClient {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Self {
        Self::new_with_client(api_key, model, timeout, reqwest::Client::new())
    }

    pub fn new_with_client(
        api_key: String,
        model: String,
        timeout: Duration,
        client: reqwest::Client,
    ) -> Self {
        Self {
            http: GeminiHttpClient::new_with_client(api_key, model, timeout, client),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.http = self.http.with_base_url(base_url);
        self
    }

    pub fn model(&self) -> &str {
        self.http.model()
    }

    fn build_request(
        prompt: &str,
        params: &SamplingParameters,
        modality: Modality,
    ) -> ThemeRequest {
        let (modalities, max_output_tokens) = match modality {
            Modality::TextAndImage => (vec!["TEXT", "IMAGE"], Some(MAX_OUTPUT_TOKENS)),
            Modality::TextOnly => (vec!["TEXT"], Some(MAX_OUTPUT_TOKENS)),
            Modality::ImageOnly => (vec!["IMAGE"], None),
        };

        ThemeRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part::Text {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: ThemeGenerationConfig {
                temperature: params.temperature,
                top_k: params.top_k,
                top_p: params.top_p,
                seed: params.seed,
                max_output_tokens,
                response_modalities: modalities.iter().map(|m| m.to_string()).collect(),
            },
        }
    }

    fn completion_reason(response: &GenerateContentResponse) -> CompletionReason {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_deref())
        {
            tracing::warn!("Gemini blocked the prompt: {}", reason);
            return CompletionReason::PolicyBlock;
        }

        let Some(candidate) = response.candidates.first() else {
            return CompletionReason::Other("NO_CANDIDATES".to_string());
        };

        match candidate.finish_reason.as_deref() {
            None | Some("STOP") => CompletionReason::Normal,
            Some(reason) if POLICY_FINISH_REASONS.contains(&reason) => {
                CompletionReason::PolicyBlock
            }
            Some(reason) => CompletionReason::Other(reason.to_string()),
        }
    }

    fn into_raw_output(response: GenerateContentResponse) -> RawModelOutput {
        let completion_reason = Self::completion_reason(&response);
        let mut text_parts = Vec::new();
        let mut binary_parts = Vec::new();

        let parts = response
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default();

        for part in parts {
            match part {
                Part::Text { text } => text_parts.push(text),
                Part::InlineData { inline_data } => binary_parts.push(BackgroundAsset {
                    media_type: mime::resolve_media_type(
                        &inline_data.mime_type,
                        &inline_data.data,
                    ),
                    payload: inline_data.data,
                }),
                Part::Other(_) => {}
            }
        }

        RawModelOutput {
            text_parts,
            binary_parts,
            completion_reason,
        }
    }
}

#[async_trait]
impl UpstreamGateway for GeminiThemeClient {
    async fn generate(
        &self,
        prompt: &str,
        params: &SamplingParameters,
        modality: Modality,
    ) -> Result<RawModelOutput> {
        tracing::debug!(
            "Calling Gemini {} ({:?}, temperature={}, topK={}, seed={})",
            self.http.model(),
            modality,
            params.temperature,
            params.top_k,
            params.seed
        );

        let request = Self::build_request(prompt, params, modality);
        let response: GenerateContentResponse = self.http.generate_content(&request).await?;
        let output = Self::into_raw_output(response);

        tracing::debug!(
            "Gemini response: text_parts={}, binary_parts={}, finish={}",
            output.text_parts.len(),
            output.binary_parts.len(),
            output.completion_reason
        );

        Ok(output)
    }
}
