use super::{Modality, UpstreamGateway};
use crate::models::RawModelOutput;
use crate::scheduler::SamplingParameters;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// A 1x1 PNG, base64 encoded.
pub const TINY_PNG_BASE64: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAIAAACQd1PeAAAADElEQVR4nGP4z8AAAAMBAQDJ/pLvAAAAAElFTkSuQmCC";

pub const DEFAULT_THEME_TEXT: &str = r##"{"theme_name": "Mock Midnight", "background_color": "rgba(24, 24, 36, 0.9)", "border_color": "#5e43bd", "text_color": "#eef1ff", "username_color": "#a98eff", "font_family": "System UI", "corner_style": "rounded", "depth_style": "soft", "description": "A mock theme.", "image_prompt": "faint stars"}"##;

/// One scripted gateway reply.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Output(RawModelOutput),
    TransportError(String),
    /// Sleeps before answering, for exercising timeouts.
    Delayed(Duration, RawModelOutput),
}

/// Arguments of one recorded gateway call.
#[derive(Debug, Clone)]
pub struct MockCall {
    pub prompt: String,
    pub params: SamplingParameters,
    pub modality: Modality,
}

/// Scripted [`UpstreamGateway`]: replies are consumed in order; once the
/// script runs out it answers with a valid theme (text modalities) or a
/// tiny PNG (image-only).
#[derive(Clone, Default)]
pub struct MockGateway {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: MockResponse) -> Self {
        lock(&self.responses).push_back(response);
        self
    }

    pub fn with_output(self, output: RawModelOutput) -> Self {
        self.with_response(MockResponse::Output(output))
    }

    pub fn with_text(self, text: &str) -> Self {
        self.with_output(RawModelOutput::text(text))
    }

    pub fn with_transport_error(self, message: &str) -> Self {
        self.with_response(MockResponse::TransportError(message.to_string()))
    }

    pub fn get_call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.calls).clone()
    }

    fn default_output(modality: Modality) -> RawModelOutput {
        match modality {
            Modality::ImageOnly => RawModelOutput {
                text_parts: Vec::new(),
                binary_parts: Vec::new(),
                completion_reason: crate::models::CompletionReason::Normal,
            }
            .with_binary("image/png", TINY_PNG_BASE64),
            Modality::TextAndImage | Modality::TextOnly => RawModelOutput::text(DEFAULT_THEME_TEXT),
        }
    }
}

#[async_trait]
impl UpstreamGateway for MockGateway {
    async fn generate(
        &self,
        prompt: &str,
        params: &SamplingParameters,
        modality: Modality,
    ) -> Result<RawModelOutput> {
        lock(&self.calls).push(MockCall {
            prompt: prompt.to_string(),
            params: params.clone(),
            modality,
        });

        let next = lock(&self.responses).pop_front();
        match next {
            Some(MockResponse::Output(output)) => Ok(output),
            Some(MockResponse::TransportError(message)) => Err(Error::AiProvider(message)),
            Some(MockResponse::Delayed(delay, output)) => {
                tokio::time::sleep(delay).await;
                Ok(output)
            }
            None => Ok(Self::default_output(modality)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract;
    use crate::models::OutputMode;
    use crate::scheduler;

    #[tokio::test]
    async fn test_default_text_reply_is_extractable() {
        let gateway = MockGateway::new();
        let params = scheduler::schedule(0, OutputMode::ColorOnly);

        let output = gateway
            .generate("prompt", &params, Modality::TextOnly)
            .await
            .unwrap();
        let theme = extract::extract_from_parts(&output.text_parts).unwrap();
        assert_eq!(theme.name, "Mock Midnight");
    }

    #[tokio::test]
    async fn test_default_image_reply_has_png() {
        let gateway = MockGateway::new();
        let params = scheduler::schedule(0, OutputMode::WithImage);

        let output = gateway
            .generate("prompt", &params, Modality::ImageOnly)
            .await
            .unwrap();
        assert!(output.has_image());
        assert!(!output.has_text());
    }

    #[tokio::test]
    async fn test_scripted_replies_in_order_and_calls_recorded() {
        let gateway = MockGateway::new()
            .with_text("first")
            .with_transport_error("boom");
        let observer = gateway.clone();
        let params = scheduler::schedule(1, OutputMode::WithImage);

        let first = gateway
            .generate("one", &params, Modality::TextAndImage)
            .await
            .unwrap();
        assert_eq!(first.text_parts, vec!["first"]);

        let err = gateway
            .generate("two", &params, Modality::TextAndImage)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AiProvider(_)));

        assert_eq!(observer.get_call_count(), 2);
        let calls = observer.calls();
        assert_eq!(calls[1].prompt, "two");
        assert_eq!(calls[0].params.top_k, 30);
    }
}
