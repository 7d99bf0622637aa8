//! Upstream generative service integration
//!
//! The core only sees [`UpstreamGateway`]: a prompt plus sampling parameters
//! in, raw text/binary parts and a completion reason out. Network, auth and
//! per-request timeouts live in the implementations.

pub mod gemini;
pub mod mime;
pub mod mock;

pub use gemini::GeminiThemeClient;
pub use mock::{MockGateway, MockResponse};

use crate::models::{OutputMode, RawModelOutput};
use crate::scheduler::SamplingParameters;
use crate::Result;
use async_trait::async_trait;

/// Which output modalities a call asks the model for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    TextAndImage,
    TextOnly,
    ImageOnly,
}

impl Modality {
    /// Modality of the structured-phase call for an output mode.
    pub fn for_output_mode(mode: OutputMode) -> Self {
        match mode {
            OutputMode::WithImage => Modality::TextAndImage,
            OutputMode::ColorOnly => Modality::TextOnly,
        }
    }
}

#[async_trait]
pub trait UpstreamGateway: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &SamplingParameters,
        modality: Modality,
    ) -> Result<RawModelOutput>;
}
