//! Attempt orchestration
//!
//! Runs exactly one attempt of a generation request through
//! `Composing -> AwaitingStructuredPhase -> AwaitingImagePhase -> Resolved`.
//! The attempt number is explicit state carried by the request: retries are
//! handed back to the caller as [`AttemptOutcome::Retry`] and come back as a
//! new request, so nothing is kept server-side between attempts.

use crate::ai::{Modality, UpstreamGateway};
use crate::extract;
use crate::models::{
    AttemptOutcome, BackgroundAsset, CompletionReason, Diagnostic, ErrorKind, GenerationRequest,
    OutputMode, RawModelOutput, ThemeConfig,
};
use crate::prompts;
use crate::scheduler::{self, SamplingParameters, MAX_ATTEMPTS};
use crate::validate::normalize;
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_UPSTREAM_TIMEOUT: Duration = Duration::from_secs(60);

enum State {
    Composing,
    AwaitingStructuredPhase {
        prompt: String,
        params: SamplingParameters,
    },
    AwaitingImagePhase {
        theme: ThemeConfig,
        params: SamplingParameters,
    },
    Resolved(AttemptOutcome),
}

impl State {
    fn name(&self) -> &'static str {
        match self {
            State::Composing => "composing",
            State::AwaitingStructuredPhase { .. } => "awaiting structured phase",
            State::AwaitingImagePhase { .. } => "awaiting image phase",
            State::Resolved(_) => "resolved",
        }
    }
}

/// Drives one attempt against an [`UpstreamGateway`].
pub struct AttemptOrchestrator {
    gateway: Arc<dyn UpstreamGateway>,
    max_attempts: u32,
    upstream_timeout: Duration,
    image_phase: bool,
}

impl AttemptOrchestrator {
    pub fn new(gateway: Arc<dyn UpstreamGateway>) -> Self {
        Self {
            gateway,
            max_attempts: MAX_ATTEMPTS,
            upstream_timeout: DEFAULT_UPSTREAM_TIMEOUT,
            image_phase: true,
        }
    }

    pub fn with_upstream_timeout(mut self, timeout: Duration) -> Self {
        self.upstream_timeout = timeout;
        self
    }

    /// Whether a missing image may be requested in a second, image-only call.
    pub fn with_image_phase(mut self, enabled: bool) -> Self {
        self.image_phase = enabled;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs one attempt. `Err` is reserved for transport failures, which are
    /// never retried here; everything else is an [`AttemptOutcome`].
    pub async fn run_attempt(&self, request: &GenerationRequest) -> Result<AttemptOutcome> {
        if request.creative_prompt.trim().is_empty() {
            warn!("Rejecting request without a prompt");
            return Ok(AttemptOutcome::Failure {
                kind: ErrorKind::MissingPrompt,
                diagnostic: Diagnostic::for_attempt(request.attempt),
            });
        }

        let attempt = if request.attempt > self.max_attempts {
            warn!(
                "Attempt {} is past the ceiling, running it as attempt {}",
                request.attempt, self.max_attempts
            );
            self.max_attempts
        } else {
            request.attempt
        };

        info!(
            "Generating theme for \"{}\" (attempt {}/{}, mode {:?})",
            request.creative_prompt, attempt, self.max_attempts, request.output_mode
        );

        let mut state = State::Composing;
        loop {
            debug!("[attempt {}] {}", attempt, state.name());
            state = match state {
                State::Composing => {
                    let params = scheduler::schedule(attempt, request.output_mode);
                    match self.reusable_theme(request, attempt) {
                        Some(theme) => {
                            info!(
                                "[attempt {}] Reusing theme \"{}\" from the previous attempt",
                                attempt, theme.name
                            );
                            State::AwaitingImagePhase { theme, params }
                        }
                        None => {
                            let prompt = prompts::theme_prompt(
                                &params.prompt_prefix,
                                &request.creative_prompt,
                                request.output_mode,
                            );
                            State::AwaitingStructuredPhase { prompt, params }
                        }
                    }
                }
                State::AwaitingStructuredPhase { prompt, params } => {
                    let modality = Modality::for_output_mode(request.output_mode);
                    let output = self.call_gateway(&prompt, &params, modality).await?;
                    self.after_structured_phase(request, attempt, params, output)
                }
                State::AwaitingImagePhase { theme, params } => {
                    let prompt = prompts::background_prompt(&request.creative_prompt, &theme);
                    let output = self
                        .call_gateway(&prompt, &params, Modality::ImageOnly)
                        .await?;
                    if output.completion_reason == CompletionReason::PolicyBlock {
                        warn!("[attempt {}] Image phase was policy blocked", attempt);
                    }
                    let asset = output.first_image().cloned();
                    State::Resolved(self.resolve_image(attempt, theme, asset))
                }
                State::Resolved(outcome) => return Ok(outcome),
            };
        }
    }

    async fn call_gateway(
        &self,
        prompt: &str,
        params: &SamplingParameters,
        modality: Modality,
    ) -> Result<RawModelOutput> {
        tokio::time::timeout(
            self.upstream_timeout,
            self.gateway.generate(prompt, params, modality),
        )
        .await
        .map_err(|_| {
            tracing::error!(
                "Upstream call ({:?}) timed out after {:?}",
                modality,
                self.upstream_timeout
            );
            Error::UpstreamTimeout(self.upstream_timeout)
        })?
    }

    /// A theme the caller carried back from an earlier attempt that only
    /// lacked a background. Only the image phase needs to run again.
    fn reusable_theme(&self, request: &GenerationRequest, attempt: u32) -> Option<ThemeConfig> {
        if attempt == 0 || !self.image_phase || request.output_mode != OutputMode::WithImage {
            return None;
        }
        let theme = request.prior_result.as_ref()?;
        if theme.background_color.trim().is_empty() || theme.text_color.trim().is_empty() {
            return None;
        }
        Some(normalize(theme.clone()))
    }

    fn after_structured_phase(
        &self,
        request: &GenerationRequest,
        attempt: u32,
        params: SamplingParameters,
        output: RawModelOutput,
    ) -> State {
        if output.completion_reason == CompletionReason::PolicyBlock {
            warn!("[attempt {}] Upstream refused on policy grounds", attempt);
            return State::Resolved(self.retry_or_fail(
                request,
                attempt,
                ErrorKind::PolicyBlocked,
                &output,
            ));
        }

        let Some(theme) = extract::extract_from_parts(&output.text_parts) else {
            warn!(
                "[attempt {}] No theme object in response (finish: {}, text: {}, image: {})",
                attempt,
                output.completion_reason,
                output.has_text(),
                output.has_image()
            );
            return State::Resolved(self.retry_or_fail(
                request,
                attempt,
                ErrorKind::UnparseableResponse,
                &output,
            ));
        };

        let theme = normalize(theme);
        info!("[attempt {}] Parsed theme \"{}\"", attempt, theme.name);

        match request.output_mode {
            OutputMode::ColorOnly => {
                if !output.binary_parts.is_empty() {
                    debug!(
                        "Discarding {} binary part(s) for color-only theme",
                        output.binary_parts.len()
                    );
                }
                State::Resolved(AttemptOutcome::Final {
                    theme,
                    asset: None,
                    image_unavailable: false,
                })
            }
            OutputMode::WithImage => match output.first_image().cloned() {
                Some(asset) => State::Resolved(self.resolve_image(attempt, theme, Some(asset))),
                None if self.image_phase => State::AwaitingImagePhase { theme, params },
                None => State::Resolved(self.resolve_image(attempt, theme, None)),
            },
        }
    }

    fn retry_or_fail(
        &self,
        request: &GenerationRequest,
        attempt: u32,
        kind: ErrorKind,
        output: &RawModelOutput,
    ) -> AttemptOutcome {
        if attempt < self.max_attempts {
            AttemptOutcome::Retry {
                next_attempt: attempt + 1,
                partial_theme: request.prior_result.clone().map(normalize),
                reason: kind.message().to_string(),
            }
        } else {
            warn!("[attempt {}] Giving up: {:?}", attempt, kind);
            AttemptOutcome::Failure {
                kind,
                diagnostic: Diagnostic::from_output(attempt, output),
            }
        }
    }

    fn resolve_image(
        &self,
        attempt: u32,
        theme: ThemeConfig,
        asset: Option<BackgroundAsset>,
    ) -> AttemptOutcome {
        match asset {
            Some(asset) => {
                info!(
                    "[attempt {}] Theme \"{}\" ready with {} background",
                    attempt, theme.name, asset.media_type
                );
                AttemptOutcome::Final {
                    theme,
                    asset: Some(asset),
                    image_unavailable: false,
                }
            }
            None if attempt < self.max_attempts => {
                info!(
                    "[attempt {}] Theme \"{}\" has no background yet, asking caller to retry",
                    attempt, theme.name
                );
                AttemptOutcome::Retry {
                    next_attempt: attempt + 1,
                    partial_theme: Some(theme),
                    reason: "Background image was not generated".to_string(),
                }
            }
            None => {
                warn!(
                    "[attempt {}] No background image after final attempt, returning colors only",
                    attempt
                );
                AttemptOutcome::Final {
                    theme,
                    asset: None,
                    image_unavailable: true,
                }
            }
        }
    }
}
