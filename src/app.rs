//! Application wiring: configuration in, a servable router out.

use crate::ai::{GeminiThemeClient, UpstreamGateway};
use crate::models::Config;
use crate::orchestrator::AttemptOrchestrator;
use crate::web::{self, AppState};
use crate::{Error, Result};
use std::num::NonZeroU16;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the shared state behind the HTTP surface.
pub struct App {
    state: AppState,
}

/// Injectable service bundle used to construct [`App`] in tests/harnesses.
pub struct AppServices {
    pub gateway: Arc<dyn UpstreamGateway>,
    pub upstream_timeout: Duration,
    pub image_phase: bool,
}

impl App {
    /// Build an app from a concrete gateway.
    ///
    /// This is primarily useful for integration tests and local harnesses that
    /// need to inject mocks.
    pub fn with_services(services: AppServices, environment: &str) -> Self {
        let orchestrator = AttemptOrchestrator::new(services.gateway)
            .with_upstream_timeout(services.upstream_timeout)
            .with_image_phase(services.image_phase);

        Self {
            state: AppState::ready(orchestrator, environment),
        }
    }

    /// Construct an app from configuration.
    ///
    /// A missing API key or an HTTP client that fails to build does not abort
    /// startup; the app serves everything except generation, which answers
    /// with [`Error::ServiceNotReady`].
    pub fn new(config: &Config) -> Self {
        match Self::build_gateway(config) {
            Ok(gateway) => Self::with_services(
                AppServices {
                    gateway,
                    upstream_timeout: config.upstream_timeout,
                    image_phase: config.image_phase,
                },
                &config.environment,
            ),
            Err(err) => {
                warn!("Theme generation disabled: {}", err);
                Self {
                    state: AppState::not_ready(&err.to_string(), &config.environment),
                }
            }
        }
    }

    fn build_gateway(config: &Config) -> Result<Arc<dyn UpstreamGateway>> {
        let api_key = config
            .gemini_api_key
            .clone()
            .ok_or_else(|| Error::ServiceNotReady("GEMINI_API_KEY not set".to_string()))?;

        let http_client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| Error::ServiceNotReady(format!("HTTP client init failed: {}", e)))?;

        let client = GeminiThemeClient::new_with_client(
            api_key,
            config.gemini_model.clone(),
            config.upstream_timeout,
            http_client,
        );
        info!(
            "Theme provider: Gemini (model: {}, timeout: {:?}, image phase: {})",
            client.model(),
            config.upstream_timeout,
            config.image_phase
        );

        Ok(Arc::new(client))
    }

    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    pub fn router(&self) -> axum::Router {
        web::router(self.state.clone())
    }

    pub async fn serve(self, listen_addr: &str, port: NonZeroU16) -> Result<()> {
        web::setup_server(listen_addr, port, self.state).await
    }
}
