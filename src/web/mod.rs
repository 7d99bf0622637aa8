use std::num::NonZeroU16;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tracing::{error, info, Instrument};
use uuid::Uuid;

use crate::models::{GenerationRequest, ThemeConfig};
use crate::orchestrator::AttemptOrchestrator;
use crate::presets;
use crate::validate::normalize;

mod responses;

pub use responses::{ApiError, ThemeBody};

#[derive(Clone)]
pub struct AppState {
    orchestrator: Option<Arc<AttemptOrchestrator>>,
    startup_error: Option<String>,
    upstream_configured: bool,
    environment: String,
    started_at: Instant,
}

impl AppState {
    pub fn ready(orchestrator: AttemptOrchestrator, environment: &str) -> Self {
        Self {
            orchestrator: Some(Arc::new(orchestrator)),
            startup_error: None,
            upstream_configured: true,
            environment: environment.to_string(),
            started_at: Instant::now(),
        }
    }

    pub fn not_ready(reason: &str, environment: &str) -> Self {
        Self {
            orchestrator: None,
            startup_error: Some(reason.to_string()),
            upstream_configured: false,
            environment: environment.to_string(),
            started_at: Instant::now(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.orchestrator.is_some()
    }
}

async fn generate_theme_handler(
    State(state): State<AppState>,
    payload: Result<Json<GenerationRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let Some(orchestrator) = state.orchestrator.as_ref() else {
        let reason = state
            .startup_error
            .clone()
            .unwrap_or_else(|| "upstream client not initialized".to_string());
        return Err(ApiError::NotReady {
            attempt: request.attempt,
            reason,
        });
    };

    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("generate_theme", %request_id, attempt = request.attempt);
    let attempt = request.attempt.min(orchestrator.max_attempts());
    let outcome = orchestrator
        .run_attempt(&request)
        .instrument(span)
        .await
        .map_err(|err| ApiError::from_error(attempt, err))?;

    Ok(outcome.into_response())
}

async fn presets_handler() -> Json<presets::Presets> {
    Json(presets::all())
}

async fn fonts_handler() -> Json<&'static [presets::Font]> {
    Json(presets::FONTS)
}

/// Sample theme for exercising the client without an upstream call.
async fn test_theme_handler() -> Json<ThemeBody> {
    let theme = normalize(ThemeConfig {
        name: "Debug Test Theme".to_string(),
        background_color: "rgba(24, 24, 36, 0.9)".to_string(),
        border_color: "#5e43bd".to_string(),
        text_color: "#eef1ff".to_string(),
        accent_color: "#a98eff".to_string(),
        font_choice: presets::DEFAULT_FONT.to_string(),
        corner_style: "rounded".to_string(),
        depth_style: "soft".to_string(),
        description: "A test theme for debugging purposes.".to_string(),
        ..ThemeConfig::default()
    });

    Json(ThemeBody {
        theme_data: theme,
        background_image: None,
        image_unavailable: false,
    })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DebugBody {
    status: &'static str,
    gemini_api_key_configured: bool,
    font_count: usize,
    environment: String,
    uptime_seconds: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_attempts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    startup_error: Option<String>,
}

async fn debug_handler(State(state): State<AppState>) -> Json<DebugBody> {
    Json(DebugBody {
        status: if state.orchestrator.is_some() {
            "running"
        } else {
            "not_ready"
        },
        gemini_api_key_configured: state.upstream_configured,
        font_count: presets::FONTS.len(),
        environment: state.environment.clone(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        max_attempts: state.orchestrator.as_ref().map(|o| o.max_attempts()),
        startup_error: state.startup_error.clone(),
    })
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "Theme Generator API is running")
}

pub(crate) fn create_router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/generate-theme",
            axum::routing::post(generate_theme_handler),
        )
        .route("/api/presets", axum::routing::get(presets_handler))
        .route("/api/fonts", axum::routing::get(fonts_handler))
        .route("/api/test-theme", axum::routing::get(test_theme_handler))
        .route("/api/debug", axum::routing::get(debug_handler))
        .route("/health", axum::routing::get(health_handler))
}

pub fn router(state: AppState) -> Router {
    create_router()
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn setup_server(
    listen_addr: &str,
    port: NonZeroU16,
    state: AppState,
) -> crate::Result<()> {
    let app = router(state);

    let addr = format!("{}:{}", listen_addr, port);
    info!("Starting server on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    if let Err(err) = axum::serve(listener, app).await {
        error!("Server error: {}", err);
        return Err(err.into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::ai::MockGateway;
    use crate::models::RawModelOutput;
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn ready_state(gateway: &MockGateway) -> AppState {
        AppState::ready(
            AttemptOrchestrator::new(Arc::new(gateway.clone())),
            "test",
        )
    }

    async fn read_json(response: Response) -> serde_json::Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("collect body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    fn generate_request(body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/generate-theme")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn color_only_final_returns_ok() {
        let gateway = MockGateway::new();
        let app = router(ready_state(&gateway));

        let response = app
            .oneshot(generate_request(serde_json::json!({
                "prompt": "midnight",
                "output_mode": "color_only"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["themeData"]["theme_name"], "Mock Midnight");
        assert_eq!(body["themeData"]["corner_style_value"], "12px");
        assert!(body["backgroundImage"].is_null());
        assert_eq!(body["imageUnavailable"], false);
    }

    #[tokio::test]
    async fn missing_image_returns_accepted_with_partial_theme() {
        let gateway = MockGateway::new()
            .with_text(crate::ai::mock::DEFAULT_THEME_TEXT)
            .with_output(RawModelOutput::policy_block());
        let app = router(ready_state(&gateway));

        let response = app
            .oneshot(generate_request(serde_json::json!({ "prompt": "midnight" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let body = read_json(response).await;
        assert_eq!(body["retry"], true);
        assert_eq!(body["nextAttempt"], 1);
        assert_eq!(body["partialTheme"]["theme_name"], "Mock Midnight");
    }

    #[tokio::test]
    async fn missing_prompt_returns_bad_request() {
        let gateway = MockGateway::new();
        let app = router(ready_state(&gateway));

        let response = app
            .oneshot(generate_request(serde_json::json!({ "attempt": 1 })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["kind"], "missing_prompt");
        assert_eq!(body["error"], "Prompt is required");
        assert_eq!(gateway.get_call_count(), 0);
    }

    #[tokio::test]
    async fn unparseable_at_ceiling_returns_diagnostic() {
        let gateway = MockGateway::new().with_text("no json, sorry");
        let app = router(ready_state(&gateway));

        let response = app
            .oneshot(generate_request(serde_json::json!({
                "prompt": "midnight",
                "attempt": 2,
                "output_mode": "color_only"
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["kind"], "unparseable_response");
        assert_eq!(body["diagnostic"]["hasText"], true);
        assert_eq!(body["diagnostic"]["textExcerpt"], "no json, sorry");
        assert_eq!(body["diagnostic"]["completionReason"], "normal");
    }

    #[tokio::test]
    async fn transport_error_returns_server_error() {
        let gateway = MockGateway::new().with_transport_error("connection reset");
        let app = router(ready_state(&gateway));

        let response = app
            .oneshot(generate_request(serde_json::json!({ "prompt": "midnight" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["error"], "Failed to generate theme");
        assert_eq!(body["kind"], "upstream_transport_error");
        assert!(body["details"]
            .as_str()
            .unwrap()
            .contains("connection reset"));
        assert_eq!(body["diagnostic"]["attempt"], 0);
        assert_eq!(body["diagnostic"]["hasText"], false);
        assert!(body["diagnostic"]["details"]
            .as_str()
            .unwrap()
            .contains("connection reset"));
    }

    #[tokio::test]
    async fn transport_error_diagnostic_uses_clamped_attempt() {
        let gateway = MockGateway::new().with_transport_error("timeout");
        let app = router(ready_state(&gateway));

        let response = app
            .oneshot(generate_request(serde_json::json!({
                "prompt": "midnight",
                "attempt": 9
            })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = read_json(response).await;
        assert_eq!(body["diagnostic"]["attempt"], 2);
    }

    #[tokio::test]
    async fn null_prompt_is_missing_prompt() {
        let gateway = MockGateway::new();
        let app = router(ready_state(&gateway));

        let response = app
            .oneshot(generate_request(serde_json::json!({ "prompt": null })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["kind"], "missing_prompt");
        assert_eq!(gateway.get_call_count(), 0);
    }

    #[tokio::test]
    async fn malformed_body_is_json_bad_request() {
        let gateway = MockGateway::new();
        let app = router(ready_state(&gateway));

        let request = Request::builder()
            .method("POST")
            .uri("/api/generate-theme")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{\"prompt\": \"midnight\", \"attempt\": \"soon\"}"))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["kind"], "invalid_request");
        assert!(body["diagnostic"]["details"].is_string());
        assert_eq!(gateway.get_call_count(), 0);
    }

    #[tokio::test]
    async fn not_ready_returns_service_unavailable() {
        let app = router(AppState::not_ready("GEMINI_API_KEY not set", "test"));

        let response = app
            .oneshot(generate_request(serde_json::json!({ "prompt": "midnight" })))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = read_json(response).await;
        assert_eq!(body["details"], "GEMINI_API_KEY not set");
        assert_eq!(body["kind"], "service_not_ready");
        assert_eq!(body["diagnostic"]["details"], "GEMINI_API_KEY not set");
    }

    #[tokio::test]
    async fn presets_lists_registry() {
        let app = router(AppState::not_ready("unused", "test"));

        let request = Request::builder()
            .uri("/api/presets")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["corner_styles"].as_array().unwrap().len(), 4);
        assert_eq!(body["depth_styles"].as_array().unwrap().len(), 5);
        assert_eq!(body["fonts"].as_array().unwrap().len(), presets::FONTS.len());
        assert_eq!(body["corner_styles"][3]["key"], "pill");
    }

    #[tokio::test]
    async fn test_theme_and_debug_endpoints() {
        let app = router(AppState::not_ready("no key", "test"));

        let request = Request::builder()
            .uri("/api/test-theme")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["themeData"]["font_family"], "System UI");

        let request = Request::builder()
            .uri("/api/debug")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = read_json(response).await;
        assert_eq!(body["status"], "not_ready");
        assert_eq!(body["geminiApiKeyConfigured"], false);
        assert_eq!(body["fontCount"], 22);
        assert!(body.get("maxAttempts").is_none());
    }

    #[tokio::test]
    async fn debug_reports_attempt_ceiling_when_ready() {
        let app = router(ready_state(&MockGateway::new()));

        let request = Request::builder()
            .uri("/api/debug")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let body = read_json(response).await;
        assert_eq!(body["status"], "running");
        assert_eq!(body["geminiApiKeyConfigured"], true);
        assert_eq!(body["maxAttempts"], 2);
        assert_eq!(body["environment"], "test");
    }

    #[tokio::test]
    async fn health_is_plain_text() {
        let app = router(AppState::not_ready("no key", "test"));

        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&bytes[..], b"Theme Generator API is running");
    }
}
