use axum::body::Body;
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use chat_theme_generator::{
    ai::{mock::TINY_PNG_BASE64, MockGateway, Modality},
    app::{App, AppServices},
    extract,
    models::{AttemptOutcome, GenerationRequest, OutputMode, RawModelOutput},
    orchestrator::AttemptOrchestrator,
    validate::normalize,
};
use http_body_util::BodyExt;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const FENCED_REPLY: &str = "Here is your theme!\n```json\n{\n  \"theme_name\": \"Harvest Glow\",\n  \"background_color\": \"rgba(60, 30, 10, 0.85)\",\n  \"border_color\": \"#c46a1b\",\n  \"text_color\": \"#fff4e0\",\n  \"username_color\": \"#ffb347\",\n  \"font_family\": \"papyrus\",\n  \"corner_style\": \"Rounded\",\n  \"depth_style\": \"glowing\",\n  \"description\": \"Warm autumn tones.\",\n  \"image_prompt\": \"falling maple leaves\",\n}\n```";

fn services(gateway: &MockGateway, image_phase: bool) -> AppServices {
    AppServices {
        gateway: Arc::new(gateway.clone()),
        upstream_timeout: Duration::from_secs(5),
        image_phase,
    }
}

async fn post_generate(app: &App, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/api/generate-theme")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_extract_then_normalize_messy_reply() {
    let theme = extract::extract(FENCED_REPLY).unwrap();
    assert_eq!(theme.name, "Harvest Glow");
    assert_eq!(theme.image_directive.as_deref(), Some("falling maple leaves"));

    let theme = normalize(theme);
    assert_eq!(theme.font_choice, "Papyrus");
    assert_eq!(theme.corner_style, "rounded");
    assert_eq!(theme.corner_style_value, "12px");
    assert_eq!(theme.depth_style, "soft");
    assert_eq!(normalize(theme.clone()), theme);
}

#[tokio::test]
async fn test_two_phase_flow_through_http() {
    let gateway = MockGateway::new().with_text(FENCED_REPLY);
    let app = App::with_services(services(&gateway, true), "test");

    let (status, body) = post_generate(&app, serde_json::json!({ "prompt": "AUTUMN" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["themeData"]["theme_name"], "Harvest Glow");
    assert_eq!(body["themeData"]["font_family"], "Papyrus");
    assert_eq!(body["backgroundImage"]["mimeType"], "image/png");
    assert_eq!(body["backgroundImage"]["data"], TINY_PNG_BASE64);
    assert_eq!(body["imageUnavailable"], false);

    let calls = gateway.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].modality, Modality::TextAndImage);
    assert_eq!(calls[1].modality, Modality::ImageOnly);
    assert!(calls[1].prompt.contains("falling maple leaves"));
}

#[tokio::test]
async fn test_client_driven_retry_loop_reaches_degraded_final() {
    let no_image = RawModelOutput::policy_block();
    let gateway = MockGateway::new()
        .with_text(FENCED_REPLY)
        .with_output(no_image.clone())
        .with_output(no_image.clone())
        .with_output(no_image);
    let app = App::with_services(services(&gateway, true), "test");

    let mut attempt = 0;
    let mut partial = serde_json::Value::Null;
    let body = loop {
        let (status, body) = post_generate(
            &app,
            serde_json::json!({
                "prompt": "AUTUMN",
                "attempt": attempt,
                "partial_theme": partial,
            }),
        )
        .await;
        if status == StatusCode::ACCEPTED {
            attempt = body["nextAttempt"].as_u64().unwrap();
            partial = body["partialTheme"].clone();
            assert_eq!(partial["theme_name"], "Harvest Glow");
            continue;
        }
        assert_eq!(status, StatusCode::OK);
        break body;
    };

    assert_eq!(attempt, 2);
    assert_eq!(body["imageUnavailable"], true);
    assert!(body["backgroundImage"].is_null());
    assert_eq!(body["themeData"]["theme_name"], "Harvest Glow");
    assert_eq!(body["themeData"]["font_family"], "Papyrus");

    let calls = gateway.calls();
    let structured: Vec<u32> = calls
        .iter()
        .filter(|call| call.modality == Modality::TextAndImage)
        .map(|call| call.params.top_k)
        .collect();
    assert_eq!(structured, vec![20]);

    let image_only: Vec<u32> = calls
        .iter()
        .filter(|call| call.modality == Modality::ImageOnly)
        .map(|call| call.params.top_k)
        .collect();
    assert_eq!(image_only, vec![20, 30, 10]);
    assert!(calls[3].prompt.contains("falling maple leaves"));
}

#[tokio::test]
async fn test_orchestrator_public_api_color_only() {
    let gateway = MockGateway::new().with_text(FENCED_REPLY);
    let orchestrator = AttemptOrchestrator::new(Arc::new(gateway.clone()));

    let request = GenerationRequest::new("AUTUMN")
        .with_attempt(1)
        .with_output_mode(OutputMode::ColorOnly);
    let outcome = orchestrator.run_attempt(&request).await.unwrap();

    let AttemptOutcome::Final {
        theme,
        asset,
        image_unavailable,
    } = outcome
    else {
        panic!("expected final outcome");
    };
    assert_eq!(theme.font_choice, "Papyrus");
    assert!(asset.is_none());
    assert!(!image_unavailable);
    assert_eq!(gateway.get_call_count(), 1);
    let call = &gateway.calls()[0];
    assert_eq!(call.modality, Modality::TextOnly);
    assert!(call.prompt.starts_with("No image is needed. Please use exactly this format"));
}

#[tokio::test]
async fn test_unparseable_exhaustion_reports_diagnostic() {
    let gateway = MockGateway::new()
        .with_text("I cannot do that")
        .with_text("still no json")
        .with_text("nope");
    let app = App::with_services(services(&gateway, false), "test");

    let (status, body) = post_generate(&app, serde_json::json!({ "prompt": "AUTUMN" })).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["nextAttempt"], 1);

    let (status, _) =
        post_generate(&app, serde_json::json!({ "prompt": "AUTUMN", "attempt": 1 })).await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) =
        post_generate(&app, serde_json::json!({ "prompt": "AUTUMN", "attempt": 2 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["kind"], "unparseable_response");
    assert_eq!(body["diagnostic"]["attempt"], 2);
    assert_eq!(body["diagnostic"]["textExcerpt"], "nope");
}
