/*!
 * HTTP API tests against a local mock server
 */

use serde_json::json;
use std::time::Duration;

use translate_stream::app_config::Config;
use translate_stream::app_controller::Controller;
use translate_stream::backend::{BackendClient, ModelLoadState, ModelVariant, TranslateRequest};
use translate_stream::endpoint::Endpoints;
use translate_stream::errors::{AppError, BackendError};

use crate::common::{HttpReply, init_test_logging, spawn_http_server, unreachable_endpoints};

fn backend(endpoints: Endpoints) -> BackendClient {
    init_test_logging();
    BackendClient::new(endpoints, Duration::from_secs(5))
}

fn gpu_status_body() -> serde_json::Value {
    json!({
        "gpu": {
            "available": true,
            "device_name": "NVIDIA RTX 4090",
            "device_count": 1,
            "current_device": 0
        },
        "model": {
            "status": "loaded",
            "model": "google/translategemma-4b-it",
            "vram_usage": 8.53
        }
    })
}

#[tokio::test]
async fn test_probe_status_withValidBody_shouldReturnStatus() {
    let (endpoints, mut requests) = spawn_http_server(vec![HttpReply::json(200, gpu_status_body())])
        .await
        .unwrap();

    let status = backend(endpoints).probe_status().await.expect("status should be available");

    assert!(status.gpu.available);
    assert_eq!(status.gpu.device_count, Some(1));
    assert_eq!(status.model.status, ModelLoadState::Loaded);
    assert!(status.is_ready());
    assert_eq!(status.to_string(), "NVIDIA RTX 4090 | google/translategemma-4b-it | 8.5 GB");

    let request = requests.recv().await.unwrap();
    assert_eq!(request.method, "GET");
    assert_eq!(request.path, "/api/status");
}

#[tokio::test]
async fn test_probe_status_withCpuOnlyBackend_shouldParseWithoutOptionalFields() {
    let body = json!({
        "gpu": { "available": false, "device_name": null },
        "model": { "status": "not_loaded", "vram_usage": 0 }
    });
    let (endpoints, _requests) = spawn_http_server(vec![HttpReply::json(200, body)]).await.unwrap();

    let status = backend(endpoints).probe_status().await.unwrap();
    assert!(!status.is_ready());
    assert_eq!(status.to_string(), "CPU Mode | not loaded | 0.0 GB");
}

#[tokio::test]
async fn test_status_withServerError_shouldBeUnavailable() {
    let (endpoints, _requests) = spawn_http_server(vec![
        HttpReply::raw(503, "model loading"),
        HttpReply::raw(503, "model loading"),
    ])
    .await
    .unwrap();
    let client = backend(endpoints);

    assert!(client.probe_status().await.is_none());
    match client.fetch_status().await {
        Err(BackendError::ApiError { status_code, message }) => {
            assert_eq!(status_code, 503);
            assert_eq!(message, "model loading");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_status_withMalformedBody_shouldBeUnavailable() {
    let (endpoints, _requests) = spawn_http_server(vec![
        HttpReply::raw(200, "{\"gpu\": true"),
        HttpReply::raw(200, "{\"unexpected\": 1}"),
    ])
    .await
    .unwrap();
    let client = backend(endpoints);

    assert!(client.probe_status().await.is_none());
    assert!(matches!(client.fetch_status().await, Err(BackendError::ParseError(_))));
}

#[tokio::test]
async fn test_status_withUnreachableHost_shouldBeUnavailable() {
    let client = backend(unreachable_endpoints().await.unwrap());

    assert!(client.probe_status().await.is_none());
    assert!(matches!(client.fetch_status().await, Err(BackendError::ConnectionError(_))));
}

#[tokio::test]
async fn test_translate_withSuccess_shouldPostRequestAndParseResponse() {
    let reply = json!({
        "translation": "Bonjour",
        "model_used": "google/translategemma-12b-it",
        "time_taken": 0.42
    });
    let (endpoints, mut requests) = spawn_http_server(vec![HttpReply::json(200, reply)]).await.unwrap();

    let request = TranslateRequest::text("Hello", "en", "fr").model(ModelVariant::Large);
    let response = backend(endpoints).translate(&request).await.unwrap();

    assert_eq!(response.translation, "Bonjour");
    assert_eq!(response.model_used, ModelVariant::Large.model_id());
    assert_eq!(response.time_taken, Some(0.42));

    let recorded = requests.recv().await.unwrap();
    assert_eq!(recorded.method, "POST");
    assert_eq!(recorded.path, "/api/translate");
    let body: serde_json::Value = serde_json::from_str(&recorded.body).unwrap();
    assert_eq!(
        body,
        json!({
            "type": "text",
            "source_lang": "en",
            "target_lang": "fr",
            "content": "Hello",
            "model": "12b"
        })
    );
}

#[tokio::test]
async fn test_translate_withServerError_shouldReturnTranslationFailed() {
    let (endpoints, _requests) = spawn_http_server(vec![HttpReply::json(500, json!({"detail": "CUDA out of memory"}))])
        .await
        .unwrap();

    let request = TranslateRequest::text("Hello", "en", "fr");
    let result = backend(endpoints).translate(&request).await;

    assert!(matches!(result, Err(BackendError::TranslationFailed { status_code: 500 })));
}

#[tokio::test]
async fn test_switch_model_withAnyStatus_shouldNotFail() {
    let (endpoints, mut requests) = spawn_http_server(vec![
        HttpReply::json(200, json!({"status": "switching"})),
        HttpReply::raw(409, "already loading"),
    ])
    .await
    .unwrap();
    let client = backend(endpoints);

    client.switch_model(ModelVariant::Large).await.unwrap();
    client.switch_model(ModelVariant::Small).await.unwrap();

    let first = requests.recv().await.unwrap();
    assert_eq!(first.method, "POST");
    assert_eq!(first.path, "/api/model/switch");
    assert_eq!(serde_json::from_str::<serde_json::Value>(&first.body).unwrap(), json!({"model": "12b"}));

    let second = requests.recv().await.unwrap();
    assert_eq!(serde_json::from_str::<serde_json::Value>(&second.body).unwrap(), json!({"model": "4b"}));
}

#[tokio::test]
async fn test_ping_withRootMessage_shouldReturnGreeting() {
    let (endpoints, mut requests) = spawn_http_server(vec![HttpReply::json(200, json!({"message": "Translation API"}))])
        .await
        .unwrap();

    let message = backend(endpoints).ping().await.unwrap();

    assert_eq!(message, "Translation API");
    assert_eq!(requests.recv().await.unwrap().path, "/");
}

#[tokio::test]
async fn test_controller_translate_once_withApiUrl_shouldUseConfiguredBackend() {
    let reply = json!({ "translation": "你好", "model_used": "google/translategemma-4b-it" });
    let (endpoints, mut requests) = spawn_http_server(vec![HttpReply::json(200, reply)]).await.unwrap();

    let mut config = Config::default();
    config.connection.api_url = Some(endpoints.http_base().to_string());
    let controller = Controller::with_config(config).unwrap();

    let response = controller.translate_once("Hello").await.unwrap();
    assert_eq!(response.translation, "你好");
    assert_eq!(response.time_taken, None);

    let body: serde_json::Value = serde_json::from_str(&requests.recv().await.unwrap().body).unwrap();
    assert_eq!(body["target_lang"], "zh-TW");
    assert_eq!(body["model"], "4b");
}

#[tokio::test]
async fn test_controller_status_withUnreachableBackend_shouldReturnNone() {
    let endpoints = unreachable_endpoints().await.unwrap();
    let mut config = Config::default();
    config.connection.api_url = Some(endpoints.http_base().to_string());
    let controller = Controller::with_config(config).unwrap();

    assert!(controller.status().await.is_none());
    assert!(matches!(controller.ping().await, Err(AppError::Backend(_))));
}

#[tokio::test]
async fn test_controller_translate_image_withFile_shouldPostBase64ImageData() {
    let reply = json!({ "translation": "Menu du jour", "model_used": "google/translategemma-12b-it" });
    let (endpoints, mut requests) = spawn_http_server(vec![HttpReply::json(200, reply)]).await.unwrap();

    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("menu.png");
    std::fs::write(&image_path, b"\x89PNG\r\n\x1a\nfake").unwrap();

    let mut config = Config::default();
    config.connection.api_url = Some(endpoints.http_base().to_string());
    config.target_language = "fr".to_string();
    config.model = ModelVariant::Large;
    let controller = Controller::with_config(config).unwrap();

    let response = controller.translate_image(&image_path).await.unwrap();
    assert_eq!(response.translation, "Menu du jour");

    let recorded = requests.recv().await.unwrap();
    assert_eq!(recorded.path, "/api/translate");
    let body: serde_json::Value = serde_json::from_str(&recorded.body).unwrap();
    assert_eq!(
        body,
        json!({
            "type": "image",
            "source_lang": "en",
            "target_lang": "fr",
            "image_data": "iVBORw0KGgpmYWtl",
            "model": "12b"
        })
    );
    assert!(body.get("content").is_none());
}

#[tokio::test]
async fn test_controller_translate_image_withMissingFile_shouldReturnFileError() {
    let controller = Controller::new_for_test().unwrap();
    let dir = tempfile::tempdir().unwrap();

    let result = controller.translate_image(&dir.path().join("missing.png")).await;
    assert!(matches!(result, Err(AppError::File(_))));
}
