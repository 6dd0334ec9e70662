/*!
 * Tests for the application controller
 */

use std::sync::Arc;
use translate_stream::app_config::Config;
use translate_stream::app_controller::Controller;
use translate_stream::errors::{AppError, SessionError};
use translate_stream::session::SessionPhase;
use translate_stream::transport::{MockConnector, MockPeer};

fn controller_with(connector: &MockConnector) -> Controller {
    Controller::with_connector(Config::default(), Arc::new(connector.clone()))
        .expect("default config should build a controller")
}

/// Play the server side of one session with `script`
fn serve(connector: MockConnector, script: impl FnOnce(&MockPeer) + Send + 'static) -> tokio::task::JoinHandle<String> {
    tokio::spawn(async move {
        let mut peer = connector.next_peer().await.expect("connector closed");
        let request = peer.recv_frame().await.expect("no request frame");
        script(&peer);
        peer.wait_closed().await;
        request
    })
}

#[test]
fn test_new_for_test_withDefaults_shouldResolveLocalEndpoints() {
    let controller = Controller::new_for_test().unwrap();
    assert_eq!(controller.endpoints().http_base(), "http://localhost:8002");
    assert_eq!(controller.config().target_language, "zh-TW");
}

#[test]
fn test_with_config_withInvalidOrigin_shouldFail() {
    let mut config = Config::default();
    config.connection.origin = Some("ftp://example.com".to_string());
    assert!(Controller::with_config(config).is_err());
}

#[tokio::test]
async fn test_translate_streaming_withChunks_shouldWriteTextAsItArrives() {
    let connector = MockConnector::new();
    let controller = controller_with(&connector);
    let server = serve(connector, |peer| {
        peer.send_chunk("你");
        peer.send_chunk("好");
        peer.send_done();
    });

    let mut out = Vec::new();
    let snapshot = controller.translate_streaming("Hello", &mut out).await.unwrap();

    assert_eq!(snapshot.phase, SessionPhase::Done);
    assert_eq!(snapshot.text, "你好");
    assert_eq!(String::from_utf8(out).unwrap(), "你好\n");

    let request: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
    assert_eq!(request["source_lang"], "en");
    assert_eq!(request["target_lang"], "zh-TW");
    assert_eq!(request["content"], "Hello");
}

#[tokio::test]
async fn test_translate_streaming_withErrorFrame_shouldReturnTranslationError() {
    let connector = MockConnector::new();
    let controller = controller_with(&connector);
    let _server = serve(connector, |peer| {
        peer.send_error("model overloaded");
    });

    let mut out = Vec::new();
    let error = controller.translate_streaming("Hello", &mut out).await.unwrap_err();

    assert!(matches!(error, AppError::Translation(ref message) if message == "model overloaded"));
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_translate_streaming_withEarlyClose_shouldReportIncompleteTranslation() {
    let connector = MockConnector::new();
    let controller = controller_with(&connector);
    let _server = serve(connector, |peer| {
        peer.send_chunk("Bon");
        peer.close();
    });

    let mut out = Vec::new();
    let error = controller.translate_streaming("Hello", &mut out).await.unwrap_err();

    assert!(matches!(error, AppError::Translation(_)));
    assert_eq!(String::from_utf8(out).unwrap(), "Bon\n");
}

#[tokio::test]
async fn test_translate_streaming_withRefusedConnection_shouldReturnConnectivityMessage() {
    let controller = controller_with(&MockConnector::refusing());

    let mut out = Vec::new();
    let error = controller.translate_streaming("Hello", &mut out).await.unwrap_err();

    assert_eq!(
        error.to_string(),
        "Translation failed: Connection failed. Please check backend status."
    );
}

#[test]
fn test_translate_withBlankText_shouldRejectBeforeConnecting() {
    let connector = MockConnector::new();
    let controller = controller_with(&connector);

    let (streaming, once) = tokio_test::block_on(async {
        let mut out = Vec::new();
        let streaming = controller.translate_streaming("  ", &mut out).await;
        let once = controller.translate_once("").await;
        (streaming, once)
    });

    assert!(matches!(streaming, Err(AppError::Session(SessionError::EmptyInput))));
    assert!(matches!(once, Err(AppError::Session(SessionError::EmptyInput))));
    assert_eq!(connector.connection_attempts(), 0);
}

#[test]
fn test_translate_image_withEmptyFile_shouldRejectBeforeSending() {
    let controller = Controller::new_for_test().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let image_path = dir.path().join("blank.png");
    std::fs::write(&image_path, b"").unwrap();

    let result = tokio_test::block_on(controller.translate_image(&image_path));

    assert!(matches!(result, Err(AppError::Session(SessionError::EmptyInput))));
}
