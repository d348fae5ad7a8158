use article_pager::services::prober::SYSTEM_MESSAGE;
use article_pager::{
    AnomalyDetector, AnomalyProber, ConversionSession, PagerError, ProberConfig,
};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn reply_body(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-test",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

async fn prober_for(server: &MockServer) -> AnomalyProber {
    let mut config = ProberConfig::new("sk-test-key-123456");
    config.endpoint = format!("{}/v1/chat/completions", server.uri());
    AnomalyProber::new(config).expect("valid prober config")
}

#[tokio::test]
async fn test_detects_anomaly_from_yes_reply() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test-key-123456"))
        .and(body_partial_json(serde_json::json!({
            "model": "gpt-3.5-turbo",
            "messages": [{"role": "system", "content": SYSTEM_MESSAGE}]
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(reply_body("Yes, the page ends in the middle of a sentence.")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let prober = prober_for(&server).await;
    let result = prober.detect("Some page text").await.expect("probe succeeds");

    assert!(result.is_anomalous());
    assert_eq!(result.description, "the page ends in the middle of a sentence.");
}

#[tokio::test]
async fn test_no_reply_means_no_anomaly() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(reply_body("no")))
        .mount(&server)
        .await;

    let prober = prober_for(&server).await;
    let result = prober.detect("Clean text.").await.expect("probe succeeds");
    assert!(!result.is_anomalous());
}

#[tokio::test]
async fn test_missing_choices_is_not_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "error": {"message": "quota exceeded"}
        })))
        .mount(&server)
        .await;

    let prober = prober_for(&server).await;
    let result = prober.detect("Any text.").await.expect("permissive parse");
    assert!(!result.is_anomalous());
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let prober = prober_for(&server).await;
    let result = prober.detect("Any text.").await;
    assert!(matches!(result, Err(PagerError::HttpStatus { status: 500 })));
}

#[tokio::test]
async fn test_unparseable_body_is_reported() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let prober = prober_for(&server).await;
    let result = prober.detect("Any text.").await;
    assert!(matches!(result, Err(PagerError::Json(_))));
}

#[tokio::test]
async fn test_session_fails_open_on_http_errors() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let prober: Arc<dyn AnomalyDetector> = Arc::new(prober_for(&server).await);
    let mut session = ConversionSession::new(Some(prober));
    let page_count = session
        .convert("One two three. Four five six. Seven eight nine", "Go.", 5)
        .expect("valid budget")
        .len();

    let anomalies = session.collect_anomalies().await;
    assert_eq!(anomalies.len(), page_count);
    assert!(anomalies.iter().all(|a| !a.is_anomalous()));
    assert_eq!(session.pages().len(), page_count);
}
