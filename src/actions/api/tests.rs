use super::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test(flavor = "multi_thread")]
async fn returns_payload_on_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/actions/get_po_status"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "status": "ok",
            "data": { "po_status": "Approved" }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = server.uri();
    let payload = tokio::task::spawn_blocking(move || {
        let api = HttpActionApi::new(&endpoint, Duration::from_secs(5)).expect("api");
        api.call("get_po_status")
    })
    .await
    .expect("task completes")
    .expect("call succeeds");

    assert_eq!(payload["data"]["po_status"], "Approved");
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/actions/get_po_status"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let endpoint = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        let api = HttpActionApi::new(&endpoint, Duration::from_secs(5)).expect("api");
        api.call("get_po_status")
    })
    .await
    .expect("task completes");

    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn timeout_is_a_recoverable_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/actions/slow_call"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"status": "ok"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let endpoint = server.uri();
    let result = tokio::task::spawn_blocking(move || {
        let api = HttpActionApi::new(&endpoint, Duration::from_millis(200)).expect("api");
        api.call("slow_call")
    })
    .await
    .expect("task completes");

    assert!(result.is_err());
}

#[test]
fn invalid_endpoint_is_rejected() {
    assert!(HttpActionApi::new("not a url", Duration::from_secs(1)).is_err());
}
