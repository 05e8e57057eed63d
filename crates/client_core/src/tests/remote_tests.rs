use super::*;
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Router,
};
use serde_json::json;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: String,
    path: String,
    content_type: Option<String>,
    body: String,
}

#[derive(Clone, Default)]
struct MockState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn mock_backend(
    State(state): State<MockState>,
    method: axum::http::Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_default();
    state.requests.lock().await.push(RecordedRequest {
        method: method.to_string(),
        path: path.clone(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToString::to_string),
        body,
    });

    let json_response = |status: StatusCode, body: String| {
        (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
    };

    match uri.path() {
        "/scenarios" if method == axum::http::Method::GET => {
            json_response(StatusCode::OK, "[]".to_string())
        }
        "/scenarios" => json_response(
            StatusCode::OK,
            json!({
                "id": "11111111-2222-4333-8444-555555555555",
                "name": "S",
                "system_prompt": "P",
                "participants": [],
                "settings": {"model": "m", "temperature": 0.5, "max_tokens": 100}
            })
            .to_string(),
        ),
        "/runs/00000000-0000-4000-8000-000000000000" => json_response(
            StatusCode::NOT_FOUND,
            json!({"detail": "Run not found"}).to_string(),
        ),
        "/empty" => StatusCode::OK.into_response(),
        "/explode" => (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response(),
        "/garbage" => (StatusCode::OK, "definitely not json").into_response(),
        "/run" => json_response(
            StatusCode::OK,
            json!({
                "id": "6f1c2d3e-4a5b-4c6d-8e7f-001122334455",
                "scenario_id": "11111111-2222-4333-8444-555555555555",
                "timestamp": "2024-03-05T10:11:12.123456",
                "starred": false,
                "log": [
                    {"speaker": "Jordan", "content": "Hi", "timestamp": "2024-03-05T10:11:12"},
                    {"speaker": "AI", "content": "Hello", "timestamp": "2024-03-05T10:11:13"}
                ]
            })
            .to_string(),
        ),
        _ => json_response(StatusCode::OK, json!({"ok": true}).to_string()),
    }
}

async fn spawn_mock_backend() -> (String, MockState) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = MockState::default();
    let app = Router::new()
        .fallback(mock_backend)
        .with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), state)
}

fn http_remote(server_url: &str) -> HttpRemoteService {
    HttpRemoteService::new(server_url, Duration::from_secs(5)).expect("remote")
}

#[tokio::test]
async fn every_request_carries_json_content_type_and_body_only_when_given() {
    let (server_url, state) = spawn_mock_backend().await;
    let remote = http_remote(&server_url);

    remote
        .call(Method::Get, "/runs", None)
        .await
        .expect("get");
    remote
        .call(Method::Patch, "/runs/abc/star", Some(json!({"starred": true})))
        .await
        .expect("patch");

    let requests = state.requests.lock().await.clone();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].content_type.as_deref(), Some("application/json"));
    assert!(requests[0].body.is_empty());
    assert_eq!(requests[1].method, "PATCH");
    assert_eq!(requests[1].content_type.as_deref(), Some("application/json"));
    let body: Value = serde_json::from_str(&requests[1].body).expect("json body");
    assert_eq!(body, json!({"starred": true}));
}

#[tokio::test]
async fn non_success_status_becomes_status_failure_with_detail() {
    let (server_url, _state) = spawn_mock_backend().await;
    let remote = http_remote(&server_url);

    let err = remote
        .call(Method::Get, "/runs/00000000-0000-4000-8000-000000000000", None)
        .await
        .expect_err("404");
    assert_eq!(err.status(), Some(404));
    let text = err.to_string();
    assert!(text.contains("404"), "unexpected message: {text}");
    assert!(text.contains("Run not found"), "unexpected message: {text}");

    let err = remote
        .call(Method::Delete, "/explode", None)
        .await
        .expect_err("500");
    assert!(matches!(
        err,
        RequestFailure::Status {
            status: 500,
            detail: None,
            ..
        }
    ));
}

#[tokio::test]
async fn empty_success_body_is_null_and_garbage_is_decode_failure() {
    let (server_url, _state) = spawn_mock_backend().await;
    let remote = http_remote(&server_url);

    let value = remote
        .call(Method::Delete, "/empty", None)
        .await
        .expect("empty body");
    assert_eq!(value, Value::Null);

    let err = remote
        .call(Method::Get, "/garbage", None)
        .await
        .expect_err("decode");
    assert!(matches!(err, RequestFailure::Decode { .. }));
    assert_eq!(err.status(), None);
}

#[tokio::test]
async fn unreachable_server_is_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let remote = http_remote(&format!("http://{addr}"));
    let err = remote
        .call(Method::Get, "/runs", None)
        .await
        .expect_err("connection refused");
    assert!(matches!(err, RequestFailure::Transport { .. }));
    assert_eq!(err.status(), None);
}

#[test]
fn server_url_must_be_http() {
    assert!(HttpRemoteService::new("ftp://example.com", Duration::from_secs(1)).is_err());
    assert!(HttpRemoteService::new("not a url", Duration::from_secs(1)).is_err());
    let remote =
        HttpRemoteService::new("http://127.0.0.1:8000/", Duration::from_secs(1)).expect("ok");
    assert_eq!(remote.server_url(), "http://127.0.0.1:8000");
}

#[tokio::test]
async fn typed_api_posts_scenario_then_run_with_query() {
    let (server_url, state) = spawn_mock_backend().await;
    let api = SimulationApi::new(Arc::new(http_remote(&server_url)));

    let scenario = api
        .create_scenario(&CreateScenarioRequest {
            name: "S".into(),
            system_prompt: "P".into(),
            participants: Vec::new(),
            settings: Default::default(),
        })
        .await
        .expect("scenario");
    let run = api.start_run(scenario.id).await.expect("run");

    assert_eq!(run.log.as_ref().map(Vec::len), Some(2));
    let requests = state.requests.lock().await.clone();
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].path, "/scenarios");
    assert_eq!(requests[1].method, "POST");
    assert_eq!(
        requests[1].path,
        "/run?scenario_id=11111111-2222-4333-8444-555555555555"
    );
}

#[tokio::test]
async fn typed_api_reports_shape_mismatch_as_decode_failure() {
    let (server_url, _state) = spawn_mock_backend().await;
    let api = SimulationApi::new(Arc::new(http_remote(&server_url)));

    // The catch-all answers `{"ok": true}`, which lacks the health `status` field.
    let err = api.health().await.expect_err("shape mismatch");
    assert!(matches!(err, RequestFailure::Decode { .. }));
}
