//! Integration tests using wiremock to simulate HTTP servers.

use async_trait::async_trait;
use outcall::transport::{Transport, TransportError, TransportRequest, TransportResponse};
use outcall::{
    ApiError, Endpoint, Error, NetworkActivity, NetworkActivityPlugin, Plugin, RawOutcome,
    Request, RequestDescriptor, RequestState, Response,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::oneshot;
use wiremock::matchers::{
    body_json, body_string_contains, header, header_regex, method, path, query_param,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct TestUser {
    id: u32,
    name: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct ServiceError {
    code: u16,
    message: String,
}

fn alan() -> TestUser {
    TestUser {
        id: 1,
        name: "Alan Bradley".to_string(),
    }
}

/// Performs `request` and waits for whichever callback fires.
async fn perform<M, E>(request: &Request<M, E>) -> Result<Response<M>, ApiError<E>>
where
    M: Send + 'static,
    E: Send + 'static,
{
    let (tx, rx) = oneshot::channel();
    let on_success = Arc::new(Mutex::new(Some(tx)));
    let on_failure = on_success.clone();

    request.perform(
        move |response| {
            if let Some(tx) = on_success.lock().unwrap().take() {
                let _ = tx.send(Ok(response));
            }
        },
        move |error| {
            if let Some(tx) = on_failure.lock().unwrap().take() {
                let _ = tx.send(Err(error));
            }
        },
    );

    rx.await.expect("a callback should fire")
}

/// Records hook invocations as `"<name>:<hook>"`.
struct Recorder {
    name: &'static str,
    log: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: log.clone(),
        })
    }
}

impl Plugin for Recorder {
    fn will_send(&self, _request: &RequestDescriptor) {
        self.log.lock().unwrap().push(format!("{}:send", self.name));
    }

    fn did_receive(&self, _request: &RequestDescriptor, outcome: &RawOutcome<'_>) {
        let hook = match outcome {
            RawOutcome::Cancelled => "cancelled",
            _ => "receive",
        };
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, hook));
    }
}

/// A transport that always fails.
struct Unreachable;

#[async_trait]
impl Transport for Unreachable {
    async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, TransportError> {
        Err(TransportError::other("connection refused"))
    }
}

#[tokio::test]
async fn test_successful_get_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alan()))
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(mock_server.uri()).unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("users/1").unwrap();

    let response = request.send().await.unwrap();

    assert_eq!(response.data, alan());
    assert_eq!(response.status.as_u16(), 200);
    assert!(!response.stubbed);
    assert!(response.raw_body.contains("Alan Bradley"));
    assert_eq!(request.state(), RequestState::Completed);
}

#[tokio::test]
async fn test_perform_delivers_success_callback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alan()))
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(mock_server.uri()).unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("users/1").unwrap();

    let response = perform(&request).await.unwrap();
    assert_eq!(response.data, alan());
}

#[tokio::test]
async fn test_error_status_parses_error_model() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/2"))
        .respond_with(ResponseTemplate::new(404).set_body_json(ServiceError {
            code: 404,
            message: "User not found".to_string(),
        }))
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(mock_server.uri()).unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("users/2").unwrap();

    let error = perform(&request).await.unwrap_err();

    assert_eq!(error.status().map(|s| s.as_u16()), Some(404));
    assert_eq!(
        error.error_model,
        Some(ServiceError {
            code: 404,
            message: "User not found".to_string(),
        })
    );
    assert!(matches!(error.cause, Error::HttpStatus { .. }));
}

#[tokio::test]
async fn test_unparseable_error_body_keeps_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/2"))
        .respond_with(ResponseTemplate::new(503).set_body_string("Service unavailable"))
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(mock_server.uri()).unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("users/2").unwrap();

    let error = request.send().await.unwrap_err();

    assert!(error.error_model.is_none());
    assert_eq!(error.raw_response(), Some("Service unavailable"));
    assert_eq!(error.status().map(|s| s.as_u16()), Some(503));
}

#[tokio::test]
async fn test_success_parse_failure_reaches_failure_callback() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("invalid json"))
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(mock_server.uri()).unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("users/1").unwrap();

    match perform(&request).await {
        Err(ApiError {
            cause:
                Error::Parse {
                    raw_response,
                    status,
                    ..
                },
            ..
        }) => {
            assert_eq!(status.as_u16(), 200);
            assert_eq!(raw_response, "invalid json");
        }
        other => panic!("Expected a parse failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_transport_failure_is_preserved() {
    let endpoint = Endpoint::builder()
        .base_url("https://example.test")
        .unwrap()
        .transport(Arc::new(Unreachable))
        .build()
        .unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("users/1").unwrap();

    let error = perform(&request).await.unwrap_err();

    assert!(error.is_transport());
    assert!(error.error_model.is_none());
    assert!(error.to_string().contains("connection refused"));
}

#[tokio::test]
async fn test_timeout_is_a_transport_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(alan())
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("slow").unwrap();

    let error = request.send().await.unwrap_err();
    assert!(matches!(
        error.cause,
        Error::Transport(TransportError::Timeout)
    ));
}

#[tokio::test]
async fn test_default_and_request_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .and(header("accept", "application/json"))
        .and(header("user-agent", "test-agent"))
        .and(header("x-trace", "abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alan()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_header("User-Agent", "test-agent")
        .unwrap()
        .build()
        .unwrap();

    let request = endpoint
        .request::<TestUser, ServiceError>("users/1")
        .unwrap()
        .header("X-Trace", "abc")
        .unwrap();

    request.send().await.unwrap();
}

#[tokio::test]
async fn test_post_json_body_and_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/users"))
        .and(query_param("notify", "true"))
        .and(header("content-type", "application/json"))
        .and(body_json(alan()))
        .respond_with(ResponseTemplate::new(201).set_body_json(alan()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(mock_server.uri()).unwrap();
    let request = endpoint
        .request::<TestUser, ServiceError>("users")
        .unwrap()
        .method(http::Method::POST)
        .query_param("notify", "true")
        .json_body(&alan())
        .unwrap();

    let response = request.send().await.unwrap();
    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.data, alan());
}

#[tokio::test]
async fn test_multipart_upload() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/uploads"))
        .and(header_regex("content-type", "^multipart/form-data; boundary="))
        .and(|request: &wiremock::Request| {
            request.headers.get_all("content-type").iter().count() == 1
        })
        .and(body_string_contains("name=\"title\""))
        .and(body_string_contains("Holiday"))
        .and(body_string_contains("filename=\"notes.txt\""))
        .and(body_string_contains("remember the milk"))
        .respond_with(ResponseTemplate::new(201).set_body_json(42))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .default_header("Content-Type", "application/json")
        .unwrap()
        .build()
        .unwrap();

    let request = endpoint
        .multipart_request::<u32, ServiceError>("uploads")
        .unwrap()
        .text_part("title", "Holiday")
        .file_part(
            "notes",
            b"remember the milk".to_vec(),
            "notes.txt",
            Some("text/plain"),
        );

    let response = perform(&request).await.unwrap();
    assert_eq!(response.status.as_u16(), 201);
    assert_eq!(response.data, 42);
}

#[tokio::test]
async fn test_colon_path_stays_under_base_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/users:search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(vec![alan()]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(format!("{}/api", mock_server.uri())).unwrap();
    let request = endpoint
        .request::<Vec<TestUser>, ServiceError>("users:search")
        .unwrap();

    let response = request.send().await.unwrap();
    assert_eq!(response.data, vec![alan()]);
}

#[tokio::test]
async fn test_empty_success_body_parses_as_null() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(mock_server.uri()).unwrap();
    let request = endpoint
        .request::<(), ServiceError>("users/1")
        .unwrap()
        .method(http::Method::DELETE);

    let response = request.send().await.unwrap();
    assert_eq!(response.status.as_u16(), 204);
}

#[tokio::test]
async fn test_global_plugins_fire_without_local_plugins() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/200"))
        .respond_with(ResponseTemplate::new(200).set_body_json(1))
        .mount(&mock_server)
        .await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let endpoint = Endpoint::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .plugin(Recorder::new("global", &log))
        .build()
        .unwrap();

    let request = endpoint.request::<u32, u32>("status/200").unwrap();
    perform(&request).await.unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["global:send", "global:receive"]);
}

#[tokio::test]
async fn test_global_plugins_run_before_local_plugins() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/status/500"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let log = Arc::new(Mutex::new(Vec::new()));
    let endpoint = Endpoint::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .plugins([
            Recorder::new("g1", &log) as Arc<dyn Plugin>,
            Recorder::new("g2", &log) as Arc<dyn Plugin>,
        ])
        .build()
        .unwrap();

    let request = endpoint
        .request::<String, u32>("status/500")
        .unwrap()
        .plugin(Recorder::new("local", &log));

    perform(&request).await.unwrap_err();

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            "g1:send",
            "g2:send",
            "local:send",
            "g1:receive",
            "g2:receive",
            "local:receive",
        ]
    );
}

#[tokio::test]
async fn test_cancel_in_flight_request_suppresses_callbacks() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(alan())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let activity = NetworkActivity::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let endpoint = Endpoint::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .plugin(Arc::new(NetworkActivityPlugin::new(activity.clone())))
        .plugin(Recorder::new("global", &log))
        .build()
        .unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("slow").unwrap();

    let callbacks = Arc::new(AtomicUsize::new(0));
    let (on_success, on_failure) = (callbacks.clone(), callbacks.clone());
    let token = request.perform(
        move |_| {
            on_success.fetch_add(1, Ordering::SeqCst);
        },
        move |_| {
            on_failure.fetch_add(1, Ordering::SeqCst);
        },
    );

    // Let the request reach the server before cancelling.
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(activity.count(), 1);
    token.cancel();

    tokio::time::sleep(Duration::from_millis(700)).await;

    assert_eq!(callbacks.load(Ordering::SeqCst), 0);
    assert!(token.is_finished());
    assert_eq!(activity.count(), 0);
    assert_eq!(request.state(), RequestState::Completed);
    assert_eq!(
        *log.lock().unwrap(),
        vec!["global:send", "global:cancelled"]
    );
}

#[tokio::test]
async fn test_cancel_after_completion_is_a_noop() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alan()))
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(mock_server.uri()).unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("users/1").unwrap();

    let (tx, rx) = oneshot::channel();
    let token = request.perform(
        move |response| {
            let _ = tx.send(response.data);
        },
        |error| panic!("unexpected failure: {}", error),
    );

    assert_eq!(rx.await.unwrap(), alan());
    tokio::time::sleep(Duration::from_millis(10)).await;

    token.cancel();
    assert!(token.is_finished());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_requests_return_activity_to_zero() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/fast"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(1)
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(2)
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&mock_server)
        .await;

    let peak = Arc::new(AtomicUsize::new(0));
    let activity = NetworkActivity::new();
    let mut changes = activity.subscribe();
    let peak_clone = peak.clone();
    let watcher = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            let count = *changes.borrow_and_update();
            peak_clone.fetch_max(count, Ordering::SeqCst);
        }
    });

    let endpoint = Endpoint::builder()
        .base_url(mock_server.uri())
        .unwrap()
        .plugin(Arc::new(NetworkActivityPlugin::new(activity.clone())))
        .build()
        .unwrap();

    let slow = endpoint.request::<u32, u32>("slow").unwrap();
    let fast = endpoint.request::<u32, u32>("fast").unwrap();

    let (slow_result, fast_result) = tokio::join!(perform(&slow), perform(&fast));

    assert_eq!(slow_result.unwrap_err().error_model, Some(2));
    assert_eq!(fast_result.unwrap().data, 1);
    assert_eq!(activity.count(), 0);
    assert_eq!(peak.load(Ordering::SeqCst), 2);

    drop(activity);
    drop(endpoint);
    watcher.abort();
}

#[tokio::test]
async fn test_second_send_fails_fast() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(alan()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let endpoint = Endpoint::new(mock_server.uri()).unwrap();
    let request = endpoint.request::<TestUser, ServiceError>("users/1").unwrap();

    request.send().await.unwrap();
    let error = request.send().await.unwrap_err();

    assert!(matches!(error.cause, Error::AlreadyPerformed));
}
