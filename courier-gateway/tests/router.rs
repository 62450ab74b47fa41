use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request as HttpRequest, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use courier::message::{AuthPayload, MailPayload, RequestEnvelope, UniformResponse};
use courier::transport::{AuthTransport, SyncCall};
use courier::{CourierError, LogEvent, Result, Transport, TransportReply};
use courier_gateway::{create_router, Action, GatewayRouter, GatewayState, TransportRegistry};

/// Records which adapter saw which request
#[derive(Default)]
struct Calls {
    by_adapter: Mutex<Vec<&'static str>>,
    logs: Mutex<Vec<LogEvent>>,
}

impl Calls {
    fn adapters(&self) -> Vec<&'static str> {
        self.by_adapter.lock().unwrap().clone()
    }
}

struct Recording<R> {
    name: &'static str,
    calls: Arc<Calls>,
    reply: fn(&R) -> Result<TransportReply>,
}

#[async_trait]
impl Transport for Recording<AuthPayload> {
    type Request = AuthPayload;

    async fn invoke(&self, request: &AuthPayload) -> Result<TransportReply> {
        self.calls.by_adapter.lock().unwrap().push(self.name);
        (self.reply)(request)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl Transport for Recording<LogEvent> {
    type Request = LogEvent;

    async fn invoke(&self, request: &LogEvent) -> Result<TransportReply> {
        self.calls.by_adapter.lock().unwrap().push(self.name);
        self.calls.logs.lock().unwrap().push(request.clone());
        (self.reply)(request)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[async_trait]
impl Transport for Recording<MailPayload> {
    type Request = MailPayload;

    async fn invoke(&self, request: &MailPayload) -> Result<TransportReply> {
        self.calls.by_adapter.lock().unwrap().push(self.name);
        (self.reply)(request)
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

fn recording_registry(calls: &Arc<Calls>) -> TransportRegistry {
    fn log(name: &'static str, calls: &Arc<Calls>, message: &'static str) -> Arc<Recording<LogEvent>> {
        let reply: fn(&LogEvent) -> Result<TransportReply> = match message {
            "logged" => |_: &LogEvent| Ok(TransportReply::new("logged")),
            "logged via RabbitMQ" => |_: &LogEvent| Ok(TransportReply::new("logged via RabbitMQ")),
            _ => |e: &LogEvent| Ok(TransportReply::new(format!("{} logged", e.name))),
        };
        Arc::new(Recording {
            name,
            calls: calls.clone(),
            reply,
        })
    }

    TransportRegistry {
        auth: Arc::new(Recording {
            name: "auth",
            calls: calls.clone(),
            reply: |_: &AuthPayload| Ok(TransportReply::new("Authenticated")),
        }),
        log: log("log", calls, "logged"),
        log_publish: log("log_rmq", calls, "logged via RabbitMQ"),
        log_rpc: log("log_rpc", calls, "rpc"),
        log_grpc: log("log_grpc", calls, "grpc"),
        mail: Arc::new(Recording {
            name: "mail",
            calls: calls.clone(),
            reply: |m: &MailPayload| Ok(TransportReply::new(format!("message sent to {}", m.to))),
        }),
    }
}

fn app(registry: TransportRegistry) -> Router {
    create_router(GatewayState {
        router: Arc::new(GatewayRouter::new(registry)),
        broker: None,
    })
}

async fn post_json(app: Router, body: Value) -> (StatusCode, Value) {
    let request = HttpRequest::builder()
        .method("POST")
        .uri("/handle")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// Stand-in auth service answering with a fixed status
async fn start_auth_service(status: u16) -> String {
    let handler = move |Json(_): Json<Value>| async move {
        (
            StatusCode::from_u16(status).unwrap(),
            Json(json!({"error": false, "message": "ok", "data": {"id": 1, "email": "a@b.com"}})),
        )
    };
    let app = Router::new().route("/authenticate", post(handler));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_each_known_action_reaches_exactly_one_adapter() {
    let expected = [
        (Action::Auth, "auth", StatusCode::ACCEPTED, "Authenticated"),
        (Action::Log, "log", StatusCode::OK, "logged"),
        (Action::LogRmq, "log_rmq", StatusCode::ACCEPTED, "logged via RabbitMQ"),
        (Action::LogRpc, "log_rpc", StatusCode::ACCEPTED, "login logged"),
        (Action::LogGrpc, "log_grpc", StatusCode::ACCEPTED, "login logged"),
        (Action::Mail, "mail", StatusCode::OK, "message sent to you@there.com"),
    ];

    for (action, adapter, status, message) in expected {
        let calls = Arc::new(Calls::default());
        let router = GatewayRouter::new(recording_registry(&calls));

        let envelope = RequestEnvelope::new(action.as_str())
            .with_log(LogEvent::new("login", "user X"))
            .with_mail(MailPayload {
                to: "you@there.com".to_string(),
                ..Default::default()
            });
        let (got_status, body) = router.route(envelope).await;

        assert_eq!(calls.adapters(), vec![adapter], "action {}", action);
        assert_eq!(got_status, status, "action {}", action);
        assert_eq!(body.message, message);
        assert!(!body.error);
    }
}

#[tokio::test]
async fn test_unknown_action_calls_no_adapter() {
    let calls = Arc::new(Calls::default());
    let (status, body) = post_json(app(recording_registry(&calls)), json!({"action": "foo"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({"error": true, "message": "unknown action"}));
    assert!(calls.adapters().is_empty());
}

#[tokio::test]
async fn test_malformed_body_is_rejected() {
    let calls = Arc::new(Calls::default());
    let request = HttpRequest::builder()
        .method("POST")
        .uri("/handle")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app(recording_registry(&calls)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: UniformResponse = serde_json::from_slice(&bytes).unwrap();
    assert!(body.error);
    assert!(body.message.starts_with("invalid message format"));
    assert!(calls.adapters().is_empty());
}

#[tokio::test]
async fn test_body_without_json_content_type_is_decoded() {
    let calls = Arc::new(Calls::default());
    let request = HttpRequest::builder()
        .method("POST")
        .uri("/handle")
        .body(Body::from(r#"{"action":"log","log":{"name":"login","data":"user X"}}"#))
        .unwrap();

    let response = app(recording_registry(&calls)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: UniformResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body, UniformResponse::success("logged", None));
    assert_eq!(calls.adapters(), vec!["log"]);
}

#[tokio::test]
async fn test_log_payload_passes_through_unchanged() {
    let calls = Arc::new(Calls::default());
    let (status, body) = post_json(
        app(recording_registry(&calls)),
        json!({"action": "log_rmq", "log": {"name": "login", "data": "user X"}}),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, json!({"error": false, "message": "logged via RabbitMQ"}));
    assert_eq!(
        calls.logs.lock().unwrap().clone(),
        vec![LogEvent::new("login", "user X")]
    );
}

#[tokio::test]
async fn test_adapter_failure_becomes_error_response() {
    let calls = Arc::new(Calls::default());
    let mut registry = recording_registry(&calls);
    registry.log_grpc = Arc::new(Recording {
        name: "log_grpc",
        calls: calls.clone(),
        reply: |_: &LogEvent| Err(CourierError::Timeout { timeout_ms: 1000 }),
    });

    let (status, body) = post_json(
        app(registry),
        json!({"action": "log_grpc", "log": {"name": "n", "data": "d"}}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], json!(true));
    assert_eq!(body["message"], json!("call timed out after 1000ms"));
}

#[tokio::test]
async fn test_auth_accepted_by_downstream() {
    let calls = Arc::new(Calls::default());
    let mut registry = recording_registry(&calls);
    registry.auth = Arc::new(AuthTransport::new(SyncCall::new(start_auth_service(202).await)));

    let (status, body) = post_json(
        app(registry),
        json!({"action": "auth", "auth": {"email": "a@b.com", "password": "x"}}),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["error"], json!(false));
    assert_eq!(body["message"], json!("Authenticated"));
    assert_eq!(body["data"]["email"], json!("a@b.com"));
}

#[tokio::test]
async fn test_auth_rejected_by_downstream() {
    let calls = Arc::new(Calls::default());
    let mut registry = recording_registry(&calls);
    registry.auth = Arc::new(AuthTransport::new(SyncCall::new(start_auth_service(401).await)));

    let (status, body) = post_json(
        app(registry),
        json!({"action": "auth", "auth": {"email": "a@b.com", "password": "x"}}),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({"error": true, "message": "invalid credentials"}));
}

#[tokio::test]
async fn test_health_lists_adapters() {
    let calls = Arc::new(Calls::default());
    let request = HttpRequest::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app(recording_registry(&calls)).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["status"], json!("healthy"));
    assert_eq!(
        body["adapters"],
        json!(["auth", "log", "log_rmq", "log_rpc", "log_grpc", "mail"])
    );
}
