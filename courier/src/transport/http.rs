use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, warn};

use super::{Transport, TransportReply};
use crate::error::{CourierError, Result};
use crate::event::LogEvent;
use crate::message::{AuthPayload, MailPayload, UniformResponse};
use crate::subscriber::EventSink;

pub use reqwest::Client;

/// Blocking-style JSON POST against a downstream service.
///
/// No timeout is set; calls are bounded by the client's defaults only.
#[derive(Debug, Clone)]
pub struct SyncCall {
    client: reqwest::Client,
    base_url: String,
}

impl SyncCall {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Share one HTTP client across adapters
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn post(&self, path: &str, body: &impl Serialize) -> Result<reqwest::Response> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        debug!(%url, "POST");
        let response = self.client.post(&url).json(body).send().await?;
        Ok(response)
    }
}

fn expect_accepted(service: &str, response: &reqwest::Response) -> Result<()> {
    match response.status() {
        StatusCode::ACCEPTED => Ok(()),
        StatusCode::UNAUTHORIZED => Err(CourierError::Unauthorized),
        status => Err(CourierError::UnexpectedStatus {
            service: service.to_string(),
            status: status.as_u16(),
        }),
    }
}

/// `POST {auth}/authenticate`
#[derive(Debug, Clone)]
pub struct AuthTransport {
    call: SyncCall,
}

impl AuthTransport {
    pub fn new(call: SyncCall) -> Self {
        Self { call }
    }
}

#[async_trait]
impl Transport for AuthTransport {
    type Request = AuthPayload;

    async fn invoke(&self, request: &AuthPayload) -> Result<TransportReply> {
        let response = self.call.post("authenticate", request).await?;
        expect_accepted("auth service", &response)?;

        let body: UniformResponse = response.json().await?;
        if body.error {
            warn!(email = %request.email, "Auth service rejected credentials: {}", body.message);
            return Err(CourierError::Unauthorized);
        }

        Ok(TransportReply::new("Authenticated").with_data(body.data))
    }

    fn name(&self) -> &'static str {
        "auth"
    }
}

/// `POST {log}/log`; also the subscriber's downstream sink
#[derive(Debug, Clone)]
pub struct HttpLogTransport {
    call: SyncCall,
}

impl HttpLogTransport {
    pub fn new(call: SyncCall) -> Self {
        Self { call }
    }

    async fn write(&self, event: &LogEvent) -> Result<()> {
        let response = self.call.post("log", event).await?;
        expect_accepted("logger service", &response)
    }
}

#[async_trait]
impl Transport for HttpLogTransport {
    type Request = LogEvent;

    async fn invoke(&self, request: &LogEvent) -> Result<TransportReply> {
        self.write(request).await?;
        Ok(TransportReply::new("logged"))
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[async_trait]
impl EventSink for HttpLogTransport {
    async fn deliver(&self, event: &LogEvent) -> Result<()> {
        self.write(event).await
    }

    fn name(&self) -> &'static str {
        "logger-http"
    }
}

/// `POST {mail}/send`
#[derive(Debug, Clone)]
pub struct MailTransport {
    call: SyncCall,
}

impl MailTransport {
    pub fn new(call: SyncCall) -> Self {
        Self { call }
    }
}

#[async_trait]
impl Transport for MailTransport {
    type Request = MailPayload;

    async fn invoke(&self, request: &MailPayload) -> Result<TransportReply> {
        let response = self.call.post("send", request).await?;
        expect_accepted("mail service", &response)?;
        Ok(TransportReply::new(format!("message sent to {}", request.to)))
    }

    fn name(&self) -> &'static str {
        "mail"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::StatusCode as AxumStatus, routing::post, Json, Router};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    type Seen = Arc<Mutex<Vec<serde_json::Value>>>;

    /// Downstream stand-in: `password == "x"` authenticates, anything else is 401
    async fn start_downstream(log_status: u16) -> (String, Seen) {
        let seen: Seen = Arc::default();

        let app = Router::new()
            .route(
                "/authenticate",
                post(|Json(body): Json<serde_json::Value>| async move {
                    let email = body["email"].clone();
                    match body["password"].as_str() {
                        Some("x") => (
                            AxumStatus::ACCEPTED,
                            Json(serde_json::json!({"error": false, "message": "ok", "data": {"email": email}})),
                        ),
                        Some("flagged") => (
                            AxumStatus::ACCEPTED,
                            Json(serde_json::json!({"error": true, "message": "blocked"})),
                        ),
                        _ => (
                            AxumStatus::UNAUTHORIZED,
                            Json(serde_json::json!({"error": true, "message": "invalid"})),
                        ),
                    }
                }),
            )
            .route(
                "/log",
                post(move |State(seen): State<Seen>, Json(body): Json<serde_json::Value>| async move {
                    seen.lock().await.push(body);
                    AxumStatus::from_u16(log_status).unwrap()
                }),
            )
            .route("/send", post(|| async { AxumStatus::ACCEPTED }))
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await });
        (format!("http://{}", addr), seen)
    }

    #[tokio::test]
    async fn test_auth_success_carries_data() {
        let (base, _) = start_downstream(202).await;
        let auth = AuthTransport::new(SyncCall::new(base));

        let reply = auth
            .invoke(&AuthPayload {
                email: "a@b.com".to_string(),
                password: "x".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(reply.message, "Authenticated");
        assert_eq!(reply.data.unwrap()["email"], "a@b.com");
    }

    #[tokio::test]
    async fn test_auth_rejections() {
        let (base, _) = start_downstream(202).await;
        let auth = AuthTransport::new(SyncCall::new(base));

        for password in ["wrong", "flagged"] {
            let err = auth
                .invoke(&AuthPayload {
                    email: "a@b.com".to_string(),
                    password: password.to_string(),
                })
                .await
                .unwrap_err();
            assert!(matches!(err, CourierError::Unauthorized), "{password}: {err}");
        }
    }

    #[tokio::test]
    async fn test_log_forwards_body() {
        let (base, seen) = start_downstream(202).await;
        let log = HttpLogTransport::new(SyncCall::new(format!("{}/", base)));

        let reply = log.invoke(&LogEvent::new("login", "user X")).await.unwrap();
        assert_eq!(reply.message, "logged");
        assert_eq!(
            seen.lock().await.as_slice(),
            &[serde_json::json!({"name": "login", "data": "user X"})]
        );
    }

    #[tokio::test]
    async fn test_log_non_accepted_status() {
        let (base, _) = start_downstream(500).await;
        let log = HttpLogTransport::new(SyncCall::new(base));

        let err = log.deliver(&LogEvent::new("a", "b")).await.unwrap_err();
        assert!(matches!(err, CourierError::UnexpectedStatus { status: 500, .. }));
    }

    #[tokio::test]
    async fn test_mail_message_names_recipient() {
        let (base, _) = start_downstream(202).await;
        let mail = MailTransport::new(SyncCall::new(base));
        let reply = mail
            .invoke(&MailPayload {
                to: "me@here.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(reply.message, "message sent to me@here.com");
    }

    #[tokio::test]
    async fn test_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let mail = MailTransport::new(SyncCall::new(format!("http://{}", addr)));
        let err = mail.invoke(&MailPayload::default()).await.unwrap_err();
        assert!(matches!(err, CourierError::Http(_)));
    }
}
