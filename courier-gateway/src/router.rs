use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use courier::event::LogEvent;
use courier::message::{AuthPayload, MailPayload, RequestEnvelope, UniformResponse};
use courier::{BrokerConnection, CourierError, Result, TransportReply};

use crate::registry::TransportRegistry;

/// Every action the gateway understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Auth,
    Log,
    LogRmq,
    LogRpc,
    LogGrpc,
    Mail,
}

impl Action {
    pub const ALL: [Action; 6] = [
        Action::Auth,
        Action::Log,
        Action::LogRmq,
        Action::LogRpc,
        Action::LogGrpc,
        Action::Mail,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Auth => "auth",
            Action::Log => "log",
            Action::LogRmq => "log_rmq",
            Action::LogRpc => "log_rpc",
            Action::LogGrpc => "log_grpc",
            Action::Mail => "mail",
        }
    }

    /// Status written when the adapter succeeds
    pub fn success_status(&self) -> StatusCode {
        match self {
            Action::Auth | Action::LogRmq | Action::LogRpc | Action::LogGrpc => StatusCode::ACCEPTED,
            Action::Log | Action::Mail => StatusCode::OK,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = CourierError;

    fn from_str(tag: &str) -> Result<Self> {
        Action::ALL
            .into_iter()
            .find(|action| action.as_str() == tag)
            .ok_or_else(|| CourierError::UnknownAction(tag.to_string()))
    }
}

/// An envelope reduced to the one payload its action selects
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Auth(AuthPayload),
    Log(LogEvent),
    LogRmq(LogEvent),
    LogRpc(LogEvent),
    LogGrpc(LogEvent),
    Mail(MailPayload),
}

impl Request {
    pub fn action(&self) -> Action {
        match self {
            Request::Auth(_) => Action::Auth,
            Request::Log(_) => Action::Log,
            Request::LogRmq(_) => Action::LogRmq,
            Request::LogRpc(_) => Action::LogRpc,
            Request::LogGrpc(_) => Action::LogGrpc,
            Request::Mail(_) => Action::Mail,
        }
    }
}

impl TryFrom<RequestEnvelope> for Request {
    type Error = CourierError;

    fn try_from(envelope: RequestEnvelope) -> Result<Self> {
        let log = || envelope.log.clone().unwrap_or_default();
        Ok(match envelope.action.parse::<Action>()? {
            Action::Auth => Request::Auth(envelope.auth.clone().unwrap_or_default()),
            Action::Log => Request::Log(log()),
            Action::LogRmq => Request::LogRmq(log()),
            Action::LogRpc => Request::LogRpc(log()),
            Action::LogGrpc => Request::LogGrpc(log()),
            Action::Mail => Request::Mail(envelope.mail.clone().unwrap_or_default()),
        })
    }
}

/// Maps each request to exactly one transport adapter and normalizes the outcome
#[derive(Debug, Clone)]
pub struct GatewayRouter {
    transports: TransportRegistry,
}

impl GatewayRouter {
    pub fn new(transports: TransportRegistry) -> Self {
        Self { transports }
    }

    pub fn transports(&self) -> &TransportRegistry {
        &self.transports
    }

    /// Route one envelope; unknown actions never reach an adapter
    pub async fn route(&self, envelope: RequestEnvelope) -> (StatusCode, UniformResponse) {
        match Request::try_from(envelope) {
            Ok(request) => {
                let action = request.action();
                let outcome = self.dispatch(request).await;
                normalize(action, outcome)
            }
            Err(e) => {
                warn!("Rejected envelope: {}", e);
                (StatusCode::BAD_REQUEST, UniformResponse::failure(e.to_string()))
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Result<TransportReply> {
        let t = &self.transports;
        debug!(action = %request.action(), "Dispatching");
        match &request {
            Request::Auth(payload) => t.auth.invoke(payload).await,
            Request::Log(event) => t.log.invoke(event).await,
            Request::LogRmq(event) => t.log_publish.invoke(event).await,
            Request::LogRpc(event) => t.log_rpc.invoke(event).await,
            Request::LogGrpc(event) => t.log_grpc.invoke(event).await,
            Request::Mail(payload) => t.mail.invoke(payload).await,
        }
    }
}

/// Turn an adapter outcome into the status and body written to the caller
pub fn normalize(action: Action, outcome: Result<TransportReply>) -> (StatusCode, UniformResponse) {
    match outcome {
        Ok(reply) => (
            action.success_status(),
            UniformResponse::success(reply.message, reply.data),
        ),
        Err(CourierError::Unauthorized) => (
            StatusCode::UNAUTHORIZED,
            UniformResponse::failure("invalid credentials"),
        ),
        Err(e) if e.is_validation() => (StatusCode::BAD_REQUEST, UniformResponse::failure(e.to_string())),
        Err(e) => {
            error!(%action, "Transport error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                UniformResponse::failure(e.to_string()),
            )
        }
    }
}

/// Gateway state shared by the HTTP handlers
#[derive(Debug, Clone)]
pub struct GatewayState {
    pub router: Arc<GatewayRouter>,
    /// Broker connection for health reporting, when one is configured
    pub broker: Option<BrokerConnection>,
}

/// Build the HTTP surface: `POST /handle` takes an envelope, `GET /health` reports status
pub fn create_router(state: GatewayState) -> Router {
    info!("Creating gateway router");
    Router::new()
        .route("/handle", post(handle_submission))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Decodes the body as JSON whatever its content type
async fn handle_submission(
    State(state): State<GatewayState>,
    body: Bytes,
) -> (StatusCode, Json<UniformResponse>) {
    let envelope = match RequestEnvelope::from_bytes(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Malformed envelope: {}", e);
            return (StatusCode::BAD_REQUEST, Json(UniformResponse::failure(e.to_string())));
        }
    };

    let (status, response) = state.router.route(envelope).await;
    (status, Json(response))
}

async fn health_check(State(state): State<GatewayState>) -> Json<Value> {
    let broker = state.broker.as_ref().map(|b| b.stats());
    let healthy = broker.as_ref().map_or(true, |stats| stats.is_connected);

    Json(serde_json::json!({
        "status": if healthy { "healthy" } else { "unhealthy" },
        "gateway": "courier-gateway",
        "version": env!("CARGO_PKG_VERSION"),
        "broker": broker,
        "adapters": state.router.transports().names(),
    }))
}
