use std::sync::Arc;

use courier::event::LogEvent;
use courier::message::{AuthPayload, MailPayload};
use courier::transport::http::Client;
use courier::transport::{
    AuthTransport, GrpcLogTransport, HttpLogTransport, MailTransport, PublishTransport,
    RpcLogTransport, SyncCall, Transport,
};
use courier::{config::Services, EventPublisher};

pub type AuthAdapter = Arc<dyn Transport<Request = AuthPayload>>;
pub type LogAdapter = Arc<dyn Transport<Request = LogEvent>>;
pub type MailAdapter = Arc<dyn Transport<Request = MailPayload>>;

/// One adapter per action; the router picks exactly one of these per request
#[derive(Clone)]
pub struct TransportRegistry {
    pub auth: AuthAdapter,
    pub log: LogAdapter,
    pub log_publish: LogAdapter,
    pub log_rpc: LogAdapter,
    pub log_grpc: LogAdapter,
    pub mail: MailAdapter,
}

impl TransportRegistry {
    /// Wire the production adapters; the publisher carries the shared broker connection
    pub fn new(services: &Services, publisher: EventPublisher) -> Self {
        let client = Client::new();
        Self {
            auth: Arc::new(AuthTransport::new(SyncCall::with_client(
                client.clone(),
                &services.auth_url,
            ))),
            log: Arc::new(HttpLogTransport::new(SyncCall::with_client(
                client.clone(),
                &services.log_url,
            ))),
            log_publish: Arc::new(PublishTransport::new(publisher)),
            log_rpc: Arc::new(RpcLogTransport::new(&services.log_rpc_addr)),
            log_grpc: Arc::new(GrpcLogTransport::new(&services.log_grpc_url)),
            mail: Arc::new(MailTransport::new(SyncCall::with_client(
                client,
                &services.mail_url,
            ))),
        }
    }

    /// Adapter names in dispatch order, for the health endpoint
    pub fn names(&self) -> Vec<&'static str> {
        vec![
            self.auth.name(),
            self.log.name(),
            self.log_publish.name(),
            self.log_rpc.name(),
            self.log_grpc.name(),
            self.mail.name(),
        ]
    }
}

impl std::fmt::Debug for TransportRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportRegistry")
            .field("adapters", &self.names())
            .finish()
    }
}
