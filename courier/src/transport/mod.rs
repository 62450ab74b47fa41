//! Transport adapters.
//!
//! Each adapter wraps one wire protocol behind the same `invoke` shape so the
//! gateway can stay protocol-agnostic:
//!
//! - [`http`]: synchronous request/response (auth, log, mail)
//! - [`rpc`]: binary RPC, one named-method call per invocation
//! - [`grpc`]: typed unary call with a 1s deadline
//! - [`publish`]: fire-and-forget publish to the topic exchange

use async_trait::async_trait;

use crate::error::Result;

pub mod grpc;
pub mod http;
pub mod publish;
pub mod rpc;

pub use grpc::GrpcLogTransport;
pub use http::{AuthTransport, HttpLogTransport, MailTransport, SyncCall};
pub use publish::PublishTransport;
pub use rpc::RpcLogTransport;

/// What an adapter hands back on success
#[derive(Debug, Clone, PartialEq)]
pub struct TransportReply {
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl TransportReply {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Option<serde_json::Value>) -> Self {
        self.data = data;
        self
    }
}

/// One wire protocol behind a uniform call shape
#[async_trait]
pub trait Transport: Send + Sync {
    type Request: Send + Sync;

    async fn invoke(&self, request: &Self::Request) -> Result<TransportReply>;

    /// Adapter name for logs
    fn name(&self) -> &'static str;
}
