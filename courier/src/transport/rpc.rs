use async_trait::async_trait;

use super::{Transport, TransportReply};
use crate::error::Result;
use crate::event::LogEvent;
use crate::rpc::{self, RpcPayload, LOG_INFO_METHOD};

/// Calls `RPCServer.LogInfo` on the logger's binary RPC port.
///
/// A new connection is dialed per invocation; no deadline is applied.
#[derive(Debug, Clone)]
pub struct RpcLogTransport {
    addr: String,
}

impl RpcLogTransport {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }
}

#[async_trait]
impl Transport for RpcLogTransport {
    type Request = LogEvent;

    async fn invoke(&self, request: &LogEvent) -> Result<TransportReply> {
        let payload = RpcPayload {
            name: request.name.clone(),
            data: request.data.clone(),
        };
        let result = rpc::call(self.addr.as_str(), LOG_INFO_METHOD, &payload).await?;
        Ok(TransportReply::new(result))
    }

    fn name(&self) -> &'static str {
        "log_rpc"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::RpcServer;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    #[tokio::test]
    async fn test_result_string_becomes_message() {
        let received: Arc<Mutex<Vec<RpcPayload>>> = Arc::default();
        let sink = received.clone();

        let server = RpcServer::new();
        server
            .register_function(LOG_INFO_METHOD, move |params| {
                let sink = sink.clone();
                async move {
                    let payload: RpcPayload = serde_json::from_value(params)?;
                    let reply = format!("Processed payload via RPC: {}", payload.name);
                    sink.lock().await.push(payload);
                    Ok::<_, crate::error::CourierError>(reply)
                }
            })
            .await;
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { server.serve(listener).await });

        let transport = RpcLogTransport::new(addr.to_string());
        let reply = transport.invoke(&LogEvent::new("login", "user X")).await.unwrap();

        assert_eq!(reply.message, "Processed payload via RPC: login");
        assert_eq!(
            received.lock().await.as_slice(),
            &[RpcPayload {
                name: "login".to_string(),
                data: "user X".to_string()
            }]
        );
    }
}
