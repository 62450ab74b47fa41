//! Binary RPC: named-method calls over TCP.
//!
//! Each frame is a length-delimited JSON document. A client dials, writes one
//! [`RpcCall`], reads one [`RpcReply`] and hangs up; the server keeps serving
//! calls on a connection until the peer closes it.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tokio::sync::RwLock;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{debug, error, info, warn};

use crate::error::{CourierError, Result};

/// Method the logger exposes for plain log writes
pub const LOG_INFO_METHOD: &str = "RPCServer.LogInfo";

/// Request frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcCall {
    pub seq: u64,
    pub method: String,
    pub params: serde_json::Value,
}

/// Reply frame; exactly one of `result`/`error` is set
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    pub seq: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RpcReply {
    fn ok(seq: u64, result: String) -> Self {
        Self {
            seq,
            result: Some(result),
            error: None,
        }
    }

    fn err(seq: u64, error: impl Into<String>) -> Self {
        Self {
            seq,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// Parameters of [`LOG_INFO_METHOD`]: `{"Name": ..., "Data": ...}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RpcPayload {
    pub name: String,
    pub data: String,
}

/// Trait for implementing RPC methods
#[async_trait]
pub trait RpcHandler: Send + Sync {
    /// Handle one call, returning the string result
    async fn handle(&self, params: serde_json::Value) -> Result<String>;

    /// Get handler name for debugging
    fn name(&self) -> &str {
        "RpcHandler"
    }
}

/// Simple function-based RPC handler
pub struct FunctionHandler<F> {
    name: String,
    handler: F,
}

impl<F> FunctionHandler<F> {
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            name: name.into(),
            handler,
        }
    }
}

#[async_trait]
impl<F, Fut> RpcHandler for FunctionHandler<F>
where
    F: Fn(serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String>> + Send,
{
    async fn handle(&self, params: serde_json::Value) -> Result<String> {
        (self.handler)(params).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

type HandlerMap = Arc<RwLock<HashMap<String, Arc<dyn RpcHandler>>>>;

/// Serves registered methods to binary RPC clients
#[derive(Clone, Default)]
pub struct RpcServer {
    handlers: HandlerMap,
    served: Arc<AtomicU64>,
}

impl RpcServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for a specific method
    pub async fn register_handler<H>(&self, method: impl Into<String>, handler: H)
    where
        H: RpcHandler + 'static,
    {
        let method = method.into();
        self.handlers
            .write()
            .await
            .insert(method.clone(), Arc::new(handler));
        info!("Registered RPC handler for method: {}", method);
    }

    /// Register a function-based handler
    pub async fn register_function<F, Fut>(&self, method: impl Into<String>, handler: F)
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String>> + Send + 'static,
    {
        let method = method.into();
        let function_handler = FunctionHandler::new(method.clone(), handler);
        self.register_handler(method, function_handler).await;
    }

    /// Accept connections until the listener fails
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("RPC server listening on {}", listener.local_addr()?);
        loop {
            let (stream, peer) = listener.accept().await?;
            debug!(%peer, "Accepted RPC connection");
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.serve_connection(stream).await {
                    warn!(%peer, "RPC connection ended with error: {}", e);
                }
            });
        }
    }

    async fn serve_connection(&self, stream: TcpStream) -> Result<()> {
        let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

        while let Some(frame) = framed.next().await {
            let reply = match serde_json::from_slice::<RpcCall>(&frame?) {
                Ok(call) => self.dispatch(call).await,
                Err(e) => RpcReply::err(0, format!("malformed call: {}", e)),
            };
            framed.send(Bytes::from(serde_json::to_vec(&reply)?)).await?;
        }

        Ok(())
    }

    async fn dispatch(&self, call: RpcCall) -> RpcReply {
        let handler = { self.handlers.read().await.get(&call.method).cloned() };
        self.served.fetch_add(1, Ordering::Relaxed);

        match handler {
            Some(handler) => match handler.handle(call.params).await {
                Ok(result) => RpcReply::ok(call.seq, result),
                Err(e) => {
                    error!("Handler error for {}: {}", call.method, e);
                    RpcReply::err(call.seq, e.to_string())
                }
            },
            None => {
                warn!("No handler found for method: {}", call.method);
                RpcReply::err(call.seq, format!("rpc: can't find method {}", call.method))
            }
        }
    }

    /// Get server statistics
    pub async fn get_stats(&self) -> RpcStats {
        RpcStats {
            registered_handlers: self.handlers.read().await.len(),
            calls_served: self.served.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for RpcServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcServer")
            .field("calls_served", &self.served.load(Ordering::Relaxed))
            .finish()
    }
}

/// RPC server statistics
#[derive(Debug, Clone, serde::Serialize)]
pub struct RpcStats {
    pub registered_handlers: usize,
    pub calls_served: u64,
}

/// Dial `addr`, invoke `method` once and return its string result
pub async fn call<A>(addr: A, method: &str, params: impl Serialize) -> Result<String>
where
    A: ToSocketAddrs + std::fmt::Display,
{
    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|e| CourierError::rpc_error(format!("dial {}: {}", addr, e)))?;
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    let request = RpcCall {
        seq: 1,
        method: method.to_string(),
        params: serde_json::to_value(params)?,
    };
    framed.send(Bytes::from(serde_json::to_vec(&request)?)).await?;

    let frame = framed
        .next()
        .await
        .ok_or_else(|| CourierError::rpc_error("connection closed before reply"))??;
    let reply: RpcReply = serde_json::from_slice(&frame)?;

    match (reply.result, reply.error) {
        (_, Some(error)) => Err(CourierError::rpc_error(error)),
        (Some(result), None) => Ok(result),
        (None, None) => Err(CourierError::rpc_error("empty reply")),
    }
}
