use async_trait::async_trait;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

use super::{Transport, TransportReply};
use crate::error::{CourierError, Result};
use crate::event::LogEvent;
use crate::grpc::{LogRequest, LogServiceClient};

/// Deadline for the whole typed call, dial included
pub const GRPC_DEADLINE: Duration = Duration::from_secs(1);

/// Issues one `WriteLog` unary call per invocation
#[derive(Debug, Clone)]
pub struct GrpcLogTransport {
    endpoint: String,
    deadline: Duration,
}

impl GrpcLogTransport {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            deadline: GRPC_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    async fn write_log(&self, event: &LogEvent) -> Result<String> {
        let mut client = LogServiceClient::connect(self.endpoint.clone()).await?;

        let response = client
            .write_log(LogRequest::from(event))
            .await
            .map_err(|status| self.deadline_status(status))?;
        Ok(response.into_inner().result)
    }

    fn timed_out(&self) -> CourierError {
        CourierError::Timeout {
            timeout_ms: self.deadline.as_millis() as u64,
        }
    }

    /// A server that gives up on the call reports the same failure as our own timer
    fn deadline_status(&self, status: tonic::Status) -> CourierError {
        match status.code() {
            tonic::Code::DeadlineExceeded => self.timed_out(),
            _ => CourierError::Grpc(status),
        }
    }
}

#[async_trait]
impl Transport for GrpcLogTransport {
    type Request = LogEvent;

    async fn invoke(&self, request: &LogEvent) -> Result<TransportReply> {
        debug!(endpoint = %self.endpoint, "WriteLog");
        let result = timeout(self.deadline, self.write_log(request))
            .await
            .map_err(|_| self.timed_out())??;
        Ok(TransportReply::new(result))
    }

    fn name(&self) -> &'static str {
        "log_grpc"
    }
}
