//! Typed RPC (gRPC) definitions for the `LogService/WriteLog` unary call.
//!
//! Messages are plain prost structs; `build.rs` generates the client and
//! server glue from them.

#[derive(Clone, PartialEq, prost::Message)]
pub struct Log {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub data: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogRequest {
    #[prost(message, optional, tag = "1")]
    pub log_entry: Option<Log>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct LogResponse {
    #[prost(string, tag = "1")]
    pub result: String,
}

include!(concat!(env!("OUT_DIR"), "/courier.logs.LogService.rs"));

pub use log_service_client::LogServiceClient;
pub use log_service_server::{LogService, LogServiceServer};

impl From<&crate::event::LogEvent> for LogRequest {
    fn from(event: &crate::event::LogEvent) -> Self {
        Self {
            log_entry: Some(Log {
                name: event.name.clone(),
                data: event.data.clone(),
            }),
        }
    }
}
